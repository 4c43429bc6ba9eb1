//! Minimal Plotly figure model rendered into the report as JSON.

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;

pub const FIGURE_WIDTH: u32 = 1600;
pub const FIGURE_HEIGHT: u32 = 1024;

const BACKGROUND: &str = "#111111";
const FOREGROUND: &str = "#f2f5fa";
const GRID: &str = "#283442";

static NEXT_CHART_ID: AtomicUsize = AtomicUsize::new(0);

/// X values of a trace.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Axis {
    Numbers(Vec<f64>),
    Labels(Vec<String>),
}

#[derive(Debug, Clone, Serialize)]
pub struct Line {
    pub color: String,
    pub width: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dash: Option<&'static str>,
}

impl Line {
    #[must_use]
    pub fn solid(color: &str, width: f64) -> Self {
        Self {
            color: color.to_string(),
            width,
            dash: None,
        }
    }

    #[must_use]
    pub fn dashed(color: &str, width: f64) -> Self {
        Self {
            dash: Some("dash"),
            ..Self::solid(color, width)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct Marker {
    color: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Trace {
    Bar {
        x: Axis,
        y: Vec<f64>,
        name: String,
        marker: Marker,
        width: f64,
    },
    Scatter {
        x: Axis,
        y: Vec<f64>,
        name: String,
        mode: &'static str,
        line: Line,
        showlegend: bool,
    },
    Candlestick {
        x: Axis,
        open: Vec<f64>,
        high: Vec<f64>,
        low: Vec<f64>,
        close: Vec<f64>,
        name: String,
    },
}

#[derive(Debug, Clone, Serialize)]
struct Shape {
    #[serde(rename = "type")]
    kind: &'static str,
    xref: &'static str,
    yref: &'static str,
    x0: f64,
    x1: f64,
    y0: f64,
    y1: f64,
    line: Line,
    name: String,
    showlegend: bool,
}

#[derive(Debug, Clone, Serialize)]
struct Title {
    text: String,
}

#[derive(Debug, Clone, Default, Serialize)]
struct AxisLayout {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<&'static str>,
    gridcolor: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    rangeslider: Option<RangeSlider>,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
struct RangeSlider {
    visible: bool,
}

#[derive(Debug, Clone, Serialize)]
struct Font {
    color: &'static str,
}

#[derive(Debug, Clone, Serialize)]
struct Layout {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<Title>,
    width: u32,
    height: u32,
    barmode: &'static str,
    showlegend: bool,
    paper_bgcolor: &'static str,
    plot_bgcolor: &'static str,
    font: Font,
    xaxis: AxisLayout,
    yaxis: AxisLayout,
    shapes: Vec<Shape>,
}

/// A Plotly figure with the dark report theme.
#[derive(Debug, Clone, Serialize)]
pub struct Figure {
    data: Vec<Trace>,
    layout: Layout,
}

impl Default for Figure {
    fn default() -> Self {
        Self::new()
    }
}

impl Figure {
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            layout: Layout {
                title: None,
                width: FIGURE_WIDTH,
                height: FIGURE_HEIGHT,
                barmode: "relative",
                showlegend: true,
                paper_bgcolor: BACKGROUND,
                plot_bgcolor: BACKGROUND,
                font: Font { color: FOREGROUND },
                xaxis: AxisLayout {
                    gridcolor: GRID,
                    ..AxisLayout::default()
                },
                yaxis: AxisLayout {
                    gridcolor: GRID,
                    ..AxisLayout::default()
                },
                shapes: Vec::new(),
            },
        }
    }

    #[must_use]
    pub fn title(mut self, text: impl Into<String>) -> Self {
        self.layout.title = Some(Title { text: text.into() });
        self
    }

    /// Treat x values as categories so market closures leave no gaps.
    #[must_use]
    pub fn category_x(mut self) -> Self {
        self.layout.xaxis.kind = Some("category");
        self.layout.xaxis.rangeslider = Some(RangeSlider { visible: false });
        self
    }

    pub fn bar(&mut self, x: Axis, y: Vec<f64>, name: impl Into<String>, color: &str) -> &mut Self {
        self.data.push(Trace::Bar {
            x,
            y,
            name: name.into(),
            marker: Marker {
                color: color.to_string(),
            },
            width: 0.8,
        });
        self
    }

    pub fn line(&mut self, x: Axis, y: Vec<f64>, name: impl Into<String>, line: Line) -> &mut Self {
        self.data.push(Trace::Scatter {
            x,
            y,
            name: name.into(),
            mode: "lines",
            line,
            showlegend: true,
        });
        self
    }

    pub fn candlestick(
        &mut self,
        x: Axis,
        ohlc: [Vec<f64>; 4],
        name: impl Into<String>,
    ) -> &mut Self {
        let [open, high, low, close] = ohlc;
        self.data.push(Trace::Candlestick {
            x,
            open,
            high,
            low,
            close,
            name: name.into(),
        });
        self
    }

    /// Full-height vertical line with a legend entry.
    pub fn vline(&mut self, x: f64, name: impl Into<String>, line: Line) -> &mut Self {
        self.layout.shapes.push(Shape {
            kind: "line",
            xref: "x",
            yref: "paper",
            x0: x,
            x1: x,
            y0: 0.0,
            y1: 1.0,
            line,
            name: name.into(),
            showlegend: true,
        });
        self
    }

    /// Full-width horizontal line with a legend entry.
    pub fn hline(&mut self, y: f64, name: impl Into<String>, line: Line) -> &mut Self {
        self.layout.shapes.push(Shape {
            kind: "line",
            xref: "paper",
            yref: "y",
            x0: 0.0,
            x1: 1.0,
            y0: y,
            y1: y,
            line,
            name: name.into(),
            showlegend: true,
        });
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// `<div>` plus the script that draws into it.
    pub fn to_html(&self) -> Result<String, serde_json::Error> {
        let id = NEXT_CHART_ID.fetch_add(1, Ordering::Relaxed);
        // keep a "</script>" inside any label from closing the tag early
        let data = serde_json::to_string(&self.data)?.replace("</", "<\\/");
        let layout = serde_json::to_string(&self.layout)?.replace("</", "<\\/");
        Ok(format!(
            r#"<div id="chart-{id}"></div><script>Plotly.newPlot("chart-{id}", {data}, {layout});</script>"#
        ))
    }
}
