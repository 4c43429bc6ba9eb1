//! Report assembly: one tab per symbol inside a single HTML document.

mod gex;
mod options;
mod runner;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use opreport_analytics::GreeksParams;
use opreport_core::AppResult;
use opreport_market::MarketData;
use tracing::info;

use crate::html;

pub use gex::GexReport;
pub use options::OptionReport;
pub use runner::{RunnerOptions, process_with_retry, run};

/// Strike band for symbols with dense strikes.
pub const NARROW_PRICE_RANGE: f64 = 0.05;
/// Strike band for everything else.
pub const WIDE_PRICE_RANGE: f64 = 0.2;

/// Knobs shared by the chain-based reports.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSettings {
    pub narrow_range_symbols: Vec<String>,
    pub daily_expiry_symbols: Vec<String>,
    pub active_volume_threshold: u64,
    pub risk_free_rate: f64,
    pub dividend_yield: f64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            narrow_range_symbols: vec!["SPY".to_string(), "QQQ".to_string()],
            daily_expiry_symbols: vec!["SPY".to_string()],
            active_volume_threshold: 1_000,
            risk_free_rate: 0.045,
            dividend_yield: 0.0,
        }
    }
}

impl AnalysisSettings {
    #[must_use]
    pub fn price_range(&self, symbol: &str) -> f64 {
        if self
            .narrow_range_symbols
            .iter()
            .any(|s| s.eq_ignore_ascii_case(symbol))
        {
            NARROW_PRICE_RANGE
        } else {
            WIDE_PRICE_RANGE
        }
    }
}

/// What a per-symbol report needs besides the symbol.
#[derive(Clone)]
pub struct ReportContext {
    pub market: Arc<dyn MarketData>,
    pub settings: AnalysisSettings,
    pub today: NaiveDate,
}

impl ReportContext {
    #[must_use]
    pub fn greeks(&self, spot: f64) -> GreeksParams {
        GreeksParams {
            spot,
            risk_free_rate: self.settings.risk_free_rate,
            dividend_yield: self.settings.dividend_yield,
            today: self.today,
        }
    }
}

/// Renders the tab content of one symbol.
#[async_trait]
pub trait SymbolReport: Send + Sync {
    async fn process_symbol(&self, symbol: &str) -> AppResult<String>;
}

fn symbol_heading(symbol: &str) -> String {
    html::h(1, &format!("Simple analysis for {symbol}:"))
}

/// Heading only; useful to check the page layout without market calls.
pub struct BasicReport;

#[async_trait]
impl SymbolReport for BasicReport {
    async fn process_symbol(&self, symbol: &str) -> AppResult<String> {
        Ok(symbol_heading(symbol))
    }
}

/// The report document being assembled.
pub struct Report {
    title: String,
    symbols: Vec<String>,
    timestamp: DateTime<Tz>,
    body: String,
}

impl Report {
    #[must_use]
    pub fn new(author: &str, title: &str, symbols: Vec<String>, timestamp: DateTime<Tz>) -> Self {
        let date = timestamp.format("%Y-%m-%d").to_string();
        let time = timestamp.format("%H:%M").to_string();

        let mut body = html::header(author, &date, &time, title);
        body.push_str(r#"<a id="top"></a>"#);
        body.push_str(&html::tablinks(&symbols));

        Self {
            title: title.to_string(),
            symbols,
            timestamp,
            body,
        }
    }

    #[must_use]
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    #[must_use]
    pub fn date(&self) -> String {
        self.timestamp.format("%Y-%m-%d").to_string()
    }

    #[must_use]
    pub fn time(&self) -> String {
        self.timestamp.format("%H:%M").to_string()
    }

    pub fn add_tab(&mut self, symbol: &str, html: &str) {
        self.body.push_str(&html::add_tab(symbol, html));
    }

    /// `{date}/{time}.html` below the reports directory.
    #[must_use]
    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(self.date()).join(format!("{}.html", self.time()))
    }

    /// Finish the document and write it below `dir`, creating directories.
    pub async fn save_to_html(mut self, dir: &Path) -> AppResult<PathBuf> {
        self.body.push_str(html::back_to_top());
        self.body.push_str(html::tab_script());
        let document = html::html_report(&self.title, html::stylesheet(), &self.body);

        let path = dir.join(self.relative_path());
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, document).await?;

        info!(path = %path.display(), "Saved report");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn timestamp() -> DateTime<Tz> {
        chrono_tz::America::New_York
            .with_ymd_and_hms(2026, 10, 19, 16, 5, 0)
            .unwrap()
    }

    #[test]
    fn price_range_by_symbol() {
        let settings = AnalysisSettings::default();
        assert!((settings.price_range("SPY") - NARROW_PRICE_RANGE).abs() < f64::EPSILON);
        assert!((settings.price_range("qqq") - NARROW_PRICE_RANGE).abs() < f64::EPSILON);
        assert!((settings.price_range("AAPL") - WIDE_PRICE_RANGE).abs() < f64::EPSILON);
    }

    #[test]
    fn path_uses_report_time_zone() {
        let report = Report::new("Desk", "Options Report", vec!["SPY".into()], timestamp());
        assert_eq!(report.relative_path(), PathBuf::from("2026-10-19/16:05.html"));
    }

    #[tokio::test]
    async fn basic_report_heading() {
        let html = BasicReport.process_symbol("SPY").await.unwrap();
        assert_eq!(html, "<h1>Simple analysis for SPY:</h1>");
    }

    #[tokio::test]
    async fn saves_complete_document() {
        let dir = tempfile::tempdir().unwrap();
        let mut report = Report::new(
            "Desk",
            "Options Report",
            vec!["SPY".into(), "QQQ".into()],
            timestamp(),
        );
        report.add_tab("SPY", "<p>spy</p>");
        report.add_tab("QQQ", "<p>qqq</p>");

        let path = report.save_to_html(dir.path()).await.unwrap();
        assert_eq!(path, dir.path().join("2026-10-19").join("16:05.html"));

        let html = std::fs::read_to_string(&path).unwrap();
        assert!(html.contains(r#"<a id="top"></a>"#));
        assert!(html.contains("Back to top"));
        assert!(html.find("<p>spy</p>").unwrap() < html.find("<p>qqq</p>").unwrap());
        assert!(html.trim_end().ends_with("</html>"));
    }
}
