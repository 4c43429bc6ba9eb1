//! HTML building blocks for the tabbed report page.

use opreport_email::html_escape;

/// Plotly bundle loaded once in the document head.
pub const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

#[must_use]
pub fn header(author: &str, date: &str, time: &str, title: &str) -> String {
    format!(
        r#"<div class="header"><h1>{title}</h1><p class="byline">{author} | {date} {time}</p></div>"#,
        title = html_escape(title),
        author = html_escape(author),
        date = html_escape(date),
        time = html_escape(time),
    )
}

/// Heading of the given level, clamped to `h1`..`h6`.
#[must_use]
pub fn h(level: u8, text: &str) -> String {
    let level = level.clamp(1, 6);
    format!("<h{level}>{}</h{level}>", html_escape(text))
}

#[must_use]
pub fn tablinks(symbols: &[String]) -> String {
    let buttons: String = symbols
        .iter()
        .map(|s| {
            let s = html_escape(s);
            format!(r#"<button class="tablinks" data-tab="{s}">{s}</button>"#)
        })
        .collect();
    format!(r#"<div class="tab">{buttons}</div>"#)
}

#[must_use]
pub fn add_tab(symbol: &str, html: &str) -> String {
    format!(
        r#"<div id="tab-{id}" class="tabcontent">{html}</div>"#,
        id = html_escape(symbol)
    )
}

#[must_use]
pub fn back_to_top() -> &'static str {
    r##"<a class="button" href="#top">Back to top</a>"##
}

/// Tab switching; the first tab is opened on load.
#[must_use]
pub fn tab_script() -> &'static str {
    r#"<script>
function openTab(evt, name) {
  document.querySelectorAll(".tabcontent").forEach(function (el) { el.style.display = "none"; });
  document.querySelectorAll(".tablinks").forEach(function (el) { el.classList.remove("active"); });
  var tab = document.getElementById("tab-" + name);
  if (tab) { tab.style.display = "block"; }
  evt.currentTarget.classList.add("active");
  window.dispatchEvent(new Event("resize"));
}
document.querySelectorAll(".tablinks").forEach(function (button) {
  button.addEventListener("click", function (evt) { openTab(evt, button.dataset.tab); });
});
var first = document.querySelector(".tablinks");
if (first) { first.click(); }
</script>"#
}

#[must_use]
pub fn stylesheet() -> &'static str {
    r"<style>
body { background-color: #111111; color: #f2f5fa; font-family: -apple-system, 'Segoe UI', Roboto, Arial, sans-serif; margin: 0 24px; }
.header { border-bottom: 1px solid #444; margin-bottom: 12px; }
.byline { color: #aaaaaa; }
.tab { overflow: hidden; border: 1px solid #444; background-color: #1e1e1e; }
.tab button { background-color: inherit; color: #f2f5fa; float: left; border: none; outline: none; cursor: pointer; padding: 12px 16px; font-size: 15px; }
.tab button:hover { background-color: #333; }
.tab button.active { background-color: #0066cc; }
.tabcontent { display: none; padding: 6px 12px; border: 1px solid #444; border-top: none; }
.button { display: inline-block; margin: 16px 0; padding: 10px 18px; background-color: #0066cc; color: #ffffff; text-decoration: none; border-radius: 6px; }
</style>"
}

/// Complete document around `body`.
#[must_use]
pub fn html_report(title: &str, stylesheet: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title}</title>
<script src="{PLOTLY_CDN}" charset="utf-8"></script>
{stylesheet}
</head>
<body>
{body}
</body>
</html>"#,
        title = html_escape(title),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headings_escape_and_clamp() {
        assert_eq!(h(5, "a < b"), "<h5>a &lt; b</h5>");
        assert_eq!(h(9, "x"), "<h6>x</h6>");
        assert_eq!(h(0, "x"), "<h1>x</h1>");
    }

    #[test]
    fn tabs_link_to_content() {
        let links = tablinks(&["SPY".to_string(), "^SPX".to_string()]);
        assert!(links.contains(r#"data-tab="SPY""#));
        assert!(links.contains(r#"data-tab="^SPX""#));
        assert!(add_tab("SPY", "<p>x</p>").starts_with(r#"<div id="tab-SPY" class="tabcontent">"#));
    }

    #[test]
    fn header_escapes_user_text() {
        let html = header("<b>me</b>", "2026-10-19", "16:05", "Options & more");
        assert!(html.contains("&lt;b&gt;me&lt;/b&gt;"));
        assert!(html.contains("Options &amp; more"));
    }

    #[test]
    fn document_loads_plotly_once() {
        let doc = html_report("Options Report", stylesheet(), "<p>body</p>");
        assert_eq!(doc.matches(PLOTLY_CDN).count(), 1);
        assert!(doc.contains("<title>Options Report</title>"));
        assert!(doc.contains("<p>body</p>"));
    }
}
