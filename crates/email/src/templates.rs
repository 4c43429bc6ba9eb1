//! Body of the daily report notification.

/// Link to a published report.
pub struct ReportLinkEmail<'a> {
    pub subject: &'a str,
    pub link: &'a str,
}

impl ReportLinkEmail<'_> {
    #[must_use]
    pub fn render_html(&self) -> String {
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{subject}</title>
</head>
<body>
    <p>Here is your daily report: <a href="{link}" target="_blank"> link </a></p>
</body>
</html>"#,
            subject = html_escape(self.subject),
            link = html_escape(self.link),
        )
    }

    #[must_use]
    pub fn render_text(&self) -> String {
        format!("Here is your daily report: {}", self.link)
    }
}

/// Simple HTML escaping for template values.
#[must_use]
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_link() {
        let email = ReportLinkEmail {
            subject: "reports/2026-10-19/16:05.html",
            link: "https://s3.example.com/reports/2026-10-19/16%3A05.html?X-Amz-Signature=abc",
        };

        let html = email.render_html();
        assert!(html.contains("Here is your daily report:"));
        assert!(html.contains(r#"target="_blank""#));
        assert!(html.contains("X-Amz-Signature=abc"));

        let text = email.render_text();
        assert!(text.ends_with("X-Amz-Signature=abc"));
    }

    #[test]
    fn escapes_query_separators_in_href() {
        let email = ReportLinkEmail {
            subject: "s",
            link: "https://x/r?a=1&b=2",
        };
        assert!(email.render_html().contains("a=1&amp;b=2"));
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(
            html_escape("<script>alert('x')</script>"),
            "&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"
        );
    }
}
