//! Publishing a finished report: upload, presign, email the link.
//!
//! Email goes through a small, fixed set of providers, so they are an enum
//! rather than trait objects.

use std::collections::BTreeMap;
use std::path::{Component, Path};
use std::sync::Arc;
use std::time::Duration;

use opreport_brevo::{BrevoMessage, BrevoService};
use opreport_core::AppResult;
use opreport_email::{EmailService, Recipients, ReportLinkEmail};
use opreport_storage::S3Storage;
use tracing::{error, info, instrument};

/// Boxed async error type for email operations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Header carrying the report key on Brevo messages.
const REPORT_HEADER: &str = "X-Report-Key";

/// Email provider supporting SMTP and Brevo backends.
#[derive(Clone)]
pub enum EmailProvider {
    Smtp(Arc<EmailService>),
    Brevo(Arc<BrevoService>),
}

impl EmailProvider {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Smtp(_) => "smtp",
            Self::Brevo(_) => "brevo",
        }
    }

    /// Send the report link.
    ///
    /// # Errors
    /// Returns an error if the email fails to send.
    pub async fn send_report_link(
        &self,
        recipients: &Recipients,
        subject: &str,
        link: &str,
    ) -> Result<(), BoxError> {
        match self {
            Self::Smtp(service) => service
                .send_report_link(recipients, subject, link)
                .await
                .map_err(Into::into),
            Self::Brevo(service) => {
                let html = ReportLinkEmail { subject, link }.render_html();
                let headers = BTreeMap::from([(REPORT_HEADER.to_string(), subject.to_string())]);
                let message = BrevoMessage {
                    to: &recipients.to,
                    cc: &recipients.cc,
                    bcc: &recipients.bcc,
                    reply_to: recipients.reply_to.as_deref(),
                    subject,
                    html_content: &html,
                    headers: &headers,
                };
                service.send(&message).await.map(|_| ()).map_err(Into::into)
            }
        }
    }
}

/// Storage key for a local file: its path with `/` separators.
#[must_use]
pub fn object_key(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Upload the report and email a presigned link to it.
///
/// Returns the link. Email failures are logged, not returned.
#[instrument(skip_all, fields(key = %object_key(path)))]
pub async fn publish(
    storage: &S3Storage,
    email: Option<&EmailProvider>,
    path: &Path,
    expires_in: Duration,
    recipients: &Recipients,
) -> AppResult<String> {
    let key = object_key(path);
    storage.upload_file(path, &key, HTML_CONTENT_TYPE).await?;
    let link = storage.presign_get(&key, expires_in).await?;
    info!(expires_in = expires_in.as_secs(), "Report published");

    match email {
        Some(provider) if !recipients.is_empty() => {
            match provider.send_report_link(recipients, &key, &link).await {
                Ok(()) => info!(provider = provider.name(), "Report link sent"),
                Err(e) => error!(provider = provider.name(), error = %e, "Failed to email report link"),
            }
        }
        Some(_) => info!("No recipients configured, skipping email"),
        None => info!("Email not configured, skipping"),
    }

    Ok(link)
}

#[cfg(test)]
mod tests {
    use opreport_brevo::BrevoConfig;
    use opreport_storage::S3Config;
    use secrecy::SecretString;

    use super::*;

    #[test]
    fn object_key_uses_forward_slashes() {
        let path = Path::new("reports").join("2026-10-19").join("16:05.html");
        assert_eq!(object_key(&path), "reports/2026-10-19/16:05.html");
        assert_eq!(object_key(Path::new("./chains/SPY.csv")), "chains/SPY.csv");
    }

    #[tokio::test]
    async fn missing_report_fails_before_email() {
        let storage = S3Storage::new(
            S3Config::from_url(
                "http://127.0.0.1:9/reports/",
                "key".to_string(),
                SecretString::from("secret"),
            )
            .unwrap(),
        );
        let dir = tempfile::tempdir().unwrap();
        let result = publish(
            &storage,
            None,
            &dir.path().join("missing.html"),
            Duration::from_secs(60),
            &Recipients::default(),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn brevo_failure_is_an_error_for_the_caller() {
        let mut config = BrevoConfig::new(SecretString::from("key"), "Desk <desk@example.com>");
        config.base_url = "http://127.0.0.1:9".to_string();
        config.timeout = Duration::from_millis(200);
        let provider = EmailProvider::Brevo(Arc::new(BrevoService::new(config).unwrap()));
        assert_eq!(provider.name(), "brevo");

        let recipients = Recipients {
            to: vec!["trader@example.com".to_string()],
            ..Recipients::default()
        };
        let result = provider
            .send_report_link(&recipients, "reports/2026-10-19/16:05.html", "https://x")
            .await;
        assert!(result.is_err());
    }
}
