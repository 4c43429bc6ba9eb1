//! Brevo email service using the transactional `smtp/email` API.
//!
//! # Configuration
//!
//! Environment variables:
//! - `EMAIL_SENDER` - Sender in format "Name <email@example.com>" (must be verified in Brevo)
//! - `BREVO_API_KEY` - API v3 key
//!
//! # Example
//!
//! ```ignore
//! let service = BrevoService::new(config)?;
//! service.send(&BrevoMessage { to: &recipients, subject, html_content, ..message }).await?;
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

/// Brevo API base URL.
pub const BREVO_API_URL: &str = "https://api.brevo.com/v3";

/// Email service errors.
#[derive(Debug, thiserror::Error)]
pub enum BrevoError {
    #[error("Failed to send email: {0}")]
    SendError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Brevo service configuration.
#[derive(Debug, Clone)]
pub struct BrevoConfig {
    pub api_key: SecretString,
    /// "Name <email@example.com>" or a bare address.
    pub sender: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl BrevoConfig {
    #[must_use]
    pub fn new(api_key: SecretString, sender: impl Into<String>) -> Self {
        Self {
            api_key,
            sender: sender.into(),
            base_url: BREVO_API_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// One transactional email.
#[derive(Debug, Clone, Copy)]
pub struct BrevoMessage<'a> {
    pub to: &'a [String],
    pub cc: &'a [String],
    pub bcc: &'a [String],
    pub reply_to: Option<&'a str>,
    pub subject: &'a str,
    pub html_content: &'a str,
    pub headers: &'a BTreeMap<String, String>,
}

/// Brevo email service.
#[derive(Clone)]
pub struct BrevoService {
    client: Client,
    config: BrevoConfig,
    sender: EmailAddress,
}

impl std::fmt::Debug for BrevoService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrevoService")
            .field("sender", &self.sender.email)
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

// Brevo API v3 request structures
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendRequest<'a> {
    sender: &'a EmailAddress,
    to: Vec<EmailAddress>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    cc: Vec<EmailAddress>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    bcc: Vec<EmailAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<EmailAddress>,
    #[serde(skip_serializing_if = "no_headers")]
    headers: &'a BTreeMap<String, String>,
    html_content: &'a str,
    subject: &'a str,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn no_headers(headers: &&BTreeMap<String, String>) -> bool {
    headers.is_empty()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct EmailAddress {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

impl EmailAddress {
    /// Accepts `Name <email>` or a bare `email`.
    fn parse(raw: &str) -> Result<Self, BrevoError> {
        let raw = raw.trim();
        let (name, email) = match raw.rsplit_once('<') {
            Some((name, rest)) => {
                let email = rest.strip_suffix('>').ok_or_else(|| {
                    BrevoError::ConfigError(format!("Unterminated address: {raw}"))
                })?;
                let name = name.trim().trim_matches('"');
                ((!name.is_empty()).then(|| name.to_string()), email.trim())
            }
            None => (None, raw),
        };

        if !email.contains('@') || email.contains(char::is_whitespace) {
            return Err(BrevoError::ConfigError(format!("Invalid address: {raw}")));
        }

        Ok(Self {
            email: email.to_string(),
            name,
        })
    }
}

fn addresses(raw: &[String]) -> Result<Vec<EmailAddress>, BrevoError> {
    raw.iter().map(|a| EmailAddress::parse(a)).collect()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendResponse {
    message_id: Option<String>,
}

impl BrevoService {
    pub fn new(config: BrevoConfig) -> Result<Self, BrevoError> {
        if config.api_key.expose_secret().is_empty() {
            return Err(BrevoError::ConfigError("API key is empty".to_string()));
        }
        let sender = EmailAddress::parse(&config.sender)?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BrevoError::ConfigError(format!("HTTP client: {e}")))?;

        info!(sender = %sender.email, "Brevo service initialized");

        Ok(Self {
            client,
            config,
            sender,
        })
    }

    fn request<'a>(&'a self, message: &BrevoMessage<'a>) -> Result<SendRequest<'a>, BrevoError> {
        let to = addresses(message.to)?;
        if to.is_empty() {
            return Err(BrevoError::ConfigError("No recipients".to_string()));
        }

        Ok(SendRequest {
            sender: &self.sender,
            to,
            cc: addresses(message.cc)?,
            bcc: addresses(message.bcc)?,
            reply_to: message.reply_to.map(EmailAddress::parse).transpose()?,
            headers: message.headers,
            html_content: message.html_content,
            subject: message.subject,
        })
    }

    /// Send one email; returns the Brevo message id when reported.
    #[instrument(skip(self, message), fields(subject = %message.subject, to = message.to.len()))]
    pub async fn send(&self, message: &BrevoMessage<'_>) -> Result<Option<String>, BrevoError> {
        let request = self.request(message)?;
        let url = format!("{}/smtp/email", self.config.base_url.trim_end_matches('/'));

        debug!(%url, "Sending email via Brevo");

        let response = self
            .client
            .post(&url)
            .header("api-key", self.config.api_key.expose_secret())
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| BrevoError::SendError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(%status, %body, "Brevo API error");
            return Err(BrevoError::SendError(format!("{status}: {body}")));
        }

        let message_id = response
            .json::<SendResponse>()
            .await
            .ok()
            .and_then(|r| r.message_id);

        info!(message_id = message_id.as_deref().unwrap_or("-"), "Email sent");
        Ok(message_id)
    }
}
