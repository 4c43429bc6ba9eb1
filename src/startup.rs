//! Wiring of market data, storage and email from configuration.

use std::sync::Arc;

use opreport_brevo::{BrevoConfig, BrevoService};
use opreport_email::{EmailConfig, EmailService};
use opreport_market::{MarketData, YahooClient, YahooConfig};
use opreport_storage::{S3Config, S3Storage};
use tracing::info;

use crate::config::Config;
use crate::delivery::EmailProvider;

pub fn init_market(config: &Config) -> anyhow::Result<Arc<dyn MarketData>> {
    let client = YahooClient::new(YahooConfig {
        timeout: config.http_timeout(),
        ..YahooConfig::default()
    })?;
    Ok(Arc::new(client))
}

pub fn init_s3(config: &Config) -> anyhow::Result<Option<S3Storage>> {
    match (
        &config.s3_url,
        &config.s3_access_key_id,
        &config.s3_secret_access_key,
    ) {
        (Some(url), Some(key), Some(secret)) => {
            let s3_config = S3Config::from_url(url, key.clone(), secret.clone())?
                .with_region(config.s3_region.clone());
            Ok(Some(S3Storage::new(s3_config)))
        }
        _ => {
            info!("S3 not configured");
            Ok(None)
        }
    }
}

/// Brevo when an API key is set, otherwise SMTP when a URL is set.
pub fn init_email(config: &Config) -> anyhow::Result<Option<EmailProvider>> {
    let Some(sender) = config.email_sender.as_deref() else {
        info!("Email not configured");
        return Ok(None);
    };

    if let Some(api_key) = &config.brevo_api_key {
        let service = BrevoService::new(BrevoConfig::new(api_key.clone(), sender))?;
        return Ok(Some(EmailProvider::Brevo(Arc::new(service))));
    }
    if let Some(smtp_url) = &config.smtp_url {
        let service = EmailService::new(EmailConfig::from_url(smtp_url, sender)?)?;
        return Ok(Some(EmailProvider::Smtp(Arc::new(service))));
    }

    info!("No email provider configured");
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_args;

    fn config(extra: &[&str]) -> Config {
        let mut args = extra.to_vec();
        args.push("chains");
        parse_args(&args).unwrap()
    }

    #[test]
    fn nothing_configured() {
        let config = config(&[]);
        assert!(init_s3(&config).unwrap().is_none());
        assert!(init_email(&config).unwrap().is_none());
        assert!(init_market(&config).is_ok());
    }

    #[test]
    fn storage_with_region() {
        let config = config(&[
            "--s3-url",
            "http://localhost:9000/reports/",
            "--s3-access-key-id",
            "minio",
            "--s3-secret-access-key",
            "secret",
            "--s3-region",
            "eu-west-1",
        ]);
        let storage = init_s3(&config).unwrap().unwrap();
        assert_eq!(storage.bucket(), "reports");
    }

    #[test]
    fn brevo_preferred_over_smtp() {
        let config = config(&[
            "--email-sender",
            "Desk <desk@example.com>",
            "--smtp-url",
            "smtp://localhost:2525?tls=none",
            "--brevo-api-key",
            "xkeysib-test",
        ]);
        let provider = init_email(&config).unwrap().unwrap();
        assert_eq!(provider.name(), "brevo");
    }

    #[tokio::test]
    async fn smtp_when_no_brevo_key() {
        let config = config(&[
            "--email-sender",
            "Desk <desk@example.com>",
            "--smtp-url",
            "smtp://localhost:2525?tls=none",
        ]);
        let provider = init_email(&config).unwrap().unwrap();
        assert_eq!(provider.name(), "smtp");
    }
}
