//! S3 storage client implementation.

use std::path::Path;
use std::time::Duration;

use aws_credential_types::Credentials;
use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Region},
    presigning::PresigningConfig,
    primitives::ByteStream,
};
use opreport_core::{AppError, AppResult, ResultExt};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, instrument};

pub const DEFAULT_REGION: &str = "us-east-1";

/// Longest lifetime SigV4 accepts for a presigned URL.
pub const MAX_PRESIGN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// S3 storage configuration.
#[derive(Debug, Clone)]
pub struct S3Config {
    pub endpoint: String,
    pub bucket: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: SecretString,
}

impl S3Config {
    /// Parse S3 URL: `https://host[:port]/bucket-name/`
    pub fn from_url(
        url: &str,
        access_key_id: String,
        secret_access_key: SecretString,
    ) -> AppResult<Self> {
        let url = url.trim_end_matches('/');
        let (endpoint, bucket) = url
            .rsplit_once('/')
            .filter(|(endpoint, _)| endpoint.contains("://"))
            .ok_or_else(|| AppError::InvalidArgument(format!("Invalid S3 URL format: {url}")))?;

        if bucket.is_empty() || bucket.contains(':') {
            return Err(AppError::InvalidArgument(
                "S3 URL must contain bucket name".to_string(),
            ));
        }

        Ok(Self {
            endpoint: endpoint.to_string(),
            bucket: bucket.to_string(),
            region: DEFAULT_REGION.to_string(),
            access_key_id,
            secret_access_key,
        })
    }

    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }
}

/// S3 storage client for report and chain uploads.
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
}

impl S3Storage {
    #[must_use]
    pub fn new(config: S3Config) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            config.secret_access_key.expose_secret(),
            None,
            None,
            "options-report",
        );

        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint)
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(true) // MinIO and most S3-compatible hosts
            .build();

        info!(bucket = %config.bucket, endpoint = %config.endpoint, region = %config.region, "S3 storage initialized");

        Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket,
        }
    }

    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Upload a local file under `key`.
    #[instrument(skip(self, path), fields(bucket = %self.bucket))]
    pub async fn upload_file(&self, path: &Path, key: &str, content_type: &str) -> AppResult<()> {
        debug!(path = %path.display(), "Uploading file");

        let body = ByteStream::from_path(path)
            .await
            .storage("Failed to read upload source")?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(key = %key, error = ?e, "S3 upload failed");
                AppError::Storage(format!("Failed to upload {key}: {e}"))
            })?;

        info!(key = %key, "File uploaded");
        Ok(())
    }

    /// Presigned GET URL for `key`, valid for `expires_in` (at most [`MAX_PRESIGN_TTL`]).
    #[instrument(skip(self), fields(bucket = %self.bucket))]
    pub async fn presign_get(&self, key: &str, expires_in: Duration) -> AppResult<String> {
        if expires_in > MAX_PRESIGN_TTL {
            return Err(AppError::InvalidArgument(format!(
                "Presign lifetime {}s exceeds {}s",
                expires_in.as_secs(),
                MAX_PRESIGN_TTL.as_secs()
            )));
        }

        let presigning_config = PresigningConfig::expires_in(expires_in)
            .map_err(|e| AppError::InvalidArgument(format!("Invalid presign duration: {e}")))?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning_config)
            .await
            .storage("Failed to generate presigned URL")?;

        debug!(key = %key, expires_in = expires_in.as_secs(), "Presigned URL generated");
        Ok(presigned.uri().to_string())
    }
}
