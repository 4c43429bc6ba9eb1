//! Structured error handling for the report pipeline.
//!
//! Upstream and storage failures keep the provider message so that retries
//! and the final log line say what actually went wrong.

use std::fmt::Display;

use thiserror::Error;
use tracing::error;

/// Application error type shared by all crates.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Market data provider returned an error or an unreadable payload.
    #[error("Upstream: {0}")]
    Upstream(String),

    #[error("Storage: {0}")]
    Storage(String),

    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal: {0}")]
    Internal(String),
}

/// Result type alias for the workspace.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create a not found error for an entity.
    pub fn not_found(entity: &str, id: impl Display) -> Self {
        Self::NotFound(format!("{entity} not found: {id}"))
    }

    /// Create an upstream error for a provider endpoint.
    pub fn upstream(endpoint: &str, detail: impl Display) -> Self {
        Self::Upstream(format!("{endpoint}: {detail}"))
    }

    /// Whether retrying the same call could plausibly succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Upstream(_) | Self::Storage(_) | Self::Io(_))
    }
}

/// Extension trait for converting foreign errors to `AppError` with logging.
pub trait ResultExt<T> {
    /// Map the error to `AppError::Internal`, logging the original.
    fn internal(self, msg: &'static str) -> AppResult<T>;

    /// Map the error to `AppError::Upstream` for the given endpoint.
    fn upstream(self, endpoint: &str) -> AppResult<T>;

    /// Map the error to `AppError::Storage`, logging the original.
    fn storage(self, msg: &'static str) -> AppResult<T>;
}

impl<T, E: Display> ResultExt<T> for Result<T, E> {
    fn internal(self, msg: &'static str) -> AppResult<T> {
        self.map_err(|e| {
            error!(error = %e, "{msg}");
            AppError::Internal(format!("{msg}: {e}"))
        })
    }

    fn upstream(self, endpoint: &str) -> AppResult<T> {
        self.map_err(|e| AppError::upstream(endpoint, e))
    }

    fn storage(self, msg: &'static str) -> AppResult<T> {
        self.map_err(|e| {
            error!(error = %e, "{msg}");
            AppError::Storage(format!("{msg}: {e}"))
        })
    }
}

/// Extension trait for Option types.
pub trait OptionExt<T> {
    /// Convert `None` to `AppError::NotFound`.
    fn ok_or_not_found(self, entity: &str, id: impl Display) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, entity: &str, id: impl Display) -> AppResult<T> {
        self.ok_or_else(|| AppError::not_found(entity, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_helper_formats_correctly() {
        let err = AppError::not_found("Option chain", "SPY");
        assert!(err.to_string().contains("Option chain"));
        assert!(err.to_string().contains("SPY"));
    }

    #[test]
    fn upstream_keeps_endpoint_and_detail() {
        let err: AppResult<()> = Err("503 Service Unavailable").upstream("options/SPY");
        let msg = err.unwrap_err().to_string();
        assert!(msg.contains("options/SPY"));
        assert!(msg.contains("503"));
    }

    #[test]
    fn transient_classification() {
        assert!(AppError::Upstream("x".into()).is_transient());
        assert!(AppError::Storage("x".into()).is_transient());
        assert!(!AppError::InvalidArgument("x".into()).is_transient());
        assert!(!AppError::NotFound("x".into()).is_transient());
    }

    #[test]
    fn none_maps_to_not_found() {
        let value: Option<u8> = None;
        assert!(matches!(
            value.ok_or_not_found("Expiration", "2026-10-23"),
            Err(AppError::NotFound(_))
        ));
    }
}
