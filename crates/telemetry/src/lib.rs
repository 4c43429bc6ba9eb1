//! Telemetry setup for structured logging, OpenTelemetry tracing and Sentry error tracking.
//!
//! The report binary is a short-lived batch job, so everything here is
//! initialised once at startup and flushed through [`TelemetryGuard::shutdown`]
//! before the process exits.
//!
//! # Features
//! - `otlp` (default): OpenTelemetry OTLP exporter
//! - `sentry` (default): Sentry error tracking

#[cfg(feature = "otlp")]
use std::time::Duration;

use tracing::Level;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "otlp")]
use opentelemetry::KeyValue;
#[cfg(feature = "otlp")]
use opentelemetry::trace::TracerProvider as _;
#[cfg(feature = "otlp")]
use opentelemetry_otlp::WithExportConfig;
#[cfg(feature = "otlp")]
use opentelemetry_sdk::{
    Resource,
    trace::{Sampler, SdkTracerProvider},
};

#[cfg(feature = "sentry")]
pub use sentry;

/// Service name reported to OTLP and used as the tracer name.
const SERVICE_NAME: &str = "options-report";

/// Noisy dependency targets capped regardless of the configured level.
const DEPENDENCY_DIRECTIVES: &[&str] = &[
    "hyper=info",
    "hyper_util=info",
    "reqwest=info",
    "rustls=warn",
    "h2=info",
    "aws_config=warn",
    "aws_smithy_runtime=warn",
    "aws_sdk_s3=info",
    "lettre=info",
    "sentry=warn",
];

/// Telemetry configuration.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub log_level: String,
    /// Use JSON log format
    pub json_logs: bool,
    /// OpenTelemetry OTLP endpoint (optional)
    pub otlp_endpoint: Option<String>,
    /// Sentry DSN (optional)
    pub sentry_dsn: Option<String>,
    /// Environment name (e.g., "production", "development")
    pub environment: Option<String>,
    /// Application version
    pub version: Option<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "INFO".to_string(),
            json_logs: false,
            otlp_endpoint: None,
            sentry_dsn: None,
            environment: None,
            version: None,
        }
    }
}

/// Active telemetry handles that need graceful shutdown.
pub struct TelemetryGuard {
    #[cfg(feature = "otlp")]
    otel_provider: Option<SdkTracerProvider>,
    #[cfg(feature = "sentry")]
    _sentry_guard: Option<sentry::ClientInitGuard>,
}

impl TelemetryGuard {
    /// Flush and shut down telemetry providers.
    pub fn shutdown(self) {
        #[cfg(feature = "otlp")]
        if let Some(provider) = self.otel_provider
            && let Err(e) = provider.shutdown()
        {
            eprintln!("Failed to shutdown OpenTelemetry provider: {e}");
        }
        // Sentry guard flushes on drop
    }
}

/// Parse a log level name, falling back to INFO.
#[must_use]
pub fn parse_level(level: &str) -> Level {
    match level.trim().to_uppercase().as_str() {
        "TRACE" => Level::TRACE,
        "DEBUG" => Level::DEBUG,
        "WARN" | "WARNING" => Level::WARN,
        "ERROR" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Initialize OpenTelemetry tracing with OTLP exporter.
///
/// Returns `None` if OTLP endpoint is not configured or the exporter cannot be built.
#[cfg(feature = "otlp")]
fn init_opentelemetry(otlp_endpoint: Option<&str>) -> Option<SdkTracerProvider> {
    let endpoint = otlp_endpoint?;

    let exporter = match opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .with_timeout(Duration::from_secs(5))
        .build()
    {
        Ok(exporter) => exporter,
        Err(e) => {
            eprintln!("Failed to create OTLP exporter for {endpoint}: {e}");
            return None;
        }
    };

    let resource = Resource::builder()
        .with_attributes([KeyValue::new("service.name", SERVICE_NAME)])
        .build();

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_sampler(Sampler::AlwaysOn)
        .with_resource(resource)
        .build();

    opentelemetry::global::set_tracer_provider(provider.clone());

    Some(provider)
}

/// Initialize Sentry error tracking.
///
/// Returns `None` if Sentry DSN is not configured.
#[cfg(feature = "sentry")]
fn init_sentry(config: &TelemetryConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: config.version.clone().map(Into::into),
            environment: config.environment.clone().map(Into::into),
            traces_sample_rate: 1.0,
            attach_stacktrace: true,
            send_default_pii: false,
            ..Default::default()
        },
    ));

    if guard.is_enabled() {
        Some(guard)
    } else {
        eprintln!("Sentry DSN provided but client not enabled");
        None
    }
}

fn env_filter(level: Level) -> EnvFilter {
    DEPENDENCY_DIRECTIVES.iter().fold(
        EnvFilter::from_default_env().add_directive(level.into()),
        |filter, directive| match directive.parse() {
            Ok(d) => filter.add_directive(d),
            Err(_) => filter,
        },
    )
}

/// Setup complete logging/tracing stack.
///
/// - Console logging (JSON or human-readable)
/// - `OpenTelemetry` tracing (if OTLP endpoint configured)
/// - Sentry error tracking (if DSN configured)
///
/// Returns a guard that should be kept alive for the application lifetime.
///
/// # Panics
/// Panics if a global tracing subscriber is already installed.
#[must_use]
pub fn setup_telemetry(config: &TelemetryConfig) -> TelemetryGuard {
    let env_filter = env_filter(parse_level(&config.log_level));

    // Sentry must be initialised before the subscriber so its layer sees a client
    #[cfg(feature = "sentry")]
    let sentry_guard = init_sentry(config);

    #[cfg(feature = "otlp")]
    let otel_provider = init_opentelemetry(config.otlp_endpoint.as_deref());

    let fmt_layer = if config.json_logs {
        fmt::layer().json().with_target(true).boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .with_timer(ChronoLocal::new("%H:%M:%S%.3f".to_string()))
            .compact()
            .boxed()
    };

    #[cfg(all(feature = "otlp", feature = "sentry"))]
    {
        let registry = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(sentry_tracing::layer());

        if let Some(provider) = &otel_provider {
            let tracer = provider.tracer(SERVICE_NAME);
            registry
                .with(tracing_opentelemetry::layer().with_tracer(tracer))
                .init();
        } else {
            registry.init();
        }
    }

    #[cfg(all(feature = "otlp", not(feature = "sentry")))]
    {
        let registry = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer);

        if let Some(provider) = &otel_provider {
            let tracer = provider.tracer(SERVICE_NAME);
            registry
                .with(tracing_opentelemetry::layer().with_tracer(tracer))
                .init();
        } else {
            registry.init();
        }
    }

    #[cfg(all(not(feature = "otlp"), feature = "sentry"))]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(sentry_tracing::layer())
            .init();
    }

    #[cfg(all(not(feature = "otlp"), not(feature = "sentry")))]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
    }

    TelemetryGuard {
        #[cfg(feature = "otlp")]
        otel_provider,
        #[cfg(feature = "sentry")]
        _sentry_guard: sentry_guard,
    }
}

/// Capture an error to Sentry (if enabled).
#[cfg(feature = "sentry")]
pub fn capture_error<E: std::fmt::Display>(error: &E) {
    sentry::capture_message(&error.to_string(), sentry::Level::Error);
}

/// Capture an error to Sentry (no-op if Sentry feature is disabled).
#[cfg(not(feature = "sentry"))]
pub fn capture_error<E: std::fmt::Display>(_error: &E) {}
