//! Logging setup and the health report.

use std::io;

use paygate_bridge::Gateway;
use serde::Serialize;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Log format configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable pretty format for development.
    Pretty,
    /// JSON format for production log aggregation.
    Json,
}

impl LogFormat {
    /// Reads `LOG_FORMAT`: `json` selects JSON, anything else pretty.
    #[must_use]
    pub fn from_env() -> Self {
        Self::parse(&std::env::var("LOG_FORMAT").unwrap_or_default())
    }

    fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") { Self::Json } else { Self::Pretty }
    }
}

/// Installs the global subscriber.
///
/// # Environment Variables
///
/// - `LOG_FORMAT`: `json` or `pretty` (default: `pretty`)
/// - `RUST_LOG`: filter directives (default: `info`); use
///   `RUST_LOG=info,audit=info` style directives to route the `audit` target
pub fn init_observability(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => {
            subscriber
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_thread_ids(false)
                        .with_thread_names(false)
                        .with_span_events(FmtSpan::CLOSE)
                        .with_writer(io::stderr),
                )
                .init();
        }
        LogFormat::Json => {
            subscriber
                .with(
                    fmt::layer()
                        .json()
                        .with_current_span(true)
                        .with_span_list(true)
                        .with_target(true)
                        .with_thread_ids(false)
                        .with_thread_names(false)
                        .with_span_events(FmtSpan::CLOSE)
                        .with_writer(io::stderr),
                )
                .init();
        }
    }
}

/// Overall health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Every configured provider initialised.
    Healthy,
    /// Nothing failed, but no provider is configured.
    Degraded,
    /// At least one configured provider failed to initialise.
    Unhealthy,
}

/// Result of one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthCheckStatus {
    /// Check passed.
    Pass,
    /// Check failed.
    Fail,
    /// Degraded but operational.
    Warn,
}

/// One named check.
#[derive(Debug, Clone, Serialize)]
pub struct HealthCheck {
    /// Check name (the provider name for provider checks).
    pub name: String,
    /// Outcome.
    pub status: HealthCheckStatus,
    /// Details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HealthCheck {
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for constructors"
    )]
    fn new(name: impl Into<String>, status: HealthCheckStatus, message: impl Into<String>) -> Self {
        Self { name: name.into(), status, message: Some(message.into()) }
    }
}

/// Body of `GET /healthz`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// Overall status.
    pub status: HealthStatus,
    /// Server version.
    pub version: &'static str,
    /// Seconds since start-up.
    pub uptime_secs: u64,
    /// Providers ready to serve calls.
    pub providers: Vec<String>,
    /// Per-provider checks.
    pub checks: Vec<HealthCheck>,
}

impl HealthReport {
    /// Builds the report for `gateway`.
    #[must_use]
    pub fn for_gateway(gateway: &Gateway, uptime_secs: u64) -> Self {
        let providers: Vec<String> = gateway.enabled_providers().map(|p| p.to_string()).collect();

        let mut checks: Vec<HealthCheck> = providers
            .iter()
            .map(|name| HealthCheck::new(name.as_str(), HealthCheckStatus::Pass, "ready"))
            .collect();
        checks.extend(gateway.unavailable_providers().map(|(provider, reason)| {
            HealthCheck::new(provider.as_str(), HealthCheckStatus::Fail, reason)
        }));
        if checks.is_empty() {
            checks.push(HealthCheck::new(
                "providers",
                HealthCheckStatus::Warn,
                "no provider is configured",
            ));
        }

        Self {
            status: Self::compute_status(&checks),
            version: env!("CARGO_PKG_VERSION"),
            uptime_secs,
            providers,
            checks,
        }
    }

    /// Worst status among `checks`.
    #[must_use]
    pub fn compute_status(checks: &[HealthCheck]) -> HealthStatus {
        if checks.iter().any(|c| c.status == HealthCheckStatus::Fail) {
            HealthStatus::Unhealthy
        } else if checks.iter().any(|c| c.status == HealthCheckStatus::Warn) {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }
}
