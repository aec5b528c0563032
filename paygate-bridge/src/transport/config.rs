//! Outbound HTTP client configuration.
//!
//! Deserialized from the `[http]` table of the gateway configuration file.

use std::{ops::RangeInclusive, time::Duration};

use serde::Deserialize;

use crate::error::{GatewayError, Result};

/// HTTP client settings shared by every provider.
///
/// # Examples
///
/// ```toml
/// [http]
/// timeout_secs = 30
/// connect_timeout_secs = 10
/// pool_max_idle_per_host = 10
/// http_version = "auto"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpConfig {
    /// Maximum idle connections kept per provider host.
    #[serde(default = "default_pool_max_idle")]
    pub pool_max_idle_per_host: usize,

    /// Whole-request timeout in seconds; applies to token and provider calls.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// HTTP version preference.
    #[serde(default)]
    pub http_version: HttpVersion,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            pool_max_idle_per_host: default_pool_max_idle(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            http_version: HttpVersion::default(),
        }
    }
}

/// Accepted range for `timeout_secs`.
pub const TIMEOUT_RANGE: RangeInclusive<u64> = 1..=300;

/// Accepted range for `connect_timeout_secs`.
pub const CONNECT_TIMEOUT_RANGE: RangeInclusive<u64> = 1..=60;

impl HttpConfig {
    /// Validates timeout bounds.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] naming the setting and its value if
    /// `timeout_secs` is outside [`TIMEOUT_RANGE`] or `connect_timeout_secs`
    /// is outside [`CONNECT_TIMEOUT_RANGE`].
    pub fn validate(&self) -> Result<()> {
        check_range("timeout_secs", self.timeout_secs, &TIMEOUT_RANGE)?;
        check_range("connect_timeout_secs", self.connect_timeout_secs, &CONNECT_TIMEOUT_RANGE)?;
        if self.connect_timeout_secs > self.timeout_secs {
            tracing::warn!(
                connect_timeout_secs = self.connect_timeout_secs,
                timeout_secs = self.timeout_secs,
                "connect timeout exceeds request timeout and will never fire"
            );
        }
        Ok(())
    }

    /// Returns timeout as Duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Returns connect timeout as Duration.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// HTTP version preference.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HttpVersion {
    /// HTTP/1.1 only.
    Http1,
    /// HTTP/2 with prior knowledge.
    Http2,
    /// Negotiate (prefer HTTP/2, fall back to HTTP/1.1).
    #[default]
    Auto,
}

fn check_range(name: &str, value: u64, range: &RangeInclusive<u64>) -> Result<()> {
    if range.contains(&value) {
        return Ok(());
    }
    Err(GatewayError::Config(format!(
        "[http] {name} must be between {} and {}, got {value}",
        range.start(),
        range.end()
    )))
}

const fn default_pool_max_idle() -> usize {
    10
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_connect_timeout_secs() -> u64 {
    10
}
