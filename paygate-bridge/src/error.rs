//! Error types for the payment gateway.
//!
//! Every core operation returns [`Result<T, GatewayError>`](Result). The variants
//! follow the failure taxonomy of the gateway: caller mistakes, token issuance
//! failures, provider-reported failures and transport failures, plus the
//! ambient configuration and cryptography kinds.
//!
//! # Error Categories
//!
//! - **Caller errors** ([`GatewayError::Validation`], [`GatewayError::InvalidInput`]):
//!   surfaced as HTTP 400
//! - **Token errors** ([`GatewayError::Auth`]): the provider refused to mint a token
//! - **Provider errors** ([`GatewayError::Upstream`]): non-2xx or in-body failure
//! - **Network errors** ([`GatewayError::Transport`]): the provider could not be reached
//! - **Setup errors** ([`GatewayError::Config`], [`GatewayError::Crypto`])
//!
//! The conversion into the outward `{status, message, data}` envelope lives in
//! [`crate::normalize`]; nothing here knows about HTTP responses.
//!
//! # Examples
//!
//! ```
//! use paygate_bridge::error::{GatewayError, Result};
//!
//! fn require_amount(amount: Option<&str>) -> Result<&str> {
//!     amount.ok_or_else(|| GatewayError::Validation("Missing required fields: amount".into()))
//! }
//!
//! assert!(require_amount(None).is_err());
//! ```

use serde_json::Value;
use thiserror::Error;

/// Result type alias for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Errors that can occur while shaping, authenticating or forwarding a provider call.
///
/// # Error Recovery
///
/// - **Validation errors**: fix the request body and resend
/// - **Auth errors**: check the provider client id/secret in the environment
/// - **Upstream errors**: inspect the provider body carried in the error
/// - **Transport errors**: the provider was unreachable; the call is not retried
#[must_use = "errors should be handled, propagated, or explicitly panicked"]
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Caller input failed validation.
    ///
    /// The message names the offending field(s), e.g.
    /// `"Missing required fields: amount, currency"`.
    #[error("{0}")]
    Validation(String),

    /// Misuse of an encryption helper (empty plaintext or nonce, non-object record).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Token issuance failed.
    ///
    /// `status` is the token endpoint's HTTP status. A body that could not be
    /// understood (missing `access_token`/`expires_in`) is reported as 502.
    #[error("{message}")]
    Auth {
        /// HTTP status to surface.
        status: u16,
        /// Human readable reason.
        message: String,
        /// Token endpoint body, when it was JSON.
        body: Option<Value>,
    },

    /// Provider reported a failure (non-2xx status or falsy in-body status).
    #[error("{message}")]
    Upstream {
        /// HTTP status returned by the provider.
        status: u16,
        /// Provider message, or a generic per-endpoint failure string.
        message: String,
        /// Full provider body.
        body: Option<Value>,
    },

    /// The provider could not be reached or its reply could not be read.
    ///
    /// Covers connection failures, timeouts and unreadable bodies.
    #[error("{operation} failed: {reason}")]
    Transport {
        /// Label of the operation that failed (e.g. `"STK Push"`).
        operation: String,
        /// Underlying failure text.
        reason: String,
    },

    /// Missing or invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Key material or AEAD failure.
    #[error("cryptographic operation failed: {0}")]
    Crypto(String),
}

impl GatewayError {
    /// Builds a transport error for the given operation label.
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for constructors"
    )]
    pub fn transport(operation: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Transport { operation: operation.into(), reason: reason.to_string() }
    }

    /// HTTP status this error maps to at the outward boundary.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::Validation(_) | Self::InvalidInput(_) => 400,
            Self::Auth { status, .. } | Self::Upstream { status, .. } => *status,
            Self::Transport { .. } | Self::Config(_) | Self::Crypto(_) => 500,
        }
    }
}
