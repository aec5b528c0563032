//! Outbound transport to provider APIs.
//!
//! This module provides a sealed [`Transport`] trait that sends one shaped
//! [`OutboundRequest`](crate::schema::OutboundRequest) to a provider and
//! hands back the raw [`UpstreamOutcome`](crate::normalize::UpstreamOutcome).
//! Interpreting the status and body is left to the normalizer.
//!
//! Every call carries:
//! - `Authorization: Bearer <token>`
//! - `X-Trace-Id`, fresh per call
//! - `X-Idempotency-Key` on money-moving POST/PUT calls
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::collections::HashMap;
//!
//! use paygate_bridge::{
//!     schema::{BuildContext, EndpointSchema, RequestBuilder},
//!     transport::{HttpConfig, HttpMethod, HttpTransport, RequestContext, Transport},
//! };
//! use secrecy::SecretString;
//! use serde_json::Value;
//! use url::Url;
//!
//! # async fn example() -> paygate_bridge::error::Result<()> {
//! let transport = HttpTransport::with_config(&HttpConfig::default())?;
//! let base_url = Url::parse("https://sandbox.sasapay.app/api/v1").unwrap();
//! let token = SecretString::from("access-token");
//!
//! let schema = EndpointSchema::empty();
//! let request = RequestBuilder::new(HttpMethod::Get, "/payments/channel-codes/", &schema)
//!     .build(&Value::Null, &HashMap::new(), &BuildContext::default())?;
//!
//! let outcome = transport
//!     .send(RequestContext { base_url: &base_url, request: &request, bearer: &token })
//!     .await?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

#[allow(
    redundant_imports,
    reason = "Future needed for RPITIT despite being in Edition 2024 prelude"
)]
use std::future::Future;
use std::fmt;

use secrecy::SecretString;
use url::Url;

use crate::{error::Result, normalize::UpstreamOutcome, schema::OutboundRequest};

pub mod config;
pub mod http;
mod sealed;

pub use config::{HttpConfig, HttpVersion};
pub use http::HttpTransport;

/// Header carrying the per-call trace id.
pub const TRACE_ID_HEADER: &str = "X-Trace-Id";

/// Header carrying the per-call idempotency key.
pub const IDEMPOTENCY_KEY_HEADER: &str = "X-Idempotency-Key";

/// HTTP methods used against provider APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
}

impl HttpMethod {
    /// Returns the method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
        }
    }

    /// Whether the method changes provider state.
    #[must_use]
    pub const fn is_mutation(self) -> bool {
        matches!(self, Self::Post | Self::Put)
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Self::GET,
            HttpMethod::Post => Self::POST,
            HttpMethod::Put => Self::PUT,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a transport needs for one provider call.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext<'a> {
    /// Provider base URL; the request path is appended to it.
    pub base_url: &'a Url,
    /// Shaped request.
    pub request: &'a OutboundRequest,
    /// Bearer token from the provider's token cache.
    pub bearer: &'a SecretString,
}

/// Provider transport abstraction.
///
/// This trait is sealed: only implementations within this crate are allowed.
pub trait Transport: sealed::private::Sealed + Send + Sync {
    /// Sends one request.
    ///
    /// Any HTTP status, success or not, comes back as
    /// [`UpstreamOutcome::Response`]; network failures and timeouts come
    /// back as [`UpstreamOutcome::TransportFailure`].
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Validation`](crate::error::GatewayError::Validation)
    /// if the request path is unsafe to send.
    fn send<'a>(
        &'a self,
        ctx: RequestContext<'a>,
    ) -> impl Future<Output = Result<UpstreamOutcome>> + Send + 'a;

    /// Returns the protocol name for logging.
    fn protocol_name(&self) -> &'static str;
}
