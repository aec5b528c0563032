//! HTTP transport implementation.
//!
//! This module provides HTTP/1.1 and HTTP/2 transport using reqwest.

use reqwest::Client;
use secrecy::ExposeSecret;
use tracing::instrument;

use super::config::{HttpConfig, HttpVersion};
use crate::{
    error::{GatewayError, Result},
    normalize::UpstreamOutcome,
    transport::{IDEMPOTENCY_KEY_HEADER, RequestContext, TRACE_ID_HEADER, Transport, sealed},
};

/// Rejects paths containing traversal sequences.
fn sanitize_path(path: &str) -> Result<&str> {
    if path.contains("..") || path.contains("//") {
        return Err(GatewayError::Validation(
            "Invalid path: traversal sequences not allowed".to_owned(),
        ));
    }
    if !path.is_empty() && !path.starts_with('/') {
        return Err(GatewayError::Validation("Path must start with '/'".to_owned()));
    }
    Ok(path)
}

/// Whether a header value is free of CR, LF and NUL.
fn is_safe_header_value(value: &str) -> bool {
    !value.contains(['\r', '\n', '\0'])
}

/// HTTP/1.1 and HTTP/2 transport using reqwest.
///
/// The underlying [`Client`] is shared with the token issuers so every
/// provider call goes through one connection pool and one set of timeouts.
///
/// # Examples
///
/// ```
/// use paygate_bridge::transport::{HttpConfig, HttpTransport, HttpVersion, Transport};
///
/// let config = HttpConfig { http_version: HttpVersion::Http1, ..HttpConfig::default() };
/// let transport = HttpTransport::with_config(&config).unwrap();
/// assert_eq!(transport.protocol_name(), "http/1.1");
/// ```
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    http_version: HttpVersion,
}

impl sealed::private::Sealed for HttpTransport {}

impl HttpTransport {
    /// Creates a transport from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if the HTTP client cannot be built.
    pub fn with_config(config: &HttpConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout());

        builder = match config.http_version {
            HttpVersion::Http1 => builder.http1_only(),
            HttpVersion::Http2 => builder.http2_prior_knowledge(),
            HttpVersion::Auto => builder,
        };

        let client = builder
            .build()
            .map_err(|e| GatewayError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, http_version: config.http_version })
    }

    /// Returns the shared HTTP client.
    #[must_use]
    pub const fn client(&self) -> &Client {
        &self.client
    }

    #[instrument(
        skip(self, ctx),
        fields(
            method = %ctx.request.method,
            path = %ctx.request.path,
            trace_id = %ctx.request.trace_id
        )
    )]
    async fn execute_request(&self, ctx: RequestContext<'_>) -> Result<UpstreamOutcome> {
        let request = ctx.request;
        let path = sanitize_path(&request.path)?;

        let token = ctx.bearer.expose_secret();
        if !is_safe_header_value(token) {
            return Ok(UpstreamOutcome::TransportFailure(
                "access token contains control characters".to_owned(),
            ));
        }

        let full_url = format!("{}{path}", ctx.base_url.as_str().trim_end_matches('/'));

        let mut builder = self
            .client
            .request(request.method.into(), &full_url)
            .bearer_auth(token)
            .header(TRACE_ID_HEADER, request.trace_id.to_string());

        if let Some(key) = request.idempotency_key {
            builder = builder.header(IDEMPOTENCY_KEY_HEADER, key.to_string());
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                let e = e.without_url();
                tracing::warn!(error = %e, "provider call did not complete");
                return Ok(UpstreamOutcome::TransportFailure(e.to_string()));
            }
        };

        let status = response.status().as_u16();
        match response.bytes().await {
            Ok(body) => {
                tracing::debug!(status, bytes = body.len(), "provider responded");
                Ok(UpstreamOutcome::Response { status, body: body.to_vec() })
            }
            Err(e) => Ok(UpstreamOutcome::TransportFailure(e.without_url().to_string())),
        }
    }
}

impl Transport for HttpTransport {
    async fn send<'a>(&'a self, ctx: RequestContext<'a>) -> Result<UpstreamOutcome> {
        self.execute_request(ctx).await
    }

    fn protocol_name(&self) -> &'static str {
        match self.http_version {
            HttpVersion::Http1 => "http/1.1",
            HttpVersion::Http2 => "http/2",
            HttpVersion::Auto => "http",
        }
    }
}
