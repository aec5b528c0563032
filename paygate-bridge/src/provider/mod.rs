//! Provider catalogue.
//!
//! Each supported provider contributes a table of [`Endpoint`] rows: inbound
//! route, upstream path, payload schema and response messages. The gateway
//! and the server are both driven entirely by this table.

pub mod callback;
mod flutterwave;
mod mpesa;
mod sasapay;

use std::{fmt, sync::LazyLock};

use serde::{Deserialize, Serialize};

use crate::{
    auth::AuthScheme,
    normalize::ResponseRules,
    schema::{EndpointSchema, RequestBuilder},
    transport::HttpMethod,
};

/// Supported payment providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    /// Card and orchestration gateway.
    Flutterwave,
    /// Mobile-money gateway.
    Mpesa,
    /// Regional payments gateway, Kenya.
    Sasapay,
    /// Regional payments gateway, Tanzania.
    SasapayTz,
}

impl Provider {
    /// Every provider, in configuration order.
    pub const ALL: [Self; 4] = [Self::Flutterwave, Self::Mpesa, Self::Sasapay, Self::SasapayTz];

    /// Configuration and log name (`sasapay_tz`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Flutterwave => "flutterwave",
            Self::Mpesa => "mpesa",
            Self::Sasapay => "sasapay",
            Self::SasapayTz => "sasapay_tz",
        }
    }

    /// Currency applied when the caller sends none.
    #[must_use]
    pub const fn default_currency(self) -> Option<&'static str> {
        match self {
            Self::Sasapay => Some("KES"),
            Self::SasapayTz => Some("TZS"),
            Self::Flutterwave | Self::Mpesa => None,
        }
    }

    /// Body field whose falsy value marks a failed call despite HTTP 2xx.
    #[must_use]
    pub const fn failure_field(self) -> Option<&'static str> {
        match self {
            Self::Flutterwave | Self::Sasapay | Self::SasapayTz => Some("status"),
            Self::Mpesa => None,
        }
    }

    /// Token handshake the provider expects.
    #[must_use]
    pub const fn auth_scheme(self) -> AuthScheme {
        match self {
            Self::Flutterwave => AuthScheme::ClientCredentials,
            Self::Mpesa | Self::Sasapay | Self::SasapayTz => AuthScheme::Basic,
        }
    }

    /// Token path relative to the base URL, for providers that issue tokens
    /// from the API host.
    #[must_use]
    pub const fn default_token_path(self) -> Option<&'static str> {
        match self {
            Self::Flutterwave => None,
            Self::Mpesa => Some("/oauth/v1/generate"),
            Self::Sasapay | Self::SasapayTz => Some("/auth/token/"),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an endpoint does with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    /// Shaped and forwarded to the provider.
    Upstream,
    /// Returns the cached access token.
    TokenIntrospection,
    /// Provider result callback, answered locally.
    Callback,
    /// Instant payment notification, answered locally.
    Ipn,
}

/// One row of the catalogue.
#[derive(Debug, Clone)]
pub struct Endpoint {
    /// Owning provider.
    pub provider: Provider,
    /// Operation id, unique per provider (`stk_push`).
    pub operation: &'static str,
    /// Inbound route; `{id}` marks a path parameter.
    pub route: &'static str,
    /// Method for both the inbound route and the upstream call.
    pub method: HttpMethod,
    /// Upstream path relative to the provider base URL.
    pub upstream_path: &'static str,
    /// Outbound payload description.
    pub schema: EndpointSchema,
    /// Whether POST/PUT calls carry an idempotency key.
    pub money_moving: bool,
    /// Response messages and failure detection.
    pub rules: ResponseRules,
    /// Handling.
    pub kind: EndpointKind,
}

impl Endpoint {
    fn new(provider: Provider, operation: &'static str, method: HttpMethod, route: &'static str) -> Self {
        Self {
            provider,
            operation,
            route,
            method,
            upstream_path: "",
            schema: EndpointSchema::empty(),
            money_moving: false,
            rules: ResponseRules {
                label: operation,
                success_message: "Request processed",
                failure_message: "Request failed",
                failure_field: provider.failure_field(),
            },
            kind: EndpointKind::Upstream,
        }
    }

    pub(crate) fn get(provider: Provider, operation: &'static str, route: &'static str, upstream: &'static str) -> Self {
        Self { upstream_path: upstream, ..Self::new(provider, operation, HttpMethod::Get, route) }
    }

    pub(crate) fn post(provider: Provider, operation: &'static str, route: &'static str, upstream: &'static str) -> Self {
        Self { upstream_path: upstream, ..Self::new(provider, operation, HttpMethod::Post, route) }
    }

    pub(crate) fn put(provider: Provider, operation: &'static str, route: &'static str, upstream: &'static str) -> Self {
        Self { upstream_path: upstream, ..Self::new(provider, operation, HttpMethod::Put, route) }
    }

    pub(crate) fn introspection(provider: Provider, route: &'static str) -> Self {
        let mut endpoint = Self::new(provider, "auth", HttpMethod::Post, route);
        endpoint.kind = EndpointKind::TokenIntrospection;
        endpoint.messages("Token request", "Token retrieved successfully", "Failed to retrieve token")
    }

    pub(crate) fn callback(provider: Provider, route: &'static str) -> Self {
        let mut endpoint = Self::new(provider, "c2b_callback", HttpMethod::Post, route);
        endpoint.kind = EndpointKind::Callback;
        endpoint
    }

    pub(crate) fn ipn(provider: Provider, route: &'static str) -> Self {
        let mut endpoint = Self::new(provider, "ipn", HttpMethod::Post, route);
        endpoint.kind = EndpointKind::Ipn;
        endpoint
    }

    pub(crate) fn schema(mut self, schema: EndpointSchema) -> Self {
        self.schema = schema;
        self
    }

    pub(crate) fn money_moving(mut self) -> Self {
        self.money_moving = true;
        self
    }

    pub(crate) fn messages(
        mut self,
        label: &'static str,
        success_message: &'static str,
        failure_message: &'static str,
    ) -> Self {
        self.rules.label = label;
        self.rules.success_message = success_message;
        self.rules.failure_message = failure_message;
        self
    }

    /// Request builder for this endpoint.
    #[must_use]
    pub fn request_builder(&self) -> RequestBuilder<'_> {
        RequestBuilder::new(self.method, self.upstream_path, &self.schema).money_moving(self.money_moving)
    }
}

static CATALOGUE: LazyLock<Vec<Endpoint>> = LazyLock::new(|| {
    let mut endpoints = flutterwave::endpoints();
    endpoints.extend(mpesa::endpoints());
    endpoints.extend(sasapay::kenya_endpoints());
    endpoints.extend(sasapay::tanzania_endpoints());
    endpoints
});

/// Every endpoint of every provider.
#[must_use]
pub fn catalogue() -> &'static [Endpoint] {
    &CATALOGUE
}

/// Endpoints of one provider.
pub fn endpoints(provider: Provider) -> impl Iterator<Item = &'static Endpoint> {
    catalogue().iter().filter(move |endpoint| endpoint.provider == provider)
}

/// Looks up an endpoint by provider and operation id.
#[must_use]
pub fn find(provider: Provider, operation: &str) -> Option<&'static Endpoint> {
    endpoints(provider).find(|endpoint| endpoint.operation == operation)
}
