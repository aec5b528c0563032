//! Request pipeline.
//!
//! [`Gateway::handle`] is the single entry point used by the server. For an
//! upstream endpoint it runs:
//!
//! ```text
//! inbound JSON -> RequestBuilder -> TokenCache -> Transport -> normalize -> envelope
//! ```
//!
//! Every step returns [`Result`]; the error is converted to an envelope once,
//! at the end, so a handler never fails.

use std::{
    collections::{BTreeMap, HashMap},
    time::Instant,
};

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tracing::instrument;
use url::Url;
use uuid::Uuid;

use crate::{
    audit::{AuditEvent, AuditEventType, audit_log},
    auth::{HttpTokenIssuer, TokenCache, password},
    config::{GatewayConfig, ResolvedProvider},
    crypto::FieldEncryptor,
    error::{GatewayError, Result},
    normalize::{NormalizedResponse, interpret},
    provider::{
        Endpoint, EndpointKind, Provider,
        callback::{accept_ipn, acknowledge_callback},
    },
    schema::{BuildContext, OutboundRequest},
    transport::{HttpTransport, RequestContext, Transport},
};

/// Payload fields reported as the audit reference, first match wins.
const REFERENCE_FIELDS: [&str; 6] = [
    "reference",
    "MerchantTransactionReference",
    "AccountReference",
    "RefNo",
    "TransID",
    "CheckoutRequestID",
];

/// Runtime state of one configured provider.
#[derive(Debug)]
struct ProviderState {
    base_url: Url,
    tokens: TokenCache<HttpTokenIssuer>,
    encryptor: Option<FieldEncryptor>,
    short_code: Option<String>,
    passkey: Option<SecretString>,
    currency: Option<String>,
}

impl ProviderState {
    fn new(resolved: ResolvedProvider, transport: &HttpTransport) -> Self {
        let ResolvedProvider {
            provider,
            base_url,
            token_url,
            credentials,
            encryptor,
            short_code,
            passkey,
            currency,
        } = resolved;

        let issuer =
            HttpTokenIssuer::new(transport.client().clone(), token_url, provider.auth_scheme(), provider);
        Self {
            base_url,
            tokens: TokenCache::new(provider, credentials, issuer),
            encryptor,
            short_code,
            passkey,
            currency,
        }
    }

    /// Values a schema may inject, computed for `now`.
    fn build_context(&self, now: DateTime<Utc>) -> BuildContext<'_> {
        let timestamp = password::timestamp(now);
        let password = match (&self.short_code, &self.passkey) {
            (Some(short_code), Some(passkey)) => {
                Some(password::stk_password(short_code, passkey, &timestamp))
            }
            _ => None,
        };

        BuildContext {
            currency: self.currency.clone(),
            short_code: self.short_code.clone(),
            password,
            timestamp: Some(timestamp),
            encryptor: self.encryptor.as_ref(),
        }
    }
}

/// Provider-call orchestrator.
///
/// Holds one [`TokenCache`] per configured provider and a single HTTP
/// transport shared by token issuance and provider calls.
#[derive(Debug)]
pub struct Gateway {
    transport: HttpTransport,
    providers: BTreeMap<Provider, ProviderState>,
    unavailable: BTreeMap<Provider, String>,
}

impl Gateway {
    /// Builds a gateway, reading secrets from the process environment.
    ///
    /// # Errors
    ///
    /// See [`from_config_with`](Self::from_config_with).
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        Self::from_config_with(config, |name| std::env::var(name).ok())
    }

    /// Builds a gateway, reading secrets through `lookup`.
    ///
    /// A provider whose secrets cannot be resolved is logged and marked
    /// unavailable; its routes answer with a configuration error and the
    /// health report degrades.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if the HTTP client cannot be built.
    pub fn from_config_with(
        config: &GatewayConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let transport = HttpTransport::with_config(&config.http)?;
        let mut providers = BTreeMap::new();
        let mut unavailable = BTreeMap::new();

        for (provider, section) in config.providers() {
            match section.resolve(provider, &lookup) {
                Ok(resolved) => {
                    tracing::info!(%provider, base_url = %resolved.base_url, "provider enabled");
                    providers.insert(provider, ProviderState::new(resolved, &transport));
                }
                Err(error) => {
                    tracing::error!(%provider, %error, "provider failed to initialise");
                    unavailable.insert(provider, error.to_string());
                }
            }
        }

        tracing::info!(
            protocol = transport.protocol_name(),
            enabled = providers.len(),
            unavailable = unavailable.len(),
            "gateway ready"
        );
        Ok(Self { transport, providers, unavailable })
    }

    /// Providers ready to serve calls.
    pub fn enabled_providers(&self) -> impl Iterator<Item = Provider> + '_ {
        self.providers.keys().copied()
    }

    /// Configured providers that failed to initialise, with the reason.
    pub fn unavailable_providers(&self) -> impl Iterator<Item = (Provider, &str)> + '_ {
        self.unavailable.iter().map(|(provider, reason)| (*provider, reason.as_str()))
    }

    /// Handles one inbound call. Never fails; errors become failure envelopes.
    ///
    /// `params` holds the route's path parameters (`id`).
    #[instrument(
        skip(self, endpoint, inbound, params),
        fields(provider = %endpoint.provider, operation = endpoint.operation)
    )]
    pub async fn handle(
        &self,
        endpoint: &Endpoint,
        inbound: Value,
        params: &HashMap<String, String>,
    ) -> NormalizedResponse {
        match endpoint.kind {
            EndpointKind::Upstream => self.call(endpoint, &inbound, params).await,
            EndpointKind::TokenIntrospection => {
                self.introspect(endpoint).await.unwrap_or_else(NormalizedResponse::from)
            }
            EndpointKind::Callback => {
                let event = notification_event(AuditEventType::CallbackReceived, endpoint, &inbound);
                audit_log(&event);
                acknowledge_callback(inbound)
            }
            EndpointKind::Ipn => {
                let event = notification_event(AuditEventType::IpnReceived, endpoint, &inbound);
                match accept_ipn(inbound) {
                    Ok(response) => {
                        audit_log(&event);
                        response
                    }
                    Err(error) => {
                        audit_log(&event.with_error(error.to_string()));
                        error.into()
                    }
                }
            }
        }
    }

    async fn call(
        &self,
        endpoint: &Endpoint,
        inbound: &Value,
        params: &HashMap<String, String>,
    ) -> NormalizedResponse {
        let started = Instant::now();
        let state = match self.state(endpoint.provider) {
            Ok(state) => state,
            Err(error) => return error.into(),
        };

        let ctx = state.build_context(Utc::now());
        let request = match endpoint.request_builder().build(inbound, params, &ctx) {
            Ok(request) => request,
            Err(error) => {
                tracing::info!(%error, "request rejected before provider call");
                audit_log(
                    &AuditEvent::new(AuditEventType::ValidationRejected, endpoint.provider.as_str(), Uuid::new_v4())
                        .with_operation(endpoint.operation)
                        .with_error(error.to_string()),
                );
                return error.into();
            }
        };

        let response =
            self.dispatch(state, endpoint, &request).await.unwrap_or_else(NormalizedResponse::from);

        let event_type = if response.status {
            AuditEventType::ProviderCallSucceeded
        } else {
            AuditEventType::ProviderCallFailed
        };
        let mut event = AuditEvent::new(event_type, endpoint.provider.as_str(), request.trace_id)
            .with_operation(endpoint.operation)
            .with_upstream_status(response.http_status)
            .with_duration(started.elapsed());
        if let Some(reference) = request.body.as_ref().and_then(reference_of) {
            event = event.with_reference(reference);
        }
        if !response.status {
            event = event.with_error(response.message.clone());
        }
        audit_log(&event);

        response
    }

    /// Fetches a token strictly before the provider call, then interprets the outcome.
    async fn dispatch(
        &self,
        state: &ProviderState,
        endpoint: &Endpoint,
        request: &OutboundRequest,
    ) -> Result<NormalizedResponse> {
        let token = state.tokens.get_valid_token().await?;
        let ctx = RequestContext { base_url: &state.base_url, request, bearer: token.access_token() };
        let outcome = self.transport.send(ctx).await?;
        interpret(outcome, &endpoint.rules)
    }

    async fn introspect(&self, endpoint: &Endpoint) -> Result<NormalizedResponse> {
        let state = self.state(endpoint.provider)?;
        let token = state.tokens.get_valid_token().await?;
        let now = Utc::now();

        Ok(NormalizedResponse::success(
            200,
            endpoint.rules.success_message,
            json!({
                "access_token": token.access_token().expose_secret(),
                "token_type": "Bearer",
                "expires_in": token.remaining_secs(now),
                "expires_at": token.expires_at().to_rfc3339(),
            }),
        ))
    }

    fn state(&self, provider: Provider) -> Result<&ProviderState> {
        if let Some(state) = self.providers.get(&provider) {
            return Ok(state);
        }
        Err(match self.unavailable.get(&provider) {
            Some(reason) => GatewayError::Config(format!("{provider} is unavailable: {reason}")),
            None => GatewayError::Config(format!("{provider} is not configured")),
        })
    }
}

fn notification_event(event_type: AuditEventType, endpoint: &Endpoint, body: &Value) -> AuditEvent {
    let event = AuditEvent::new(event_type, endpoint.provider.as_str(), Uuid::new_v4())
        .with_operation(endpoint.operation);
    match reference_of(body) {
        Some(reference) => event.with_reference(reference),
        None => event,
    }
}

fn reference_of(body: &Value) -> Option<&str> {
    REFERENCE_FIELDS.iter().find_map(|field| body.get(*field).and_then(Value::as_str))
}
