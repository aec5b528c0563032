//! Provider token issuance.
//!
//! A [`TokenIssuer`] performs one provider handshake and returns a fresh
//! access token with its lifetime. It is only ever called by
//! [`TokenCache`](super::TokenCache) when the cached token is missing or
//! about to expire.

#[allow(
    redundant_imports,
    reason = "Future needed for RPITIT despite being in Edition 2024 prelude"
)]
use std::future::Future;

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;
use url::Url;

use crate::{
    error::{GatewayError, Result},
    normalize::extract_message,
    provider::Provider,
};

/// Operation label used for transport failures during issuance.
pub const TOKEN_OPERATION: &str = "Token request";

/// Status reported when the token endpoint answered 2xx with an unusable body.
const MALFORMED_STATUS: u16 = 502;

/// Client id and secret for one provider.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    client_id: String,
    client_secret: SecretString,
}

impl ClientCredentials {
    /// Creates credentials.
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for constructors"
    )]
    pub fn new(client_id: impl Into<String>, client_secret: SecretString) -> Self {
        Self { client_id: client_id.into(), client_secret }
    }

    /// Returns the client id.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Returns the client secret.
    #[must_use]
    pub const fn client_secret(&self) -> &SecretString {
        &self.client_secret
    }
}

/// A freshly minted token.
#[derive(Debug)]
pub struct IssuedToken {
    /// Bearer token value.
    pub access_token: SecretString,
    /// Lifetime in seconds, as reported by the provider.
    pub expires_in: u64,
}

/// Performs a provider's token handshake.
///
/// Implementations must not cache; caching and refresh policy belong to
/// [`TokenCache`](super::TokenCache).
pub trait TokenIssuer: Send + Sync {
    /// Requests a new access token.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::Auth`] if the endpoint answers non-2xx or the body
    ///   lacks `access_token`/`expires_in`
    /// - [`GatewayError::Transport`] if the endpoint cannot be reached
    fn issue(
        &self,
        credentials: &ClientCredentials,
    ) -> impl Future<Output = Result<IssuedToken>> + Send;
}

/// How a provider expects client credentials to be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthScheme {
    /// `GET <token_url>?grant_type=client_credentials` with HTTP Basic auth.
    Basic,
    /// Form-encoded `POST` of `client_id`, `client_secret` and `grant_type`.
    ClientCredentials,
}

/// [`TokenIssuer`] that talks to a provider token endpoint over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTokenIssuer {
    client: Client,
    token_url: Url,
    scheme: AuthScheme,
    provider: Provider,
}

impl HttpTokenIssuer {
    /// Creates an issuer sharing the gateway's HTTP client.
    #[must_use]
    pub const fn new(client: Client, token_url: Url, scheme: AuthScheme, provider: Provider) -> Self {
        Self { client, token_url, scheme, provider }
    }

    /// Returns the token endpoint.
    #[must_use]
    pub const fn token_url(&self) -> &Url {
        &self.token_url
    }
}

impl TokenIssuer for HttpTokenIssuer {
    #[instrument(
        skip(self, credentials),
        fields(provider = %self.provider, scheme = ?self.scheme)
    )]
    async fn issue(&self, credentials: &ClientCredentials) -> Result<IssuedToken> {
        let secret = credentials.client_secret().expose_secret();
        let request = match self.scheme {
            AuthScheme::Basic => self
                .client
                .get(self.token_url.clone())
                .query(&[("grant_type", "client_credentials")])
                .basic_auth(credentials.client_id(), Some(secret)),
            AuthScheme::ClientCredentials => self.client.post(self.token_url.clone()).form(&[
                ("client_id", credentials.client_id()),
                ("client_secret", secret),
                ("grant_type", "client_credentials"),
            ]),
        };

        let response =
            request.send().await.map_err(|e| GatewayError::transport(TOKEN_OPERATION, e))?;
        let status = response.status().as_u16();
        let raw = response.bytes().await.map_err(|e| GatewayError::transport(TOKEN_OPERATION, e))?;
        let body: Option<Value> = serde_json::from_slice(&raw).ok();

        if !(200..300).contains(&status) {
            let message = body.as_ref().and_then(extract_message).map_or_else(
                || format!("Failed to retrieve token (status {status})"),
                str::to_owned,
            );
            tracing::warn!(status, "token endpoint rejected the request");
            return Err(GatewayError::Auth { status, message, body });
        }

        parse_token(body)
    }
}

/// Extracts `access_token` and `expires_in` from a token endpoint body.
///
/// `expires_in` is accepted as a JSON number or a numeric string.
///
/// # Errors
///
/// Returns [`GatewayError::Auth`] with status 502 when either field is
/// missing or unusable. The token value is stripped from the error body.
pub fn parse_token(body: Option<Value>) -> Result<IssuedToken> {
    let Some(json) = body else {
        return Err(malformed("body is not JSON", None));
    };

    let access_token = json
        .get("access_token")
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
        .map(|token| SecretString::from(token.to_owned()));
    let expires_in = json.get("expires_in").and_then(parse_expires_in);

    match (access_token, expires_in) {
        (Some(access_token), Some(expires_in)) => Ok(IssuedToken { access_token, expires_in }),
        (None, _) => Err(malformed("missing access_token", Some(json))),
        (Some(_), None) => Err(malformed("missing or invalid expires_in", Some(json))),
    }
}

fn parse_expires_in(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| value.as_str().and_then(|text| text.trim().parse().ok()))
}

fn malformed(reason: &str, body: Option<Value>) -> GatewayError {
    let body = body.map(|mut json| {
        if let Some(fields) = json.as_object_mut()
            && fields.contains_key("access_token")
        {
            fields.insert("access_token".to_owned(), Value::String("[REDACTED]".to_owned()));
        }
        json
    });
    GatewayError::Auth {
        status: MALFORMED_STATUS,
        message: format!("Malformed token response: {reason}"),
        body,
    }
}
