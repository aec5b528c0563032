//! Per-provider token cache with just-in-time refresh.
//!
//! The cache moves through three states:
//!
//! ```text
//! NO_TOKEN --issue--> VALID --(within 60 s of expiry)--> EXPIRING --issue--> VALID
//! ```
//!
//! The credential is guarded by an async mutex that stays locked across the
//! issuance call. Callers that observe an expiring token while another
//! caller is refreshing wait for the lock and then see the new token, so at
//! most one issuance is in flight per provider and an older token can never
//! overwrite a newer one.

use chrono::{DateTime, TimeDelta, Utc};
use secrecy::SecretString;
use tokio::sync::Mutex;
use tracing::instrument;
use uuid::Uuid;

use super::issuer::{ClientCredentials, HttpTokenIssuer, TokenIssuer};
use crate::{
    audit::{AuditEvent, AuditEventType, audit_log},
    error::{GatewayError, Result},
    provider::Provider,
};

/// Seconds before expiry at which a cached token is considered stale.
pub const REFRESH_MARGIN_SECS: i64 = 60;

/// An access token and the instant it expires.
#[derive(Debug, Clone)]
pub struct CachedToken {
    access_token: SecretString,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// Creates a cached token.
    #[must_use]
    pub const fn new(access_token: SecretString, expires_at: DateTime<Utc>) -> Self {
        Self { access_token, expires_at }
    }

    /// Returns the bearer token value.
    #[must_use]
    pub const fn access_token(&self) -> &SecretString {
        &self.access_token
    }

    /// Returns the absolute expiry instant.
    #[must_use]
    pub const fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether the token can still be presented at `now`.
    ///
    /// A token is fresh while at least [`REFRESH_MARGIN_SECS`] remain.
    #[must_use]
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at >= now + TimeDelta::seconds(REFRESH_MARGIN_SECS)
    }

    /// Whole seconds left until expiry at `now` (zero once expired).
    #[must_use]
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds().max(0)
    }
}

/// Provider credential: client id/secret plus the current token, if any.
///
/// Holding the token and its expiry in one `Option` keeps them set or unset
/// together.
#[derive(Debug)]
pub struct Credential {
    credentials: ClientCredentials,
    token: Option<CachedToken>,
}

/// Token cache for one provider.
///
/// # Examples
///
/// ```rust,no_run
/// use paygate_bridge::{
///     auth::{AuthScheme, ClientCredentials, HttpTokenIssuer, TokenCache},
///     provider::Provider,
/// };
/// use secrecy::{ExposeSecret, SecretString};
///
/// # async fn example() -> paygate_bridge::error::Result<()> {
/// let issuer = HttpTokenIssuer::new(
///     reqwest::Client::new(),
///     "https://sandbox.example.com/oauth/v1/generate".parse().unwrap(),
///     AuthScheme::Basic,
///     Provider::Mpesa,
/// );
/// let credentials = ClientCredentials::new("consumer-key", SecretString::from("consumer-secret"));
/// let cache = TokenCache::new(Provider::Mpesa, credentials, issuer);
///
/// let token = cache.get_valid_token().await?;
/// println!("expires at {}", token.expires_at());
/// # let _ = token.access_token().expose_secret();
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct TokenCache<I = HttpTokenIssuer> {
    provider: Provider,
    issuer: I,
    credential: Mutex<Credential>,
}

impl<I: TokenIssuer> TokenCache<I> {
    /// Creates an empty cache; the first [`get_valid_token`](Self::get_valid_token)
    /// call issues a token.
    #[must_use]
    pub fn new(provider: Provider, credentials: ClientCredentials, issuer: I) -> Self {
        Self { provider, issuer, credential: Mutex::new(Credential { credentials, token: None }) }
    }

    /// Seeds the cache with an existing token.
    #[must_use]
    pub fn with_token(mut self, token: CachedToken) -> Self {
        self.credential.get_mut().token = Some(token);
        self
    }

    /// Returns the provider this cache serves.
    #[must_use]
    pub const fn provider(&self) -> Provider {
        self.provider
    }

    /// Returns a token that stays valid for at least [`REFRESH_MARGIN_SECS`].
    ///
    /// Issues a new token when none is cached or the cached one is within the
    /// refresh margin; otherwise returns the cached token without touching
    /// the issuer. On issuance failure the cache is left unchanged.
    ///
    /// # Errors
    ///
    /// Propagates [`GatewayError::Auth`] and [`GatewayError::Transport`] from
    /// the issuer.
    #[instrument(skip(self), fields(provider = %self.provider))]
    pub async fn get_valid_token(&self) -> Result<CachedToken> {
        let mut credential = self.credential.lock().await;

        if let Some(token) = &credential.token
            && token.is_fresh_at(Utc::now())
        {
            return Ok(token.clone());
        }

        let issued = match self.issuer.issue(&credential.credentials).await {
            Ok(issued) => issued,
            Err(error) => {
                let event = AuditEvent::new(
                    AuditEventType::TokenIssuanceFailed,
                    self.provider.as_str(),
                    Uuid::new_v4(),
                )
                .with_upstream_status(error.http_status())
                .with_error(error.to_string());
                audit_log(&event);
                return Err(error);
            }
        };

        let expires_at = expiry_after(Utc::now(), issued.expires_in)?;
        let token = CachedToken::new(issued.access_token, expires_at);
        credential.token = Some(token.clone());

        tracing::info!(expires_in = issued.expires_in, "access token issued");
        audit_log(&AuditEvent::new(
            AuditEventType::TokenIssued,
            self.provider.as_str(),
            Uuid::new_v4(),
        ));
        Ok(token)
    }

    /// Returns the cached token without refreshing it.
    pub async fn peek(&self) -> Option<CachedToken> {
        self.credential.lock().await.token.clone()
    }
}

fn expiry_after(now: DateTime<Utc>, expires_in: u64) -> Result<DateTime<Utc>> {
    i64::try_from(expires_in)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| GatewayError::Auth {
            status: 502,
            message: "Malformed token response: expires_in out of range".into(),
            body: None,
        })
}
