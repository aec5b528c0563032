//! Gateway configuration.
//!
//! Loaded from a TOML file. Secrets never live in the file: each provider
//! section names the environment variables that hold them, and
//! [`ProviderConfig::resolve`] reads those variables once at start-up.
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:8080"
//!
//! [http]
//! timeout_secs = 30
//!
//! [mpesa]
//! base_url = "https://sandbox.safaricom.co.ke"
//! client_id_env = "MPESA_CONSUMER_KEY"
//! client_secret_env = "MPESA_CONSUMER_SECRET"
//! short_code = "174379"
//! passkey_env = "MPESA_PASSKEY"
//! ```

use std::{fs, path::Path};

use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

use crate::{
    auth::ClientCredentials,
    crypto::FieldEncryptor,
    error::{GatewayError, Result},
    provider::Provider,
    transport::HttpConfig,
};

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "PAYGATE_CONFIG";

/// Configuration file used when [`CONFIG_PATH_ENV`] is unset.
pub const DEFAULT_CONFIG_PATH: &str = "paygate.toml";

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Inbound listener.
    #[serde(default)]
    pub server: ServerConfig,

    /// Outbound HTTP client.
    #[serde(default)]
    pub http: HttpConfig,

    /// Card and orchestration gateway; disabled when absent.
    pub flutterwave: Option<ProviderConfig>,

    /// Mobile-money gateway; disabled when absent.
    pub mpesa: Option<ProviderConfig>,

    /// Regional payments gateway, Kenya; disabled when absent.
    pub sasapay: Option<ProviderConfig>,

    /// Regional payments gateway, Tanzania; disabled when absent.
    pub sasapay_tz: Option<ProviderConfig>,
}

impl GatewayConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if the document does not parse or
    /// fails [`validate`](Self::validate).
    ///
    /// # Examples
    ///
    /// ```
    /// use paygate_bridge::{config::GatewayConfig, provider::Provider};
    ///
    /// let config = GatewayConfig::from_toml_str(
    ///     r#"
    ///     [sasapay]
    ///     base_url = "https://sandbox.sasapay.app/api/v1"
    ///     client_id_env = "SASAPAY_CLIENT_ID"
    ///     client_secret_env = "SASAPAY_CLIENT_SECRET"
    ///     "#,
    /// )
    /// .unwrap();
    ///
    /// assert!(config.provider(Provider::Sasapay).is_some());
    /// assert!(config.provider(Provider::Mpesa).is_none());
    /// assert_eq!(config.server.bind, "0.0.0.0:8080");
    /// ```
    pub fn from_toml_str(document: &str) -> Result<Self> {
        let config: Self = toml::from_str(document)
            .map_err(|e| GatewayError::Config(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if the file cannot be read or is invalid.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let document = fs::read_to_string(path).map_err(|e| {
            GatewayError::Config(format!("cannot read configuration {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&document)
    }

    /// Validates every section.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] naming the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        self.http.validate()?;
        for (provider, section) in self.providers() {
            section.validate(provider)?;
        }
        Ok(())
    }

    /// Section for `provider`, if configured.
    #[must_use]
    pub const fn provider(&self, provider: Provider) -> Option<&ProviderConfig> {
        match provider {
            Provider::Flutterwave => self.flutterwave.as_ref(),
            Provider::Mpesa => self.mpesa.as_ref(),
            Provider::Sasapay => self.sasapay.as_ref(),
            Provider::SasapayTz => self.sasapay_tz.as_ref(),
        }
    }

    /// Configured providers with their sections.
    pub fn providers(&self) -> impl Iterator<Item = (Provider, &ProviderConfig)> {
        Provider::ALL.into_iter().filter_map(|provider| Some((provider, self.provider(provider)?)))
    }
}

/// Inbound listener settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Socket address to bind.
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_owned()
}

/// One provider section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// API base URL; upstream paths are appended to it.
    pub base_url: String,

    /// Token endpoint. Defaults to the provider's token path under
    /// `base_url`; required for providers with a separate identity host.
    #[serde(default)]
    pub token_url: Option<String>,

    /// Variable holding the client id (consumer key).
    pub client_id_env: String,

    /// Variable holding the client secret.
    pub client_secret_env: String,

    /// Variable holding the base64 card encryption key.
    #[serde(default)]
    pub encryption_key_env: Option<String>,

    /// Merchant short code for STK push.
    #[serde(default)]
    pub short_code: Option<String>,

    /// Variable holding the STK push passkey.
    #[serde(default)]
    pub passkey_env: Option<String>,

    /// Overrides the provider's default currency.
    #[serde(default)]
    pub currency: Option<String>,
}

impl ProviderConfig {
    /// Validates URLs and variable names.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if:
    /// - a URL does not parse or uses a scheme other than `http`/`https`
    /// - the provider has no default token path and `token_url` is unset
    /// - a variable name is not `[A-Za-z_][A-Za-z0-9_]*`
    pub fn validate(&self, provider: Provider) -> Result<()> {
        validate_url(provider, "base_url", &self.base_url)?;
        self.token_url(provider)?;

        validate_env_var_name(&self.client_id_env)?;
        validate_env_var_name(&self.client_secret_env)?;
        if let Some(name) = &self.encryption_key_env {
            validate_env_var_name(name)?;
        }
        if let Some(name) = &self.passkey_env {
            validate_env_var_name(name)?;
        }
        Ok(())
    }

    /// Resolved token endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if the URL is invalid or missing.
    pub fn token_url(&self, provider: Provider) -> Result<Url> {
        match (&self.token_url, provider.default_token_path()) {
            (Some(url), _) => validate_url(provider, "token_url", url),
            (None, Some(path)) => {
                let joined = format!("{}{path}", self.base_url.trim_end_matches('/'));
                validate_url(provider, "token_url", &joined)
            }
            (None, None) => {
                Err(GatewayError::Config(format!("[{provider}] token_url is required")))
            }
        }
    }

    /// Reads secrets through `lookup` and builds the runtime settings.
    ///
    /// `lookup` is normally `|name| std::env::var(name).ok()`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if a named variable is unset or empty,
    /// or the encryption key is not base64 for a 16- or 32-byte key.
    pub fn resolve(
        &self,
        provider: Provider,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<ResolvedProvider> {
        let secret = |name: &str| -> Result<SecretString> {
            lookup(name)
                .filter(|value| !value.is_empty())
                .map(SecretString::from)
                .ok_or_else(|| {
                    GatewayError::Config(format!("[{provider}] environment variable {name} is not set"))
                })
        };

        let client_id = lookup(&self.client_id_env).filter(|value| !value.is_empty()).ok_or_else(|| {
            GatewayError::Config(format!(
                "[{provider}] environment variable {} is not set",
                self.client_id_env
            ))
        })?;
        let credentials = ClientCredentials::new(client_id, secret(&self.client_secret_env)?);

        let encryptor = match &self.encryption_key_env {
            Some(name) => Some(FieldEncryptor::from_base64(&secret(name)?).map_err(|e| {
                GatewayError::Config(format!("[{provider}] {name}: {e}"))
            })?),
            None => None,
        };
        let passkey = self.passkey_env.as_deref().map(secret).transpose()?;

        Ok(ResolvedProvider {
            provider,
            base_url: validate_url(provider, "base_url", &self.base_url)?,
            token_url: self.token_url(provider)?,
            credentials,
            encryptor,
            short_code: self.short_code.clone(),
            passkey,
            currency: self
                .currency
                .clone()
                .or_else(|| provider.default_currency().map(str::to_owned)),
        })
    }
}

/// Provider settings with secrets loaded.
#[derive(Debug)]
pub struct ResolvedProvider {
    /// Provider.
    pub provider: Provider,
    /// API base URL.
    pub base_url: Url,
    /// Token endpoint.
    pub token_url: Url,
    /// Client id and secret.
    pub credentials: ClientCredentials,
    /// Card encryptor, when a key is configured.
    pub encryptor: Option<FieldEncryptor>,
    /// STK push short code.
    pub short_code: Option<String>,
    /// STK push passkey.
    pub passkey: Option<SecretString>,
    /// Default currency.
    pub currency: Option<String>,
}

/// Parses a provider URL; only `http` and `https` are accepted.
fn validate_url(provider: Provider, field: &str, raw: &str) -> Result<Url> {
    let url = Url::parse(raw)
        .map_err(|e| GatewayError::Config(format!("[{provider}] invalid {field} '{raw}': {e}")))?;

    match url.scheme() {
        "https" => Ok(url),
        "http" => {
            tracing::warn!(%provider, field, "plain HTTP URL configured; credentials will travel unencrypted");
            Ok(url)
        }
        other => Err(GatewayError::Config(format!(
            "[{provider}] {field} must use http or https, got: {other}"
        ))),
    }
}

/// Validates an environment variable name: `[A-Za-z_][A-Za-z0-9_]*`.
fn validate_env_var_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(GatewayError::Config("environment variable name cannot be empty".to_owned()));
    };

    if !first.is_ascii_alphabetic() && first != '_' {
        return Err(GatewayError::Config(format!(
            "environment variable name must start with letter or underscore: {name}"
        )));
    }

    if let Some(ch) = chars.find(|ch| !ch.is_ascii_alphanumeric() && *ch != '_') {
        return Err(GatewayError::Config(format!(
            "environment variable name contains invalid character '{ch}': {name}"
        )));
    }

    Ok(())
}
