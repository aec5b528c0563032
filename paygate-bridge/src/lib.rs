//! Paygate Bridge: one envelope for several payment-provider APIs.
//!
//! The crate fronts a card/orchestration gateway (`flutterwave`), a
//! mobile-money gateway (`mpesa`) and a regional payments gateway in Kenya
//! and Tanzania variants (`sasapay`, `sasapay_tz`). Callers send plain JSON;
//! the bridge authenticates, shapes the provider payload, forwards it and
//! folds whatever comes back into:
//!
//! ```json
//! {"status": true, "message": "STK Push sent successfully.", "data": {...}}
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   inbound JSON
//! │ paygate-     │──────────────┐
//! │ server       │              │
//! └──────────────┘   ┌──────────▼───────────┐
//!                    │ Gateway::handle      │
//!                    │  RequestBuilder      │  schema: required fields, defaults,
//!                    │   └─ FieldEncryptor  │  amount check, card encryption
//!                    │  TokenCache          │  60 s refresh margin, one issuance
//!                    │   └─ TokenIssuer     │  in flight per provider
//!                    │  Transport           │  X-Trace-Id, X-Idempotency-Key
//!                    │  normalize           │  {status, message, data}
//!                    └──────────┬───────────┘
//!                               │ HTTPS + Bearer
//!                    ┌──────────▼───────────┐
//!                    │  provider API        │
//!                    └──────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::collections::HashMap;
//!
//! use paygate_bridge::{
//!     Gateway,
//!     config::GatewayConfig,
//!     provider::{self, Provider},
//! };
//! use serde_json::json;
//!
//! # async fn example() -> paygate_bridge::Result<()> {
//! let config = GatewayConfig::from_file("paygate.toml")?;
//! let gateway = Gateway::from_config(&config)?;
//!
//! let endpoint = provider::find(Provider::Mpesa, "stk_push").expect("catalogued");
//! let response = gateway
//!     .handle(
//!         endpoint,
//!         json!({"Amount": 1, "PhoneNumber": "254708374149", "CallBackURL": "https://example.com/cb"}),
//!         &HashMap::new(),
//!     )
//!     .await;
//!
//! println!("{} {}", response.http_status, response.message);
//! # Ok(())
//! # }
//! ```
//!
//! # Module Organization
//!
//! - [`provider`]: endpoint catalogue and local callback/IPN receivers
//! - [`schema`]: declarative payload schemas and the request builder
//! - [`auth`]: token issuance and the per-provider token cache
//! - [`crypto`]: nonces and card field encryption
//! - [`transport`]: outbound HTTP
//! - [`normalize`]: provider outcome to envelope
//! - [`gateway`]: the pipeline tying these together
//! - [`config`]: TOML configuration with secrets read from the environment
//! - [`audit`]: structured audit events
//! - [`error`]: error taxonomy
//!
//! # Security Considerations
//!
//! - Client secrets, passkeys, encryption keys and tokens are held as
//!   [`secrecy::SecretString`] and never logged.
//! - Card number, expiry and CVV leave the process only as AES-GCM ciphertext.
//! - Money-moving mutations carry a fresh idempotency key per call.
//! - No retries: a failed provider call is final and reported as such.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![allow(
    clippy::multiple_crate_versions,
    reason = "transitive dependencies from reqwest and wiremock"
)]

pub mod audit;
pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod gateway;
pub mod normalize;
pub mod provider;
pub mod schema;
pub mod transport;

pub use error::{GatewayError, Result};
pub use gateway::Gateway;
pub use normalize::NormalizedResponse;
