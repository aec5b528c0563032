//! Provider authentication.
//!
//! Each provider gets one [`TokenCache`] owning its client credentials and
//! current access token. The cache calls a [`TokenIssuer`] only when the
//! token is missing or within [`REFRESH_MARGIN_SECS`] of expiry.
//!
//! [`password`] derives the timestamp-bound STK push password used by the
//! mobile-money provider.

pub mod cache;
pub mod issuer;
pub mod password;

pub use cache::{CachedToken, Credential, REFRESH_MARGIN_SECS, TokenCache};
pub use issuer::{AuthScheme, ClientCredentials, HttpTokenIssuer, IssuedToken, TokenIssuer};
