//! Timestamp-bound STK push password.
//!
//! The mobile-money gateway authenticates STK push requests with
//! `base64(shortcode || passkey || timestamp)`, where the timestamp is the
//! same `YYYYMMDDHHMMSS` UTC value sent alongside it in the request body.

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroizing;

/// Formats `now` as `YYYYMMDDHHMMSS`.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use paygate_bridge::auth::password::timestamp;
///
/// let now = Utc.with_ymd_and_hms(2025, 1, 31, 13, 5, 9).unwrap();
/// assert_eq!(timestamp(now), "20250131130509");
/// ```
#[must_use]
pub fn timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d%H%M%S").to_string()
}

/// Derives the STK push password for `timestamp`.
#[must_use]
pub fn stk_password(shortcode: &str, passkey: &SecretString, timestamp: &str) -> SecretString {
    let raw = Zeroizing::new(format!("{shortcode}{}{timestamp}", passkey.expose_secret()));
    SecretString::from(STANDARD.encode(raw.as_bytes()))
}
