//! Random nonce generation for field encryption.

use rand::{Rng, distributions::Alphanumeric, rngs::OsRng};

/// Nonce length used by [`generate_default`] and record encryption.
///
/// AES-GCM takes a 96-bit nonce, and the alphanumeric string is used byte
/// for byte, so this must stay at 12.
pub const DEFAULT_NONCE_LEN: usize = 12;

/// Generates a random alphanumeric string of `length` characters.
///
/// Characters are drawn uniformly from `[A-Za-z0-9]` using the operating
/// system CSPRNG. With 62^12 possible 12-character values, collisions are
/// negligible for any realistic number of encryptions under one key.
///
/// # Examples
///
/// ```
/// use paygate_bridge::crypto::nonce;
///
/// let value = nonce::generate(12);
/// assert_eq!(value.len(), 12);
/// assert!(value.chars().all(|c| c.is_ascii_alphanumeric()));
/// ```
#[must_use]
pub fn generate(length: usize) -> String {
    OsRng.sample_iter(&Alphanumeric).take(length).map(char::from).collect()
}

/// Generates a nonce of [`DEFAULT_NONCE_LEN`] characters.
#[must_use]
pub fn generate_default() -> String {
    generate(DEFAULT_NONCE_LEN)
}
