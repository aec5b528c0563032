//! Card field encryption.
//!
//! - [`nonce`]: random alphanumeric nonces
//! - [`field`]: AES-GCM encryption of single fields and whole card records

pub mod field;
pub mod nonce;

pub use field::FieldEncryptor;
