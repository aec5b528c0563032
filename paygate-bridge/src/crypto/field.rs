//! AES-GCM encryption of individual card fields.
//!
//! Providers that accept card data directly expect every sensitive field to
//! be encrypted with a pre-shared key. Each value is sealed with AES-GCM
//! under a caller-supplied 12-character nonce (its ASCII bytes are the
//! 96-bit GCM nonce) with no associated data, and shipped as
//! `base64(ciphertext || tag)`. The nonce travels next to the ciphertext so
//! the provider can open it.
//!
//! # Security
//!
//! A nonce must never be used for two different records under the same key.
//! [`FieldEncryptor::encrypt_record`] generates a fresh one per call and uses
//! it for every field of that single record only.

use std::fmt;

use aes_gcm::{
    Aes128Gcm, Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use zeroize::Zeroizing;

use super::nonce;
use crate::error::{GatewayError, Result};

/// GCM nonce size in bytes.
const NONCE_LEN: usize = 12;

type GcmNonce = Nonce<aes_gcm::aead::consts::U12>;

enum Cipher {
    Aes128(Box<Aes128Gcm>),
    Aes256(Box<Aes256Gcm>),
}

impl Cipher {
    fn encrypt(&self, nonce: &GcmNonce, plaintext: &[u8]) -> Result<Vec<u8>> {
        let sealed = match self {
            Self::Aes128(cipher) => cipher.encrypt(nonce, plaintext),
            Self::Aes256(cipher) => cipher.encrypt(nonce, plaintext),
        };
        sealed.map_err(|_| GatewayError::Crypto("failed to encrypt field".into()))
    }

    fn decrypt(&self, nonce: &GcmNonce, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let opened = match self {
            Self::Aes128(cipher) => cipher.decrypt(nonce, ciphertext),
            Self::Aes256(cipher) => cipher.decrypt(nonce, ciphertext),
        };
        opened.map_err(|_| GatewayError::Crypto("failed to decrypt field".into()))
    }

    const fn key_bits(&self) -> u16 {
        match self {
            Self::Aes128(_) => 128,
            Self::Aes256(_) => 256,
        }
    }
}

/// Encrypts sensitive request fields with a pre-shared AES-GCM key.
///
/// The key is loaded once from configuration and shared by all requests of a
/// provider; the encryptor holds no other state.
///
/// # Examples
///
/// ```
/// use paygate_bridge::crypto::FieldEncryptor;
/// use secrecy::SecretString;
///
/// # fn main() -> paygate_bridge::error::Result<()> {
/// let key = SecretString::from("MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY=");
/// let encryptor = FieldEncryptor::from_base64(&key)?;
///
/// let sealed = encryptor.encrypt("4111111111111111", "abcDEF123456")?;
/// assert_eq!(encryptor.decrypt(&sealed, "abcDEF123456")?, "4111111111111111");
/// # Ok(())
/// # }
/// ```
pub struct FieldEncryptor {
    cipher: Cipher,
}

impl fmt::Debug for FieldEncryptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldEncryptor").field("key_bits", &self.cipher.key_bits()).finish()
    }
}

impl FieldEncryptor {
    /// Creates an encryptor from a base64-encoded key.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Crypto`] if the key is not valid base64 or
    /// does not decode to 16 or 32 bytes.
    pub fn from_base64(key: &SecretString) -> Result<Self> {
        let raw = Zeroizing::new(
            STANDARD
                .decode(key.expose_secret().trim())
                .map_err(|_| GatewayError::Crypto("encryption key is not valid base64".into()))?,
        );
        Self::from_bytes(&raw)
    }

    /// Creates an encryptor from raw key bytes (16 or 32 bytes).
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Crypto`] for any other key length.
    pub fn from_bytes(key: &[u8]) -> Result<Self> {
        let cipher = match key.len() {
            16 => Cipher::Aes128(Box::new(
                Aes128Gcm::new_from_slice(key)
                    .map_err(|e| GatewayError::Crypto(e.to_string()))?,
            )),
            32 => Cipher::Aes256(Box::new(
                Aes256Gcm::new_from_slice(key)
                    .map_err(|e| GatewayError::Crypto(e.to_string()))?,
            )),
            other => {
                return Err(GatewayError::Crypto(format!(
                    "encryption key must be 16 or 32 bytes, got {other}"
                )));
            }
        };
        Ok(Self { cipher })
    }

    /// Encrypts `plaintext` under `nonce` and returns `base64(ciphertext || tag)`.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::InvalidInput`] if `plaintext` or `nonce` is empty, or
    ///   `nonce` is not exactly 12 bytes
    /// - [`GatewayError::Crypto`] if the AEAD operation fails
    pub fn encrypt(&self, plaintext: &str, nonce: &str) -> Result<String> {
        if plaintext.is_empty() || nonce.is_empty() {
            return Err(GatewayError::InvalidInput(
                "both plaintext and nonce are required for encryption".into(),
            ));
        }
        let nonce = parse_nonce(nonce)?;
        let sealed = self.cipher.encrypt(&nonce, plaintext.as_bytes())?;
        Ok(STANDARD.encode(sealed))
    }

    /// Reverses [`encrypt`](Self::encrypt).
    ///
    /// # Errors
    ///
    /// - [`GatewayError::InvalidInput`] for an empty ciphertext or a bad nonce
    /// - [`GatewayError::Crypto`] if the input is not base64, fails
    ///   authentication, or is not UTF-8
    pub fn decrypt(&self, ciphertext: &str, nonce: &str) -> Result<String> {
        if ciphertext.is_empty() || nonce.is_empty() {
            return Err(GatewayError::InvalidInput(
                "both ciphertext and nonce are required for decryption".into(),
            ));
        }
        let nonce = parse_nonce(nonce)?;
        let raw = STANDARD
            .decode(ciphertext)
            .map_err(|_| GatewayError::Crypto("ciphertext is not valid base64".into()))?;
        let opened = self.cipher.decrypt(&nonce, &raw)?;
        String::from_utf8(opened)
            .map_err(|_| GatewayError::Crypto("decrypted field is not UTF-8".into()))
    }

    /// Encrypts every value of a JSON object under one fresh nonce.
    ///
    /// Values are stringified first (strings as-is, anything else as its JSON
    /// text). The result maps each input key to its ciphertext and adds a
    /// `"nonce"` entry.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::InvalidInput`] if `fields` is not an object or a
    ///   value stringifies to an empty string
    /// - [`GatewayError::Crypto`] if the AEAD operation fails
    pub fn encrypt_record(&self, fields: &Value) -> Result<Map<String, Value>> {
        let Value::Object(fields) = fields else {
            return Err(GatewayError::InvalidInput("record to encrypt must be an object".into()));
        };

        let nonce = nonce::generate_default();
        let mut sealed = Map::with_capacity(fields.len() + 1);
        sealed.insert("nonce".to_owned(), Value::String(nonce.clone()));

        for (name, value) in fields {
            let plaintext = Zeroizing::new(stringify(value));
            sealed.insert(name.clone(), Value::String(self.encrypt(&plaintext, &nonce)?));
        }
        Ok(sealed)
    }
}

fn parse_nonce(nonce: &str) -> Result<GcmNonce> {
    let bytes: [u8; NONCE_LEN] = nonce.as_bytes().try_into().map_err(|_| {
        GatewayError::InvalidInput(format!(
            "nonce must be exactly {NONCE_LEN} bytes, got {}",
            nonce.len()
        ))
    })?;
    Ok(Nonce::from(bytes))
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
