// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Secret unsealing for encrypted training scripts.
//!
//! Blob layout:
//!
//! ```text
//! [ IV: 16 bytes ][ auth tag: 16 bytes ][ ciphertext ... ]
//! ```
//!
//! AES-256-GCM with a 16-byte nonce and no associated data. Unsealing has no
//! side effects; the caller decides where (and for how long) plaintext lives.

use aes_gcm::aead::generic_array::typenum::U16;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::AesGcm;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretBox, SecretString};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// AES-256-GCM with a 16-byte IV.
type ScriptCipher = AesGcm<Aes256, U16>;

pub const KEY_LEN: usize = 32;
pub const IV_LEN: usize = 16;
pub const TAG_LEN: usize = 16;

/// Errors from sealing or unsealing a script blob
#[derive(Debug, Error)]
pub enum UnsealError {
    #[error("encryption key must be 32 bytes (or 64 hex chars), got {0} bytes")]
    InvalidKey(usize),
    #[error("blob too short: {0} bytes, need at least 32")]
    Truncated(usize),
    #[error("decryption failed: wrong key or corrupt blob")]
    Authentication,
    #[error("encryption failed")]
    Encryption,
    #[error("integrity check failed: expected sha256 {expected}, got {actual}")]
    Integrity { expected: String, actual: String },
}

/// The process-wide script decryption key.
pub struct UnsealKey(SecretBox<[u8; KEY_LEN]>);

impl UnsealKey {
    /// Accepts either exactly 32 raw bytes or 64 hex characters, taken as is.
    pub fn from_secret(secret: &SecretString) -> Result<Self, UnsealError> {
        let raw = secret.expose_secret();
        let mut key = Box::new([0u8; KEY_LEN]);
        if raw.len() == KEY_LEN * 2 && raw.bytes().all(|b| b.is_ascii_hexdigit()) {
            hex::decode_to_slice(raw, key.as_mut_slice())
                .map_err(|_| UnsealError::InvalidKey(raw.len()))?;
        } else if raw.len() == KEY_LEN {
            key.copy_from_slice(raw.as_bytes());
        } else {
            return Err(UnsealError::InvalidKey(raw.len()));
        }
        Ok(Self(SecretBox::new(key)))
    }

    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(SecretBox::new(Box::new(bytes)))
    }

    fn cipher(&self) -> Result<ScriptCipher, UnsealError> {
        ScriptCipher::new_from_slice(self.0.expose_secret())
            .map_err(|_| UnsealError::InvalidKey(KEY_LEN))
    }
}

impl std::fmt::Debug for UnsealKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("UnsealKey([REDACTED])")
    }
}

/// Decrypt a sealed blob.
pub fn unseal(blob: &[u8], key: &UnsealKey) -> Result<Vec<u8>, UnsealError> {
    if blob.len() < IV_LEN + TAG_LEN {
        return Err(UnsealError::Truncated(blob.len()));
    }
    let (iv, rest) = blob.split_at(IV_LEN);
    let (tag, ciphertext) = rest.split_at(TAG_LEN);

    let mut plaintext = ciphertext.to_vec();
    key.cipher()?
        .decrypt_in_place_detached(
            GenericArray::from_slice(iv),
            b"",
            &mut plaintext,
            GenericArray::from_slice(tag),
        )
        .map_err(|_| UnsealError::Authentication)?;
    Ok(plaintext)
}

/// Encrypt `plaintext` into the sealed blob layout with a fresh random IV.
pub fn seal(plaintext: &[u8], key: &UnsealKey) -> Result<Vec<u8>, UnsealError> {
    let mut iv = [0u8; IV_LEN];
    rand::rng().fill_bytes(&mut iv);

    let mut ciphertext = plaintext.to_vec();
    let tag = key
        .cipher()?
        .encrypt_in_place_detached(GenericArray::from_slice(&iv), b"", &mut ciphertext)
        .map_err(|_| UnsealError::Encryption)?;

    let mut blob = Vec::with_capacity(IV_LEN + TAG_LEN + ciphertext.len());
    blob.extend_from_slice(&iv);
    blob.extend_from_slice(&tag);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Lowercase hex SHA-256.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Compare plaintext against a recorded hash. `None` skips the check.
pub fn verify_integrity(plaintext: &[u8], expected: Option<&str>) -> Result<(), UnsealError> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let actual = sha256_hex(plaintext);
    if actual.eq_ignore_ascii_case(expected.trim()) {
        Ok(())
    } else {
        Err(UnsealError::Integrity {
            expected: expected.to_string(),
            actual,
        })
    }
}

#[cfg(test)]
#[path = "unseal_tests.rs"]
mod tests;
