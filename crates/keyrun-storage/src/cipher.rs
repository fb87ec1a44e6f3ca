//! AES-256-GCM sealing of byte buffers.
//!
//! Blob layout is `nonce (12 bytes) || ciphertext || tag (16 bytes)`. There is
//! no header or version; changing the layout breaks every existing `.enc` file.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use rand::{rngs::OsRng, RngCore};
use thiserror::Error;

use crate::key::DerivedKey;

/// AES-GCM nonce size in bytes.
pub const NONCE_LEN: usize = 12;
/// AES-GCM authentication tag size in bytes.
pub const TAG_LEN: usize = 16;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    /// Wrong key, truncated blob or tampered data. No plaintext is ever returned.
    #[error("authentication failed: wrong key or corrupted ciphertext")]
    Authentication,
    /// The AEAD could not seal the buffer; the runtime is unusable.
    #[error("encryption unavailable: {reason}")]
    Environment { reason: String },
}

/// Encrypt `plaintext` under `key` with a fresh random nonce.
pub fn seal(plaintext: &[u8], key: &DerivedKey) -> Result<Vec<u8>, CipherError> {
    let cipher = build_cipher(key);

    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let sealed = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| CipherError::Environment {
            reason: format!("encrypt failed: {e}"),
        })?;

    let mut blob = Vec::with_capacity(NONCE_LEN + sealed.len());
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&sealed);
    Ok(blob)
}

/// Authenticate and decrypt a blob produced by [`seal`].
pub fn open(blob: &[u8], key: &DerivedKey) -> Result<Vec<u8>, CipherError> {
    if blob.len() < NONCE_LEN + TAG_LEN {
        return Err(CipherError::Authentication);
    }
    let (nonce, sealed) = blob.split_at(NONCE_LEN);
    build_cipher(key)
        .decrypt(Nonce::from_slice(nonce), sealed)
        .map_err(|_| CipherError::Authentication)
}

fn build_cipher(key: &DerivedKey) -> Aes256Gcm {
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()))
}
