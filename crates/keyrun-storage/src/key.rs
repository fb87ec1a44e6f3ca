use std::fmt;

use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Key size for AES-256-GCM.
pub const KEY_LEN: usize = 32;

/// Symmetric key derived from a secret. Wiped from memory on drop and never printed.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey([u8; KEY_LEN]);

impl DerivedKey {
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedKey(..)")
    }
}

/// Derive the file encryption key for `secret`.
///
/// SHA-256 of the secret's bytes: deterministic and exactly [`KEY_LEN`] long for
/// any input. It is not a password hash; the key store holding the secret is
/// the confidentiality boundary.
pub fn derive(secret: &str) -> DerivedKey {
    DerivedKey(Sha256::digest(secret.as_bytes()).into())
}
