//! Encryption at rest for keyrun-protected files.
//! AES-256-GCM over whole files, keys derived from secrets held in the OS keyring.

pub mod cipher;
pub mod file_codec;
pub mod fingerprint;
pub mod key;
pub mod keyring_store;
