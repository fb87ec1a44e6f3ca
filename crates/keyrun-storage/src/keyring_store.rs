use async_trait::async_trait;
use keyrun_core::keystore::{service_name, KeyStore, KeyStoreError};
use tracing::{debug, instrument};

/// OS keychain-backed key store (Keychain, Credential Manager, Secret Service
/// behind a keyutils cache on Linux).
///
/// Each key lives under service `keyrun_<name>` with the caller's identity as
/// the account.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyringStore;

impl KeyringStore {
    pub fn new() -> Self {
        Self
    }

    fn entry(&self, name: &str, identity: &str) -> Result<keyring::Entry, KeyStoreError> {
        keyring::Entry::new(&service_name(name), identity).map_err(backend_err)
    }
}

// Keyring operations are synchronous; wrapped in async for trait compatibility.
#[async_trait]
impl KeyStore for KeyringStore {
    #[instrument(skip(self, identity))]
    async fn get(&self, name: &str, identity: &str) -> Result<String, KeyStoreError> {
        self.entry(name, identity)?
            .get_password()
            .map_err(|err| map_keyring_err(name, err))
    }

    #[instrument(skip(self, identity, secret))]
    async fn set(&self, name: &str, identity: &str, secret: &str) -> Result<(), KeyStoreError> {
        self.entry(name, identity)?
            .set_password(secret)
            .map_err(|err| map_keyring_err(name, err))?;
        debug!(service = %service_name(name), "stored key");
        Ok(())
    }

    #[instrument(skip(self, identity))]
    async fn delete(&self, name: &str, identity: &str) -> Result<(), KeyStoreError> {
        self.entry(name, identity)?
            .delete_credential()
            .map_err(|err| map_keyring_err(name, err))
    }
}

fn map_keyring_err(name: &str, err: keyring::Error) -> KeyStoreError {
    match err {
        keyring::Error::NoEntry => KeyStoreError::NotFound {
            name: name.trim().to_string(),
        },
        other => backend_err(other),
    }
}

fn backend_err(err: keyring::Error) -> KeyStoreError {
    KeyStoreError::Backend {
        reason: err.to_string(),
    }
}
