use std::{
    collections::HashMap,
    env,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use thiserror::Error;

/// Prefix shared by every entry keyrun writes to a secret backend.
pub const SERVICE_PREFIX: &str = "keyrun";

/// Errors produced by secret store implementations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyStoreError {
    /// No secret is stored under the requested name for this identity.
    #[error("no key named `{name}` in the key store")]
    NotFound { name: String },
    /// Underlying backend failure.
    #[error("key store failure: {reason}")]
    Backend { reason: String },
}

/// Get/set/delete contract for named secrets, scoped to the calling identity.
///
/// `name` is the short user-facing key name; implementations namespace it with
/// [`service_name`]. `identity` is the OS account the secret belongs to and is
/// always passed in explicitly rather than looked up deep in the call chain.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Retrieve the secret stored under `name`.
    async fn get(&self, name: &str, identity: &str) -> Result<String, KeyStoreError>;

    /// Store `secret` under `name`, overwriting any previous value.
    async fn set(&self, name: &str, identity: &str, secret: &str) -> Result<(), KeyStoreError>;

    /// Remove the secret stored under `name`.
    async fn delete(&self, name: &str, identity: &str) -> Result<(), KeyStoreError>;
}

/// Namespaced service name for a key, e.g. `terraform` -> `keyrun_terraform`.
pub fn service_name(name: &str) -> String {
    format!("{SERVICE_PREFIX}_{}", name.trim())
}

/// Resolve the OS account name of the calling user.
pub fn current_identity() -> Result<String, KeyStoreError> {
    identity_from(|var| env::var(var).ok())
}

fn identity_from(lookup: impl Fn(&str) -> Option<String>) -> Result<String, KeyStoreError> {
    ["USER", "USERNAME"]
        .into_iter()
        .filter_map(|var| lookup(var))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .ok_or_else(|| KeyStoreError::Backend {
            reason: "cannot determine current user (USER/USERNAME unset)".to_string(),
        })
}

/// In-memory key store for tests and dry runs. Nothing is persisted.
#[derive(Debug, Default, Clone)]
pub struct InMemoryKeyStore {
    inner: Arc<Mutex<HashMap<(String, String), String>>>,
}

impl InMemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor with one secret already stored.
    pub fn with_secret(name: &str, identity: &str, secret: &str) -> Self {
        let store = Self::new();
        if let Ok(mut map) = store.inner.lock() {
            map.insert(
                (service_name(name), identity.to_string()),
                secret.to_string(),
            );
        }
        store
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<(String, String), String>>, KeyStoreError> {
        self.inner.lock().map_err(|err| KeyStoreError::Backend {
            reason: format!("lock poisoned: {err}"),
        })
    }
}

#[async_trait]
impl KeyStore for InMemoryKeyStore {
    async fn get(&self, name: &str, identity: &str) -> Result<String, KeyStoreError> {
        let map = self.lock()?;
        map.get(&(service_name(name), identity.to_string()))
            .cloned()
            .ok_or_else(|| KeyStoreError::NotFound {
                name: name.trim().to_string(),
            })
    }

    async fn set(&self, name: &str, identity: &str, secret: &str) -> Result<(), KeyStoreError> {
        let mut map = self.lock()?;
        map.insert(
            (service_name(name), identity.to_string()),
            secret.to_string(),
        );
        Ok(())
    }

    async fn delete(&self, name: &str, identity: &str) -> Result<(), KeyStoreError> {
        let mut map = self.lock()?;
        map.remove(&(service_name(name), identity.to_string()))
            .map(|_| ())
            .ok_or_else(|| KeyStoreError::NotFound {
                name: name.trim().to_string(),
            })
    }
}
