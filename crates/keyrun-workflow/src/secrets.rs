use std::collections::BTreeMap;

use keyrun_core::keystore::KeyStore;
use tracing::debug;

use crate::error::WorkflowError;

/// Fetch the master secret stored under `name`.
pub async fn resolve_secret<S>(store: &S, identity: &str, name: &str) -> Result<String, WorkflowError>
where
    S: KeyStore + ?Sized,
{
    store
        .get(name, identity)
        .await
        .map_err(|source| WorkflowError::Secret {
            name: name.trim().to_string(),
            source,
        })
}

/// Resolve `VAR -> key name` into `VAR -> secret` for the child's environment.
/// Values are only ever handed to the child; the current process env is untouched.
pub async fn resolve_env<S>(
    store: &S,
    identity: &str,
    env: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, String>, WorkflowError>
where
    S: KeyStore + ?Sized,
{
    let mut resolved = BTreeMap::new();
    for (var, name) in env {
        let secret = store
            .get(name, identity)
            .await
            .map_err(|source| WorkflowError::EnvSecret {
                var: var.clone(),
                name: name.trim().to_string(),
                source,
            })?;
        debug!(%var, "resolved environment secret");
        resolved.insert(var.clone(), secret);
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use keyrun_core::keystore::{InMemoryKeyStore, KeyStoreError};

    use super::*;

    #[tokio::test]
    async fn resolves_master_secret() {
        let store = InMemoryKeyStore::with_secret("state", "alice", "pw");
        let secret = resolve_secret(&store, "alice", "state").await.expect("secret");
        assert_eq!(secret, "pw");
    }

    #[tokio::test]
    async fn missing_master_secret_names_the_key() {
        let store = InMemoryKeyStore::new();
        let err = resolve_secret(&store, "alice", "state")
            .await
            .expect_err("missing");
        match err {
            WorkflowError::Secret { name, source } => {
                assert_eq!(name, "state");
                assert!(matches!(source, KeyStoreError::NotFound { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn resolves_env_mapping() {
        let store = InMemoryKeyStore::with_secret("aws", "alice", "AKIA...");
        let env = BTreeMap::from([("AWS_SECRET_ACCESS_KEY".to_string(), "aws".to_string())]);

        let resolved = resolve_env(&store, "alice", &env).await.expect("env");
        assert_eq!(
            resolved.get("AWS_SECRET_ACCESS_KEY").map(String::as_str),
            Some("AKIA...")
        );
    }

    #[tokio::test]
    async fn missing_env_secret_names_the_variable() {
        let store = InMemoryKeyStore::new();
        let env = BTreeMap::from([("TOKEN".to_string(), "gh".to_string())]);
        let err = resolve_env(&store, "alice", &env).await.expect_err("missing");
        assert!(matches!(err, WorkflowError::EnvSecret { ref var, .. } if var == "TOKEN"));
    }
}
