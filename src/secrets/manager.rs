//! # Secret Manager
//!
//! Idempotent create/read/delete of single-key secret entries.
//!
//! `create_or_update` follows the same compare-before-write pattern for every
//! backend:
//! 1. Make sure the namespace exists, creating it on demand
//! 2. Fetch the current entry
//! 3. Create it if missing, update it if the payload differs, otherwise do nothing
//!
//! Conflicting concurrent writers are not serialized here; the backend's
//! optimistic version check decides and the conflict is returned unchanged.

use super::{NamespaceBackend, SecretBackend, SecretEntry};
use crate::error::{BackendError, Error, Result};
use crate::observability::metrics;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, Instrument};

/// What `create_or_update` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// Entry didn't exist and was created
    Created,
    /// Entry existed with a different payload and was overwritten
    Updated,
    /// Entry existed with the same payload; nothing was written
    Unchanged,
}

impl UpsertOutcome {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            UpsertOutcome::Created => "create",
            UpsertOutcome::Updated => "update",
            UpsertOutcome::Unchanged => "no_change",
        }
    }

    /// Whether the backend was written to
    #[must_use]
    pub fn wrote(&self) -> bool {
        !matches!(self, UpsertOutcome::Unchanged)
    }
}

/// Secret CRUD over a secret backend and a namespace backend
#[derive(Clone)]
pub struct SecretManager {
    secrets: Arc<dyn SecretBackend>,
    namespaces: Arc<dyn NamespaceBackend>,
}

impl std::fmt::Debug for SecretManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretManager").finish_non_exhaustive()
    }
}

impl SecretManager {
    pub fn new(secrets: Arc<dyn SecretBackend>, namespaces: Arc<dyn NamespaceBackend>) -> Self {
        Self {
            secrets,
            namespaces,
        }
    }

    /// Create the namespace unless it already exists
    ///
    /// Losing a creation race to another writer counts as success.
    pub async fn ensure_namespace(&self, namespace: &str) -> Result<()> {
        match self.namespaces.get(namespace).await {
            Ok(()) => Ok(()),
            Err(BackendError::NotFound { .. }) => {
                let start = Instant::now();
                match self.namespaces.create(namespace).await {
                    Ok(()) => {
                        info!("Created secret namespace {}", namespace);
                        metrics::record_secret_operation(
                            "namespace_create",
                            start.elapsed().as_secs_f64(),
                        );
                        Ok(())
                    }
                    Err(BackendError::AlreadyExists { .. }) => {
                        debug!("Namespace {} created concurrently", namespace);
                        Ok(())
                    }
                    Err(e) => {
                        metrics::increment_secret_operation_errors("namespace_create");
                        Err(e.into())
                    }
                }
            }
            Err(e) => {
                metrics::increment_secret_operation_errors("namespace_get");
                Err(e.into())
            }
        }
    }

    /// Store `plaintext` under the lowercased `name` in `namespace`
    ///
    /// Writes only when the stored payload differs.
    pub async fn create_or_update(
        &self,
        plaintext: &str,
        name: &str,
        namespace: &str,
    ) -> Result<UpsertOutcome> {
        let name = name.to_lowercase();
        let span = tracing::debug_span!(
            "secret.create_or_update",
            secret.namespace = namespace,
            secret.name = %name,
            operation.kind = tracing::field::Empty,
        );
        let span_clone = span.clone();
        let start = Instant::now();

        async move {
            self.ensure_namespace(namespace).await?;

            let desired = SecretEntry::single(namespace, name.as_str(), plaintext);

            let outcome = match self.secrets.get(namespace, &name).await {
                Err(BackendError::NotFound { .. }) => {
                    self.secrets
                        .create(&desired)
                        .await
                        .inspect_err(|_| metrics::increment_secret_operation_errors("create"))?;
                    UpsertOutcome::Created
                }
                Err(e) => {
                    metrics::increment_secret_operation_errors("get");
                    return Err(e.into());
                }
                Ok(existing) if existing.data == desired.data => {
                    debug!("Secret {} unchanged, skipping update", desired.key());
                    UpsertOutcome::Unchanged
                }
                Ok(existing) => {
                    info!("Secret value changed, updating secret {}", desired.key());
                    let replacement = SecretEntry {
                        data: desired.data,
                        ..existing
                    };
                    self.secrets
                        .update(&replacement)
                        .await
                        .inspect_err(|_| metrics::increment_secret_operation_errors("update"))?;
                    UpsertOutcome::Updated
                }
            };

            span_clone.record("operation.kind", outcome.as_str());
            metrics::record_secret_operation(outcome.as_str(), start.elapsed().as_secs_f64());
            Ok(outcome)
        }
        .instrument(span)
        .await
    }

    /// Plaintext stored under `name` in `namespace`
    ///
    /// A missing entry is returned as the backend's `NotFound`; an entry
    /// without a `name` key is `MissingSecretKey`.
    pub async fn get(&self, namespace: &str, name: &str) -> Result<String> {
        let span = tracing::debug_span!(
            "secret.get",
            secret.namespace = namespace,
            secret.name = name
        );
        let start = Instant::now();

        async move {
            let mut entry = self
                .secrets
                .get(namespace, name)
                .await
                .inspect_err(|_| metrics::increment_secret_operation_errors("get"))?;
            metrics::record_secret_operation("get", start.elapsed().as_secs_f64());

            entry.data.remove(name).ok_or_else(|| Error::MissingSecretKey {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
        }
        .instrument(span)
        .await
    }

    /// Delete the entry; deleting a missing entry succeeds
    pub async fn delete(&self, namespace: &str, name: &str) -> Result<()> {
        let start = Instant::now();
        match self.secrets.delete(namespace, name).await {
            Ok(()) => {
                metrics::record_secret_operation("delete", start.elapsed().as_secs_f64());
                Ok(())
            }
            Err(BackendError::NotFound { .. }) => {
                debug!("Secret {}/{} already gone", namespace, name);
                Ok(())
            }
            Err(e) => {
                metrics::increment_secret_operation_errors("delete");
                Err(e.into())
            }
        }
    }
}
