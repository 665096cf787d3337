//! # Secret Backends
//!
//! Abstract interfaces for the backends that hold secret payloads and the
//! namespaces they live in, plus the [`SecretManager`] that drives them.
//!
//! Two implementations are provided:
//! - [`kubernetes`]: Kubernetes `Secret` and `Namespace` objects
//! - [`memory`]: in-process maps, for tests and local tooling

use crate::constants::SECRET_TYPE_OPAQUE;
use crate::error::BackendError;
use async_trait::async_trait;
use std::collections::BTreeMap;

pub mod kubernetes;
pub mod manager;
pub mod memory;

pub use kubernetes::{KubeNamespaceBackend, KubeSecretBackend};
pub use manager::{SecretManager, UpsertOutcome};
pub use memory::{MemoryNamespaceBackend, MemorySecretBackend};

/// A secret as stored in the backend
#[derive(Clone, PartialEq, Eq)]
pub struct SecretEntry {
    pub namespace: String,
    pub name: String,
    pub data: BTreeMap<String, String>,
    /// Opaque type tag
    pub secret_type: String,
    /// Backend version the entry was read at, used for optimistic updates
    pub resource_version: Option<String>,
}

impl SecretEntry {
    /// Single-key entry: the key is the entry's own name
    pub fn single(namespace: impl Into<String>, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let mut data = BTreeMap::new();
        data.insert(name.clone(), value.into());
        Self {
            namespace: namespace.into(),
            name,
            data,
            secret_type: SECRET_TYPE_OPAQUE.to_string(),
            resource_version: None,
        }
    }

    /// `namespace/name`, as used in logs and errors
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

impl std::fmt::Debug for SecretEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print secret values
        f.debug_struct("SecretEntry")
            .field("namespace", &self.namespace)
            .field("name", &self.name)
            .field("keys", &self.data.keys().collect::<Vec<_>>())
            .field("secret_type", &self.secret_type)
            .field("resource_version", &self.resource_version)
            .finish()
    }
}

/// Backend holding secret entries, keyed by (namespace, name)
#[async_trait]
pub trait SecretBackend: Send + Sync {
    /// Fetch an entry; `NotFound` if it does not exist
    async fn get(&self, namespace: &str, name: &str) -> Result<SecretEntry, BackendError>;

    /// Create an entry; `AlreadyExists` if it exists
    async fn create(&self, entry: &SecretEntry) -> Result<SecretEntry, BackendError>;

    /// Replace an entry's payload; `Conflict` if it changed since it was read
    async fn update(&self, entry: &SecretEntry) -> Result<SecretEntry, BackendError>;

    /// Delete an entry; `NotFound` if it does not exist
    async fn delete(&self, namespace: &str, name: &str) -> Result<(), BackendError>;
}

/// Backend holding the namespaces secrets are created in
#[async_trait]
pub trait NamespaceBackend: Send + Sync {
    /// `NotFound` if the namespace does not exist
    async fn get(&self, name: &str) -> Result<(), BackendError>;

    /// `AlreadyExists` if the namespace exists
    async fn create(&self, name: &str) -> Result<(), BackendError>;
}
