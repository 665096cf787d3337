//! # Kubernetes Backends
//!
//! Secret entries are stored as `Opaque` Kubernetes secrets whose single data
//! key is the secret's own name. Namespaces are created on demand.

use super::{NamespaceBackend, SecretBackend, SecretEntry};
use crate::constants::SECRET_TYPE_OPAQUE;
use crate::error::{BackendError, ResourceKind};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, Secret};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{DeleteParams, PostParams};
use kube::{Api, Client};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Secret backend over the Kubernetes API
#[derive(Clone)]
pub struct KubeSecretBackend {
    client: Client,
}

impl std::fmt::Debug for KubeSecretBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeSecretBackend").finish_non_exhaustive()
    }
}

impl KubeSecretBackend {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

/// Convert a Kubernetes secret into an entry
///
/// `data` holds the decoded bytes; `stringData` is write-only on the server but
/// is merged in as well so locally built objects round-trip.
pub fn entry_from_secret(secret: Secret) -> SecretEntry {
    let mut data = BTreeMap::new();
    if let Some(bytes) = secret.data {
        for (key, value) in bytes {
            data.insert(key, String::from_utf8_lossy(&value.0).into_owned());
        }
    }
    if let Some(strings) = secret.string_data {
        data.extend(strings);
    }

    SecretEntry {
        namespace: secret.metadata.namespace.unwrap_or_default(),
        name: secret.metadata.name.unwrap_or_default(),
        data,
        secret_type: secret
            .type_
            .unwrap_or_else(|| SECRET_TYPE_OPAQUE.to_string()),
        resource_version: secret.metadata.resource_version,
    }
}

/// Build the Kubernetes object written for an entry
pub fn secret_from_entry(entry: &SecretEntry) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(entry.name.clone()),
            namespace: Some(entry.namespace.clone()),
            resource_version: entry.resource_version.clone(),
            ..ObjectMeta::default()
        },
        string_data: Some(entry.data.clone()),
        type_: Some(entry.secret_type.clone()),
        ..Secret::default()
    }
}

#[async_trait]
impl SecretBackend for KubeSecretBackend {
    async fn get(&self, namespace: &str, name: &str) -> Result<SecretEntry, BackendError> {
        let secret = self
            .api(namespace)
            .get(name)
            .await
            .map_err(|e| BackendError::from_kube(e, ResourceKind::Secret, format!("{namespace}/{name}")))?;
        Ok(entry_from_secret(secret))
    }

    async fn create(&self, entry: &SecretEntry) -> Result<SecretEntry, BackendError> {
        let mut secret = secret_from_entry(entry);
        secret.metadata.resource_version = None;
        let created = self
            .api(&entry.namespace)
            .create(&PostParams::default(), &secret)
            .await
            .map_err(|e| BackendError::from_kube(e, ResourceKind::Secret, entry.key()))?;
        info!("Created secret {}", entry.key());
        Ok(entry_from_secret(created))
    }

    async fn update(&self, entry: &SecretEntry) -> Result<SecretEntry, BackendError> {
        // A replace without data drops stale keys; stringData becomes the whole payload.
        // The resource version turns concurrent writers into a 409 Conflict.
        let secret = secret_from_entry(entry);
        let updated = self
            .api(&entry.namespace)
            .replace(&entry.name, &PostParams::default(), &secret)
            .await
            .map_err(|e| BackendError::from_kube(e, ResourceKind::Secret, entry.key()))?;
        info!("Updated secret {}", entry.key());
        Ok(entry_from_secret(updated))
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), BackendError> {
        self.api(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map_err(|e| BackendError::from_kube(e, ResourceKind::Secret, format!("{namespace}/{name}")))?;
        info!("Deleted secret {}/{}", namespace, name);
        Ok(())
    }
}

/// Namespace backend over the Kubernetes API
#[derive(Clone)]
pub struct KubeNamespaceBackend {
    client: Client,
}

impl std::fmt::Debug for KubeNamespaceBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeNamespaceBackend").finish_non_exhaustive()
    }
}

impl KubeNamespaceBackend {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NamespaceBackend for KubeNamespaceBackend {
    async fn get(&self, name: &str) -> Result<(), BackendError> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        namespaces
            .get(name)
            .await
            .map_err(|e| BackendError::from_kube(e, ResourceKind::Namespace, name))?;
        debug!("Namespace {} exists", name);
        Ok(())
    }

    async fn create(&self, name: &str) -> Result<(), BackendError> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let namespace = Namespace {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..ObjectMeta::default()
            },
            ..Namespace::default()
        };
        namespaces
            .create(&PostParams::default(), &namespace)
            .await
            .map_err(|e| BackendError::from_kube(e, ResourceKind::Namespace, name))?;
        info!("Created namespace {}", name);
        Ok(())
    }
}
