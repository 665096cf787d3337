//! # In-Memory Backends
//!
//! Secret and namespace backends held in process memory.
//!
//! This is ephemeral - data does not persist across restarts.
//! Thread-safe using Arc<RwLock> for concurrent access. Every stored entry gets
//! a monotonically increasing resource version, and updates that carry a stale
//! version fail with `Conflict`, mirroring the Kubernetes API.

use super::{NamespaceBackend, SecretBackend, SecretEntry};
use crate::error::{BackendError, ResourceKind};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

type EntryKey = (String, String);

/// In-memory secret backend
#[derive(Clone, Debug, Default)]
pub struct MemorySecretBackend {
    entries: Arc<RwLock<BTreeMap<EntryKey, SecretEntry>>>,
    next_version: Arc<AtomicU64>,
    writes: Arc<AtomicUsize>,
}

impl MemorySecretBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful create and update calls
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of stored entries
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Snapshot of every stored entry, ordered by (namespace, name)
    pub async fn entries(&self) -> Vec<SecretEntry> {
        self.entries.read().await.values().cloned().collect()
    }

    fn stamp(&self, entry: &SecretEntry) -> SecretEntry {
        let version = self.next_version.fetch_add(1, Ordering::SeqCst) + 1;
        SecretEntry {
            resource_version: Some(version.to_string()),
            ..entry.clone()
        }
    }
}

fn key_of(namespace: &str, name: &str) -> EntryKey {
    (namespace.to_string(), name.to_string())
}

#[async_trait]
impl SecretBackend for MemorySecretBackend {
    async fn get(&self, namespace: &str, name: &str) -> Result<SecretEntry, BackendError> {
        self.entries
            .read()
            .await
            .get(&key_of(namespace, name))
            .cloned()
            .ok_or_else(|| BackendError::NotFound {
                kind: ResourceKind::Secret,
                key: format!("{namespace}/{name}"),
            })
    }

    async fn create(&self, entry: &SecretEntry) -> Result<SecretEntry, BackendError> {
        let mut entries = self.entries.write().await;
        let key = key_of(&entry.namespace, &entry.name);
        if entries.contains_key(&key) {
            return Err(BackendError::AlreadyExists {
                kind: ResourceKind::Secret,
                key: entry.key(),
            });
        }
        let stored = self.stamp(entry);
        entries.insert(key, stored.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(stored)
    }

    async fn update(&self, entry: &SecretEntry) -> Result<SecretEntry, BackendError> {
        let mut entries = self.entries.write().await;
        let key = key_of(&entry.namespace, &entry.name);
        let Some(current) = entries.get(&key) else {
            return Err(BackendError::NotFound {
                kind: ResourceKind::Secret,
                key: entry.key(),
            });
        };
        if let Some(expected) = &entry.resource_version {
            if current.resource_version.as_ref() != Some(expected) {
                return Err(BackendError::Conflict {
                    kind: ResourceKind::Secret,
                    key: entry.key(),
                    message: format!(
                        "resource version {expected} is stale (current {})",
                        current.resource_version.as_deref().unwrap_or("none")
                    ),
                });
            }
        }
        let stored = self.stamp(entry);
        entries.insert(key, stored.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(stored)
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), BackendError> {
        self.entries
            .write()
            .await
            .remove(&key_of(namespace, name))
            .map(|_| ())
            .ok_or_else(|| BackendError::NotFound {
                kind: ResourceKind::Secret,
                key: format!("{namespace}/{name}"),
            })
    }
}

/// In-memory namespace backend
#[derive(Clone, Debug, Default)]
pub struct MemoryNamespaceBackend {
    names: Arc<RwLock<BTreeSet<String>>>,
}

impl MemoryNamespaceBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend that already holds the given namespaces
    pub fn with_namespaces<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: Arc::new(RwLock::new(names.into_iter().map(Into::into).collect())),
        }
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.names.read().await.contains(name)
    }

    pub async fn names(&self) -> Vec<String> {
        self.names.read().await.iter().cloned().collect()
    }
}

#[async_trait]
impl NamespaceBackend for MemoryNamespaceBackend {
    async fn get(&self, name: &str) -> Result<(), BackendError> {
        if self.contains(name).await {
            Ok(())
        } else {
            Err(BackendError::NotFound {
                kind: ResourceKind::Namespace,
                key: name.to_string(),
            })
        }
    }

    async fn create(&self, name: &str) -> Result<(), BackendError> {
        if self.names.write().await.insert(name.to_string()) {
            Ok(())
        } else {
            Err(BackendError::AlreadyExists {
                kind: ResourceKind::Namespace,
                key: name.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_then_get() {
        let backend = MemorySecretBackend::new();
        let created = backend
            .create(&SecretEntry::single("ns", "a", "1"))
            .await
            .expect("create succeeds");
        assert_eq!(created.resource_version.as_deref(), Some("1"));

        let fetched = backend.get("ns", "a").await.expect("entry exists");
        assert_eq!(fetched, created);
        assert_eq!(backend.write_count(), 1);
    }

    #[tokio::test]
    async fn test_create_twice_is_already_exists() {
        let backend = MemorySecretBackend::new();
        let entry = SecretEntry::single("ns", "a", "1");
        backend.create(&entry).await.expect("first create succeeds");
        let err = backend.create(&entry).await.expect_err("second create fails");
        assert!(err.is_already_exists());
    }

    #[tokio::test]
    async fn test_stale_update_conflicts() {
        let backend = MemorySecretBackend::new();
        let first = backend
            .create(&SecretEntry::single("ns", "a", "1"))
            .await
            .expect("create succeeds");

        let mut writer_a = first.clone();
        writer_a.data.insert("a".to_string(), "2".to_string());
        backend.update(&writer_a).await.expect("fresh update succeeds");

        let mut writer_b = first;
        writer_b.data.insert("a".to_string(), "3".to_string());
        let err = backend.update(&writer_b).await.expect_err("stale update fails");
        assert!(err.is_conflict());
        assert_eq!(backend.get("ns", "a").await.expect("exists").data["a"], "2");
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let backend = MemorySecretBackend::new();
        let err = backend.delete("ns", "a").await.expect_err("nothing to delete");
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_namespaces() {
        let backend = MemoryNamespaceBackend::with_namespaces(["existing"]);
        backend.get("existing").await.expect("namespace exists");
        assert!(backend.get("new").await.expect_err("missing").is_not_found());
        backend.create("new").await.expect("create succeeds");
        assert!(backend
            .create("new")
            .await
            .expect_err("already created")
            .is_already_exists());
        assert_eq!(backend.names().await, vec!["existing", "new"]);
    }
}
