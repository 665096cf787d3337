//! Common test utilities for password store integration tests
//!
//! Provides a schema registry covering the shapes the tests exercise and a
//! facade wired to in-memory backends.

#![allow(dead_code, reason = "not every test binary uses every helper")]

use password_store::prelude::*;
use serde_json::Value;
use std::sync::Arc;

pub const GITHUB_CONFIG: &str = "githubConfig";
pub const NESTED_CONFIG: &str = "nestedConfig";
pub const USER_LIST: &str = "userList";

/// Registry with a flat, a nested and an array-of-objects password schema
pub fn registry() -> MemorySchemaRegistry {
    MemorySchemaRegistry::from_yaml_str(
        r"
githubConfig:
  name: string
  id: string
  clientId: string
  clientSecret: password
nestedConfig:
  auth: authSettings
authSettings:
  username: string
  password: password
userList:
  users: array[user]
user:
  login: string
  password: password
",
    )
    .expect("test schemas parse")
}

/// Facade over in-memory backends, with handles to inspect them
pub struct Harness {
    pub store: PasswordStore,
    pub delegate: MemoryStore,
    pub secrets: MemorySecretBackend,
    pub namespaces: MemoryNamespaceBackend,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_secret_backend(MemorySecretBackend::new())
    }

    pub fn with_secret_backend(secrets: MemorySecretBackend) -> Self {
        let namespaces = MemoryNamespaceBackend::new();
        let manager = SecretManager::new(Arc::new(secrets.clone()), Arc::new(namespaces.clone()));
        Self::build(manager, secrets, namespaces)
    }

    pub fn with_manager(manager: SecretManager) -> Self {
        Self::build(manager, MemorySecretBackend::new(), MemoryNamespaceBackend::new())
    }

    fn build(
        manager: SecretManager,
        secrets: MemorySecretBackend,
        namespaces: MemoryNamespaceBackend,
    ) -> Self {
        let fields = FieldIndex::build(&registry(), &[GITHUB_CONFIG, NESTED_CONFIG, USER_LIST])
            .expect("field index builds");
        let delegate = MemoryStore::new();
        let store = PasswordStore::new(Arc::new(fields), manager)
            .with_shared_delegate(Arc::new(delegate.clone()));
        Self {
            store,
            delegate,
            secrets,
            namespaces,
        }
    }
}

/// Turn a `json!` object literal into a payload
pub fn payload(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        other => panic!("Expected a JSON object, got {other}"),
    }
}
