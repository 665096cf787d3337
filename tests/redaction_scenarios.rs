//! # Redaction Scenario Tests
//!
//! End-to-end tests of the password store facade over in-memory backends.
//!
//! These tests verify:
//! - Password fields are moved into secrets on create and update
//! - References are resolved back to plaintext on read
//! - Nested objects and arrays of objects get one secret per value
//! - Already redacted values are never wrapped twice
//! - Array elements moved by an update keep their passwords
//! - A failed redaction never reaches the resource store
//! - A backend conflict is returned unchanged, with no retry

mod common;

use async_trait::async_trait;
use common::{payload, Harness, GITHUB_CONFIG, NESTED_CONFIG, USER_LIST};
use futures::StreamExt;
use password_store::prelude::*;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[tokio::test]
async fn test_create_moves_password_into_project_namespace() {
    let harness = Harness::new();
    let ctx = ApiContext::new();

    let created = harness
        .store
        .create(
            &ctx,
            GITHUB_CONFIG,
            payload(json!({"name": "gh1", "id": "proj1:gh1", "clientSecret": "s3cr3t"})),
        )
        .await
        .expect("create succeeds");

    assert_eq!(created["clientSecret"], "proj1:gh1-clientsecret");
    assert_eq!(created["name"], "gh1");

    let entry = harness
        .secrets
        .get("proj1", "gh1-clientsecret")
        .await
        .expect("secret written");
    assert_eq!(
        entry.data,
        [("gh1-clientsecret".to_string(), "s3cr3t".to_string())]
            .into_iter()
            .collect()
    );
    assert!(harness.namespaces.contains("proj1").await);

    // The resource store never sees the plaintext
    let raw = harness
        .delegate
        .raw(GITHUB_CONFIG, "proj1:gh1")
        .await
        .expect("resource stored");
    assert_eq!(raw["clientSecret"], "proj1:gh1-clientsecret");
}

#[tokio::test]
async fn test_by_id_resolves_plaintext() {
    let harness = Harness::new();
    let ctx = ApiContext::new();
    harness
        .store
        .create(
            &ctx,
            GITHUB_CONFIG,
            payload(json!({"name": "gh1", "id": "proj1:gh1", "clientSecret": "s3cr3t"})),
        )
        .await
        .expect("create succeeds");

    let fetched = harness
        .store
        .by_id(&ctx, GITHUB_CONFIG, "proj1:gh1")
        .await
        .expect("read succeeds");
    assert_eq!(fetched["clientSecret"], "s3cr3t");
}

#[tokio::test]
async fn test_nested_password_without_name_uses_resource_type() {
    let harness = Harness::new();
    let ctx = ApiContext::new();

    let created = harness
        .store
        .create(
            &ctx,
            NESTED_CONFIG,
            payload(json!({"auth": {"username": "admin", "password": "pw"}})),
        )
        .await
        .expect("create succeeds");

    assert_eq!(created["auth"]["password"], "mgmt-secrets:nestedconfig-password");
    assert_eq!(created["auth"]["username"], "admin");

    let entry = harness
        .secrets
        .get("mgmt-secrets", "nestedconfig-password")
        .await
        .expect("secret written in default namespace");
    assert_eq!(entry.data["nestedconfig-password"], "pw");
}

#[tokio::test]
async fn test_array_elements_get_distinct_secrets() {
    let harness = Harness::new();
    let ctx = ApiContext::new();

    let created = harness
        .store
        .create(
            &ctx,
            USER_LIST,
            payload(json!({
                "id": "team",
                "users": [
                    {"login": "alice", "password": "alice-pw"},
                    {"login": "bob", "password": "bob-pw"}
                ]
            })),
        )
        .await
        .expect("create succeeds");

    assert_eq!(created["users"][0]["password"], "team:userlist-password-0");
    assert_eq!(created["users"][1]["password"], "team:userlist-password-1");

    let entries = harness.secrets.entries().await;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].data["userlist-password-0"], "alice-pw");
    assert_eq!(entries[1].data["userlist-password-1"], "bob-pw");

    let id = created["id"].as_str().expect("id kept");
    let fetched = harness
        .store
        .by_id(&ctx, USER_LIST, id)
        .await
        .expect("read succeeds");
    assert_eq!(fetched["users"][0]["password"], "alice-pw");
    assert_eq!(fetched["users"][1]["password"], "bob-pw");
}

async fn create_team(harness: &Harness, ctx: &ApiContext) -> Payload {
    harness
        .store
        .create(
            ctx,
            USER_LIST,
            payload(json!({
                "id": "team",
                "users": [
                    {"login": "alice", "password": "alice-pw"},
                    {"login": "bob", "password": "bob-pw"}
                ]
            })),
        )
        .await
        .expect("create succeeds")
}

#[tokio::test]
async fn test_removed_element_keeps_remaining_password() {
    let harness = Harness::new();
    let ctx = ApiContext::new();
    create_team(&harness, &ctx).await;

    // Listed payloads carry references; drop alice and send bob back
    let mut listed = harness
        .store
        .list(&ctx, USER_LIST, &QueryOptions::new())
        .await
        .expect("list succeeds")
        .remove(0);
    let bob = listed["users"][1].clone();
    listed.insert("users".to_string(), json!([bob]));

    let updated = harness
        .store
        .update(&ctx, USER_LIST, listed, "team")
        .await
        .expect("update succeeds");
    assert_eq!(updated["users"][0]["password"], "team:userlist-password-0");

    let fetched = harness
        .store
        .by_id(&ctx, USER_LIST, "team")
        .await
        .expect("read succeeds");
    assert_eq!(fetched["users"].as_array().map(Vec::len), Some(1));
    assert_eq!(fetched["users"][0]["login"], "bob");
    assert_eq!(fetched["users"][0]["password"], "bob-pw");
}

#[tokio::test]
async fn test_reordered_elements_keep_their_passwords() {
    let harness = Harness::new();
    let ctx = ApiContext::new();
    let mut created = create_team(&harness, &ctx).await;

    let (alice, bob) = (created["users"][0].clone(), created["users"][1].clone());
    created.insert("users".to_string(), json!([bob, alice]));

    harness
        .store
        .update(&ctx, USER_LIST, created, "team")
        .await
        .expect("update succeeds");

    let fetched = harness
        .store
        .by_id(&ctx, USER_LIST, "team")
        .await
        .expect("read succeeds");
    assert_eq!(fetched["users"][0]["login"], "bob");
    assert_eq!(fetched["users"][0]["password"], "bob-pw");
    assert_eq!(fetched["users"][1]["login"], "alice");
    assert_eq!(fetched["users"][1]["password"], "alice-pw");
    // Two creates, then each position rewritten once
    assert_eq!(harness.secrets.write_count(), 4);
}

#[tokio::test]
async fn test_round_trip_for_every_protected_type() {
    let harness = Harness::new();
    let ctx = ApiContext::new();
    let cases = [
        (GITHUB_CONFIG, json!({"name": "a", "id": "p:a", "clientSecret": "one"}), "/clientSecret", "one"),
        (NESTED_CONFIG, json!({"id": "n1", "auth": {"password": "two"}}), "/auth/password", "two"),
        (USER_LIST, json!({"id": "u1", "users": [{"password": "three"}]}), "/users/0/password", "three"),
    ];

    for (resource_type, input, pointer, plaintext) in cases {
        let created = harness
            .store
            .create(&ctx, resource_type, payload(input))
            .await
            .expect("create succeeds");
        let stored = serde_json::Value::Object(created.clone());
        assert_ne!(stored.pointer(pointer), Some(&json!(plaintext)), "{resource_type} kept plaintext");

        let id = created["id"].as_str().expect("id present");
        let fetched = harness
            .store
            .by_id(&ctx, resource_type, id)
            .await
            .expect("read succeeds");
        assert_eq!(
            serde_json::Value::Object(fetched).pointer(pointer),
            Some(&json!(plaintext)),
            "{resource_type} did not round-trip"
        );
    }
}

#[tokio::test]
async fn test_numeric_password_round_trips_as_string() {
    let harness = Harness::new();
    let ctx = ApiContext::new();

    harness
        .store
        .create(&ctx, GITHUB_CONFIG, payload(json!({"name": "gh1", "id": "proj1:gh1", "clientSecret": 42})))
        .await
        .expect("create succeeds");

    let fetched = harness
        .store
        .by_id(&ctx, GITHUB_CONFIG, "proj1:gh1")
        .await
        .expect("read succeeds");
    assert_eq!(fetched["clientSecret"], json!("42"));
}

#[tokio::test]
async fn test_update_does_not_rewrap_reserved_namespace_reference() {
    let harness = Harness::new();
    let ctx = ApiContext::new();

    let created = harness
        .store
        .create(&ctx, NESTED_CONFIG, payload(json!({"auth": {"password": "pw"}})))
        .await
        .expect("create succeeds");
    let id = created["id"].as_str().expect("id assigned").to_string();
    assert_eq!(harness.secrets.write_count(), 1);

    let updated = harness
        .store
        .update(&ctx, NESTED_CONFIG, created.clone(), &id)
        .await
        .expect("update succeeds");

    assert_eq!(updated["auth"]["password"], created["auth"]["password"]);
    assert_eq!(harness.secrets.write_count(), 1);
    assert_eq!(harness.secrets.len().await, 1);
}

#[tokio::test]
async fn test_update_with_own_reference_writes_nothing() {
    let harness = Harness::new();
    let ctx = ApiContext::new();

    let created = harness
        .store
        .create(
            &ctx,
            GITHUB_CONFIG,
            payload(json!({"name": "gh1", "id": "proj1:gh1", "clientSecret": "s3cr3t"})),
        )
        .await
        .expect("create succeeds");

    harness
        .store
        .update(&ctx, GITHUB_CONFIG, created, "proj1:gh1")
        .await
        .expect("update succeeds");

    assert_eq!(harness.secrets.write_count(), 1);
    assert_eq!(
        harness
            .secrets
            .get("proj1", "gh1-clientsecret")
            .await
            .expect("secret kept")
            .data["gh1-clientsecret"],
        "s3cr3t"
    );
}

#[tokio::test]
async fn test_update_with_new_plaintext_overwrites_secret() {
    let harness = Harness::new();
    let ctx = ApiContext::new();
    let resource = |secret: &str| payload(json!({"name": "gh1", "id": "proj1:gh1", "clientSecret": secret}));

    harness
        .store
        .create(&ctx, GITHUB_CONFIG, resource("first"))
        .await
        .expect("create succeeds");
    harness
        .store
        .update(&ctx, GITHUB_CONFIG, resource("second"), "proj1:gh1")
        .await
        .expect("update succeeds");

    assert_eq!(harness.secrets.write_count(), 2);
    let fetched = harness
        .store
        .by_id(&ctx, GITHUB_CONFIG, "proj1:gh1")
        .await
        .expect("read succeeds");
    assert_eq!(fetched["clientSecret"], "second");
}

#[tokio::test]
async fn test_list_and_watch_pass_references_through() {
    let harness = Harness::new();
    let ctx = ApiContext::new();
    let mut watch = harness
        .store
        .watch(&ctx, GITHUB_CONFIG, &QueryOptions::new())
        .await
        .expect("watch opens");

    harness
        .store
        .create(
            &ctx,
            GITHUB_CONFIG,
            payload(json!({"name": "gh1", "id": "proj1:gh1", "clientSecret": "s3cr3t"})),
        )
        .await
        .expect("create succeeds");

    let listed = harness
        .store
        .list(&ctx, GITHUB_CONFIG, &QueryOptions::new().filter("name", "gh1"))
        .await
        .expect("list succeeds");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["clientSecret"], "proj1:gh1-clientsecret");

    let event = watch.next().await.expect("watch sees the create");
    assert_eq!(event["clientSecret"], "proj1:gh1-clientsecret");

    let deleted = harness
        .store
        .delete(&ctx, GITHUB_CONFIG, "proj1:gh1")
        .await
        .expect("delete succeeds")
        .expect("resource existed");
    assert_eq!(deleted["clientSecret"], "proj1:gh1-clientsecret");
    // Deleting the resource leaves its secret in place
    assert_eq!(harness.secrets.len().await, 1);
}

/// Secret backend that refuses every write
#[derive(Debug)]
struct ReadOnlyBackend;

#[async_trait]
impl SecretBackend for ReadOnlyBackend {
    async fn get(&self, namespace: &str, name: &str) -> Result<SecretEntry, BackendError> {
        Err(BackendError::NotFound {
            kind: ResourceKind::Secret,
            key: format!("{namespace}/{name}"),
        })
    }

    async fn create(&self, entry: &SecretEntry) -> Result<SecretEntry, BackendError> {
        Err(BackendError::Other(anyhow::anyhow!("refusing to write {}", entry.key())))
    }

    async fn update(&self, entry: &SecretEntry) -> Result<SecretEntry, BackendError> {
        Err(BackendError::Other(anyhow::anyhow!("refusing to write {}", entry.key())))
    }

    async fn delete(&self, _namespace: &str, _name: &str) -> Result<(), BackendError> {
        Ok(())
    }
}

#[tokio::test]
async fn test_failed_redaction_never_reaches_delegate() {
    let manager = SecretManager::new(Arc::new(ReadOnlyBackend), Arc::new(MemoryNamespaceBackend::new()));
    let harness = Harness::with_manager(manager);
    let ctx = ApiContext::new();

    let err = harness
        .store
        .create(
            &ctx,
            GITHUB_CONFIG,
            payload(json!({"name": "gh1", "id": "proj1:gh1", "clientSecret": "s3cr3t"})),
        )
        .await
        .expect_err("redaction fails");

    assert!(err.to_string().contains("refusing to write proj1/gh1-clientsecret"));
    assert!(matches!(err, Error::Backend(BackendError::Other(_))));
    assert!(harness.delegate.is_empty().await);
}

/// Secret backend where another writer always wins the update race
#[derive(Debug, Default)]
struct ContendedBackend {
    writes: AtomicUsize,
    seen_version: Mutex<Option<String>>,
}

#[async_trait]
impl SecretBackend for ContendedBackend {
    async fn get(&self, namespace: &str, name: &str) -> Result<SecretEntry, BackendError> {
        let mut entry = SecretEntry::single(namespace, name, "old-secret");
        entry.resource_version = Some("7".to_string());
        Ok(entry)
    }

    async fn create(&self, entry: &SecretEntry) -> Result<SecretEntry, BackendError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(entry.clone())
    }

    async fn update(&self, entry: &SecretEntry) -> Result<SecretEntry, BackendError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        *self.seen_version.lock().expect("lock not poisoned") = entry.resource_version.clone();
        Err(BackendError::Conflict {
            kind: ResourceKind::Secret,
            key: entry.key(),
            message: "the object has been modified".to_string(),
        })
    }

    async fn delete(&self, _namespace: &str, _name: &str) -> Result<(), BackendError> {
        Ok(())
    }
}

#[tokio::test]
async fn test_update_conflict_surfaces_without_retry() {
    let backend = Arc::new(ContendedBackend::default());
    let manager = SecretManager::new(
        Arc::clone(&backend) as Arc<dyn SecretBackend>,
        Arc::new(MemoryNamespaceBackend::new()),
    );
    let harness = Harness::with_manager(manager);
    let ctx = ApiContext::new();
    let stored = payload(json!({"name": "gh1", "id": "proj1:gh1", "clientSecret": "proj1:gh1-clientsecret"}));
    harness
        .delegate
        .create(&ctx, GITHUB_CONFIG, stored.clone())
        .await
        .expect("seed resource");

    let err = harness
        .store
        .update(
            &ctx,
            GITHUB_CONFIG,
            payload(json!({"name": "gh1", "id": "proj1:gh1", "clientSecret": "new-secret"})),
            "proj1:gh1",
        )
        .await
        .expect_err("another writer won");

    match err {
        Error::Backend(BackendError::Conflict { kind, key, .. }) => {
            assert_eq!(kind, ResourceKind::Secret);
            assert_eq!(key, "proj1/gh1-clientsecret");
        }
        other => panic!("Expected Conflict, got {other:?}"),
    }
    assert_eq!(backend.writes.load(Ordering::SeqCst), 1);
    assert_eq!(
        backend.seen_version.lock().expect("lock not poisoned").as_deref(),
        Some("7")
    );

    // The resource store still holds what was there before the update
    let raw = harness
        .delegate
        .raw(GITHUB_CONFIG, "proj1:gh1")
        .await
        .expect("resource kept");
    assert_eq!(raw, stored);
}

#[tokio::test]
async fn test_types_without_passwords_pass_through() {
    let harness = Harness::new();
    let ctx = ApiContext::new();
    let store = harness
        .store
        .clone()
        .with_delegate("plainConfig", Arc::new(harness.delegate.clone()));

    let created = store
        .create(&ctx, "plainConfig", payload(json!({"id": "x", "clientSecret": "visible"})))
        .await
        .expect("create succeeds");
    assert_eq!(created["clientSecret"], "visible");
    assert!(harness.secrets.is_empty().await);
}
