//! # Password Store
//!
//! A [`Store`] facade that keeps password fields out of the resource store.
//!
//! On `create` and `update` every non-empty password field is written to the
//! secret backend and replaced in the payload by a `namespace:name` reference.
//! On `by_id` the references are resolved back to plaintext. `list`, `delete`
//! and `watch` pass through untouched, so their payloads carry references.
//!
//! Secret coordinates come from the payload:
//! - name: `<name attribute or resource type>-<password field name>`, plus
//!   `-<index>` for each array element the field sits in
//! - namespace: first part of a `project:resource` id, the id itself if it has
//!   no colon, otherwise the default namespace
//!
//! A value that already references a secret of the same field at another
//! array position (after a List, reorder and Update) is moved: the secret it
//! names is read and written under the field's current name.
//!
//! A failed redaction aborts the write before the delegate is called.
//! Secrets already written for earlier fields of the same payload stay in the
//! backend and are reused on retry.

use super::{ApiContext, Payload, QueryOptions, StorageContext, Store};
use crate::config::StoreConfig;
use crate::constants::{DEFAULT_SECRET_NAMESPACE, ID_ATTRIBUTE, NAME_ATTRIBUTE, REFERENCE_SEPARATOR};
use crate::error::{Error, Result};
use crate::fields::{put_value, walk, Direction, FieldIndex, FieldMatch, FieldTree};
use crate::observability::metrics;
use crate::reference::{self, Reference};
use crate::secrets::SecretManager;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info_span, Instrument};

/// Store facade that moves password fields into the secret backend
#[derive(Clone)]
pub struct PasswordStore {
    fields: Arc<FieldIndex>,
    secrets: SecretManager,
    delegates: HashMap<String, Arc<dyn Store>>,
    default_namespace: String,
    context: StorageContext,
}

impl std::fmt::Debug for PasswordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<&String> = self.delegates.keys().collect();
        types.sort_unstable();
        f.debug_struct("PasswordStore")
            .field("delegates", &types)
            .field("default_namespace", &self.default_namespace)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl PasswordStore {
    pub fn new(fields: Arc<FieldIndex>, secrets: SecretManager) -> Self {
        Self {
            fields,
            secrets,
            delegates: HashMap::new(),
            default_namespace: DEFAULT_SECRET_NAMESPACE.to_string(),
            context: StorageContext::default(),
        }
    }

    /// Facade with namespace and storage context taken from `config`
    pub fn from_config(config: &StoreConfig, fields: Arc<FieldIndex>, secrets: SecretManager) -> Self {
        Self::new(fields, secrets)
            .with_default_namespace(config.default_namespace.clone())
            .with_storage_context(config.storage_context)
    }

    /// Route `resource_type` to `delegate`
    #[must_use]
    pub fn with_delegate(mut self, resource_type: impl Into<String>, delegate: Arc<dyn Store>) -> Self {
        self.delegates.insert(resource_type.into(), delegate);
        self
    }

    /// Route every protected type of the field index to `delegate`
    #[must_use]
    pub fn with_shared_delegate(mut self, delegate: Arc<dyn Store>) -> Self {
        let types: Vec<String> = self
            .fields
            .protected_types()
            .into_iter()
            .map(str::to_string)
            .collect();
        for resource_type in types {
            self.delegates.insert(resource_type, Arc::clone(&delegate));
        }
        self
    }

    #[must_use]
    pub fn with_default_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.default_namespace = namespace.into();
        self
    }

    #[must_use]
    pub fn with_storage_context(mut self, context: StorageContext) -> Self {
        self.context = context;
        self
    }

    pub fn secrets(&self) -> &SecretManager {
        &self.secrets
    }

    fn delegate(&self, resource_type: &str) -> Result<&Arc<dyn Store>> {
        self.delegates
            .get(resource_type)
            .ok_or_else(|| Error::UnknownResourceType(resource_type.to_string()))
    }

    fn tree(&self, resource_type: &str) -> Option<&FieldTree> {
        self.fields.get(resource_type).filter(|tree| !tree.is_empty())
    }

    /// Move every password value of `payload` into the secret backend
    ///
    /// Returns the number of fields rewritten. Stops at the first failure.
    pub async fn redact_passwords(&self, resource_type: &str, payload: &mut Payload) -> Result<usize> {
        let Some(tree) = self.tree(resource_type) else {
            return Ok(0);
        };

        let found = walk(
            tree,
            payload,
            Direction::Redact {
                reserved_namespace: &self.default_namespace,
            },
        );
        let namespace = self.secret_namespace(payload);
        let base = secret_base(resource_type, payload).to_string();

        // Every plaintext is settled before the first write, so a reference
        // moved to another array position still reads the secret it named.
        let mut pending = Vec::new();
        for field in found {
            if field.value.is_empty() {
                continue;
            }
            let name = secret_name(resource_type, payload, &field);
            let encoded = reference::encode(&namespace, &name);
            if field.value == encoded {
                debug!("Field {} already references its secret", field.path.join("."));
                continue;
            }

            let plaintext = match sibling_reference(&field.value, &namespace, &base, field.field_name()) {
                Some(target) => {
                    debug!(
                        "Field {} carries reference {}, moving it to {}",
                        field.path.join("."),
                        field.value,
                        encoded
                    );
                    self.secrets.get(&target.namespace, &target.name).await?
                }
                None => field.value.clone(),
            };
            pending.push((field, name, encoded, plaintext));
        }

        let mut rewritten = 0;
        for (field, name, encoded, plaintext) in pending {
            self.secrets
                .create_or_update(&plaintext, &name, &namespace)
                .await?;
            put_value(payload, &field, encoded);
            metrics::increment_redactions();
            rewritten += 1;
        }

        Ok(rewritten)
    }

    /// Replace every reference in `payload` with the plaintext it points to
    ///
    /// Values that are not `namespace:name` references are left as they are.
    /// Returns the number of fields resolved.
    pub async fn resolve_passwords(&self, resource_type: &str, payload: &mut Payload) -> Result<usize> {
        let Some(tree) = self.tree(resource_type) else {
            return Ok(0);
        };

        let mut resolved = 0;
        for field in walk(tree, payload, Direction::Resolve) {
            let target = match reference::decode(&field.value) {
                Ok(target) => target,
                Err(malformed) => {
                    debug!("Leaving {} as stored: {}", field.path.join("."), malformed);
                    metrics::increment_legacy_values();
                    continue;
                }
            };

            let plaintext = self.secrets.get(&target.namespace, &target.name).await?;
            put_value(payload, &field, plaintext);
            metrics::increment_resolutions();
            resolved += 1;
        }

        Ok(resolved)
    }

    /// Namespace the secrets of `payload` are written to
    pub fn secret_namespace(&self, payload: &Payload) -> String {
        let id = payload
            .get(ID_ATTRIBUTE)
            .and_then(Value::as_str)
            .unwrap_or_default();

        let mut parts = id.split(REFERENCE_SEPARATOR);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(project), Some(_), None) if !project.is_empty() => project.to_string(),
            (Some(single), None, None) if !single.is_empty() => single.to_string(),
            _ => self.default_namespace.clone(),
        }
    }
}

/// Name attribute of the payload, or the resource type when it has none
fn secret_base<'a>(resource_type: &'a str, payload: &'a Payload) -> &'a str {
    payload
        .get(NAME_ATTRIBUTE)
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .unwrap_or(resource_type)
}

/// Secret name for one password field, before lowercasing
fn secret_name(resource_type: &str, payload: &Payload, field: &FieldMatch) -> String {
    let mut name = format!("{}-{}", secret_base(resource_type, payload), field.field_name());
    for index in &field.elements {
        name.push('-');
        name.push_str(&index.to_string());
    }
    name
}

/// Reference to a secret this facade wrote for the same field of the same
/// resource, at any array position
///
/// Matches `<namespace>:<base>-<field>` followed by zero or more `-<index>`
/// segments. Such a value is a stored reference that moved, not plaintext.
fn sibling_reference(value: &str, namespace: &str, base: &str, field: &str) -> Option<Reference> {
    let target = reference::decode(value).ok()?;
    if target.namespace != namespace {
        return None;
    }

    let stem = format!("{base}-{field}").to_lowercase();
    let indices = target.name.to_lowercase().strip_prefix(&stem)?.to_string();
    let positional = indices.is_empty()
        || indices.strip_prefix('-').is_some_and(|rest| {
            rest.split('-')
                .all(|index| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()))
        });
    positional.then_some(target)
}

#[async_trait]
impl Store for PasswordStore {
    async fn create(
        &self,
        ctx: &ApiContext,
        resource_type: &str,
        mut payload: Payload,
    ) -> Result<Payload> {
        let delegate = self.delegate(resource_type)?;
        let span = info_span!("password_store.create", request_id = %ctx.request_id, resource_type);

        async move {
            self.redact_passwords(resource_type, &mut payload).await?;
            delegate.create(ctx, resource_type, payload).await
        }
        .instrument(span)
        .await
    }

    async fn update(
        &self,
        ctx: &ApiContext,
        resource_type: &str,
        mut payload: Payload,
        id: &str,
    ) -> Result<Payload> {
        let delegate = self.delegate(resource_type)?;
        let span = info_span!("password_store.update", request_id = %ctx.request_id, resource_type, id);

        async move {
            self.redact_passwords(resource_type, &mut payload).await?;
            delegate.update(ctx, resource_type, payload, id).await
        }
        .instrument(span)
        .await
    }

    async fn by_id(&self, ctx: &ApiContext, resource_type: &str, id: &str) -> Result<Payload> {
        let delegate = self.delegate(resource_type)?;
        let span = info_span!("password_store.by_id", request_id = %ctx.request_id, resource_type, id);

        async move {
            let mut payload = delegate.by_id(ctx, resource_type, id).await?;
            self.resolve_passwords(resource_type, &mut payload).await?;
            Ok(payload)
        }
        .instrument(span)
        .await
    }

    async fn list(
        &self,
        ctx: &ApiContext,
        resource_type: &str,
        query: &QueryOptions,
    ) -> Result<Vec<Payload>> {
        self.delegate(resource_type)?
            .list(ctx, resource_type, query)
            .await
    }

    async fn delete(
        &self,
        ctx: &ApiContext,
        resource_type: &str,
        id: &str,
    ) -> Result<Option<Payload>> {
        self.delegate(resource_type)?
            .delete(ctx, resource_type, id)
            .await
    }

    async fn watch(
        &self,
        ctx: &ApiContext,
        resource_type: &str,
        query: &QueryOptions,
    ) -> Result<BoxStream<'static, Payload>> {
        self.delegate(resource_type)?
            .watch(ctx, resource_type, query)
            .await
    }

    fn context(&self) -> StorageContext {
        self.context
    }
}
