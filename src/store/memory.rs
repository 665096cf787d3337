//! # In-Memory Store
//!
//! Resource store held in process memory, keyed by (resource type, id).
//!
//! Writes are published on a broadcast channel so `watch` streams see every
//! create and update made after they subscribed. Slow watchers that fall
//! behind the channel capacity skip the missed events.

use super::{ApiContext, Payload, QueryOptions, StorageContext, Store};
use crate::constants::{DEFAULT_WATCH_CHANNEL_CAPACITY, ID_ATTRIBUTE};
use crate::error::{Error, Result};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, warn};

type ResourceKey = (String, String);

/// In-memory resource store
#[derive(Clone, Debug)]
pub struct MemoryStore {
    resources: Arc<RwLock<BTreeMap<ResourceKey, Payload>>>,
    events: broadcast::Sender<(String, Payload)>,
    context: StorageContext,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(DEFAULT_WATCH_CHANNEL_CAPACITY);
        Self {
            resources: Arc::new(RwLock::new(BTreeMap::new())),
            events,
            context: StorageContext::Management,
        }
    }

    #[must_use]
    pub fn with_context(mut self, context: StorageContext) -> Self {
        self.context = context;
        self
    }

    /// Raw stored payload, bypassing any wrapping store
    pub async fn raw(&self, resource_type: &str, id: &str) -> Option<Payload> {
        self.resources
            .read()
            .await
            .get(&(resource_type.to_string(), id.to_string()))
            .cloned()
    }

    /// Number of stored resources across all types
    pub async fn len(&self) -> usize {
        self.resources.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.resources.read().await.is_empty()
    }

    fn publish(&self, resource_type: &str, payload: &Payload) {
        // No receivers is fine
        let _ = self.events.send((resource_type.to_string(), payload.clone()));
    }
}

fn payload_id(payload: &Payload) -> Option<String> {
    match payload.get(ID_ATTRIBUTE) {
        Some(Value::String(id)) if !id.is_empty() => Some(id.clone()),
        _ => None,
    }
}

fn not_found(resource_type: &str, id: &str) -> Error {
    Error::ResourceNotFound {
        resource_type: resource_type.to_string(),
        id: id.to_string(),
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create(
        &self,
        ctx: &ApiContext,
        resource_type: &str,
        mut payload: Payload,
    ) -> Result<Payload> {
        let id = payload_id(&payload).unwrap_or_else(|| {
            let id = uuid::Uuid::new_v4().to_string();
            payload.insert(ID_ATTRIBUTE.to_string(), Value::String(id.clone()));
            id
        });

        let mut resources = self.resources.write().await;
        let key = (resource_type.to_string(), id.clone());
        if resources.contains_key(&key) {
            return Err(Error::Delegate(anyhow::anyhow!(
                "{resource_type} '{id}' already exists"
            )));
        }
        resources.insert(key, payload.clone());
        drop(resources);

        debug!(request_id = %ctx.request_id, "Created {} {}", resource_type, id);
        self.publish(resource_type, &payload);
        Ok(payload)
    }

    async fn update(
        &self,
        ctx: &ApiContext,
        resource_type: &str,
        mut payload: Payload,
        id: &str,
    ) -> Result<Payload> {
        payload.insert(ID_ATTRIBUTE.to_string(), Value::String(id.to_string()));

        let mut resources = self.resources.write().await;
        let Some(slot) = resources.get_mut(&(resource_type.to_string(), id.to_string())) else {
            return Err(not_found(resource_type, id));
        };
        *slot = payload.clone();
        drop(resources);

        debug!(request_id = %ctx.request_id, "Updated {} {}", resource_type, id);
        self.publish(resource_type, &payload);
        Ok(payload)
    }

    async fn by_id(&self, _ctx: &ApiContext, resource_type: &str, id: &str) -> Result<Payload> {
        self.raw(resource_type, id)
            .await
            .ok_or_else(|| not_found(resource_type, id))
    }

    async fn list(
        &self,
        _ctx: &ApiContext,
        resource_type: &str,
        query: &QueryOptions,
    ) -> Result<Vec<Payload>> {
        let resources = self.resources.read().await;
        let matching = resources
            .iter()
            .filter(|((kind, _), payload)| kind == resource_type && query.matches(payload))
            .map(|(_, payload)| payload.clone());

        Ok(match query.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        })
    }

    async fn delete(
        &self,
        ctx: &ApiContext,
        resource_type: &str,
        id: &str,
    ) -> Result<Option<Payload>> {
        let removed = self
            .resources
            .write()
            .await
            .remove(&(resource_type.to_string(), id.to_string()));
        if removed.is_some() {
            debug!(request_id = %ctx.request_id, "Deleted {} {}", resource_type, id);
        }
        Ok(removed)
    }

    async fn watch(
        &self,
        _ctx: &ApiContext,
        resource_type: &str,
        query: &QueryOptions,
    ) -> Result<BoxStream<'static, Payload>> {
        let receiver = self.events.subscribe();
        let resource_type = resource_type.to_string();
        let query = query.clone();
        let limit = query.limit;

        let events = stream::unfold(receiver, |mut receiver| async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => return Some((event, receiver)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Watcher fell behind, skipped {} events", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });

        let filtered = events.filter_map(move |(kind, payload)| {
            let keep = kind == resource_type && query.matches(&payload);
            async move { keep.then_some(payload) }
        });

        Ok(match limit {
            Some(limit) => filtered.take(limit).boxed(),
            None => filtered.boxed(),
        })
    }

    fn context(&self) -> StorageContext {
        self.context
    }
}
