//! # Resource Stores
//!
//! The capability set every resource store offers, and the two implementations
//! shipped with the crate:
//! - [`memory::MemoryStore`]: in-process store, used as the delegate in tests and tooling
//! - [`password::PasswordStore`]: facade that moves password fields into the secret backend

use crate::error::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub mod memory;
pub mod password;

pub use memory::MemoryStore;
pub use password::PasswordStore;

/// A resource payload: a JSON object keyed by field name
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Per-call context handed to every store operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiContext {
    /// Correlates log lines emitted while serving one call
    pub request_id: String,
}

impl ApiContext {
    #[must_use]
    pub fn new() -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn with_request_id(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
        }
    }
}

impl Default for ApiContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Query for `list` and `watch`
///
/// `filters` are exact matches on top-level string fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub filters: BTreeMap<String, String>,
    pub limit: Option<usize>,
}

impl QueryOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(field.into(), value.into());
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether `payload` satisfies every filter
    #[must_use]
    pub fn matches(&self, payload: &Payload) -> bool {
        self.filters.iter().all(|(field, expected)| {
            payload
                .get(field)
                .and_then(serde_json::Value::as_str)
                .is_some_and(|actual| actual == expected)
        })
    }
}

/// Storage scope a store serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageContext {
    /// Cluster-wide management data
    #[default]
    Management,
    /// Data scoped to a single project
    Project,
}

impl StorageContext {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageContext::Management => "management",
            StorageContext::Project => "project",
        }
    }
}

impl fmt::Display for StorageContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageContext {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "management" | "mgmt" => Ok(StorageContext::Management),
            "project" => Ok(StorageContext::Project),
            other => Err(format!("unknown storage context '{other}'")),
        }
    }
}

/// Generic resource store
///
/// Every operation names the resource type it acts on. Implementations that
/// only serve one type may ignore it.
#[async_trait]
pub trait Store: Send + Sync {
    /// Persist a new resource and return it as stored
    async fn create(&self, ctx: &ApiContext, resource_type: &str, payload: Payload)
        -> Result<Payload>;

    /// Replace the resource `id` and return it as stored
    async fn update(
        &self,
        ctx: &ApiContext,
        resource_type: &str,
        payload: Payload,
        id: &str,
    ) -> Result<Payload>;

    /// Fetch one resource; `ResourceNotFound` if absent
    async fn by_id(&self, ctx: &ApiContext, resource_type: &str, id: &str) -> Result<Payload>;

    async fn list(
        &self,
        ctx: &ApiContext,
        resource_type: &str,
        query: &QueryOptions,
    ) -> Result<Vec<Payload>>;

    /// Remove a resource, returning it if it existed
    async fn delete(&self, ctx: &ApiContext, resource_type: &str, id: &str)
        -> Result<Option<Payload>>;

    /// Stream of resources written after the call, filtered by `query`
    async fn watch(
        &self,
        ctx: &ApiContext,
        resource_type: &str,
        query: &QueryOptions,
    ) -> Result<BoxStream<'static, Payload>>;

    fn context(&self) -> StorageContext;
}
