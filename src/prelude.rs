//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ## Usage
//!
//! ```rust
//! use password_store::prelude::*;
//! ```

// Store capability set and the redaction facade
pub use crate::store::{
    ApiContext, MemoryStore, PasswordStore, Payload, QueryOptions, StorageContext, Store,
};

// Schemas and the password field index built from them
pub use crate::fields::{FieldIndex, FieldTree};
pub use crate::schema::{MemorySchemaRegistry, Schema, SchemaRegistry};

// Secret backends
pub use crate::secrets::{
    KubeNamespaceBackend, KubeSecretBackend, MemoryNamespaceBackend, MemorySecretBackend,
    NamespaceBackend, SecretBackend, SecretEntry, SecretManager, UpsertOutcome,
};

pub use crate::reference::{MalformedReference, Reference};

// Config and observability
pub use crate::config::StoreConfig;
pub use crate::observability::logging::init_tracing;
pub use crate::observability::metrics::{gather_metrics, register_metrics};

// Common error types
pub use crate::error::{BackendError, Error, ResourceKind};
