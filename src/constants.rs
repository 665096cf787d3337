//! # Constants
//!
//! Shared constants used throughout the password store.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Type marker that flags a schema field as a password
pub const PASSWORD_FIELD_TYPE: &str = "password";

/// Prefix of the array type marker (`array[<type>]`)
pub const ARRAY_TYPE_PREFIX: &str = "array[";

/// Namespace used for secrets when the resource id does not name one.
/// References into this namespace are never re-wrapped on write.
pub const DEFAULT_SECRET_NAMESPACE: &str = "mgmt-secrets";

/// Separator between namespace and name in a stored reference
pub const REFERENCE_SEPARATOR: char = ':';

/// Kubernetes secret type written for every secret entry
pub const SECRET_TYPE_OPAQUE: &str = "Opaque";

/// Payload attribute used as the secret name prefix
pub const NAME_ATTRIBUTE: &str = "name";

/// Payload attribute the secret namespace is derived from
pub const ID_ATTRIBUTE: &str = "id";

/// Default tracing filter when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "password_store=info";

/// Buffered events per watch channel in the in-memory store
pub const DEFAULT_WATCH_CHANNEL_CAPACITY: usize = 256;
