//! # Store Configuration
//!
//! Process-level settings loaded from environment variables.

use crate::constants::{DEFAULT_LOG_FILTER, DEFAULT_SECRET_NAMESPACE};
use crate::store::StorageContext;

/// Password store configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Namespace used when a resource id does not name one.
    /// Also the namespace whose references are never re-wrapped on write.
    pub default_namespace: String,
    /// Storage scope reported by the facade
    pub storage_context: StorageContext,
    /// Resource types whose password fields are redacted
    /// Empty means every type known to the schema registry
    pub protected_types: Vec<String>,
    /// Tracing filter used when `RUST_LOG` is not set
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: String,
    /// Enable color in text format logs
    pub log_enable_color: bool,
    /// Enable metrics collection
    pub enable_metrics: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_namespace: DEFAULT_SECRET_NAMESPACE.to_string(),
            storage_context: StorageContext::Management,
            protected_types: Vec::new(),
            log_level: DEFAULT_LOG_FILTER.to_string(),
            log_format: "text".to_string(),
            log_enable_color: true,
            enable_metrics: true,
        }
    }
}

impl StoreConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            default_namespace: env_var_or_default_str(
                "PASSWORD_STORE_DEFAULT_NAMESPACE",
                DEFAULT_SECRET_NAMESPACE,
            ),
            storage_context: env_var_or_default(
                "PASSWORD_STORE_CONTEXT",
                StorageContext::Management,
            ),
            protected_types: env_var_list("PASSWORD_STORE_PROTECTED_TYPES"),
            log_level: env_var_or_default_str("LOG_LEVEL", DEFAULT_LOG_FILTER),
            log_format: env_var_or_default_str("LOG_FORMAT", "text"),
            log_enable_color: env_var_or_default_bool("LOG_ENABLE_COLOR", true),
            enable_metrics: env_var_or_default_bool("ENABLE_METRICS", true),
        }
    }

    /// Whether logs should be emitted as JSON lines
    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}

/// Read environment variable or return default value
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read environment variable as boolean or return default
fn env_var_or_default_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| parse_bool(&v))
        .unwrap_or(default)
}

/// Read environment variable as string or return default
fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read a comma-separated environment variable, skipping blank entries
fn env_var_list(key: &str) -> Vec<String> {
    std::env::var(key)
        .map(|v| parse_list(&v))
        .unwrap_or_default()
}

fn parse_bool(value: &str) -> bool {
    let v_lower = value.to_lowercase();
    v_lower == "true" || v_lower == "1" || v_lower == "yes" || v_lower == "on"
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}
