//! # Metrics
//!
//! Prometheus metrics for monitoring the password store.
//!
//! ## Metrics Exposed
//!
//! - `password_store_redactions_total` - Password fields replaced by a reference on write
//! - `password_store_resolutions_total` - References resolved back to plaintext on read
//! - `password_store_legacy_values_total` - Password values left as-is on read because they are not references
//! - `password_store_secret_operations_total` - Secret backend operations, by operation
//! - `password_store_secret_operation_duration_seconds` - Duration of secret backend operations, by operation
//! - `password_store_secret_operation_errors_total` - Failed secret backend operations, by operation

use anyhow::Result;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::{LazyLock, OnceLock};

// Metrics
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static REDACTIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "password_store_redactions_total",
        "Total number of password fields replaced by a secret reference",
    )
    .expect("Failed to create REDACTIONS_TOTAL metric - this should never happen")
});

static RESOLUTIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "password_store_resolutions_total",
        "Total number of secret references resolved back to plaintext",
    )
    .expect("Failed to create RESOLUTIONS_TOTAL metric - this should never happen")
});

static LEGACY_VALUES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "password_store_legacy_values_total",
        "Total number of password values returned unchanged because they are not references",
    )
    .expect("Failed to create LEGACY_VALUES_TOTAL metric - this should never happen")
});

static SECRET_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "password_store_secret_operations_total",
            "Total number of secret backend operations",
        ),
        &["operation"],
    )
    .expect("Failed to create SECRET_OPERATIONS_TOTAL metric - this should never happen")
});

static SECRET_OPERATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "password_store_secret_operation_duration_seconds",
            "Duration of secret backend operations in seconds",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0]),
        &["operation"],
    )
    .expect("Failed to create SECRET_OPERATION_DURATION metric - this should never happen")
});

static SECRET_OPERATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "password_store_secret_operation_errors_total",
            "Total number of failed secret backend operations",
        ),
        &["operation"],
    )
    .expect("Failed to create SECRET_OPERATION_ERRORS_TOTAL metric - this should never happen")
});

static REGISTRATION: OnceLock<Result<(), String>> = OnceLock::new();

/// Register every metric with the registry
///
/// Only the first call registers. Every later call returns the outcome of
/// that first attempt, failures included.
pub fn register_metrics() -> Result<()> {
    register_once(&REGISTRATION, register_all)
}

fn register_once(
    outcome: &OnceLock<Result<(), String>>,
    register: impl FnOnce() -> Result<()>,
) -> Result<()> {
    outcome
        .get_or_init(|| register().map_err(|e| format!("{e:#}")))
        .clone()
        .map_err(anyhow::Error::msg)
}

fn register_all() -> Result<()> {
    REGISTRY.register(Box::new(REDACTIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RESOLUTIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(LEGACY_VALUES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SECRET_OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SECRET_OPERATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(SECRET_OPERATION_ERRORS_TOTAL.clone()))?;
    Ok(())
}

/// Render the registry in the Prometheus text format
pub fn gather_metrics() -> Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

pub fn increment_redactions() {
    REDACTIONS_TOTAL.inc();
}

pub fn increment_resolutions() {
    RESOLUTIONS_TOTAL.inc();
}

pub fn increment_legacy_values() {
    LEGACY_VALUES_TOTAL.inc();
}

/// Record a completed secret backend operation
pub fn record_secret_operation(operation: &str, duration: f64) {
    SECRET_OPERATIONS_TOTAL
        .with_label_values(&[operation])
        .inc();
    SECRET_OPERATION_DURATION
        .with_label_values(&[operation])
        .observe(duration);
}

/// Increment secret operation errors counter
pub fn increment_secret_operation_errors(operation: &str) {
    SECRET_OPERATION_ERRORS_TOTAL
        .with_label_values(&[operation])
        .inc();
}
