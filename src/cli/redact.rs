//! # Redact Command
//!
//! Command to move the password fields of a payload into Kubernetes secrets.

use super::{print_payload, read_payload};
use anyhow::{Context, Result};
use password_store::prelude::*;
use std::path::Path;

/// Redact the payload in `file` and print it with references in place
pub async fn redact_command(store: &PasswordStore, resource_type: &str, file: &Path) -> Result<()> {
    let mut payload = read_payload(file)?;

    let rewritten = store
        .redact_passwords(resource_type, &mut payload)
        .await
        .with_context(|| format!("Failed to redact {resource_type} payload"))?;

    eprintln!("Redacted {rewritten} password field(s)");
    print_payload(&payload)
}
