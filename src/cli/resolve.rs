//! # Resolve Command
//!
//! Command to resolve secret references in a stored payload.

use super::{print_payload, read_payload};
use anyhow::{Context, Result};
use password_store::prelude::*;
use std::path::Path;

pub async fn resolve_command(store: &PasswordStore, resource_type: &str, file: &Path) -> Result<()> {
    let mut payload = read_payload(file)?;

    let resolved = store
        .resolve_passwords(resource_type, &mut payload)
        .await
        .with_context(|| format!("Failed to resolve {resource_type} payload"))?;

    eprintln!("Resolved {resolved} password field(s)");
    print_payload(&payload)
}
