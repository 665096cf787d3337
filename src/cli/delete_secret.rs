//! # Delete Secret Command
//!
//! Command to remove a single secret entry.

use anyhow::{Context, Result};
use password_store::prelude::*;

/// Delete `namespace/name`; an already missing entry still succeeds
pub async fn delete_secret_command(secrets: &SecretManager, namespace: &str, name: &str) -> Result<()> {
    secrets
        .delete(namespace, name)
        .await
        .with_context(|| format!("Failed to delete secret '{namespace}/{name}'"))?;

    println!("Secret '{namespace}/{name}' deleted");
    Ok(())
}
