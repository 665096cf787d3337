//! # Fields Command
//!
//! Command to show which fields of each resource type hold passwords.

use super::field_index;
use anyhow::{Context, Result};
use password_store::prelude::*;

/// Print the field tree of each protected type as JSON
pub fn fields_command(
    config: &StoreConfig,
    registry: &MemorySchemaRegistry,
    resource_type: Option<&str>,
) -> Result<()> {
    let index = field_index(config, registry)?;

    let types: Vec<&str> = match resource_type {
        Some(resource_type) => {
            if index.get(resource_type).is_none() {
                anyhow::bail!(
                    "Resource type '{resource_type}' is not protected. Protected types: {}",
                    index.protected_types().join(", ")
                );
            }
            vec![resource_type]
        }
        None => index.protected_types(),
    };

    if types.is_empty() {
        println!("No resource type declares a password field.");
        return Ok(());
    }

    for type_name in types {
        let Some(tree) = index.get(type_name) else {
            continue;
        };
        println!("{type_name} ({} password field(s)):", tree.leaf_count());
        println!(
            "{}",
            serde_json::to_string_pretty(tree).context("Failed to serialize field tree")?
        );
    }

    Ok(())
}
