//! # Field Trees
//!
//! A field tree is a resource schema pruned down to the paths that lead to
//! password fields, either directly or through nested and array-typed
//! composite fields. Trees are built once per protected resource type and
//! shared read-only afterwards.

use crate::constants::PASSWORD_FIELD_TYPE;
use crate::error::{Error, Result};
use crate::schema::{Schema, SchemaRegistry};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// Password-bearing subset of a schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldTree {
    /// A password field
    Leaf,
    /// Child fields that lead to at least one password field.
    /// An empty composite is a pruned subtree.
    Composite(BTreeMap<String, FieldTree>),
}

impl FieldTree {
    /// Compress a schema into its password-bearing tree
    ///
    /// For every field, `array[T]` is unwrapped to `T`. If `T` is a type the
    /// registry knows, its tree is built recursively and kept when non-empty.
    /// Otherwise the field becomes a leaf when its own marker is `password`.
    /// Every other field is dropped.
    ///
    /// A field that leads back to a type already being expanded is dropped
    /// when that type carries no password fields. Otherwise the schema is
    /// rejected with `RecursiveSchema`: a finite tree cannot reach every
    /// password of an unbounded payload.
    pub fn build(schema: &Schema, registry: &dyn SchemaRegistry) -> Result<Self> {
        Self::build_inner(schema, registry, &mut Vec::new())
    }

    /// Build the tree of a registered resource type
    pub fn for_type(type_name: &str, registry: &dyn SchemaRegistry) -> Result<Self> {
        let schema = registry
            .lookup(type_name)
            .ok_or_else(|| Error::UnknownSchema(type_name.to_string()))?;
        let mut expanding = vec![type_name.to_string()];
        Self::build_inner(schema, registry, &mut expanding)
    }

    fn build_inner(
        schema: &Schema,
        registry: &dyn SchemaRegistry,
        expanding: &mut Vec<String>,
    ) -> Result<Self> {
        let mut children = BTreeMap::new();

        for (name, field) in &schema.fields {
            let field_type = field.field_type();
            let type_name = field_type.type_name();

            if let Some(child_schema) = registry.lookup(type_name) {
                if expanding.iter().any(|t| t == type_name) {
                    if carries_password(type_name, registry, &mut HashSet::new()) {
                        return Err(Error::RecursiveSchema {
                            type_name: type_name.to_string(),
                            field: name.clone(),
                        });
                    }
                    debug!(
                        "Schema cycle through '{}' at field '{}' holds no passwords, pruning",
                        type_name, name
                    );
                    continue;
                }
                expanding.push(type_name.to_string());
                let child = Self::build_inner(child_schema, registry, expanding);
                expanding.pop();
                let child = child?;
                if !child.is_empty() {
                    children.insert(name.clone(), child);
                }
            } else if field_type.is_password() {
                children.insert(name.clone(), FieldTree::Leaf);
            }
        }

        Ok(FieldTree::Composite(children))
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, FieldTree::Leaf)
    }

    /// True for a composite without children
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            FieldTree::Leaf => false,
            FieldTree::Composite(children) => children.is_empty(),
        }
    }

    /// Number of password leaves in the tree
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        match self {
            FieldTree::Leaf => 1,
            FieldTree::Composite(children) => children.values().map(FieldTree::leaf_count).sum(),
        }
    }
}

/// Whether `type_name`, or any type reachable from it, declares a password field
fn carries_password(
    type_name: &str,
    registry: &dyn SchemaRegistry,
    visited: &mut HashSet<String>,
) -> bool {
    if !visited.insert(type_name.to_string()) {
        return false;
    }
    let Some(schema) = registry.lookup(type_name) else {
        return false;
    };
    schema.fields.values().any(|field| {
        let field_type = field.field_type();
        let inner = field_type.type_name();
        if registry.lookup(inner).is_some() {
            carries_password(inner, registry, visited)
        } else {
            field_type.is_password()
        }
    })
}

impl Serialize for FieldTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldTree::Leaf => serializer.serialize_str(PASSWORD_FIELD_TYPE),
            FieldTree::Composite(children) => {
                let mut map = serializer.serialize_map(Some(children.len()))?;
                for (name, child) in children {
                    map.serialize_entry(name, child)?;
                }
                map.end()
            }
        }
    }
}

/// Field trees of every protected resource type
///
/// Built once at start-up and shared behind an `Arc`; it is never mutated
/// afterwards, so concurrent requests read it without locking.
#[derive(Debug, Clone, Default)]
pub struct FieldIndex {
    trees: HashMap<String, FieldTree>,
}

impl FieldIndex {
    /// Build trees for the given resource types
    ///
    /// Fails if a type has no schema in the registry.
    pub fn build<S: AsRef<str>>(registry: &dyn SchemaRegistry, types: &[S]) -> Result<Self> {
        let mut trees = HashMap::with_capacity(types.len());
        for type_name in types {
            let type_name = type_name.as_ref();
            let tree = FieldTree::for_type(type_name, registry)?;
            debug!(
                "Built field tree for '{}' with {} password field(s)",
                type_name,
                tree.leaf_count()
            );
            trees.insert(type_name.to_string(), tree);
        }
        Ok(Self { trees })
    }

    /// Build trees for every type the registry knows
    pub fn build_all(registry: &dyn SchemaRegistry) -> Result<Self> {
        Self::build(registry, &registry.types())
    }

    #[must_use]
    pub fn get(&self, type_name: &str) -> Option<&FieldTree> {
        self.trees.get(type_name)
    }

    /// Resource types with at least one password field, sorted
    #[must_use]
    pub fn protected_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self
            .trees
            .iter()
            .filter(|(_, tree)| !tree.is_empty())
            .map(|(name, _)| name.as_str())
            .collect();
        types.sort_unstable();
        types
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }
}
