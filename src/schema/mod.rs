//! # Schemas
//!
//! Resource schemas as supplied by the schema registry: per resource type, a
//! mapping of field name to a type marker. Markers are either scalar names
//! (including the literal `password`), the name of another resource type, or
//! `array[<marker>]`.
//!
//! Schemas can be loaded from YAML or JSON documents shaped as
//! `type -> field -> marker`, where a field is either the bare marker string or
//! an object with a `type` key:
//!
//! ```yaml
//! githubConfig:
//!   hostname: string
//!   clientSecret: password
//!   auth: basicAuth
//! basicAuth:
//!   username: string
//!   password:
//!     type: password
//! ```

use crate::constants::{ARRAY_TYPE_PREFIX, PASSWORD_FIELD_TYPE};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Parsed field type marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// The literal `password` marker
    Password,
    /// `array[<inner>]`
    Array(Box<FieldType>),
    /// Any other marker: a composite if the registry knows it, a scalar otherwise
    Named(String),
}

impl FieldType {
    /// Parse a raw type marker
    #[must_use]
    pub fn parse(marker: &str) -> Self {
        let marker = marker.trim();
        if let Some(inner) = marker
            .strip_prefix(ARRAY_TYPE_PREFIX)
            .and_then(|rest| rest.strip_suffix(']'))
        {
            return FieldType::Array(Box::new(FieldType::parse(inner)));
        }
        if marker == PASSWORD_FIELD_TYPE {
            FieldType::Password
        } else {
            FieldType::Named(marker.to_string())
        }
    }

    /// Element type with every array layer removed
    #[must_use]
    pub fn element(&self) -> &FieldType {
        match self {
            FieldType::Array(inner) => inner.element(),
            other => other,
        }
    }

    /// Type name to look up in the registry, after unwrapping arrays
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            FieldType::Password => PASSWORD_FIELD_TYPE,
            FieldType::Named(name) => name,
            FieldType::Array(inner) => inner.type_name(),
        }
    }

    #[must_use]
    pub fn is_password(&self) -> bool {
        matches!(self, FieldType::Password)
    }
}

/// A single field declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "FieldDeclaration", into = "FieldDeclaration")]
pub struct ResourceField {
    /// Raw type marker as declared
    pub marker: String,
}

impl ResourceField {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    #[must_use]
    pub fn field_type(&self) -> FieldType {
        FieldType::parse(&self.marker)
    }
}

/// Accepted spellings of a field declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum FieldDeclaration {
    Marker(String),
    Full {
        #[serde(rename = "type")]
        marker: String,
    },
}

impl From<FieldDeclaration> for ResourceField {
    fn from(declaration: FieldDeclaration) -> Self {
        match declaration {
            FieldDeclaration::Marker(marker) | FieldDeclaration::Full { marker } => {
                ResourceField { marker }
            }
        }
    }
}

impl From<ResourceField> for FieldDeclaration {
    fn from(field: ResourceField) -> Self {
        FieldDeclaration::Marker(field.marker)
    }
}

/// Field declarations of one resource type, keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    pub fields: BTreeMap<String, ResourceField>,
}

impl Schema {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field, builder style
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, marker: impl Into<String>) -> Self {
        self.fields.insert(name.into(), ResourceField::new(marker));
        self
    }
}

/// Source of schema metadata
pub trait SchemaRegistry: Send + Sync {
    /// Schema registered for a resource type
    fn lookup(&self, type_name: &str) -> Option<&Schema>;

    /// Every registered resource type
    fn types(&self) -> Vec<String>;
}

/// Schema registry held in memory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemorySchemaRegistry {
    schemas: BTreeMap<String, Schema>,
}

impl MemorySchemaRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema, builder style
    #[must_use]
    pub fn with_schema(mut self, type_name: impl Into<String>, schema: Schema) -> Self {
        self.insert(type_name, schema);
        self
    }

    pub fn insert(&mut self, type_name: impl Into<String>, schema: Schema) {
        self.schemas.insert(type_name.into(), schema);
    }

    /// Parse a YAML (or JSON, which is valid YAML) schema document
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse schema document")
    }

    /// Load a schema document from disk
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read schema file {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid schema file {}", path.display()))
    }
}

impl SchemaRegistry for MemorySchemaRegistry {
    fn lookup(&self, type_name: &str) -> Option<&Schema> {
        self.schemas.get(type_name)
    }

    fn types(&self) -> Vec<String> {
        self.schemas.keys().cloned().collect()
    }
}
