//! # References
//!
//! Once a password has been moved into the secret backend, the payload keeps a
//! reference to it of the form `namespace:name`. Secret names are lowercase;
//! namespaces are kept as given.

use crate::constants::REFERENCE_SEPARATOR;
use std::fmt;
use thiserror::Error;

/// Location of a secret entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    pub namespace: String,
    pub name: String,
}

/// A value that is not a two-part `namespace:name` reference
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{0}' is not a namespace:name reference")]
pub struct MalformedReference(pub String);

impl Reference {
    /// Reference to `name` (lowercased) in `namespace`
    pub fn new(namespace: impl Into<String>, name: &str) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.to_lowercase(),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.namespace, REFERENCE_SEPARATOR, self.name)
    }
}

impl std::str::FromStr for Reference {
    type Err = MalformedReference;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode(s)
    }
}

/// Encode a secret location as stored in the payload
#[must_use]
pub fn encode(namespace: &str, name: &str) -> String {
    Reference::new(namespace, name).to_string()
}

/// Split a stored value on its first colon
///
/// Only the first colon separates; anything after it belongs to the name.
/// Both parts must be non-empty.
pub fn decode(value: &str) -> Result<Reference, MalformedReference> {
    match value.split_once(REFERENCE_SEPARATOR) {
        Some((namespace, name)) if !namespace.is_empty() && !name.is_empty() => Ok(Reference {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }),
        _ => Err(MalformedReference(value.to_string())),
    }
}
