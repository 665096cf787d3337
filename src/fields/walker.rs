//! # Field Walker
//!
//! Matches a [`FieldTree`] against a resource payload and collects the values
//! found at password leaves.
//!
//! The walk follows only keys present in both the tree and the payload, in key
//! order. Nested objects extend the path by their key. Arrays of objects are
//! walked element by element with the same path: the recorded [`FieldPath`]
//! carries no array index, so every element of one array field shares it.
//! The element indices are kept separately in [`FieldMatch::elements`] so the
//! value can be written back to the element it came from.
//!
//! Password values are text. A number or bool at a leaf is read through its
//! string form and written back as a string, so after a round trip through
//! the secret backend `42` comes back as `"42"`. `null` reads as an empty
//! value. Objects and arrays at a leaf are not password values.

use super::tree::FieldTree;
use crate::constants::REFERENCE_SEPARATOR;
use crate::store::Payload;
use serde_json::Value;
use tracing::debug;

/// Field names from the payload root to a password leaf
pub type FieldPath = Vec<String>;

/// Why the payload is being walked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction<'a> {
    /// Collect plaintext to move into the secret backend.
    /// Values that already reference the reserved namespace are skipped.
    Redact { reserved_namespace: &'a str },
    /// Collect references to resolve back to plaintext
    Resolve,
}

/// A value found at a password leaf
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMatch {
    pub path: FieldPath,
    /// Index of the element taken in each array crossed on the way down
    pub elements: Vec<usize>,
    pub value: String,
}

impl FieldMatch {
    /// Last path segment, the password field's own name
    #[must_use]
    pub fn field_name(&self) -> &str {
        self.path.last().map_or("", String::as_str)
    }
}

/// Collect every password value present in `payload`
#[must_use]
pub fn walk(tree: &FieldTree, payload: &Payload, direction: Direction<'_>) -> Vec<FieldMatch> {
    let mut matches = Vec::new();
    if let FieldTree::Composite(children) = tree {
        let mut path = Vec::new();
        let mut elements = Vec::new();
        walk_object(children, payload, direction, &mut path, &mut elements, &mut matches);
    }
    matches
}

fn walk_object(
    children: &std::collections::BTreeMap<String, FieldTree>,
    object: &Payload,
    direction: Direction<'_>,
    path: &mut Vec<String>,
    elements: &mut Vec<usize>,
    matches: &mut Vec<FieldMatch>,
) {
    for (key, child) in children {
        let Some(value) = object.get(key) else {
            continue;
        };
        path.push(key.clone());

        match (child, value) {
            (FieldTree::Leaf, value) => {
                if let Some(text) = leaf_text(value) {
                    if already_redacted(&text, direction) {
                        debug!("Value at {} already references the reserved namespace, skipping", path.join("."));
                    } else {
                        matches.push(FieldMatch {
                            path: path.clone(),
                            elements: elements.clone(),
                            value: text,
                        });
                    }
                }
            }
            (FieldTree::Composite(grandchildren), Value::Object(nested)) => {
                walk_object(grandchildren, nested, direction, path, elements, matches);
            }
            (FieldTree::Composite(grandchildren), Value::Array(items)) => {
                for (index, item) in items.iter().enumerate() {
                    if let Value::Object(nested) = item {
                        elements.push(index);
                        walk_object(grandchildren, nested, direction, path, elements, matches);
                        elements.pop();
                    }
                }
            }
            (FieldTree::Composite(_), _) => {}
        }

        path.pop();
    }
}

/// String form of a leaf value
///
/// Scalars are stringified; the original JSON type is not kept.
fn leaf_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn already_redacted(value: &str, direction: Direction<'_>) -> bool {
    match direction {
        Direction::Redact { reserved_namespace } => value
            .split_once(REFERENCE_SEPARATOR)
            .is_some_and(|(namespace, _)| namespace == reserved_namespace),
        Direction::Resolve => false,
    }
}

/// Overwrite the value a match was read from
///
/// Returns false when the payload no longer has the shape the match was taken
/// from (a missing key, a non-object, or an out-of-range array element).
pub fn put_value(payload: &mut Payload, found: &FieldMatch, value: impl Into<Value>) -> bool {
    put_at(payload, &found.path, &found.elements, value.into())
}

fn put_at(object: &mut Payload, path: &[String], elements: &[usize], value: Value) -> bool {
    let Some((key, rest)) = path.split_first() else {
        return false;
    };
    if rest.is_empty() {
        object.insert(key.clone(), value);
        return true;
    }

    match object.get_mut(key) {
        Some(Value::Object(nested)) => put_at(nested, rest, elements, value),
        Some(Value::Array(items)) => {
            let Some((index, remaining)) = elements.split_first() else {
                return false;
            };
            match items.get_mut(*index) {
                Some(Value::Object(nested)) => put_at(nested, rest, remaining, value),
                _ => false,
            }
        }
        _ => false,
    }
}
