//! # Password Fields
//!
//! Locating password fields in resource payloads: [`tree`] compresses schemas
//! into field trees, [`walker`] matches those trees against payloads.

pub mod tree;
pub mod walker;

pub use tree::{FieldIndex, FieldTree};
pub use walker::{put_value, walk, Direction, FieldMatch, FieldPath};
