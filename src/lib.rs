//! Password Store Library
//!
//! A store layer that keeps password fields of resource payloads out of the
//! resource store. Schemas declare which fields are passwords; on write their
//! values move into Kubernetes secrets and the payload keeps a
//! `namespace:name` reference, on read the reference is resolved back.
//! Tests are included in the module files and under `tests/`.
//!
//! ## Quick Start
//!
//! ```rust
//! use password_store::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

pub mod config;
pub mod constants;
pub mod error;
pub mod fields;
pub mod observability;
pub mod prelude;
pub mod reference;
pub mod schema;
pub mod secrets;
pub mod store;
