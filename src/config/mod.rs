//! # Configuration
//!
//! Environment-driven settings for the password store and the `pwstore` binary.

mod store;

pub use store::StoreConfig;
