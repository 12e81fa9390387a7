//! Configuration model for socklock.
//!
//! This module defines the Config struct that an optional `socklock.yaml`
//! deserializes into. It supports forward-compatible YAML parsing (unknown
//! fields are ignored), sensible defaults for every field, and validation of
//! config values.

mod model;
mod operations;
pub mod types;


// Re-export public API
pub use model::Config;
pub use operations::CONFIG_ENV_VAR;
