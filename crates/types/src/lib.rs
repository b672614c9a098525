//! Shared types for the stage configuration system
//!
//! This crate holds the nested value model, the canonicalization rules and
//! the error types used by the builders and the configuration manager.

pub mod error;
pub mod utils;

// Re-export commonly used types
pub use error::{BuildError, LoadError, Result, StageError};
pub use figment::value::{Dict, Value};
pub use utils::{canonical_key, canonical_text, canonicalize, is_reserved};
