//! Error types for the stage configuration system

use thiserror::Error;

/// Main error type for the stage configuration system
#[derive(Error, Debug)]
pub enum StageError {
    /// Builder protocol misuse
    #[error("Builder error: {0}")]
    Build(#[from] BuildError),

    /// Configuration source loading errors
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// Debug rendering errors
    #[error("Render error: {0}")]
    Render(String),

    /// Typed extraction of a frozen snapshot failed
    #[error("Extraction error: {0}")]
    Extract(String),
}

/// Result type alias for stage operations
pub type Result<T> = std::result::Result<T, StageError>;

/// Factory protocol errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// A value was supplied before a key was selected
    #[error("No active key: select a key before supplying a value")]
    NoActiveKey,

    /// A value was supplied outside of any scope
    #[error("No active scope: enter a scope before supplying a value")]
    NoActiveScope,

    /// A group was requested while another group is still selected
    #[error("Group {requested} requested while group {current} is still selected")]
    GroupInProgress { current: String, requested: String },

    /// A key was requested before any group was selected
    #[error("Key {key} requested without a selected group")]
    NoActiveGroup { key: String },

    /// Scope nesting beyond the supported depth
    #[error("Scope nesting too deep: at most {max} nested scopes are supported")]
    ScopeTooDeep { max: usize },
}

/// Source loading errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// Dotted path did not resolve to anything
    #[error("Configuration source not found: {path}")]
    NotFound { path: String },

    /// A path source was given but no resolver is available
    #[error("No resolver available for path: {path}")]
    NoResolver { path: String },

    /// Path resolution kept yielding further paths
    #[error("Path resolution did not settle after {hops} hops starting at {path}")]
    ResolutionLoop { path: String, hops: usize },
}
