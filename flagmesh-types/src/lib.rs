//! Core type definitions for flagmesh.
//!
//! This crate defines the fundamental, transport-agnostic types used
//! throughout the engine:
//! - Scalar flag values and their type tags
//! - Scope maps (dimension → value contexts)
//! - Feature definitions and their validation rules
//! - Change entries (the unit of propagation)
//! - Structured validation errors with positional message templates
//!
//! Store clients, resolution logic and the engine itself live in their
//! respective crates, not here.

mod change;
mod definition;
mod scope;
mod validation;
mod value;

pub use change::{ChangeEntry, ChangeOptions};
pub use definition::{
    CollisionPolicy, DefinitionSpec, FeatureDefinition, SourceTier, ValidationRule,
};
pub use scope::ScopeMap;
pub use validation::ValidationError;
pub use value::{FlagType, FlagValue};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("scope map is not a plain map of string values: {0}")]
    InvalidScopeMap(String),

    #[error("invalid flag type name: {0}")]
    InvalidFlagType(String),
}
