//! Scope-key codec and superscope enumeration for flagmesh.
//!
//! A scope map narrows a feature value to a context (tenant, component,
//! …). This crate provides:
//! - the canonical string encoding between scope maps and scope keys
//! - the superscope enumerator: every ancestor scope key of a map in a
//!   fixed preference order, backed by a bounded cache
//!
//! Both are pure and deterministic; the enumerator's preference tables
//! are a compatibility contract pinned in tests, not a formula.

mod key;
mod superscope;

pub use key::{ScopeKey, OUTER_SEPARATOR, PAIR_SEPARATOR, ROOT_SCOPE_KEY};
pub use superscope::{SuperscopeEnumerator, MAX_SCOPE_DIMENSIONS, SUPERSCOPE_CACHE_CAPACITY};

/// Result type alias using the crate's error type.
pub type ScopeResult<T> = std::result::Result<T, ScopeError>;

/// Errors that can occur in scope-key operations.
#[derive(Debug, thiserror::Error)]
pub enum ScopeError {
    /// A scope key string does not parse as sorted `name::value` pairs.
    #[error("malformed scope key: {0}")]
    MalformedKey(String),
}
