//! Error types for the engine.
//!
//! The taxonomy follows the propagation policy: configuration problems
//! abort initialization, validation failures are data (never `Err`),
//! store contention is surfaced to the mutation caller, and store
//! unavailability degrades operation instead of failing it.

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur in engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Bad or colliding definitions; fatal at initialization.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The engine has not completed initialization.
    #[error("engine is not initialized")]
    NotInitialized,

    /// A concurrent initialization is already running.
    #[error("engine initialization is already in progress")]
    AlreadyInitializing,

    /// The engine is already initialized; reconstruct to reset.
    #[error("engine is already initialized")]
    AlreadyInitialized,

    /// Store-level failure. Normal mutation callers only ever see the
    /// contention variant; unavailability is handled by degrading.
    #[error(transparent)]
    Store(#[from] flagmesh_store::StoreError),
}
