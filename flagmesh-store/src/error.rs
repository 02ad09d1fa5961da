//! Error types for the store layer.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store cannot be reached. The engine treats this as a cue to
    /// degrade to fallback-only operation, never as a crash.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// All compare-and-swap attempts lost the race.
    #[error("store contention: {attempts} compare-and-swap attempts exhausted for {key}/{field}")]
    Contention {
        /// The store entry key.
        key: String,
        /// The hash field within the entry.
        field: String,
        /// How many attempts were made.
        attempts: usize,
    },

    /// The store answered with a reply shape the protocol does not
    /// define. The CAS loop retries on this.
    #[error("unexpected store reply: {0}")]
    UnexpectedReply(String),

    /// A value could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The subscription channel was closed.
    #[error("subscription channel closed")]
    ChannelClosed,
}
