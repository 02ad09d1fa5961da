//! The shared-store contract.
//!
//! Connection pooling, TLS and reconnect backoff belong to the store
//! client implementing this trait, not to the engine.

use crate::StoreResult;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::mpsc;

/// Outcome of a version-guarded transactional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnReply {
    /// The write was applied.
    Committed,
    /// The entry changed since the watch; nothing was written.
    Aborted,
}

/// The stored type of a scalar entry, used by legacy migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    /// No entry at this key.
    Missing,
    /// A plain string entry (legacy flat format).
    String,
    /// A hash entry (current per-scope format).
    Hash,
    /// Some other store type.
    Other,
}

/// A key-value/pub-sub store with optimistic concurrency.
///
/// The contract mirrors watch + transactional-write stores: `watch`
/// samples an entry's version, and `commit` applies one field write
/// only if the entry is still at that version.
#[async_trait]
pub trait SharedStore: Send + Sync {
    /// Places an optimistic watch on an entry, returning its current
    /// version. Entries that do not exist yet report version 0.
    async fn watch(&self, key: &str) -> StoreResult<u64>;

    /// Reads one hash field.
    async fn hash_get(&self, key: &str, field: &str) -> StoreResult<Option<String>>;

    /// Reads all fields of a hash entry.
    async fn hash_get_all(&self, key: &str) -> StoreResult<BTreeMap<String, String>>;

    /// Version-guarded transactional write of one hash field:
    /// `Some(value)` sets the field, `None` deletes it. Reports
    /// [`TxnReply::Aborted`] when the watched version is stale.
    async fn commit(
        &self,
        key: &str,
        watched_version: u64,
        field: &str,
        value: Option<&str>,
    ) -> StoreResult<TxnReply>;

    /// Publishes a payload on a channel.
    async fn publish(&self, channel: &str, payload: &str) -> StoreResult<()>;

    /// Subscribes to a channel. Delivery is at-least-once and includes
    /// the subscriber's own publications.
    async fn subscribe(&self, channel: &str) -> StoreResult<mpsc::UnboundedReceiver<String>>;

    /// Reads a scalar entry (legacy flat format).
    async fn scalar_get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Writes a scalar entry.
    async fn scalar_set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Deletes a scalar entry.
    async fn scalar_delete(&self, key: &str) -> StoreResult<()>;

    /// Reports the stored type at a key.
    async fn scalar_kind(&self, key: &str) -> StoreResult<ScalarKind>;
}
