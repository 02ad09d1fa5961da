//! In-memory reference implementation of the shared-store contract.
//!
//! Used by tests and by single-process deployments that want the full
//! engine without an external store. Versioning matches the contract:
//! every applied write bumps the entry version, and `commit` aborts
//! when the watched version is stale.
//!
//! Fault-injection knobs support concurrency tests: interleaved writes
//! land right before a commit attempt (forcing a genuine lost race),
//! and the whole store can be switched unavailable.

use crate::{ScalarKind, SharedStore, StoreError, StoreResult, TxnReply};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;
use tokio::sync::mpsc;

#[derive(Default)]
struct Inner {
    hashes: HashMap<String, BTreeMap<String, String>>,
    scalars: HashMap<String, String>,
    versions: HashMap<String, u64>,
    unavailable: bool,
    // Competing writes applied just before the next commit attempts on
    // a (key, field), so the commit loses its race like it would
    // against a real concurrent writer.
    interleaved: HashMap<(String, String), VecDeque<Option<String>>>,
    // Number of upcoming commits that answer with a malformed reply.
    unexpected_replies: usize,
}

impl Inner {
    fn bump(&mut self, key: &str) {
        *self.versions.entry(key.to_string()).or_insert(0) += 1;
    }

    fn apply_field(&mut self, key: &str, field: &str, value: Option<&str>) {
        let hash = self.hashes.entry(key.to_string()).or_default();
        match value {
            Some(v) => {
                hash.insert(field.to_string(), v.to_string());
            }
            None => {
                hash.remove(field);
                if hash.is_empty() {
                    self.hashes.remove(key);
                }
            }
        }
        self.bump(key);
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable {
            Err(StoreError::Unavailable("memory store switched off".into()))
        } else {
            Ok(())
        }
    }
}

/// In-memory shared store with pub/sub and fault injection.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    subscribers: Mutex<HashMap<String, Vec<mpsc::UnboundedSender<String>>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Switches the store (un)available. While unavailable every
    /// operation returns [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.lock().unwrap().unavailable = unavailable;
    }

    /// Queues a competing write that lands right before the next commit
    /// attempt on `key`/`field`, making that attempt lose its race.
    pub fn interleave_write(&self, key: &str, field: &str, value: Option<&str>) {
        self.inner
            .lock()
            .unwrap()
            .interleaved
            .entry((key.to_string(), field.to_string()))
            .or_default()
            .push_back(value.map(str::to_string));
    }

    /// Makes the next `count` commits answer with a malformed reply
    /// shape instead of committing.
    pub fn inject_unexpected_replies(&self, count: usize) {
        self.inner.lock().unwrap().unexpected_replies = count;
    }

    /// Seeds a hash field directly, bypassing version checks.
    pub fn seed_hash(&self, key: &str, field: &str, value: &str) {
        self.inner.lock().unwrap().apply_field(key, field, Some(value));
    }

    /// Seeds a scalar entry directly (legacy-format fixture).
    pub fn seed_scalar(&self, key: &str, value: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.scalars.insert(key.to_string(), value.to_string());
        inner.bump(key);
    }

    /// Current version of an entry (0 when absent).
    #[must_use]
    pub fn version_of(&self, key: &str) -> u64 {
        self.inner.lock().unwrap().versions.get(key).copied().unwrap_or(0)
    }
}

#[async_trait]
impl SharedStore for MemoryStore {
    async fn watch(&self, key: &str) -> StoreResult<u64> {
        let inner = self.inner.lock().unwrap();
        inner.check_available()?;
        Ok(inner.versions.get(key).copied().unwrap_or(0))
    }

    async fn hash_get(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        let inner = self.inner.lock().unwrap();
        inner.check_available()?;
        Ok(inner
            .hashes
            .get(key)
            .and_then(|hash| hash.get(field))
            .cloned())
    }

    async fn hash_get_all(&self, key: &str) -> StoreResult<BTreeMap<String, String>> {
        let inner = self.inner.lock().unwrap();
        inner.check_available()?;
        Ok(inner.hashes.get(key).cloned().unwrap_or_default())
    }

    async fn commit(
        &self,
        key: &str,
        watched_version: u64,
        field: &str,
        value: Option<&str>,
    ) -> StoreResult<TxnReply> {
        let mut inner = self.inner.lock().unwrap();
        inner.check_available()?;

        if inner.unexpected_replies > 0 {
            inner.unexpected_replies -= 1;
            return Err(StoreError::UnexpectedReply("garbled transaction reply".into()));
        }

        let slot = (key.to_string(), field.to_string());
        let competing = inner
            .interleaved
            .get_mut(&slot)
            .and_then(VecDeque::pop_front);
        if let Some(competing_value) = competing {
            inner.apply_field(key, field, competing_value.as_deref());
        }

        let current = inner.versions.get(key).copied().unwrap_or(0);
        if current != watched_version {
            return Ok(TxnReply::Aborted);
        }

        inner.apply_field(key, field, value);
        Ok(TxnReply::Committed)
    }

    async fn publish(&self, channel: &str, payload: &str) -> StoreResult<()> {
        self.inner.lock().unwrap().check_available()?;
        let mut subscribers = self.subscribers.lock().unwrap();
        if let Some(senders) = subscribers.get_mut(channel) {
            senders.retain(|sender| sender.send(payload.to_string()).is_ok());
        }
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> StoreResult<mpsc::UnboundedReceiver<String>> {
        self.inner.lock().unwrap().check_available()?;
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap()
            .entry(channel.to_string())
            .or_default()
            .push(tx);
        Ok(rx)
    }

    async fn scalar_get(&self, key: &str) -> StoreResult<Option<String>> {
        let inner = self.inner.lock().unwrap();
        inner.check_available()?;
        Ok(inner.scalars.get(key).cloned())
    }

    async fn scalar_set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.check_available()?;
        inner.scalars.insert(key.to_string(), value.to_string());
        inner.bump(key);
        Ok(())
    }

    async fn scalar_delete(&self, key: &str) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.check_available()?;
        inner.scalars.remove(key);
        inner.bump(key);
        Ok(())
    }

    async fn scalar_kind(&self, key: &str) -> StoreResult<ScalarKind> {
        let inner = self.inner.lock().unwrap();
        inner.check_available()?;
        if inner.scalars.contains_key(key) {
            Ok(ScalarKind::String)
        } else if inner.hashes.contains_key(key) {
            Ok(ScalarKind::Hash)
        } else {
            Ok(ScalarKind::Missing)
        }
    }
}
