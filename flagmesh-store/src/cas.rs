//! Bounded-retry optimistic compare-and-swap over one hash field.
//!
//! This is the only inter-process mutual exclusion in the system. No
//! lock is ever held across more than one store round trip: each
//! attempt is watch → read → compute → guarded write, and a lost race
//! simply retries with the fresh value.

use crate::{SharedStore, StoreError, StoreResult, TxnReply};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

/// Default number of CAS attempts before giving up.
pub const DEFAULT_CAS_ATTEMPTS: usize = 10;

/// Result of a [`cas_update`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum CasOutcome<T> {
    /// The computed value serialized identically to the stored one;
    /// no transaction was issued.
    Unchanged(Option<T>),
    /// The write committed. `None` means the field was deleted.
    Written(Option<T>),
}

impl<T> CasOutcome<T> {
    /// Whether a write was actually committed.
    #[must_use]
    pub fn was_written(&self) -> bool {
        matches!(self, Self::Written(_))
    }

    /// The resulting field value either way.
    #[must_use]
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Unchanged(v) | Self::Written(v) => v,
        }
    }
}

/// Atomically updates one hash field through `update_fn`.
///
/// Each attempt reads the latest stored value, parses it (an
/// unparseable raw value is logged and treated as absent so it can be
/// overwritten), and feeds it to `update_fn`. Returning `None` deletes
/// the field. A result that serializes identically to the stored raw
/// value short-circuits without issuing a transaction. Aborted
/// transactions and unexpected reply shapes retry from the watch;
/// exhausting `attempts` raises [`StoreError::Contention`].
pub async fn cas_update<T, F>(
    store: &dyn SharedStore,
    key: &str,
    field: &str,
    mut update_fn: F,
    attempts: usize,
) -> StoreResult<CasOutcome<T>>
where
    T: Serialize + DeserializeOwned,
    F: FnMut(Option<T>) -> Option<T>,
{
    for attempt in 1..=attempts {
        let version = store.watch(key).await?;
        let raw = store.hash_get(key, field).await?;

        let old: Option<T> = match raw.as_deref() {
            None => None,
            Some(s) => match serde_json::from_str(s) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(key, field, error = %e, "discarding unparseable stored value");
                    None
                }
            },
        };

        let new = update_fn(old);
        let new_raw = match &new {
            Some(value) => Some(serde_json::to_string(value)?),
            None => None,
        };

        if new_raw == raw {
            return Ok(CasOutcome::Unchanged(new));
        }

        match store.commit(key, version, field, new_raw.as_deref()).await {
            Ok(TxnReply::Committed) => return Ok(CasOutcome::Written(new)),
            Ok(TxnReply::Aborted) => {
                debug!(key, field, attempt, "lost compare-and-swap race, retrying");
            }
            Err(StoreError::UnexpectedReply(reply)) => {
                warn!(key, field, attempt, reply, "unexpected store reply, retrying");
            }
            Err(e) => return Err(e),
        }
    }

    Err(StoreError::Contention {
        key: key.to_string(),
        field: field.to_string(),
        attempts,
    })
}
