//! Shared-store contract and compare-and-swap primitive for flagmesh.
//!
//! The engine does not talk to any concrete store. It consumes the
//! [`SharedStore`] trait: hash fields with an optimistic watch and a
//! version-guarded transactional write, publish/subscribe by channel
//! name, and scalar operations for legacy-format migration. Any store
//! with versioned writes or conditional puts can implement it.
//!
//! [`cas_update`] is the sole cross-process mutual-exclusion primitive:
//! a bounded-retry optimistic compare-and-swap loop over one hash
//! field, with a no-op short-circuit that never issues a transaction.
//!
//! [`MemoryStore`] is a reference implementation used in tests and in
//! single-process deployments; it is not a network client.

mod cas;
mod error;
mod memory;
mod store;

pub use cas::{cas_update, CasOutcome, DEFAULT_CAS_ATTEMPTS};
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use store::{ScalarKind, SharedStore, TxnReply};
