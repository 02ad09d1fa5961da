//! Superscope enumeration.
//!
//! For a scope map with N dimensions, every non-empty dimension subset
//! yields an ancestor ("superscope") key. Resolution walks these keys
//! in a fixed preference order: decreasing subset size, same-size
//! subsets in lexicographic index order over the sorted dimension list,
//! the full key always first.
//!
//! The per-N orders below are literal tables, not a generated formula —
//! they are a compatibility contract with every other instance reading
//! the same store, and are pinned as sequences in the test suite.
//!
//! Enumeration is 2^N − 1 work and recurs on hot read paths, so results
//! are cached keyed by the canonical serialization of the map, in a
//! bounded FIFO cache that evicts the oldest entry past capacity.

use crate::ScopeKey;
use flagmesh_types::ScopeMap;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tracing::error;

/// Hard cap on scope dimensions for enumeration.
pub const MAX_SCOPE_DIMENSIONS: usize = 4;

/// Default capacity of the enumeration cache.
pub const SUPERSCOPE_CACHE_CAPACITY: usize = 1000;

/// Preference order for 1 dimension: index subsets into the sorted
/// dimension list.
const ORDER_1: &[&[usize]] = &[&[0]];

/// Preference order for 2 dimensions.
const ORDER_2: &[&[usize]] = &[&[0, 1], &[0], &[1]];

/// Preference order for 3 dimensions.
const ORDER_3: &[&[usize]] = &[
    &[0, 1, 2],
    &[0, 1],
    &[0, 2],
    &[1, 2],
    &[0],
    &[1],
    &[2],
];

/// Preference order for 4 dimensions.
const ORDER_4: &[&[usize]] = &[
    &[0, 1, 2, 3],
    &[0, 1, 2],
    &[0, 1, 3],
    &[0, 2, 3],
    &[1, 2, 3],
    &[0, 1],
    &[0, 2],
    &[0, 3],
    &[1, 2],
    &[1, 3],
    &[2, 3],
    &[0],
    &[1],
    &[2],
    &[3],
];

fn order_for(dimension_count: usize) -> &'static [&'static [usize]] {
    match dimension_count {
        1 => ORDER_1,
        2 => ORDER_2,
        3 => ORDER_3,
        4 => ORDER_4,
        _ => &[],
    }
}

/// Computes superscope key sequences, with a bounded FIFO cache.
#[derive(Debug)]
pub struct SuperscopeEnumerator {
    cache: Mutex<FifoCache>,
}

impl SuperscopeEnumerator {
    /// Creates an enumerator with the given cache capacity.
    #[must_use]
    pub fn new(cache_capacity: usize) -> Self {
        Self {
            cache: Mutex::new(FifoCache::new(cache_capacity)),
        }
    }

    /// Returns the ancestor scope keys of `map` in preference order.
    ///
    /// Exactly 2^N − 1 keys for 1 ≤ N ≤ 4; the empty map yields an
    /// empty sequence. More than [`MAX_SCOPE_DIMENSIONS`] dimensions
    /// logs one error and yields an empty sequence, forcing resolution
    /// to fall back to ROOT.
    pub fn superscope_keys(&self, map: &ScopeMap) -> Arc<Vec<ScopeKey>> {
        if map.len() > MAX_SCOPE_DIMENSIONS {
            error!(
                dimensions = map.len(),
                max = MAX_SCOPE_DIMENSIONS,
                "scope map exceeds the dimension cap, resolving at root only"
            );
            return Arc::new(Vec::new());
        }
        if map.is_empty() {
            return Arc::new(Vec::new());
        }

        let cache_key = map.canonical_string();
        if let Some(keys) = self.cache.lock().unwrap().get(&cache_key) {
            return keys;
        }

        let keys = Arc::new(enumerate(map));
        self.cache.lock().unwrap().insert(cache_key, keys.clone());
        keys
    }

    /// Current number of cached sequences.
    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.cache.lock().unwrap().len()
    }
}

impl Default for SuperscopeEnumerator {
    fn default() -> Self {
        Self::new(SUPERSCOPE_CACHE_CAPACITY)
    }
}

fn enumerate(map: &ScopeMap) -> Vec<ScopeKey> {
    // Pairs arrive sorted by dimension name; subsets keep that order,
    // so joining selected pairs directly produces canonical keys.
    let pairs: Vec<String> = map
        .iter()
        .map(|(name, value)| format!("{name}{}{value}", crate::PAIR_SEPARATOR))
        .collect();

    order_for(pairs.len())
        .iter()
        .map(|subset| {
            let key = subset
                .iter()
                .map(|&i| pairs[i].as_str())
                .collect::<Vec<_>>()
                .join(crate::OUTER_SEPARATOR);
            ScopeKey::from_encoded(key)
        })
        .collect()
}

/// Bounded insert-order cache: once full, the oldest entry is evicted.
#[derive(Debug)]
struct FifoCache {
    capacity: usize,
    entries: HashMap<String, Arc<Vec<ScopeKey>>>,
    order: VecDeque<String>,
}

impl FifoCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn get(&self, key: &str) -> Option<Arc<Vec<ScopeKey>>> {
        self.entries.get(key).cloned()
    }

    fn insert(&mut self, key: String, value: Arc<Vec<ScopeKey>>) {
        if self.entries.insert(key.clone(), value).is_none() {
            self.order.push_back(key);
            if self.order.len() > self.capacity {
                if let Some(oldest) = self.order.pop_front() {
                    self.entries.remove(&oldest);
                }
            }
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
