//! Local scoped-value state and effective-value resolution.
//!
//! The local state mirrors the validated contents of the shared store:
//! one scoped-value table per feature key, mapping encoded scope keys
//! (including ROOT) to values. Inbound change entries are applied here
//! directly — the originating instance already committed the store
//! write — and application is idempotent ("set field to X"), never a
//! delta, so duplicated or reordered delivery is harmless.

use flagmesh_scope::{ScopeKey, SuperscopeEnumerator, OUTER_SEPARATOR, ROOT_SCOPE_KEY};
use flagmesh_types::{FeatureDefinition, FlagValue, ScopeMap};
use std::collections::{BTreeMap, HashMap};

/// A per-key table of scoped values, keyed by encoded scope key.
pub type ScopedValues = BTreeMap<String, FlagValue>;

/// In-memory mirror of the distributed scoped-value tables.
#[derive(Debug, Default)]
pub(crate) struct LocalState {
    tables: HashMap<String, ScopedValues>,
}

impl LocalState {
    /// The table for a feature key, if any entry exists.
    pub fn table(&self, feature_key: &str) -> Option<&ScopedValues> {
        self.tables.get(feature_key)
    }

    /// Applies one change in place. A table left empty is dropped.
    pub fn apply(
        &mut self,
        feature_key: &str,
        scope_key: &ScopeKey,
        new_value: Option<&FlagValue>,
        clear_sub_scopes: bool,
    ) {
        let table = self.tables.entry(feature_key.to_string()).or_default();
        apply_to_table(table, scope_key, new_value, clear_sub_scopes);
        if table.is_empty() {
            self.tables.remove(feature_key);
        }
    }

    /// Replaces the table for one key (`None` removes it).
    pub fn replace_table(&mut self, feature_key: &str, table: Option<ScopedValues>) {
        match table {
            Some(t) if !t.is_empty() => {
                self.tables.insert(feature_key.to_string(), t);
            }
            _ => {
                self.tables.remove(feature_key);
            }
        }
    }

    /// A deep copy of all tables (for snapshots).
    pub fn snapshot(&self) -> HashMap<String, ScopedValues> {
        self.tables.clone()
    }
}

/// Applies one change entry to a scoped-value table.
///
/// A tombstone deletes exactly the target scope key; with
/// `clear_sub_scopes` every stored key that is a subset match of the
/// target is removed first. Subset matching deliberately uses substring
/// containment on the encoded key — a stored key matches when it
/// contains every `name::value` pair of the target — because that is
/// the externally observable behavior other instances rely on.
pub(crate) fn apply_to_table(
    table: &mut ScopedValues,
    scope_key: &ScopeKey,
    new_value: Option<&FlagValue>,
    clear_sub_scopes: bool,
) {
    match new_value {
        Some(value) => {
            table.insert(scope_key.as_str().to_string(), value.clone());
        }
        None => {
            if clear_sub_scopes {
                let target_pairs: Vec<&str> = if scope_key.is_root() {
                    Vec::new()
                } else {
                    scope_key.as_str().split(OUTER_SEPARATOR).collect()
                };
                // Zero pairs (root target) match everything.
                table.retain(|stored, _| !target_pairs.iter().all(|pair| stored.contains(pair)));
            }
            table.remove(scope_key.as_str());
        }
    }
}

/// Resolves the effective value of a key in a scope.
///
/// Falls through scoped override → superscope overrides (in enumerator
/// preference order) → root override → fallback. Inactive keys are
/// frozen to their fallback. Keys without a local definition resolve to
/// their stored values only (no fallback exists).
pub(crate) fn resolve(
    definition: Option<&FeatureDefinition>,
    table: Option<&ScopedValues>,
    enumerator: &SuperscopeEnumerator,
    scope_map: Option<&ScopeMap>,
) -> Option<FlagValue> {
    let fallback = definition.map(|d| d.fallback_value.clone());

    if let Some(def) = definition {
        if !def.active {
            return fallback;
        }
    }

    let Some(table) = table else {
        return fallback;
    };

    let root_value = table.get(ROOT_SCOPE_KEY).cloned().or(fallback);

    let Some(scope_map) = scope_map else {
        return root_value;
    };

    for scope_key in enumerator.superscope_keys(scope_map).iter() {
        if let Some(value) = table.get(scope_key.as_str()) {
            return Some(value.clone());
        }
    }

    root_value
}
