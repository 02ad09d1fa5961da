//! Scope maps — dimension → value contexts that narrow a feature value.
//!
//! A scope map is canonical by construction: dimensions are kept in a
//! sorted map, so two maps built in different insertion orders are
//! identical. Wire input arrives as untyped JSON and is converted either
//! strictly (validation path, reports errors) or lossily (resolution
//! path, silently drops non-string entries).

use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::BTreeMap;

/// A mapping from scope dimension name to string value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeMap(BTreeMap<String, String>);

impl ScopeMap {
    /// Creates an empty scope map.
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Inserts a dimension, returning the previous value if present.
    pub fn insert(&mut self, dimension: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(dimension.into(), value.into())
    }

    /// Returns the value for a dimension.
    #[must_use]
    pub fn get(&self, dimension: &str) -> Option<&str> {
        self.0.get(dimension).map(String::as_str)
    }

    /// Number of dimensions in the map.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map has no dimensions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates dimensions in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Dimension names in sorted order.
    pub fn dimensions(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Strict conversion from untyped JSON: the value must be an object
    /// whose values are all strings.
    pub fn from_value(value: &serde_json::Value) -> crate::Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| crate::Error::InvalidScopeMap(value.to_string()))?;
        let mut map = BTreeMap::new();
        for (k, v) in obj {
            match v.as_str() {
                Some(s) => {
                    map.insert(k.clone(), s.to_string());
                }
                None => return Err(crate::Error::InvalidScopeMap(format!("{k}: {v}"))),
            }
        }
        Ok(Self(map))
    }

    /// Lossy conversion from untyped JSON: non-string entries are
    /// silently dropped, non-objects become the empty map.
    #[must_use]
    pub fn sanitize(value: &serde_json::Value) -> Self {
        let mut map = BTreeMap::new();
        if let Some(obj) = value.as_object() {
            for (k, v) in obj {
                if let Some(s) = v.as_str() {
                    map.insert(k.clone(), s.to_string());
                }
            }
        }
        Self(map)
    }

    /// Canonical serialization of the map, used as a cache key.
    #[must_use]
    pub fn canonical_string(&self) -> String {
        // BTreeMap keys are sorted, so this is deterministic.
        serde_json::to_string(&self.0).unwrap_or_default()
    }
}

impl From<BTreeMap<String, String>> for ScopeMap {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ScopeMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl IntoIterator for ScopeMap {
    type Item = (String, String);
    type IntoIter = btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
