//! Canonical scope-key encoding.
//!
//! A non-empty scope map encodes as its `name::value` pairs, sorted by
//! dimension name and joined with `##`. The empty map encodes as the
//! ROOT sentinel, which can never collide with an encoded map because
//! encoded keys always contain `::`.

use crate::{ScopeError, ScopeResult};
use flagmesh_types::ScopeMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel key meaning "no scope restriction".
pub const ROOT_SCOPE_KEY: &str = "//";

/// Separator between a dimension name and its value.
pub const PAIR_SEPARATOR: &str = "::";

/// Separator between `name::value` pairs.
pub const OUTER_SEPARATOR: &str = "##";

/// Canonical string identifier for a scope map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeKey(String);

impl ScopeKey {
    /// The ROOT key.
    #[must_use]
    pub fn root() -> Self {
        Self(ROOT_SCOPE_KEY.to_string())
    }

    /// Whether this is the ROOT key.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0 == ROOT_SCOPE_KEY
    }

    /// Encodes a scope map into its canonical key.
    ///
    /// The empty map encodes as ROOT. Encoding is pure and
    /// deterministic: the map iterates its dimensions sorted.
    #[must_use]
    pub fn encode(map: &ScopeMap) -> Self {
        if map.is_empty() {
            return Self::root();
        }
        let key = map
            .iter()
            .map(|(name, value)| format!("{name}{PAIR_SEPARATOR}{value}"))
            .collect::<Vec<_>>()
            .join(OUTER_SEPARATOR);
        Self(key)
    }

    /// Wraps an already-encoded key, e.g. read back from the store.
    ///
    /// No shape check happens here; use [`ScopeKey::decode`] to verify.
    #[must_use]
    pub fn from_encoded(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Decodes back into a scope map.
    ///
    /// ROOT decodes to `Ok(None)` ("no scope"); a malformed key is an
    /// error.
    pub fn decode(&self) -> ScopeResult<Option<ScopeMap>> {
        if self.is_root() {
            return Ok(None);
        }
        let mut map = ScopeMap::new();
        for pair in self.0.split(OUTER_SEPARATOR) {
            let (name, value) = pair
                .split_once(PAIR_SEPARATOR)
                .ok_or_else(|| ScopeError::MalformedKey(self.0.clone()))?;
            if name.is_empty() || map.insert(name, value).is_some() {
                return Err(ScopeError::MalformedKey(self.0.clone()));
            }
        }
        Ok(Some(map))
    }

    /// Whether the key parses as ROOT or sorted pairs.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.decode().is_ok()
    }

    /// The encoded string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&ScopeMap> for ScopeKey {
    fn from(map: &ScopeMap) -> Self {
        Self::encode(map)
    }
}
