//! Change entries — the unit of propagation and of local mutation.
//!
//! Entries travel between instances as a JSON array on the change
//! channel. `newValue: null` is the tombstone meaning "remove this
//! override", so that field is always serialized, never skipped.
//!
//! The scope map stays untyped JSON on the wire: each entry is decoded
//! independently and a non-string scope entry must surface as a
//! validation error, not as a deserialization failure that would drop
//! the whole entry.

use crate::FlagValue;
use serde::{Deserialize, Serialize};

/// Options modifying how a change entry is applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeOptions {
    /// On a tombstone, also remove every stored scope key containing
    /// all of the target's dimension:value pairs.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub clear_sub_scopes: bool,
    /// Permit operating on a key absent from local configuration.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub remote_only: bool,
}

impl ChangeOptions {
    /// Whether all options are at their defaults.
    #[must_use]
    pub fn is_default(&self) -> bool {
        !self.clear_sub_scopes && !self.remote_only
    }
}

/// One propagated change: set or clear a scoped value for a key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEntry {
    /// The feature key being changed.
    pub feature_key: String,
    /// The new value, or `None` for the tombstone.
    pub new_value: Option<FlagValue>,
    /// Target scope as untyped JSON (validated downstream).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_map: Option<serde_json::Value>,
    /// Application options.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<ChangeOptions>,
}

impl ChangeEntry {
    /// Creates an entry setting `new_value` at the root scope.
    #[must_use]
    pub fn new(feature_key: impl Into<String>, new_value: Option<FlagValue>) -> Self {
        Self {
            feature_key: feature_key.into(),
            new_value,
            scope_map: None,
            options: None,
        }
    }

    /// Targets a specific scope.
    #[must_use]
    pub fn with_scope_map(mut self, scope_map: &crate::ScopeMap) -> Self {
        self.scope_map = Some(serde_json::to_value(scope_map).unwrap_or_default());
        self
    }

    /// Attaches options.
    #[must_use]
    pub fn with_options(mut self, options: ChangeOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Whether this entry is a tombstone (override removal).
    #[must_use]
    pub fn is_tombstone(&self) -> bool {
        self.new_value.is_none()
    }
}
