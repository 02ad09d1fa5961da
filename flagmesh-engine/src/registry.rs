//! Change-handler and validator registries.
//!
//! Handlers are an ordered multi-map: the same callback may be
//! registered several times for one key and is removed by identity.
//! Validators are registered by name before initialization; definitions
//! reference them by that name.

use async_trait::async_trait;
use flagmesh_types::{ChangeOptions, FlagValue, ScopeMap, ValidationError};
use std::collections::HashMap;
use std::sync::Arc;

/// A change delivered to registered handlers.
///
/// Old and new values are effective values computed by the resolver, so
/// after a reset the new value is the next-broader override or the
/// fallback, never the tombstone.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureChange {
    /// The feature key that changed.
    pub feature_key: String,
    /// Effective value after the change.
    pub new_value: Option<FlagValue>,
    /// Effective value before the change.
    pub old_value: Option<FlagValue>,
    /// The scope the change targeted.
    pub scope_map: Option<ScopeMap>,
    /// Options the change carried.
    pub options: Option<ChangeOptions>,
}

/// Callback invoked after a change entry is applied.
///
/// Handlers run isolated: a returned error or a panic is logged and
/// never reaches sibling handlers or the mutation caller.
#[async_trait]
pub trait ChangeHandler: Send + Sync {
    /// Reacts to one applied change.
    async fn on_change(&self, change: FeatureChange) -> anyhow::Result<()>;
}

/// Custom validator referenced from definition files by name.
///
/// Returns all violations it finds (empty = valid). A panicking
/// validator is isolated and reported as a synthetic error naming it.
#[async_trait]
pub trait FeatureValidator: Send + Sync {
    /// Validates one candidate value.
    async fn validate(
        &self,
        feature_key: String,
        value: FlagValue,
        scope_map: Option<ScopeMap>,
    ) -> Vec<ValidationError>;
}

/// Ordered multi-map of change handlers per feature key.
#[derive(Default)]
pub(crate) struct HandlerRegistry {
    handlers: HashMap<String, Vec<Arc<dyn ChangeHandler>>>,
}

impl HandlerRegistry {
    /// Appends a handler; duplicates are allowed and keep their order.
    pub fn register(&mut self, key: &str, handler: Arc<dyn ChangeHandler>) {
        self.handlers.entry(key.to_string()).or_default().push(handler);
    }

    /// Removes every registration of `handler` (by identity) for `key`.
    pub fn remove(&mut self, key: &str, handler: &Arc<dyn ChangeHandler>) {
        if let Some(list) = self.handlers.get_mut(key) {
            list.retain(|registered| !Arc::ptr_eq(registered, handler));
            if list.is_empty() {
                self.handlers.remove(key);
            }
        }
    }

    /// Handlers for a key, in registration order.
    pub fn handlers_for(&self, key: &str) -> Vec<Arc<dyn ChangeHandler>> {
        self.handlers.get(key).cloned().unwrap_or_default()
    }
}

/// Named validator registry.
#[derive(Default)]
pub(crate) struct ValidatorRegistry {
    validators: HashMap<String, Arc<dyn FeatureValidator>>,
}

impl ValidatorRegistry {
    /// Registers a validator under a name, replacing a previous one.
    pub fn register(&mut self, name: &str, validator: Arc<dyn FeatureValidator>) {
        self.validators.insert(name.to_string(), validator);
    }

    /// Removes a validator by name.
    pub fn remove(&mut self, name: &str) {
        self.validators.remove(name);
    }

    /// Looks up a validator by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn FeatureValidator>> {
        self.validators.get(name).cloned()
    }

    /// Whether a name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.validators.contains_key(name)
    }
}
