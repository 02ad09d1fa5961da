//! The validation pipeline.
//!
//! Every value entering the engine — local mutation, inbound change
//! entry, fallback at initialization — passes through one ordered,
//! short-circuiting pipeline. Steps 1–9 stop at the first violation;
//! step 10 runs all registered custom validators concurrently and
//! collects errors from every one of them, isolating a panicking
//! validator into a synthetic error naming it.
//!
//! Validation failures are data (`ValidationError`), never `Err`:
//! runtime change validation returns them to the caller, fallback
//! validation at initialization logs them as warnings and never aborts
//! startup.

use crate::registry::ValidatorRegistry;
use crate::{EngineError, EngineResult};
use flagmesh_scope::ScopeKey;
use flagmesh_types::{FeatureDefinition, FlagValue, ScopeMap, ValidationError};
use regex_lite::Regex;
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

/// Localization-neutral message templates with positional parameters.
pub mod messages {
    /// The engine has not been initialized.
    pub const NOT_INITIALIZED: &str = "feature toggles are not initialized";
    /// The feature key is not part of the configuration.
    pub const KEY_INVALID: &str = "feature key is not valid";
    /// A remote-only change targeted a locally configured key.
    pub const REMOTE_ONLY_ON_LOCAL_KEY: &str =
        "remote-only change is not allowed for a feature key in local configuration";
    /// The scope map is not a plain string-valued mapping.
    pub const SCOPE_MAP_INVALID: &str = "scope map must be a plain map of string values";
    /// A scope dimension is outside the key's whitelist.
    pub const SCOPE_NOT_ALLOWED: &str =
        "scope dimension \"{0}\" is not allowed, must be one of {1}";
    /// The derived scope key does not round-trip.
    pub const SCOPE_KEY_INVALID: &str = "scope key \"{0}\" is not well-formed";
    /// A tombstone outside change mode.
    pub const NULL_VALUE: &str = "null value is only allowed when removing an override";
    /// The key is configured inactive.
    pub const KEY_INACTIVE: &str = "feature key is not active";
    /// The app-URL gate rejected this instance.
    pub const APP_URL_MISMATCH: &str =
        "feature key is not enabled for app url \"{0}\", requires match of \"{1}\"";
    /// The value's type differs from the configured type.
    pub const WRONG_TYPE: &str = "value \"{0}\" has invalid type {1}, must be {2}";
    /// A configured regex rejected the value.
    pub const REGEX_MISMATCH: &str =
        "value \"{0}\" does not match validation regular expression {1}";
    /// A registered validator failed or panicked.
    pub const VALIDATOR_FAILED: &str = "registered validator \"{0}\" failed with: {1}";
}

/// Regexes and gates compiled once at initialization.
#[derive(Debug, Default)]
pub(crate) struct CompiledRules {
    regexes: HashMap<String, Vec<(String, Regex)>>,
    app_gates: HashMap<String, Regex>,
}

impl CompiledRules {
    /// Compiles all patterns and checks validator references.
    ///
    /// Bad patterns and references to unregistered validators are
    /// configuration errors, fatal at initialization.
    pub fn compile(
        definitions: &BTreeMap<String, FeatureDefinition>,
        validators: &ValidatorRegistry,
    ) -> EngineResult<Self> {
        let mut compiled = Self::default();
        for (key, def) in definitions {
            for pattern in def.regexes() {
                let regex = Regex::new(pattern).map_err(|e| {
                    EngineError::Configuration(format!(
                        "invalid validation regex {pattern:?} for feature key {key}: {e}"
                    ))
                })?;
                compiled
                    .regexes
                    .entry(key.clone())
                    .or_default()
                    .push((pattern.to_string(), regex));
            }
            if let Some(pattern) = &def.app_url {
                let regex = Regex::new(pattern).map_err(|e| {
                    EngineError::Configuration(format!(
                        "invalid app-URL gate {pattern:?} for feature key {key}: {e}"
                    ))
                })?;
                compiled.app_gates.insert(key.clone(), regex);
            }
            for name in def.validator_names() {
                if !validators.contains(name) {
                    return Err(EngineError::Configuration(format!(
                        "feature key {key} references unregistered validator {name:?}"
                    )));
                }
            }
        }
        Ok(compiled)
    }

    fn regexes_for(&self, key: &str) -> &[(String, Regex)] {
        self.regexes.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    fn app_gate(&self, key: &str) -> Option<&Regex> {
        self.app_gates.get(key)
    }
}

/// The scope input of a validation request: typed from the public API,
/// raw JSON from an inbound change entry.
pub(crate) enum ScopeInput<'a> {
    Typed(&'a ScopeMap),
    Raw(&'a serde_json::Value),
}

/// One request to the pipeline.
pub(crate) struct ChangeCheck<'a> {
    pub feature_key: &'a str,
    pub value: Option<&'a FlagValue>,
    pub scope: Option<ScopeInput<'a>>,
    /// Change mode permits tombstones; initialization mode does not.
    pub is_change: bool,
    /// The key is expected to be absent from local configuration.
    pub remote_only: bool,
    /// Fallback validation during initialization bypasses the
    /// initialized gate and the active/app-URL step.
    pub during_init: bool,
}

/// Runs the pipeline.
///
/// Returns the strictly converted scope map (for downstream
/// application) and the collected errors; an empty vector means valid.
pub(crate) async fn validate(
    initialized: bool,
    app_url: Option<&str>,
    definitions: &BTreeMap<String, FeatureDefinition>,
    compiled: &CompiledRules,
    validators: &ValidatorRegistry,
    check: ChangeCheck<'_>,
) -> (Option<ScopeMap>, Vec<ValidationError>) {
    let key = check.feature_key;
    let fail = |err: ValidationError| (None, vec![err]);

    // 1. Engine must be initialized (unless validating at init).
    if !initialized && !check.during_init {
        return fail(ValidationError::new(key, messages::NOT_INITIALIZED));
    }

    // 2./3. Key existence vs. remote-only expectation.
    let definition = definitions.get(key);
    if check.remote_only {
        if definition.is_some() {
            return fail(ValidationError::new(key, messages::REMOTE_ONLY_ON_LOCAL_KEY));
        }
    } else if definition.is_none() {
        return fail(ValidationError::new(key, messages::KEY_INVALID));
    }

    // 4. Scope map shape and dimension whitelist.
    let scope_map = match &check.scope {
        None => None,
        Some(ScopeInput::Typed(map)) => Some((*map).clone()),
        Some(ScopeInput::Raw(value)) => match ScopeMap::from_value(value) {
            Ok(map) => Some(map),
            Err(_) => return fail(ValidationError::new(key, messages::SCOPE_MAP_INVALID)),
        },
    };
    let scope_key = scope_map.as_ref().map(ScopeKey::encode);

    if let (Some(map), Some(def)) = (&scope_map, definition) {
        if let Some(allowed) = def.allowed_scopes() {
            for dimension in map.dimensions() {
                if !allowed.contains(&dimension) {
                    let err = ValidationError::new(key, messages::SCOPE_NOT_ALLOWED)
                        .with_values(vec![json!(dimension), json!(allowed.join(", "))])
                        .with_scope_key(scope_key.as_ref().map(|k| k.as_str()).unwrap_or_default());
                    return fail(err);
                }
            }
        }
    }

    // 5. Scope key shape: the encoded key must round-trip to the map.
    if let (Some(map), Some(sk)) = (&scope_map, &scope_key) {
        if sk.decode().ok().flatten().as_ref() != Some(map) {
            let err = ValidationError::new(key, messages::SCOPE_KEY_INVALID)
                .with_values(vec![json!(sk.as_str())]);
            return fail(err);
        }
    }

    // 6. Tombstones only in change mode.
    if check.value.is_none() && !check.is_change {
        return fail(ValidationError::new(key, messages::NULL_VALUE));
    }

    // 7. Active flag and app-URL gate, once initialized. This also
    // covers tombstones: an inactive key ignores removals too.
    if !check.during_init {
        if let Some(def) = definition {
            if !def.active {
                return fail(ValidationError::new(key, messages::KEY_INACTIVE));
            }
            if let Some(gate) = compiled.app_gate(key) {
                let url = app_url.unwrap_or_default();
                if !gate.is_match(url) {
                    let err = ValidationError::new(key, messages::APP_URL_MISMATCH)
                        .with_values(vec![json!(url), json!(gate.as_str())]);
                    return fail(err);
                }
            }
        }
    }

    // Value checks below only apply to actual values.
    let Some(value) = check.value else {
        return (scope_map, Vec::new());
    };

    // 8. Configured type.
    if let Some(def) = definition {
        if !value.has_type(def.flag_type) {
            let err = ValidationError::new(key, messages::WRONG_TYPE).with_values(vec![
                json!(value.to_string()),
                json!(value.flag_type().name()),
                json!(def.flag_type.name()),
            ]);
            return fail(err);
        }
    }

    // 9. Configured regexes (report the first failing one).
    if definition.is_some() {
        let rendered = value.to_string();
        for (pattern, regex) in compiled.regexes_for(key) {
            if !regex.is_match(&rendered) {
                let err = ValidationError::new(key, messages::REGEX_MISMATCH)
                    .with_values(vec![json!(rendered), json!(pattern)]);
                return fail(err);
            }
        }
    }

    // 10. Registered validators: all of them, concurrently, no
    // fail-fast. A panic becomes a synthetic error naming the
    // validator.
    let mut errors = Vec::new();
    if let Some(def) = definition {
        let mut tasks = Vec::new();
        for name in def.validator_names() {
            let Some(validator) = validators.get(name) else {
                // Checked at compile time; a removal afterwards still
                // must not pass silently.
                errors.push(
                    ValidationError::new(key, messages::VALIDATOR_FAILED)
                        .with_values(vec![json!(name), json!("validator is not registered")]),
                );
                continue;
            };
            let key_owned = key.to_string();
            let value_owned = value.clone();
            let scope_owned = scope_map.clone();
            let name_owned = name.to_string();
            tasks.push((
                name_owned,
                tokio::spawn(async move {
                    validator.validate(key_owned, value_owned, scope_owned).await
                }),
            ));
        }
        for (name, task) in tasks {
            match task.await {
                Ok(found) => errors.extend(found),
                Err(e) => {
                    warn!(validator = name, error = %e, "registered validator panicked");
                    errors.push(
                        ValidationError::new(key, messages::VALIDATOR_FAILED)
                            .with_values(vec![json!(name), json!(e.to_string())]),
                    );
                }
            }
        }
    }

    (scope_map, errors)
}
