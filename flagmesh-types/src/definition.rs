//! Feature definitions and their configuration sources.
//!
//! Definitions are merged from up to three tiers at initialization and
//! are immutable afterwards — a full engine reconstruction is the only
//! way to change them.

use crate::{FlagType, FlagValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// The configuration tier a definition came from.
///
/// Ordering matters: with the default collision policy, a definition
/// from a later tier overrides one from an earlier tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTier {
    /// Auto-discovered by the host framework.
    Auto,
    /// Loaded from a definition file.
    File,
    /// Supplied at runtime by the embedding application.
    Runtime,
}

impl fmt::Display for SourceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Auto => "auto",
            Self::File => "file",
            Self::Runtime => "runtime",
        };
        f.write_str(name)
    }
}

/// Policy for definition key collisions across tiers.
///
/// Same-tier collisions are always a fatal configuration error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CollisionPolicy {
    /// The later tier wins (default).
    #[default]
    Override,
    /// Any cross-tier collision aborts initialization.
    Error,
}

/// A single validation rule attached to a feature definition.
///
/// Wire form is untagged, so a definition file writes
/// `{"scopes": [...]}`, `{"regex": "..."}` or `{"validator": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValidationRule {
    /// Whitelist of scope dimensions allowed for this key.
    Scopes {
        /// Allowed dimension names.
        scopes: Vec<String>,
    },
    /// Regular expression every value must match.
    Regex {
        /// The pattern, compiled at initialization.
        regex: String,
    },
    /// Name of a validator registered on the engine before init.
    Validator {
        /// Registered validator name.
        validator: String,
    },
}

/// The wire form of a definition: the value in a `key -> spec` map as
/// found in definition files and runtime-supplied sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionSpec {
    /// Configured value type.
    #[serde(rename = "type")]
    pub flag_type: FlagType,
    /// Static default returned when no override exists.
    pub fallback_value: FlagValue,
    /// Whether the key accepts writes. Inactive keys are frozen to the
    /// fallback and ignore local and remote changes.
    #[serde(default = "default_active")]
    pub active: bool,
    /// Optional regex gate matched against the engine's app URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_url: Option<String>,
    /// Validation rules for values and scope maps.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validations: Vec<ValidationRule>,
}

fn default_active() -> bool {
    true
}

/// A fully merged feature definition with provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureDefinition {
    /// Globally unique feature key.
    pub key: String,
    /// Configured value type.
    pub flag_type: FlagType,
    /// Static default returned when no override exists.
    pub fallback_value: FlagValue,
    /// Whether the key accepts writes.
    pub active: bool,
    /// Optional regex gate matched against the engine's app URL.
    pub app_url: Option<String>,
    /// Validation rules for values and scope maps.
    pub validations: Vec<ValidationRule>,
    /// Which configuration tier supplied this definition.
    pub tier: SourceTier,
    /// Originating file for `SourceTier::File` definitions.
    pub source_file: Option<PathBuf>,
}

impl FeatureDefinition {
    /// Builds a definition from its wire spec and provenance.
    #[must_use]
    pub fn from_spec(key: impl Into<String>, spec: DefinitionSpec, tier: SourceTier) -> Self {
        Self {
            key: key.into(),
            flag_type: spec.flag_type,
            fallback_value: spec.fallback_value,
            active: spec.active,
            app_url: spec.app_url,
            validations: spec.validations,
            tier,
            source_file: None,
        }
    }

    /// Attaches the originating file path (file-tier definitions).
    #[must_use]
    pub fn with_source_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_file = Some(path.into());
        self
    }

    /// The scope-dimension whitelist, if any rule declares one.
    ///
    /// Multiple `scopes` rules are unioned.
    #[must_use]
    pub fn allowed_scopes(&self) -> Option<Vec<&str>> {
        let mut allowed: Option<Vec<&str>> = None;
        for rule in &self.validations {
            if let ValidationRule::Scopes { scopes } = rule {
                allowed
                    .get_or_insert_with(Vec::new)
                    .extend(scopes.iter().map(String::as_str));
            }
        }
        allowed
    }

    /// All regex patterns declared in validation rules, in order.
    pub fn regexes(&self) -> impl Iterator<Item = &str> {
        self.validations.iter().filter_map(|rule| match rule {
            ValidationRule::Regex { regex } => Some(regex.as_str()),
            _ => None,
        })
    }

    /// All validator names declared in validation rules, in order.
    pub fn validator_names(&self) -> impl Iterator<Item = &str> {
        self.validations.iter().filter_map(|rule| match rule {
            ValidationRule::Validator { validator } => Some(validator.as_str()),
            _ => None,
        })
    }
}
