//! Scalar flag values.
//!
//! Flag values are always scalar — string, number or boolean. Nested or
//! structured values are deliberately unsupported; `null` is not a value
//! either, it is the tombstone meaning "remove this override" and only
//! ever appears as `Option::<FlagValue>::None`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The configured type of a feature flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagType {
    /// On/off toggle.
    Boolean,
    /// Numeric value (stored as f64).
    Number,
    /// Free-form string value.
    String,
}

impl FlagType {
    /// Returns the lowercase wire name of the type.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::String => "string",
        }
    }
}

impl fmt::Display for FlagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for FlagType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "boolean" => Ok(Self::Boolean),
            "number" => Ok(Self::Number),
            "string" => Ok(Self::String),
            other => Err(crate::Error::InvalidFlagType(other.to_string())),
        }
    }
}

/// A scalar flag value.
///
/// Serializes untagged, so the wire form is a plain JSON scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    /// Boolean flag value.
    Boolean(bool),
    /// Numeric flag value.
    Number(f64),
    /// String flag value.
    String(String),
}

impl FlagValue {
    /// Returns the type tag matching this value.
    #[must_use]
    pub const fn flag_type(&self) -> FlagType {
        match self {
            Self::Boolean(_) => FlagType::Boolean,
            Self::Number(_) => FlagType::Number,
            Self::String(_) => FlagType::String,
        }
    }

    /// Returns whether this value matches the given type tag.
    #[must_use]
    pub fn has_type(&self, flag_type: FlagType) -> bool {
        self.flag_type() == flag_type
    }

    /// Returns the boolean inside, if this is a boolean value.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the number inside, if this is a numeric value.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the string inside, if this is a string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<bool> for FlagValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<f64> for FlagValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for FlagValue {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<&str> for FlagValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for FlagValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}
