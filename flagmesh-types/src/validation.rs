//! Structured validation errors.
//!
//! Validation failures are data, never panics or `Err` returns from the
//! engine API. Messages are positional templates (`{0}`, `{1}`, …) with
//! a separate ordered parameter list so hosts can localize them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One validation failure for a feature key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    /// The feature key the error refers to.
    pub feature_key: String,
    /// The scope key the error refers to, if scoped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_key: Option<String>,
    /// Message template with positional `{n}` placeholders.
    pub error_message: String,
    /// Ordered parameters substituted into the template.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub error_message_values: Vec<serde_json::Value>,
}

impl ValidationError {
    /// Creates an error with a bare template.
    #[must_use]
    pub fn new(feature_key: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            feature_key: feature_key.into(),
            scope_key: None,
            error_message: error_message.into(),
            error_message_values: Vec::new(),
        }
    }

    /// Attaches the scope key the error refers to.
    #[must_use]
    pub fn with_scope_key(mut self, scope_key: impl Into<String>) -> Self {
        self.scope_key = Some(scope_key.into());
        self
    }

    /// Attaches ordered template parameters.
    #[must_use]
    pub fn with_values(mut self, values: Vec<serde_json::Value>) -> Self {
        self.error_message_values = values;
        self
    }

    /// Renders the template with its parameters substituted.
    #[must_use]
    pub fn render(&self) -> String {
        let mut message = self.error_message.clone();
        for (i, value) in self.error_message_values.iter().enumerate() {
            let rendered = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            message = message.replace(&format!("{{{i}}}"), &rendered);
        }
        message
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.feature_key, self.render())?;
        if let Some(scope_key) = &self.scope_key {
            write!(f, " (scope {scope_key})")?;
        }
        Ok(())
    }
}
