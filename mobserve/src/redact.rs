//! Masks sensitive argument values before they reach a log line.
//!
//! ```rust
//! use mobserve::{REDACTED, Redactor};
//! use serde_json::json;
//!
//! let redactor = Redactor::new(["password"]);
//! let masked = redactor.redact(&json!({"user": "ana", "Password": "hunter2"}));
//!
//! assert_eq!(masked, json!({"user": "ana", "Password": REDACTED}));
//! ```

use std::collections::BTreeSet;

use mconfig::SecurityConfig;
use serde_json::{Map, Value};

pub const REDACTED: &str = "[REDACTED]";

/// Key names are matched case-insensitively at every depth.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Redactor {
    keys: BTreeSet<String>,
}

impl Redactor {
    pub fn new(keys: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        Self {
            keys: keys
                .into_iter()
                .map(|key| key.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn from_config(security: &SecurityConfig) -> Self {
        Self::new(&security.sensitive_params)
    }

    pub fn is_sensitive(&self, key: &str) -> bool {
        self.keys.contains(&key.to_ascii_lowercase())
    }

    pub fn redact(&self, value: &Value) -> Value {
        match value {
            Value::Object(object) => Value::Object(
                object
                    .iter()
                    .map(|(key, value)| {
                        let value = if self.is_sensitive(key) {
                            Value::String(REDACTED.to_string())
                        } else {
                            self.redact(value)
                        };
                        (key.clone(), value)
                    })
                    .collect::<Map<String, Value>>(),
            ),
            Value::Array(items) => Value::Array(items.iter().map(|item| self.redact(item)).collect()),
            other => other.clone(),
        }
    }
}
