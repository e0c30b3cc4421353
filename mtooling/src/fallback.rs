//! Fallback Policy Engine: user-facing text for failed calls.
//!
//! ```rust
//! use mconfig::ErrorHandlingConfig;
//! use mtooling::FallbackPolicy;
//!
//! let policy = FallbackPolicy::from_config(&ErrorHandlingConfig::default());
//! assert!(policy.fallback_for("timeout_error").is_some());
//! assert_eq!(policy.fallback_for("quota"), Some(mtooling::GENERIC_FALLBACK));
//! ```

use std::collections::BTreeMap;

use mconfig::{ErrorHandlingConfig, FALLBACK_DEFAULT};

use crate::{InvocationRequest, ToolError, ToolResponse};

/// Used for unknown categories when graceful degradation is on and the
/// document sets no `default` message.
pub const GENERIC_FALLBACK: &str =
    "I wasn't able to complete that request right now. Please try again later.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackPolicy {
    messages: BTreeMap<String, String>,
    graceful_degradation: bool,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self::from_config(&ErrorHandlingConfig::default())
    }
}

impl FallbackPolicy {
    pub fn new(messages: BTreeMap<String, String>, graceful_degradation: bool) -> Self {
        Self {
            messages,
            graceful_degradation,
        }
    }

    pub fn from_config(config: &ErrorHandlingConfig) -> Self {
        Self::new(config.fallback_messages.clone(), config.graceful_degradation)
    }

    pub fn graceful_degradation(&self) -> bool {
        self.graceful_degradation
    }

    /// Configured message for `category`. Unknown categories get the
    /// degradation message when enabled and `None` otherwise.
    pub fn fallback_for(&self, category: &str) -> Option<&str> {
        if let Some(message) = self.messages.get(category) {
            return Some(message);
        }
        if !self.graceful_degradation {
            return None;
        }

        Some(
            self.messages
                .get(FALLBACK_DEFAULT)
                .map(String::as_str)
                .unwrap_or(GENERIC_FALLBACK),
        )
    }

    /// Replaces `error` with a fallback response, or hands it back when no
    /// message applies.
    pub fn resolve(
        &self,
        request: &InvocationRequest,
        error: ToolError,
    ) -> Result<ToolResponse, ToolError> {
        match self.fallback_for(error.category()) {
            Some(message) => Ok(ToolResponse::fallback(request, &error, message)),
            None => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn request() -> InvocationRequest {
        InvocationRequest::new("call_1", "secure_search", json!({}))
    }

    #[test]
    fn known_categories_use_configured_text() {
        let policy = FallbackPolicy::default();
        let response = policy
            .resolve(&request(), ToolError::connection("reset"))
            .expect("fallback");

        assert!(response.is_fallback);
        assert_eq!(response.category.as_deref(), Some("connection_error"));
        assert_eq!(
            response.content,
            ErrorHandlingConfig::default().fallback_messages["connection_error"]
        );
    }

    #[test]
    fn unknown_category_uses_default_entry_when_present() {
        let mut config = ErrorHandlingConfig::default();
        config
            .fallback_messages
            .insert("default".to_string(), "Something went sideways.".to_string());
        let policy = FallbackPolicy::from_config(&config);

        assert_eq!(policy.fallback_for("throttled"), Some("Something went sideways."));
    }

    #[test]
    fn custom_categories_are_honored() {
        let mut config = ErrorHandlingConfig::default();
        config
            .fallback_messages
            .insert("throttled".to_string(), "Busy, try again.".to_string());
        let policy = FallbackPolicy::from_config(&config);

        let response = policy
            .resolve(&request(), ToolError::throttled("limit"))
            .expect("fallback");
        assert_eq!(response.content, "Busy, try again.");
    }

    #[test]
    fn without_degradation_unknown_categories_propagate() {
        let config = ErrorHandlingConfig {
            graceful_degradation: false,
            ..ErrorHandlingConfig::default()
        };
        let policy = FallbackPolicy::from_config(&config);

        let error = policy
            .resolve(&request(), ToolError::validation("query", "bad"))
            .expect_err("validation has no configured message");
        assert_eq!(error.field.as_deref(), Some("query"));

        assert!(policy.fallback_for("no_results").is_some());
    }
}
