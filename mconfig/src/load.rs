//! Document loading and structural validation.

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use crate::{AuthorizationConfig, ConfigError, McpConfig, ParamType};

impl McpConfig {
    /// Parses and validates a configuration document.
    pub fn from_json_str(document: &str) -> Result<Self, ConfigError> {
        let config: McpConfig = serde_json::from_str(document)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let document = std::fs::read_to_string(path).map_err(|err| {
            ConfigError::io(format!("failed to read '{}': {err}", path.display()))
        })?;
        Self::from_json_str(&document)
    }

    /// Checks ranges and cross-field constraints that serde cannot express.
    ///
    /// Binding consistency between `functions` and `tools` is checked when the
    /// function registry is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_assistant()?;
        self.validate_limits()?;
        self.validate_security()?;

        for function in &self.functions {
            if function.name.trim().is_empty() {
                return Err(ConfigError::invalid("function name must not be empty"));
            }

            let declared = function
                .parameters
                .properties
                .keys()
                .map(String::as_str)
                .collect::<BTreeSet<_>>();
            for required in &function.parameters.required {
                if !declared.contains(required.as_str()) {
                    return Err(ConfigError::invalid(format!(
                        "function '{}' requires undeclared parameter '{required}'",
                        function.name
                    )));
                }
            }

            for (name, parameter) in &function.parameters.properties {
                check_range(
                    &function.name,
                    name,
                    parameter.minimum,
                    parameter.maximum,
                )?;
                if let (Some(min), Some(max)) = (parameter.min_length, parameter.max_length) {
                    if min > max {
                        return Err(ConfigError::invalid(format!(
                            "function '{}' parameter '{name}' has minLength greater than maxLength",
                            function.name
                        )));
                    }
                }
                if parameter.max_length.is_some() && parameter.kind != ParamType::String {
                    return Err(ConfigError::invalid(format!(
                        "function '{}' parameter '{name}' declares maxLength on a non-string type",
                        function.name
                    )));
                }
            }
        }

        for (name, tool) in &self.tools {
            if tool.max_concurrent_requests == 0 {
                return Err(ConfigError::invalid(format!(
                    "tool '{name}' max_concurrent_requests must be greater than zero"
                )));
            }
            if tool.method.trim().is_empty() {
                return Err(ConfigError::invalid(format!(
                    "tool '{name}' method must not be empty"
                )));
            }
            if tool.timeout_seconds == Some(0) {
                return Err(ConfigError::invalid(format!(
                    "tool '{name}' timeout_seconds must be greater than zero"
                )));
            }
            for (field, rule) in &tool.validation.fields {
                check_range(name, field, rule.min, rule.max)?;
            }
        }

        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        let server = &self.mcp_server;
        if server.base_url.trim().is_empty() {
            return Err(ConfigError::invalid("mcp_server.base_url must not be empty"));
        }
        if !(server.base_url.starts_with("http://") || server.base_url.starts_with("https://")) {
            return Err(ConfigError::invalid(
                "mcp_server.base_url must be an http(s) URL",
            ));
        }
        if server.timeout == 0 {
            return Err(ConfigError::invalid(
                "mcp_server.timeout must be greater than zero",
            ));
        }
        if !is_delay(server.retry_delay) {
            return Err(ConfigError::invalid(
                "mcp_server.retry_delay must be a non-negative number of seconds",
            ));
        }

        match &server.authorization {
            AuthorizationConfig::None => {}
            AuthorizationConfig::Bearer { token_env, .. } => {
                if token_env.trim().is_empty() {
                    return Err(ConfigError::invalid(
                        "bearer authorization requires token_env",
                    ));
                }
            }
            AuthorizationConfig::Oauth2 {
                token_url,
                client_id,
                ..
            } => {
                if token_url.trim().is_empty() || client_id.trim().is_empty() {
                    return Err(ConfigError::invalid(
                        "oauth2 authorization requires token_url and client_id",
                    ));
                }
            }
        }

        if self.function_calling.timeout_seconds == 0 {
            return Err(ConfigError::invalid(
                "function_calling.timeout_seconds must be greater than zero",
            ));
        }

        let auth_retry = &self.error_handling.auth_retry;
        if !is_delay(auth_retry.retry_delay) {
            return Err(ConfigError::invalid(
                "error_handling.auth_retry.retry_delay must be a non-negative number of seconds",
            ));
        }

        Ok(())
    }

    fn validate_assistant(&self) -> Result<(), ConfigError> {
        if let Some(temperature) = self.assistant.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ConfigError::invalid(
                    "assistant.temperature must be in the inclusive range 0.0..=2.0",
                ));
            }
        }

        if let Some(top_p) = self.assistant.top_p {
            if !(0.0..=1.0).contains(&top_p) {
                return Err(ConfigError::invalid(
                    "assistant.top_p must be in the inclusive range 0.0..=1.0",
                ));
            }
        }

        Ok(())
    }

    fn validate_limits(&self) -> Result<(), ConfigError> {
        let limits = &self.response_limits;
        if limits.max_concurrent_functions == 0 {
            return Err(ConfigError::invalid(
                "response_limits.max_concurrent_functions must be greater than zero",
            ));
        }
        if limits.max_response_length == 0 {
            return Err(ConfigError::invalid(
                "response_limits.max_response_length must be greater than zero",
            ));
        }
        if limits.max_search_results_per_call == 0 {
            return Err(ConfigError::invalid(
                "response_limits.max_search_results_per_call must be greater than zero",
            ));
        }

        Ok(())
    }

    fn validate_security(&self) -> Result<(), ConfigError> {
        let security = &self.security;
        if security.max_token_age == 0 {
            return Err(ConfigError::invalid(
                "security.max_token_age must be greater than zero",
            ));
        }
        if security.token_refresh_threshold >= security.max_token_age {
            return Err(ConfigError::invalid(
                "security.token_refresh_threshold must be smaller than max_token_age",
            ));
        }

        Ok(())
    }
}

fn check_range(
    owner: &str,
    field: &str,
    min: Option<f64>,
    max: Option<f64>,
) -> Result<(), ConfigError> {
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(ConfigError::invalid(format!(
                "'{owner}' field '{field}' has a minimum greater than its maximum"
            )));
        }
    }

    Ok(())
}

/// Whether `seconds` is usable as a delay: finite, non-negative and within
/// what a `Duration` can hold.
fn is_delay(seconds: f64) -> bool {
    Duration::try_from_secs_f64(seconds).is_ok()
}

#[cfg(test)]
mod tests {
    use crate::{ConfigErrorKind, McpConfig};

    fn minimal() -> McpConfig {
        serde_json::from_str(r#"{"mcp_server":{"base_url":"https://mcp.example.com"}}"#)
            .expect("minimal document should parse")
    }

    #[test]
    fn minimal_document_is_valid_with_defaults() {
        let config = minimal();
        config.validate().expect("defaults should validate");

        assert_eq!(config.mcp_server.timeout, 30);
        assert_eq!(config.response_limits.max_concurrent_functions, 5);
        assert!(config.error_handling.graceful_degradation);
        assert_eq!(config.dispatch_retries(), 3);
    }

    #[test]
    fn max_retries_overrides_server_retry_attempts() {
        let mut config = minimal();
        config.function_calling.max_retries = Some(1);
        assert_eq!(config.dispatch_retries(), 1);

        config.function_calling.retry_on_error = false;
        assert_eq!(config.dispatch_retries(), 0);
    }

    #[test]
    fn empty_base_url_is_rejected() {
        let config: McpConfig = serde_json::from_str("{}").expect("empty document should parse");
        let error = config.validate().expect_err("base url is required");
        assert_eq!(error.kind, ConfigErrorKind::Invalid);
        assert!(error.message.contains("base_url"));
    }

    #[test]
    fn refresh_threshold_must_be_below_max_age() {
        let mut config = minimal();
        config.security.token_refresh_threshold = 3600;
        config.security.max_token_age = 3600;

        let error = config.validate().expect_err("threshold should be rejected");
        assert!(error.message.contains("token_refresh_threshold"));
    }

    #[test]
    fn required_parameter_must_be_declared() {
        let error = McpConfig::from_json_str(
            r#"{
                "mcp_server": {"base_url": "https://mcp.example.com"},
                "functions": [{
                    "name": "search",
                    "parameters": {"type": "object", "properties": {}, "required": ["query"]}
                }]
            }"#,
        )
        .expect_err("undeclared required parameter should fail");

        assert!(error.message.contains("undeclared parameter 'query'"));
    }

    #[test]
    fn inverted_numeric_rule_is_rejected() {
        let error = McpConfig::from_json_str(
            r#"{
                "mcp_server": {"base_url": "https://mcp.example.com"},
                "tools": {"search": {"validation": {"fields": {"limit": {"min": 10, "max": 1}}}}}
            }"#,
        )
        .expect_err("min > max should fail");

        assert_eq!(error.kind, ConfigErrorKind::Invalid);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let error = McpConfig::from_json_str("{").expect_err("document should fail");
        assert_eq!(error.kind, ConfigErrorKind::Parse);
    }

    #[test]
    fn zero_concurrency_tool_is_rejected() {
        let error = McpConfig::from_json_str(
            r#"{
                "mcp_server": {"base_url": "https://mcp.example.com"},
                "tools": {"search": {"max_concurrent_requests": 0}}
            }"#,
        )
        .expect_err("zero concurrency should fail");

        assert!(error.message.contains("max_concurrent_requests"));
    }
}
