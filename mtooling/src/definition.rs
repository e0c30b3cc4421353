//! Tool definitions compiled from function declarations and their tool bindings.

use std::collections::BTreeMap;
use std::time::Duration;

use mauth::AuthRequirement;
use mconfig::{
    AdmissionConfig, ConfigError, FieldRule, FunctionConfig, McpConfig, ParametersSchema,
    ToolConfig,
};
use serde::Serialize;
use serde_json::Value;

use crate::ResponseShape;

/// Where and how a function is sent on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolBinding {
    /// Key into the `tools` map; admission and caching are scoped to it.
    pub tool: String,
    pub endpoint: String,
    pub method: String,
    pub remote_name: String,
}

impl ToolBinding {
    pub fn new(tool: impl Into<String>) -> Self {
        let tool = tool.into();
        let defaults = ToolConfig::default();
        Self {
            remote_name: tool.clone(),
            tool,
            endpoint: defaults.endpoint,
            method: defaults.method,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationRule {
    pub required_fields: Vec<String>,
    pub fields: BTreeMap<String, FieldRule>,
    pub requirement: AuthRequirement,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub binding: ToolBinding,
    pub enabled: bool,
    pub requires_auth: bool,
    pub parameters: ParametersSchema,
    pub rule: ValidationRule,
    pub cache_ttl: Duration,
    pub max_concurrent_requests: usize,
    pub admission: AdmissionConfig,
    pub timeout: Duration,
    pub response: ResponseShape,
}

impl ToolDefinition {
    /// Definition with default binding, limits, and response handling.
    pub fn new(name: impl Into<String>, response: ResponseShape) -> Self {
        let name = name.into();
        let defaults = ToolConfig::default();
        Self {
            binding: ToolBinding::new(name.clone()),
            name,
            description: String::new(),
            enabled: true,
            requires_auth: false,
            parameters: ParametersSchema::default(),
            rule: ValidationRule::default(),
            cache_ttl: defaults.cache_ttl(),
            max_concurrent_requests: defaults.max_concurrent_requests,
            admission: defaults.admission,
            timeout: Duration::from_secs(30),
            response,
        }
    }

    pub fn from_config(
        function: &FunctionConfig,
        tool: &ToolConfig,
        config: &McpConfig,
    ) -> Result<Self, ConfigError> {
        let tool_name = function.tool_name();
        let format = tool.response_format.as_ref().unwrap_or(&config.response_format);
        let response = ResponseShape::from_config(format).map_err(|err| {
            ConfigError::invalid(format!("function '{}': {}", function.name, err.message))
        })?;

        let validation = &tool.validation;
        let mut requirement =
            AuthRequirement::new().with_scopes(validation.required_scopes.iter().cloned());
        if let Some(level) = validation.min_auth_level {
            requirement = requirement.with_min_level(level);
        }

        Ok(Self {
            name: function.name.clone(),
            description: function.description.clone(),
            binding: ToolBinding {
                tool: tool_name.to_string(),
                endpoint: tool.endpoint.clone(),
                method: tool.method.clone(),
                remote_name: tool
                    .remote_name
                    .clone()
                    .unwrap_or_else(|| tool_name.to_string()),
            },
            enabled: function.enabled,
            requires_auth: function.requires_auth,
            parameters: function.parameters.clone(),
            rule: ValidationRule {
                required_fields: validation.required_fields.clone(),
                fields: validation.fields.clone(),
                requirement,
            },
            cache_ttl: tool.cache_ttl(),
            max_concurrent_requests: tool.max_concurrent_requests,
            admission: tool.admission,
            timeout: config.call_timeout(tool),
            response,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_binding(mut self, binding: ToolBinding) -> Self {
        self.binding = binding;
        self
    }

    pub fn with_parameters(mut self, parameters: ParametersSchema) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_rule(mut self, rule: ValidationRule) -> Self {
        self.rule = rule;
        self
    }

    pub fn with_requires_auth(mut self, requires_auth: bool) -> Self {
        self.requires_auth = requires_auth;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_cache_ttl(mut self, cache_ttl: Duration) -> Self {
        self.cache_ttl = cache_ttl;
        self
    }

    pub fn with_concurrency(
        mut self,
        max_concurrent_requests: usize,
        admission: AdmissionConfig,
    ) -> Self {
        self.max_concurrent_requests = max_concurrent_requests;
        self.admission = admission;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Model-facing declaration of this function.
    pub fn declaration(&self) -> FunctionDeclaration {
        FunctionDeclaration {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: serde_json::to_value(&self.parameters).unwrap_or(Value::Null),
        }
    }
}

/// What the model is told about a callable function.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}
