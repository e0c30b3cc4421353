//! Typed model of the MCP function-calling configuration document.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct McpConfig {
    #[serde(default)]
    pub mcp_server: McpServerConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub function_calling: FunctionCallingConfig,
    #[serde(default)]
    pub response_limits: ResponseLimits,
    #[serde(default)]
    pub error_handling: ErrorHandlingConfig,
    #[serde(default)]
    pub functions: Vec<FunctionConfig>,
    #[serde(default)]
    pub tools: BTreeMap<String, ToolConfig>,
    #[serde(default)]
    pub response_format: ResponseFormatConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

impl McpConfig {
    /// Effective dispatch retry count: `function_calling.max_retries`, else
    /// `mcp_server.retry_attempts`, and zero when `retry_on_error` is off.
    pub fn dispatch_retries(&self) -> u32 {
        if !self.function_calling.retry_on_error {
            return 0;
        }

        self.function_calling
            .max_retries
            .unwrap_or(self.mcp_server.retry_attempts)
    }

    /// Per-call timeout for `tool`, preferring the tool's own override.
    pub fn call_timeout(&self, tool: &ToolConfig) -> Duration {
        Duration::from_secs(
            tool.timeout_seconds
                .unwrap_or(self.function_calling.timeout_seconds),
        )
    }

    pub fn tool(&self, name: &str) -> Option<&ToolConfig> {
        self.tools.get(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct McpServerConfig {
    pub base_url: String,
    /// Connect/read timeout for the HTTP client, in seconds.
    pub timeout: u64,
    pub retry_attempts: u32,
    /// Base backoff between dispatch retries, in seconds.
    pub retry_delay: f64,
    pub authorization: AuthorizationConfig,
    pub capabilities: Value,
}

impl Default for McpServerConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout: 30,
            retry_attempts: 3,
            retry_delay: 1.0,
            authorization: AuthorizationConfig::None,
            capabilities: Value::Null,
        }
    }
}

impl McpServerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn retry_delay(&self) -> Duration {
        seconds(self.retry_delay)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthorizationConfig {
    #[default]
    None,
    /// Pre-issued token read from an environment variable.
    Bearer {
        token_env: String,
        #[serde(default)]
        scopes: Vec<String>,
        #[serde(default)]
        auth_level: AuthLevel,
        /// Lifetime granted to the token, in seconds. Unbounded when absent.
        #[serde(default)]
        expires_in: Option<u64>,
    },
    /// OAuth2 client-credentials grant.
    Oauth2 {
        token_url: String,
        client_id: String,
        #[serde(default)]
        client_secret_env: Option<String>,
        #[serde(default)]
        scopes: Vec<String>,
        #[serde(default)]
        audience: Option<String>,
        #[serde(default)]
        auth_level: AuthLevel,
    },
}

impl AuthorizationConfig {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::None)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum AuthLevel {
    Anonymous,
    #[default]
    Basic,
    Elevated,
    Admin,
}

/// Model settings consumed by the surrounding chat loop, kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AssistantConfig {
    pub model: Option<String>,
    pub instructions: Option<String>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FunctionCallingConfig {
    pub auto_invoke: bool,
    pub max_iterations: u32,
    pub timeout_seconds: u64,
    pub retry_on_error: bool,
    pub max_retries: Option<u32>,
}

impl Default for FunctionCallingConfig {
    fn default() -> Self {
        Self {
            auto_invoke: true,
            max_iterations: 5,
            timeout_seconds: 30,
            retry_on_error: true,
            max_retries: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseLimits {
    pub max_response_length: usize,
    pub max_search_results_per_call: usize,
    pub max_concurrent_functions: usize,
}

impl Default for ResponseLimits {
    fn default() -> Self {
        Self {
            max_response_length: 4000,
            max_search_results_per_call: 10,
            max_concurrent_functions: 5,
        }
    }
}

pub const FALLBACK_NO_RESULTS: &str = "no_results";
pub const FALLBACK_CONNECTION_ERROR: &str = "connection_error";
pub const FALLBACK_TIMEOUT_ERROR: &str = "timeout_error";
pub const FALLBACK_AUTH_ERROR: &str = "auth_error";
pub const FALLBACK_FORBIDDEN_ERROR: &str = "forbidden_error";
/// Key overriding the generic graceful-degradation text.
pub const FALLBACK_DEFAULT: &str = "default";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorHandlingConfig {
    pub graceful_degradation: bool,
    pub fallback_messages: BTreeMap<String, String>,
    pub auth_retry: AuthRetryConfig,
}

impl Default for ErrorHandlingConfig {
    fn default() -> Self {
        let fallback_messages = [
            (
                FALLBACK_NO_RESULTS,
                "I couldn't find any results for that request.",
            ),
            (
                FALLBACK_CONNECTION_ERROR,
                "I'm having trouble reaching the tool service right now. Please try again shortly.",
            ),
            (
                FALLBACK_TIMEOUT_ERROR,
                "The tool took too long to respond. Please try again.",
            ),
            (
                FALLBACK_AUTH_ERROR,
                "I couldn't authenticate with the tool service.",
            ),
            (
                FALLBACK_FORBIDDEN_ERROR,
                "I don't have permission to perform that action.",
            ),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();

        Self {
            graceful_degradation: true,
            fallback_messages,
            auth_retry: AuthRetryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthRetryConfig {
    pub enabled: bool,
    pub max_retries: u32,
    /// Spacing between token endpoint attempts, in seconds.
    pub retry_delay: f64,
}

impl Default for AuthRetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 2,
            retry_delay: 1.0,
        }
    }
}

impl AuthRetryConfig {
    pub fn retry_delay(&self) -> Duration {
        seconds(self.retry_delay)
    }

    /// Retry count honoring the `enabled` switch.
    pub fn effective_retries(&self) -> u32 {
        if self.enabled { self.max_retries } else { 0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Key into `tools`; the function name when absent.
    #[serde(default)]
    pub tool: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub requires_auth: bool,
    #[serde(default)]
    pub parameters: ParametersSchema,
}

impl FunctionConfig {
    pub fn tool_name(&self) -> &str {
        self.tool.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParametersSchema {
    #[serde(rename = "type", default = "default_object_type")]
    pub kind: String,
    #[serde(default)]
    pub properties: BTreeMap<String, ParameterSchema>,
    #[serde(default)]
    pub required: Vec<String>,
}

impl Default for ParametersSchema {
    fn default() -> Self {
        Self {
            kind: default_object_type(),
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    #[serde(rename = "type")]
    pub kind: ParamType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(
        rename = "maxLength",
        alias = "max_length",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub max_length: Option<usize>,
    #[serde(
        rename = "minLength",
        alias = "min_length",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Value>,
}

impl ParameterSchema {
    pub fn new(kind: ParamType) -> Self {
        Self {
            kind,
            description: None,
            allowed_values: None,
            minimum: None,
            maximum: None,
            max_length: None,
            min_length: None,
            default: None,
            items: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    pub endpoint: String,
    /// Protocol method sent in the JSON-RPC envelope.
    pub method: String,
    /// Tool identifier on the remote server; the tool key when absent.
    pub remote_name: Option<String>,
    /// Seconds a successful response stays cached; zero disables caching.
    pub cache_ttl: u64,
    pub max_concurrent_requests: usize,
    pub timeout_seconds: Option<u64>,
    pub admission: AdmissionConfig,
    pub validation: ValidationConfig,
    pub response_format: Option<ResponseFormatConfig>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            endpoint: "/mcp".to_string(),
            method: "tools/call".to_string(),
            remote_name: None,
            cache_ttl: 0,
            max_concurrent_requests: 2,
            timeout_seconds: None,
            admission: AdmissionConfig::default(),
            validation: ValidationConfig::default(),
            response_format: None,
        }
    }
}

impl ToolConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }
}

/// What happens to a call arriving while a concurrency gate is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum AdmissionConfig {
    #[default]
    FailFast,
    Queue { max_waiters: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ValidationConfig {
    pub required_fields: Vec<String>,
    pub fields: BTreeMap<String, FieldRule>,
    pub required_scopes: Vec<String>,
    pub min_auth_level: Option<AuthLevel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FieldRule {
    pub max_length: Option<usize>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub allowed_values: Option<Vec<Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseFormatConfig {
    pub extraction_path: String,
    pub parse_json: bool,
    pub error_field: Option<String>,
    pub fail_on_truncation: bool,
    pub treat_empty_as_no_results: bool,
}

impl Default for ResponseFormatConfig {
    fn default() -> Self {
        Self {
            extraction_path: "result.content[0].text".to_string(),
            parse_json: true,
            error_field: Some("error".to_string()),
            fail_on_truncation: false,
            treat_empty_as_no_results: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub validate_ssl: bool,
    /// Seconds before expiry at which a token is renewed.
    pub token_refresh_threshold: u64,
    /// Seconds after issue at which a token is rejected regardless of expiry.
    pub max_token_age: u64,
    pub sensitive_params: Vec<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            validate_ssl: true,
            token_refresh_threshold: 300,
            max_token_age: 3600,
            sensitive_params: ["password", "token", "api_key", "secret", "authorization"]
                .into_iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

impl SecurityConfig {
    pub fn token_refresh_threshold(&self) -> Duration {
        Duration::from_secs(self.token_refresh_threshold)
    }

    pub fn max_token_age(&self) -> Duration {
        Duration::from_secs(self.max_token_age)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub log_requests: bool,
    pub log_responses: bool,
    pub log_errors: bool,
    pub metrics_enabled: bool,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            log_requests: true,
            log_responses: false,
            log_errors: true,
            metrics_enabled: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_object_type() -> String {
    "object".to_string()
}

fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}
