//! Configuration document for declaring callable tools and how to invoke them.
//!
//! ```rust
//! use mconfig::McpConfig;
//!
//! let config = McpConfig::from_json_str(
//!     r#"{
//!         "mcp_server": {"base_url": "https://mcp.example.com"},
//!         "functions": [{"name": "search", "parameters": {"type": "object"}}],
//!         "tools": {"search": {"cache_ttl": 60}}
//!     }"#,
//! )
//! .expect("document should load");
//!
//! assert_eq!(config.functions[0].tool_name(), "search");
//! assert_eq!(config.tools["search"].cache_ttl, 60);
//! ```

mod error;
mod load;
mod types;

pub mod prelude {
    pub use crate::{
        AdmissionConfig, AuthLevel, AuthorizationConfig, ConfigError, ConfigErrorKind,
        FunctionConfig, McpConfig, ParamType, ParameterSchema, ToolConfig,
    };
}

pub use error::{ConfigError, ConfigErrorKind};
pub use types::{
    AdmissionConfig, AssistantConfig, AuthLevel, AuthRetryConfig, AuthorizationConfig,
    ErrorHandlingConfig, FALLBACK_AUTH_ERROR, FALLBACK_CONNECTION_ERROR, FALLBACK_DEFAULT,
    FALLBACK_FORBIDDEN_ERROR, FALLBACK_NO_RESULTS, FALLBACK_TIMEOUT_ERROR, FieldRule,
    FunctionCallingConfig, FunctionConfig, McpConfig, McpServerConfig, MonitoringConfig,
    ParamType, ParameterSchema, ParametersSchema, ResponseFormatConfig, ResponseLimits,
    SecurityConfig, ToolConfig, ValidationConfig,
};
