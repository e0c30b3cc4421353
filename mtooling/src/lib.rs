//! Function registry, argument validation, dispatch, and response handling
//! for configuration-driven MCP tool calls.
//!
//! ```rust
//! use mconfig::McpConfig;
//! use mtooling::{FunctionRegistry, InvocationRequest, SchemaValidator};
//! use serde_json::json;
//!
//! let config = McpConfig::from_json_str(
//!     r#"{
//!         "mcp_server": {"base_url": "https://mcp.example.com"},
//!         "functions": [{
//!             "name": "search",
//!             "parameters": {
//!                 "type": "object",
//!                 "properties": {"query": {"type": "string", "maxLength": 16}},
//!                 "required": ["query"]
//!             }
//!         }],
//!         "tools": {"search": {}}
//!     }"#,
//! )
//! .expect("document should load");
//! let registry = FunctionRegistry::from_config(&config).expect("registry");
//!
//! let request = InvocationRequest::new("call_1", "search", json!({"query": "x".repeat(32)}));
//! let definition = registry.resolve(&request.function).expect("registered");
//! let error = SchemaValidator
//!     .validate(&definition, &request.arguments)
//!     .expect_err("query is too long");
//! assert_eq!(error.field, "query");
//! ```

mod admission;
mod cache;
mod definition;
mod dispatch;
mod error;
mod fallback;
mod hooks;
mod normalize;
mod registry;
mod runtime;
mod transport;
mod types;
mod validate;

pub mod prelude {
    pub use crate::{
        DispatchHooks, FallbackPolicy, FunctionRegistry, InvocationRequest, InvocationResult,
        McpHttpTransport, McpToolRuntime, NormalizedAnswer, ToolDefinition, ToolError,
        ToolErrorKind, ToolFuture, ToolResponse, ToolRuntime, ToolTransport, TransportRequest,
        TurnBudget,
    };
}

pub use admission::{AdmissionController, AdmissionPermit};
pub use cache::{CacheLookup, Fingerprint, ResponseCache};
pub use definition::{FunctionDeclaration, ToolBinding, ToolDefinition, ValidationRule};
pub use dispatch::{DispatchOutcome, DispatchSettings, InvocationDispatcher};
pub use error::{ToolError, ToolErrorKind};
pub use fallback::{FallbackPolicy, GENERIC_FALLBACK};
pub use hooks::{DispatchHooks, NoopDispatchHooks};
pub use normalize::{
    ExtractionPath, NormalizeLimits, NormalizedAnswer, PathSegment, ResponseNormalizer,
    ResponseShape,
};
pub use registry::{FunctionRegistry, FunctionRegistryBuilder};
pub use runtime::{McpToolRuntime, McpToolRuntimeBuilder, RuntimeSettings, ToolRuntime, TurnBudget};
pub use transport::{McpHttpTransport, ToolFuture, ToolTransport, TransportRequest, classify_status};
pub use types::{InvocationRequest, InvocationResult, ToolResponse};
pub use validate::{ROOT_FIELD, SchemaValidator, ValidationError, ValidationReason};
