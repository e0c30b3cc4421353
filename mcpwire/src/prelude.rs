//! Common imports for most mcpwire applications.

pub use crate::{build_runtime, build_runtime_with, load_runtime};
pub use crate::{call, call_from_json, declarations_json, tool_message};
pub use crate::{mcp_call, mcp_calls};
pub use crate::{
    AuthError, AuthPhase, AuthorizationResolver, ConfigError, Credential, FallbackPolicy,
    FunctionRegistry, InvocationRequest, InvocationResult, McpConfig, McpToolRuntime,
    NormalizedAnswer, ObservabilityHooks, RuntimeBundle, TokenSource, ToolDefinition, ToolError,
    ToolErrorKind, ToolResponse, ToolRuntime, ToolTransport, TurnBudget,
};
