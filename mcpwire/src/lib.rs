//! Unified facade over the mcpwire workspace crates.
//!
//! Load a configuration document, wire it into a runtime, and hand the
//! model's function calls to it:
//!
//! ```rust,no_run
//! use mcpwire::prelude::*;
//!
//! # async fn run() -> Result<(), ConfigError> {
//! let bundle = load_runtime("mcp_config.json")?;
//! let response = bundle
//!     .runtime
//!     .respond(mcp_call!("call-1", "secure_search", {"query": "vpn"}))
//!     .await;
//! if let Ok(response) = response {
//!     println!("{}", tool_message(&response));
//! }
//! # Ok(())
//! # }
//! ```

mod macros;

pub mod prelude;
pub mod runtime;
pub mod util;

pub use mauth;
pub use mcommon;
pub use mconfig;
pub use mobserve;
pub use mtooling;
pub use serde_json;

pub use mauth::{
    AuthError, AuthErrorKind, AuthFuture, AuthHooks, AuthPhase, AuthPolicy, AuthRequirement,
    AuthorizationResolver, ClientCredentialsSource, Credential, EnvTokenSource, IssuedToken,
    TokenSource,
};
pub use mcommon::{BoxFuture, CallId, MetadataMap, RetryPolicy, TraceId};
pub use mconfig::{ConfigError, ConfigErrorKind, McpConfig};
pub use mobserve::{
    MetricsObservabilityHooks, ObservabilityHooks, Redactor, SafeAuthHooks, SafeDispatchHooks,
    TracingObservabilityHooks,
};
pub use mtooling::{
    DispatchHooks, FallbackPolicy, FunctionDeclaration, FunctionRegistry, InvocationRequest,
    InvocationResult, McpHttpTransport, McpToolRuntime, NormalizedAnswer, RuntimeSettings,
    ToolDefinition, ToolError, ToolErrorKind, ToolFuture, ToolResponse, ToolRuntime,
    ToolTransport, TransportRequest, TurnBudget,
};

pub use runtime::{RuntimeBundle, build_runtime, build_runtime_with, load_runtime};
pub use util::{call, call_from_json, declarations_json, tool_message};

#[cfg(test)]
mod tests {
    use serde_json::json;

    #[test]
    fn mcp_call_macro_builds_request() {
        let request = crate::mcp_call!("call-7", "secure_search", {"query": "benefits"});
        assert_eq!(request.call_id.as_str(), "call-7");
        assert_eq!(request.arguments, json!({"query": "benefits"}));
    }

    #[test]
    fn mcp_calls_macro_numbers_requests() {
        let requests = crate::mcp_calls![
            "secure_search" => {"query": "vpn"},
            "public_status" => {},
        ];

        let ids: Vec<_> = requests.iter().map(|r| r.call_id.as_str()).collect();
        assert_eq!(ids, vec!["call-1", "call-2"]);
        assert_eq!(requests[1].arguments, json!({}));
    }

    #[test]
    fn mcp_calls_macro_supports_empty_input() {
        let requests = crate::mcp_calls![];
        assert!(requests.is_empty());
    }
}
