//! Small convenience constructors for common types.

use serde_json::{Value, json};

use crate::{FunctionRegistry, InvocationRequest, ToolResponse};

pub fn call(id: impl Into<String>, function: impl Into<String>, arguments: Value) -> InvocationRequest {
    InvocationRequest::new(id.into(), function, arguments)
}

/// Request from the raw argument string a model emitted.
pub fn call_from_json(
    id: impl Into<String>,
    function: impl Into<String>,
    arguments_json: &str,
) -> InvocationRequest {
    InvocationRequest::from_json(id.into(), function, arguments_json)
}

/// Enabled function declarations in the `{"type": "function", ...}` shape
/// chat completion APIs accept.
pub fn declarations_json(registry: &FunctionRegistry) -> Value {
    Value::Array(
        registry
            .definitions()
            .into_iter()
            .map(|declaration| {
                json!({
                    "type": "function",
                    "function": {
                        "name": declaration.name,
                        "description": declaration.description,
                        "parameters": declaration.parameters,
                    }
                })
            })
            .collect(),
    )
}

/// Tool message payload for one response, keyed by the originating call.
pub fn tool_message(response: &ToolResponse) -> Value {
    json!({
        "role": "tool",
        "tool_call_id": response.call_id.as_str(),
        "content": response.content,
    })
}
