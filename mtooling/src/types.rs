//! Invocation request, result, and response types.

use std::time::Duration;

use mcommon::{CallId, MetadataMap, TraceId};
use serde_json::{Map, Value};

use crate::{NormalizedAnswer, ToolError};

/// One function call requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationRequest {
    pub call_id: CallId,
    pub function: String,
    pub arguments: Value,
    pub trace_id: Option<TraceId>,
    pub metadata: MetadataMap,
}

impl InvocationRequest {
    pub fn new(call_id: impl Into<CallId>, function: impl Into<String>, arguments: Value) -> Self {
        Self {
            call_id: call_id.into(),
            function: function.into(),
            arguments,
            trace_id: None,
            metadata: MetadataMap::new(),
        }
    }

    /// Builds a request from the raw argument string a model emits. Blank
    /// input means no arguments; unparseable input is kept as `null` so the
    /// validator rejects it without the text travelling any further.
    pub fn from_json(
        call_id: impl Into<CallId>,
        function: impl Into<String>,
        arguments_json: &str,
    ) -> Self {
        let arguments = if arguments_json.trim().is_empty() {
            Value::Object(Map::new())
        } else {
            serde_json::from_str(arguments_json).unwrap_or(Value::Null)
        };
        Self::new(call_id, function, arguments)
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<TraceId>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvocationResult {
    pub call_id: CallId,
    pub function: String,
    pub answer: NormalizedAnswer,
    /// Network attempts made for this call; zero when served from cache.
    pub attempts: u32,
    pub cached: bool,
    pub latency: Duration,
}

/// What goes back to the model for one call: the answer, or a fallback
/// message standing in for a failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResponse {
    pub call_id: CallId,
    pub function: String,
    pub content: String,
    pub is_fallback: bool,
    /// Failure category that selected the fallback message.
    pub category: Option<String>,
    pub truncated: bool,
}

impl ToolResponse {
    pub fn from_result(result: &InvocationResult) -> Self {
        Self {
            call_id: result.call_id.clone(),
            function: result.function.clone(),
            content: result.answer.text(),
            is_fallback: false,
            category: None,
            truncated: result.answer.truncated,
        }
    }

    pub fn fallback(
        request: &InvocationRequest,
        error: &ToolError,
        message: impl Into<String>,
    ) -> Self {
        Self {
            call_id: request.call_id.clone(),
            function: request.function.clone(),
            content: message.into(),
            is_fallback: true,
            category: Some(error.category().to_string()),
            truncated: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn raw_arguments_are_parsed_or_nulled() {
        let parsed = InvocationRequest::from_json("call_1", "search", r#"{"query":"vpn"}"#);
        assert_eq!(parsed.arguments, json!({"query": "vpn"}));

        let blank = InvocationRequest::from_json("call_2", "status", "  ");
        assert_eq!(blank.arguments, json!({}));

        let broken = InvocationRequest::from_json("call_3", "search", "{query: vpn");
        assert_eq!(broken.arguments, Value::Null);
    }

    #[test]
    fn fallback_response_records_category() {
        let request = InvocationRequest::new("call_4", "search", json!({}));
        let response = ToolResponse::fallback(
            &request,
            &ToolError::timeout("slow"),
            "The tool took too long to respond.",
        );

        assert!(response.is_fallback);
        assert_eq!(response.category.as_deref(), Some("timeout_error"));
        assert_eq!(response.call_id.as_str(), "call_4");
    }
}
