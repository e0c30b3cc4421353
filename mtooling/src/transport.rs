//! Tool transport trait and the JSON-RPC over HTTP implementation.

use std::sync::atomic::{AtomicU64, Ordering};

use mauth::Credential;
use mcommon::{BoxFuture, CallId, TraceId};
use mconfig::McpConfig;
use reqwest::{Client, Response, StatusCode};
use serde_json::{Value, json};

use crate::{ToolBinding, ToolError};

pub type ToolFuture<'a, T> = BoxFuture<'a, T>;

/// One outbound call, after validation and authorization.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub call_id: CallId,
    pub trace_id: Option<TraceId>,
    pub binding: ToolBinding,
    pub arguments: Value,
    pub credential: Option<Credential>,
}

pub trait ToolTransport: Send + Sync {
    /// Sends the call and returns the decoded response body.
    fn send<'a>(
        &'a self,
        request: &'a TransportRequest,
    ) -> ToolFuture<'a, Result<Value, ToolError>>;
}

#[derive(Debug)]
pub struct McpHttpTransport {
    client: Client,
    base_url: String,
    next_id: AtomicU64,
}

impl McpHttpTransport {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn from_config(config: &McpConfig) -> Result<Self, ToolError> {
        let client = Client::builder()
            .timeout(config.mcp_server.timeout())
            .danger_accept_invalid_certs(!config.security.validate_ssl)
            .build()
            .map_err(|err| {
                ToolError::connection(format!("failed to build HTTP client: {err}"))
                    .into_terminal()
            })?;

        Ok(Self::new(client, config.mcp_server.base_url.clone()))
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// JSON-RPC 2.0 envelope for a tool call.
    pub fn envelope(id: u64, binding: &ToolBinding, arguments: &Value) -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": binding.method,
            "params": {
                "name": binding.remote_name,
                "arguments": arguments,
            },
        })
    }

    async fn parse_error(response: Response) -> ToolError {
        let status = response.status();
        // Body text is never surfaced.
        let _ = response.bytes().await;
        classify_status(status)
    }
}

/// Maps a non-success HTTP status onto the tool error taxonomy.
pub fn classify_status(status: StatusCode) -> ToolError {
    let message = format!("tool endpoint answered {status}");
    match status {
        StatusCode::UNAUTHORIZED => ToolError::unauthenticated(message),
        StatusCode::FORBIDDEN => ToolError::forbidden(message),
        StatusCode::NOT_FOUND => ToolError::no_results(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => ToolError::timeout(message),
        StatusCode::TOO_MANY_REQUESTS => ToolError::throttled(message),
        status if status.is_server_error() => ToolError::connection(message),
        _ => ToolError::remote(message),
    }
}

impl ToolTransport for McpHttpTransport {
    fn send<'a>(
        &'a self,
        request: &'a TransportRequest,
    ) -> ToolFuture<'a, Result<Value, ToolError>> {
        Box::pin(async move {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            let body = Self::envelope(id, &request.binding, &request.arguments);

            let mut builder = self
                .client
                .post(self.endpoint(&request.binding.endpoint))
                .header("X-Request-Id", request.call_id.as_str())
                .json(&body);
            if let Some(trace_id) = &request.trace_id {
                builder = builder.header("X-Trace-Id", trace_id.as_str());
            }
            if let Some(credential) = &request.credential {
                builder = builder.bearer_auth(credential.access_token());
            }

            let response = builder.send().await.map_err(|err| {
                let err = err.without_url();
                if err.is_timeout() {
                    ToolError::timeout(err.to_string())
                } else {
                    ToolError::connection(err.to_string())
                }
            })?;

            if !response.status().is_success() {
                return Err(Self::parse_error(response).await);
            }

            response.json::<Value>().await.map_err(|err| {
                if err.is_timeout() {
                    ToolError::timeout(err.to_string())
                } else {
                    ToolError::shape_mismatch(format!("response body is not JSON: {err}"))
                }
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ToolErrorKind;

    #[test]
    fn envelope_follows_json_rpc_tool_call_shape() {
        let mut binding = ToolBinding::new("secure_search");
        binding.remote_name = "search_documents".to_string();

        let envelope = McpHttpTransport::envelope(7, &binding, &json!({"query": "vpn"}));
        assert_eq!(
            envelope,
            json!({
                "jsonrpc": "2.0",
                "id": 7,
                "method": "tools/call",
                "params": {"name": "search_documents", "arguments": {"query": "vpn"}},
            })
        );
    }

    #[test]
    fn endpoint_joins_without_double_slashes() {
        let transport = McpHttpTransport::new(Client::new(), "https://mcp.example.com/");
        assert_eq!(transport.endpoint("/mcp"), "https://mcp.example.com/mcp");
    }

    #[test]
    fn statuses_map_onto_the_taxonomy() {
        let cases = [
            (StatusCode::UNAUTHORIZED, ToolErrorKind::Unauthenticated, false),
            (StatusCode::FORBIDDEN, ToolErrorKind::Forbidden, false),
            (StatusCode::NOT_FOUND, ToolErrorKind::NoResults, false),
            (StatusCode::GATEWAY_TIMEOUT, ToolErrorKind::Timeout, true),
            (StatusCode::TOO_MANY_REQUESTS, ToolErrorKind::Throttled, false),
            (StatusCode::BAD_GATEWAY, ToolErrorKind::Connection, true),
            (StatusCode::BAD_REQUEST, ToolErrorKind::Remote, false),
        ];

        for (status, kind, retryable) in cases {
            let error = classify_status(status);
            assert_eq!(error.kind, kind, "{status}");
            assert_eq!(error.retryable, retryable, "{status}");
        }
    }
}
