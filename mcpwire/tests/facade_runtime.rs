use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mcpwire::prelude::*;
use mcpwire::{AuthFuture, ConfigErrorKind, IssuedToken, TransportRequest};
use serde_json::{Value, json};

const FIXTURE: &str = include_str!("../../mconfig/tests/fixtures/mcp_config.json");

fn fixture() -> McpConfig {
    McpConfig::from_json_str(FIXTURE).expect("fixture should load")
}

#[derive(Default)]
struct RecordingTransport {
    requests: Mutex<Vec<TransportRequest>>,
}

impl ToolTransport for RecordingTransport {
    fn send<'a>(
        &'a self,
        request: &'a TransportRequest,
    ) -> mcpwire::ToolFuture<'a, Result<Value, ToolError>> {
        Box::pin(async move {
            self.requests
                .lock()
                .expect("requests lock")
                .push(request.clone());
            Ok(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": {"content": [{"type": "text", "text": "{\"hits\":3}"}]},
            }))
        })
    }
}

struct CountingTokens {
    fetches: Arc<AtomicUsize>,
}

impl TokenSource for CountingTokens {
    fn fetch<'a>(&'a self) -> AuthFuture<'a, Result<IssuedToken, AuthError>> {
        Box::pin(async move {
            let call = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(IssuedToken::new(format!("token-{call}"))
                .with_expires_in(Duration::from_secs(7200))
                .with_scopes(["search:read", "docs:read"]))
        })
    }
}

fn bundle_with_tokens(
    transport: Arc<RecordingTransport>,
) -> (RuntimeBundle, Arc<AtomicUsize>) {
    let config = fixture();
    let fetches = Arc::new(AtomicUsize::new(0));
    let resolver = AuthorizationResolver::new(
        Box::new(CountingTokens {
            fetches: Arc::clone(&fetches),
        }),
        mcpwire::AuthPolicy::from_config(&config),
    );
    let bundle =
        build_runtime_with(&config, transport, Some(resolver)).expect("runtime should build");
    (bundle, fetches)
}

#[test]
fn build_runtime_reports_missing_client_secret() {
    if std::env::var("MCP_CLIENT_SECRET").is_ok() {
        return;
    }

    let error = match build_runtime(&fixture()) {
        Ok(_) => panic!("oauth2 setup needs the client secret"),
        Err(error) => error,
    };
    assert_eq!(error.kind, ConfigErrorKind::Invalid);
    assert!(error.message.contains("MCP_CLIENT_SECRET"));
}

#[test]
fn load_runtime_surfaces_io_errors() {
    let error = match load_runtime("/nonexistent/mcp_config.json") {
        Ok(_) => panic!("missing file should fail"),
        Err(error) => error,
    };
    assert_eq!(error.kind, ConfigErrorKind::Io);
}

#[tokio::test]
async fn batch_of_calls_shares_one_credential() {
    let transport = Arc::new(RecordingTransport::default());
    let (bundle, fetches) = bundle_with_tokens(Arc::clone(&transport));

    let responses = bundle
        .runtime
        .respond_all(mcp_calls![
            "secure_search" => {"query": "vpn"},
            "get_document" => {"document_id": "doc-7"},
            "public_status" => {},
        ])
        .await;

    assert_eq!(responses.len(), 3);
    let search = responses[0].as_ref().expect("search should answer");
    assert_eq!(search.call_id.as_str(), "call-1");
    assert_eq!(search.content, r#"{"hits":3}"#);
    assert!(!search.is_fallback);

    let document = responses[1].as_ref().expect("document should answer");
    assert!(!document.is_fallback);

    let status = responses[2].as_ref().expect("disabled function degrades");
    assert!(status.is_fallback);

    assert_eq!(fetches.load(Ordering::SeqCst), 1);
    let requests = transport.requests.lock().expect("requests lock");
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|request| {
        request
            .credential
            .as_ref()
            .is_some_and(|credential| credential.access_token() == "token-1")
    }));
}

#[tokio::test]
async fn turn_budget_limits_rounds_from_config() {
    let transport = Arc::new(RecordingTransport::default());
    let (mut bundle, _) = bundle_with_tokens(transport);
    assert!(bundle.budget.auto_invoke());

    let mut rounds = 0;
    while bundle.budget.try_consume() {
        let response = bundle
            .runtime
            .respond(mcp_call!(format!("call-{rounds}"), "secure_search", {"query": "vpn"}))
            .await
            .expect("call should answer");
        assert!(!response.is_fallback);
        rounds += 1;
    }

    assert_eq!(rounds, 5);
    assert_eq!(bundle.budget.remaining(), 0);
}

#[test]
fn fixture_declarations_list_enabled_functions() {
    let transport = Arc::new(RecordingTransport::default());
    let (bundle, _) = bundle_with_tokens(transport);

    let declarations = declarations_json(&bundle.registry());
    let names: Vec<_> = declarations
        .as_array()
        .expect("declarations array")
        .iter()
        .map(|entry| entry["function"]["name"].as_str().unwrap_or_default().to_string())
        .collect();

    assert_eq!(names, vec!["get_document", "secure_search"]);
}
