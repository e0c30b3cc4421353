use std::sync::{Arc, Mutex};
use std::time::Duration;

use mauth::{AuthError, AuthHooks, AuthPhase};
use mconfig::{McpConfig, MonitoringConfig, SecurityConfig};
use mtooling::{DispatchHooks, InvocationRequest, InvocationResult, NormalizedAnswer, ToolError};
use serde_json::json;

use crate::{
    MetricsObservabilityHooks, ObservabilityHooks, REDACTED, Redactor, SafeAuthHooks,
    SafeDispatchHooks, TracingObservabilityHooks,
};

fn sample_request() -> InvocationRequest {
    InvocationRequest::new(
        "call-1",
        "secure_search",
        json!({"query": "vpn", "api_key": "sk-live"}),
    )
    .with_trace_id("trace-1")
}

fn sample_result() -> InvocationResult {
    InvocationResult {
        call_id: "call-1".into(),
        function: "secure_search".to_string(),
        answer: NormalizedAnswer::new(json!({"hits": 3})),
        attempts: 2,
        cached: false,
        latency: Duration::from_millis(20),
    }
}

fn exercise_dispatch(hooks: &dyn DispatchHooks) {
    let request = sample_request();
    let error = ToolError::timeout("tool timed out");

    hooks.on_invocation_start(&request);
    hooks.on_cache_hit(&request);
    hooks.on_retry_scheduled(&request, 1, Duration::from_millis(10), &error);
    hooks.on_invocation_success(&request, &sample_result());
    hooks.on_invocation_failure(&request, &error, Duration::from_millis(20));
    hooks.on_fallback(&request, &error);
}

fn exercise_auth(hooks: &dyn AuthHooks) {
    let error = AuthError::refresh_failed("token endpoint unavailable");

    hooks.on_acquire_start(AuthPhase::Authenticating);
    hooks.on_acquire_retry(1, Duration::from_millis(10), &error);
    hooks.on_acquire_success(AuthPhase::Refreshing, 2, Some(Duration::from_secs(3600)));
    hooks.on_acquire_failure(3, &error);
    hooks.on_forbidden(&AuthError::forbidden("missing scope"));
}

#[test]
fn tracing_hooks_smoke_test_all_callbacks() {
    let everything = MonitoringConfig {
        log_requests: true,
        log_responses: true,
        log_errors: true,
        metrics_enabled: false,
    };
    let hooks = TracingObservabilityHooks::new(everything, Redactor::new(["api_key"]));

    exercise_dispatch(&hooks);
    exercise_auth(&hooks);
}

#[test]
fn tracing_hooks_respect_disabled_monitoring_flags() {
    let quiet = MonitoringConfig {
        log_requests: false,
        log_responses: false,
        log_errors: false,
        metrics_enabled: false,
    };
    let hooks = TracingObservabilityHooks::new(quiet, Redactor::default());

    exercise_dispatch(&hooks);
    exercise_auth(&hooks);
    assert!(!hooks.monitoring().log_requests);
}

#[test]
fn metrics_hooks_smoke_test_all_callbacks() {
    let hooks = MetricsObservabilityHooks;

    exercise_dispatch(&hooks);
    exercise_auth(&hooks);
}

#[test]
fn observability_hooks_gate_metrics_on_config() {
    let mut config = McpConfig::default();
    assert!(!ObservabilityHooks::from_config(&config).metrics_enabled());

    config.monitoring.metrics_enabled = true;
    let hooks = ObservabilityHooks::from_config(&config);
    assert!(hooks.metrics_enabled());

    exercise_dispatch(&hooks);
    exercise_auth(&hooks);
}

#[test]
fn redactor_masks_sensitive_keys_at_any_depth() {
    let redactor = Redactor::from_config(&SecurityConfig {
        sensitive_params: vec!["ssn".to_string(), "Token".to_string()],
        ..SecurityConfig::default()
    });

    let masked = redactor.redact(&json!({
        "query": "benefits",
        "SSN": "123-45-6789",
        "filters": [{"token": "abc", "kind": "policy"}],
        "nested": {"inner": {"ssn": 42}},
    }));

    assert_eq!(
        masked,
        json!({
            "query": "benefits",
            "SSN": REDACTED,
            "filters": [{"token": REDACTED, "kind": "policy"}],
            "nested": {"inner": {"ssn": REDACTED}},
        })
    );
    assert!(redactor.is_sensitive("TOKEN"));
    assert!(!redactor.is_sensitive("query"));
}

#[test]
fn redactor_leaves_scalars_untouched() {
    let redactor = Redactor::new(["password"]);
    assert_eq!(redactor.redact(&json!("password")), json!("password"));
    assert_eq!(redactor.redact(&json!(null)), json!(null));
}

#[derive(Default, Clone)]
struct RecordingDispatchHooks {
    events: Arc<Mutex<Vec<&'static str>>>,
}

impl DispatchHooks for RecordingDispatchHooks {
    fn on_invocation_start(&self, _request: &InvocationRequest) {
        self.events.lock().expect("events lock").push("start");
    }

    fn on_cache_hit(&self, _request: &InvocationRequest) {
        self.events.lock().expect("events lock").push("cache_hit");
    }

    fn on_retry_scheduled(
        &self,
        _request: &InvocationRequest,
        _attempt: u32,
        _delay: Duration,
        _error: &ToolError,
    ) {
        self.events
            .lock()
            .expect("events lock")
            .push("retry_scheduled");
    }

    fn on_invocation_success(&self, _request: &InvocationRequest, _result: &InvocationResult) {
        self.events.lock().expect("events lock").push("success");
    }

    fn on_invocation_failure(
        &self,
        _request: &InvocationRequest,
        _error: &ToolError,
        _elapsed: Duration,
    ) {
        self.events.lock().expect("events lock").push("failure");
    }

    fn on_fallback(&self, _request: &InvocationRequest, _error: &ToolError) {
        self.events.lock().expect("events lock").push("fallback");
    }
}

#[derive(Default, Clone)]
struct RecordingAuthHooks {
    events: Arc<Mutex<Vec<&'static str>>>,
}

impl AuthHooks for RecordingAuthHooks {
    fn on_acquire_start(&self, _phase: AuthPhase) {
        self.events.lock().expect("events lock").push("start");
    }

    fn on_acquire_retry(&self, _attempt: u32, _delay: Duration, _error: &AuthError) {
        self.events.lock().expect("events lock").push("retry");
    }

    fn on_acquire_success(&self, _phase: AuthPhase, _attempts: u32, _expires_in: Option<Duration>) {
        self.events.lock().expect("events lock").push("success");
    }

    fn on_acquire_failure(&self, _attempts: u32, _error: &AuthError) {
        self.events.lock().expect("events lock").push("failure");
    }

    fn on_forbidden(&self, _error: &AuthError) {
        self.events.lock().expect("events lock").push("forbidden");
    }
}

struct PanicDispatchHooks;

impl DispatchHooks for PanicDispatchHooks {
    fn on_invocation_start(&self, _request: &InvocationRequest) {
        panic!("start panic");
    }

    fn on_cache_hit(&self, _request: &InvocationRequest) {
        panic!("cache hit panic");
    }

    fn on_retry_scheduled(
        &self,
        _request: &InvocationRequest,
        _attempt: u32,
        _delay: Duration,
        _error: &ToolError,
    ) {
        panic!("retry panic");
    }

    fn on_invocation_success(&self, _request: &InvocationRequest, _result: &InvocationResult) {
        panic!("success panic");
    }

    fn on_invocation_failure(
        &self,
        _request: &InvocationRequest,
        _error: &ToolError,
        _elapsed: Duration,
    ) {
        panic!("failure panic");
    }

    fn on_fallback(&self, _request: &InvocationRequest, _error: &ToolError) {
        panic!("fallback panic");
    }
}

struct PanicAuthHooks;

impl AuthHooks for PanicAuthHooks {
    fn on_acquire_start(&self, _phase: AuthPhase) {
        panic!("start panic");
    }

    fn on_acquire_retry(&self, _attempt: u32, _delay: Duration, _error: &AuthError) {
        panic!("retry panic");
    }

    fn on_acquire_success(&self, _phase: AuthPhase, _attempts: u32, _expires_in: Option<Duration>) {
        panic!("success panic");
    }

    fn on_acquire_failure(&self, _attempts: u32, _error: &AuthError) {
        panic!("failure panic");
    }

    fn on_forbidden(&self, _error: &AuthError) {
        panic!("forbidden panic");
    }
}

#[test]
fn safe_dispatch_hooks_delegate_when_inner_succeeds() {
    let inner = RecordingDispatchHooks::default();
    let events = Arc::clone(&inner.events);
    let hooks = SafeDispatchHooks::new(inner);

    exercise_dispatch(&hooks);

    assert_eq!(
        *events.lock().expect("events lock"),
        vec![
            "start",
            "cache_hit",
            "retry_scheduled",
            "success",
            "failure",
            "fallback"
        ]
    );
}

#[test]
fn safe_auth_hooks_delegate_when_inner_succeeds() {
    let inner = RecordingAuthHooks::default();
    let events = Arc::clone(&inner.events);
    let hooks = SafeAuthHooks::new(inner);

    exercise_auth(&hooks);

    assert_eq!(events.lock().expect("events lock").len(), 5);
}

#[test]
fn safe_dispatch_hooks_swallow_panics() {
    let hooks = SafeDispatchHooks::new(PanicDispatchHooks);
    exercise_dispatch(&hooks);
}

#[test]
fn safe_auth_hooks_swallow_panics() {
    let hooks = SafeAuthHooks::new(PanicAuthHooks);
    exercise_auth(&hooks);
}
