//! Metrics-based observability hooks for dispatch and authorization.
//!
//! ```rust
//! use mobserve::MetricsObservabilityHooks;
//! use mtooling::DispatchHooks;
//!
//! fn accepts_dispatch_hooks(_hooks: &dyn DispatchHooks) {}
//!
//! let hooks = MetricsObservabilityHooks;
//! accepts_dispatch_hooks(&hooks);
//! ```

use std::time::Duration;

use mauth::{AuthError, AuthHooks, AuthPhase};
use mtooling::{DispatchHooks, InvocationRequest, InvocationResult, ToolError};

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsObservabilityHooks;

impl DispatchHooks for MetricsObservabilityHooks {
    fn on_invocation_start(&self, request: &InvocationRequest) {
        metrics::counter!(
            "mcpwire_dispatch_invocation_start_total",
            "function" => request.function.clone()
        )
        .increment(1);
    }

    fn on_cache_hit(&self, request: &InvocationRequest) {
        metrics::counter!(
            "mcpwire_dispatch_cache_hit_total",
            "function" => request.function.clone()
        )
        .increment(1);
    }

    fn on_retry_scheduled(
        &self,
        request: &InvocationRequest,
        _attempt: u32,
        delay: Duration,
        error: &ToolError,
    ) {
        metrics::counter!(
            "mcpwire_dispatch_retry_scheduled_total",
            "function" => request.function.clone(),
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
        metrics::histogram!(
            "mcpwire_dispatch_retry_delay_seconds",
            "function" => request.function.clone()
        )
        .record(delay.as_secs_f64());
    }

    fn on_invocation_success(&self, request: &InvocationRequest, result: &InvocationResult) {
        metrics::counter!(
            "mcpwire_dispatch_success_total",
            "function" => request.function.clone(),
            "cached" => result.cached.to_string()
        )
        .increment(1);
        metrics::histogram!(
            "mcpwire_dispatch_duration_seconds",
            "function" => request.function.clone(),
            "status" => "success"
        )
        .record(result.latency.as_secs_f64());
        if result.answer.truncated {
            metrics::counter!(
                "mcpwire_dispatch_truncated_total",
                "function" => request.function.clone()
            )
            .increment(1);
        }
        if !result.cached {
            metrics::histogram!(
                "mcpwire_dispatch_attempts_per_success",
                "function" => request.function.clone()
            )
            .record(result.attempts as f64);
        }
    }

    fn on_invocation_failure(
        &self,
        request: &InvocationRequest,
        error: &ToolError,
        elapsed: Duration,
    ) {
        metrics::counter!(
            "mcpwire_dispatch_failure_total",
            "function" => request.function.clone(),
            "category" => error.category()
        )
        .increment(1);
        metrics::histogram!(
            "mcpwire_dispatch_duration_seconds",
            "function" => request.function.clone(),
            "status" => "failure"
        )
        .record(elapsed.as_secs_f64());
    }

    fn on_fallback(&self, _request: &InvocationRequest, error: &ToolError) {
        metrics::counter!("mcpwire_dispatch_fallback_total", "category" => error.category())
            .increment(1);
    }
}

impl AuthHooks for MetricsObservabilityHooks {
    fn on_acquire_start(&self, phase: AuthPhase) {
        metrics::counter!("mcpwire_auth_acquire_start_total", "phase" => format!("{:?}", phase))
            .increment(1);
    }

    fn on_acquire_retry(&self, _attempt: u32, delay: Duration, error: &AuthError) {
        metrics::counter!(
            "mcpwire_auth_acquire_retry_total",
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
        metrics::histogram!("mcpwire_auth_retry_delay_seconds").record(delay.as_secs_f64());
    }

    fn on_acquire_success(&self, phase: AuthPhase, attempts: u32, _expires_in: Option<Duration>) {
        metrics::counter!("mcpwire_auth_acquire_success_total", "phase" => format!("{:?}", phase))
            .increment(1);
        metrics::histogram!("mcpwire_auth_attempts_per_success").record(attempts as f64);
    }

    fn on_acquire_failure(&self, _attempts: u32, error: &AuthError) {
        metrics::counter!(
            "mcpwire_auth_acquire_failure_total",
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
    }

    fn on_forbidden(&self, _error: &AuthError) {
        metrics::counter!("mcpwire_auth_forbidden_total").increment(1);
    }
}
