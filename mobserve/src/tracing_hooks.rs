//! Tracing-based observability hooks for dispatch and authorization.
//!
//! ```rust
//! use mauth::AuthHooks;
//! use mobserve::TracingObservabilityHooks;
//!
//! fn accepts_auth_hooks(_hooks: &dyn AuthHooks) {}
//!
//! let hooks = TracingObservabilityHooks::default();
//! accepts_auth_hooks(&hooks);
//! ```

use std::time::Duration;

use mauth::{AuthError, AuthHooks, AuthPhase};
use mconfig::{McpConfig, MonitoringConfig};
use mtooling::{DispatchHooks, InvocationRequest, InvocationResult, ToolError};

use crate::Redactor;

/// Emits one event per lifecycle step. Requests, responses, and errors are
/// each switched by the matching `monitoring` flag.
#[derive(Debug, Clone, Default)]
pub struct TracingObservabilityHooks {
    monitoring: MonitoringConfig,
    redactor: Redactor,
}

impl TracingObservabilityHooks {
    pub fn new(monitoring: MonitoringConfig, redactor: Redactor) -> Self {
        Self {
            monitoring,
            redactor,
        }
    }

    pub fn from_config(config: &McpConfig) -> Self {
        Self::new(config.monitoring, Redactor::from_config(&config.security))
    }

    pub fn monitoring(&self) -> MonitoringConfig {
        self.monitoring
    }
}

impl DispatchHooks for TracingObservabilityHooks {
    fn on_invocation_start(&self, request: &InvocationRequest) {
        if !self.monitoring.log_requests {
            return;
        }
        tracing::info!(
            phase = "dispatch",
            event = "invocation_start",
            function = request.function,
            call_id = %request.call_id,
            trace_id = request.trace_id.as_ref().map(|id| id.as_str()),
            arguments = %self.redactor.redact(&request.arguments)
        );
    }

    fn on_cache_hit(&self, request: &InvocationRequest) {
        if !self.monitoring.log_requests {
            return;
        }
        tracing::debug!(
            phase = "dispatch",
            event = "cache_hit",
            function = request.function,
            call_id = %request.call_id
        );
    }

    fn on_retry_scheduled(
        &self,
        request: &InvocationRequest,
        attempt: u32,
        delay: Duration,
        error: &ToolError,
    ) {
        if !self.monitoring.log_errors {
            return;
        }
        tracing::warn!(
            phase = "dispatch",
            event = "retry_scheduled",
            function = request.function,
            call_id = %request.call_id,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error_kind = ?error.kind,
            retryable = error.retryable,
            error = %error
        );
    }

    fn on_invocation_success(&self, request: &InvocationRequest, result: &InvocationResult) {
        if self.monitoring.log_responses {
            tracing::info!(
                phase = "dispatch",
                event = "invocation_success",
                function = request.function,
                call_id = %request.call_id,
                attempts = result.attempts,
                cached = result.cached,
                truncated = result.answer.truncated,
                elapsed_ms = result.latency.as_millis() as u64,
                answer = %self.redactor.redact(&result.answer.value)
            );
        } else if self.monitoring.log_requests {
            tracing::info!(
                phase = "dispatch",
                event = "invocation_success",
                function = request.function,
                call_id = %request.call_id,
                attempts = result.attempts,
                cached = result.cached,
                truncated = result.answer.truncated,
                elapsed_ms = result.latency.as_millis() as u64
            );
        }
    }

    fn on_invocation_failure(
        &self,
        request: &InvocationRequest,
        error: &ToolError,
        elapsed: Duration,
    ) {
        if !self.monitoring.log_errors {
            return;
        }
        tracing::error!(
            phase = "dispatch",
            event = "invocation_failure",
            function = request.function,
            call_id = %request.call_id,
            trace_id = request.trace_id.as_ref().map(|id| id.as_str()),
            elapsed_ms = elapsed.as_millis() as u64,
            error_kind = ?error.kind,
            category = error.category(),
            field = error.field.as_deref(),
            retryable = error.retryable,
            error = %error
        );
    }

    fn on_fallback(&self, request: &InvocationRequest, error: &ToolError) {
        if !self.monitoring.log_errors {
            return;
        }
        tracing::warn!(
            phase = "fallback",
            event = "fallback_applied",
            function = request.function,
            call_id = %request.call_id,
            category = error.category()
        );
    }
}

impl AuthHooks for TracingObservabilityHooks {
    fn on_acquire_start(&self, phase: AuthPhase) {
        if !self.monitoring.log_requests {
            return;
        }
        tracing::info!(phase = "auth", event = "acquire_start", auth_phase = ?phase);
    }

    fn on_acquire_retry(&self, attempt: u32, delay: Duration, error: &AuthError) {
        if !self.monitoring.log_errors {
            return;
        }
        tracing::warn!(
            phase = "auth",
            event = "acquire_retry",
            attempt,
            delay_ms = delay.as_millis() as u64,
            error_kind = ?error.kind,
            error = %error
        );
    }

    fn on_acquire_success(&self, phase: AuthPhase, attempts: u32, expires_in: Option<Duration>) {
        if !self.monitoring.log_requests {
            return;
        }
        tracing::info!(
            phase = "auth",
            event = "acquire_success",
            auth_phase = ?phase,
            attempts,
            expires_in_secs = expires_in.map(|expires_in| expires_in.as_secs())
        );
    }

    fn on_acquire_failure(&self, attempts: u32, error: &AuthError) {
        if !self.monitoring.log_errors {
            return;
        }
        tracing::error!(
            phase = "auth",
            event = "acquire_failure",
            attempts,
            error_kind = ?error.kind,
            retryable = error.retryable,
            error = %error
        );
    }

    fn on_forbidden(&self, error: &AuthError) {
        if !self.monitoring.log_errors {
            return;
        }
        tracing::warn!(phase = "auth", event = "forbidden", error = %error);
    }
}
