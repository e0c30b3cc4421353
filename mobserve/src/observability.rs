//! The hook set a runtime built from a configuration document installs.

use std::time::Duration;

use mauth::{AuthError, AuthHooks, AuthPhase};
use mconfig::McpConfig;
use mtooling::{DispatchHooks, InvocationRequest, InvocationResult, ToolError};

use crate::{MetricsObservabilityHooks, TracingObservabilityHooks};

/// Tracing always, metrics only when `monitoring.metrics_enabled` is set.
#[derive(Debug, Clone, Default)]
pub struct ObservabilityHooks {
    tracing: TracingObservabilityHooks,
    metrics: Option<MetricsObservabilityHooks>,
}

impl ObservabilityHooks {
    pub fn new(tracing: TracingObservabilityHooks, metrics_enabled: bool) -> Self {
        Self {
            tracing,
            metrics: metrics_enabled.then_some(MetricsObservabilityHooks),
        }
    }

    pub fn from_config(config: &McpConfig) -> Self {
        Self::new(
            TracingObservabilityHooks::from_config(config),
            config.monitoring.metrics_enabled,
        )
    }

    pub fn metrics_enabled(&self) -> bool {
        self.metrics.is_some()
    }
}

impl DispatchHooks for ObservabilityHooks {
    fn on_invocation_start(&self, request: &InvocationRequest) {
        self.tracing.on_invocation_start(request);
        if let Some(metrics) = &self.metrics {
            metrics.on_invocation_start(request);
        }
    }

    fn on_cache_hit(&self, request: &InvocationRequest) {
        self.tracing.on_cache_hit(request);
        if let Some(metrics) = &self.metrics {
            metrics.on_cache_hit(request);
        }
    }

    fn on_retry_scheduled(
        &self,
        request: &InvocationRequest,
        attempt: u32,
        delay: Duration,
        error: &ToolError,
    ) {
        self.tracing
            .on_retry_scheduled(request, attempt, delay, error);
        if let Some(metrics) = &self.metrics {
            metrics.on_retry_scheduled(request, attempt, delay, error);
        }
    }

    fn on_invocation_success(&self, request: &InvocationRequest, result: &InvocationResult) {
        self.tracing.on_invocation_success(request, result);
        if let Some(metrics) = &self.metrics {
            metrics.on_invocation_success(request, result);
        }
    }

    fn on_invocation_failure(
        &self,
        request: &InvocationRequest,
        error: &ToolError,
        elapsed: Duration,
    ) {
        self.tracing.on_invocation_failure(request, error, elapsed);
        if let Some(metrics) = &self.metrics {
            metrics.on_invocation_failure(request, error, elapsed);
        }
    }

    fn on_fallback(&self, request: &InvocationRequest, error: &ToolError) {
        self.tracing.on_fallback(request, error);
        if let Some(metrics) = &self.metrics {
            metrics.on_fallback(request, error);
        }
    }
}

impl AuthHooks for ObservabilityHooks {
    fn on_acquire_start(&self, phase: AuthPhase) {
        self.tracing.on_acquire_start(phase);
        if let Some(metrics) = &self.metrics {
            metrics.on_acquire_start(phase);
        }
    }

    fn on_acquire_retry(&self, attempt: u32, delay: Duration, error: &AuthError) {
        self.tracing.on_acquire_retry(attempt, delay, error);
        if let Some(metrics) = &self.metrics {
            metrics.on_acquire_retry(attempt, delay, error);
        }
    }

    fn on_acquire_success(&self, phase: AuthPhase, attempts: u32, expires_in: Option<Duration>) {
        self.tracing.on_acquire_success(phase, attempts, expires_in);
        if let Some(metrics) = &self.metrics {
            metrics.on_acquire_success(phase, attempts, expires_in);
        }
    }

    fn on_acquire_failure(&self, attempts: u32, error: &AuthError) {
        self.tracing.on_acquire_failure(attempts, error);
        if let Some(metrics) = &self.metrics {
            metrics.on_acquire_failure(attempts, error);
        }
    }

    fn on_forbidden(&self, error: &AuthError) {
        self.tracing.on_forbidden(error);
        if let Some(metrics) = &self.metrics {
            metrics.on_forbidden(error);
        }
    }
}
