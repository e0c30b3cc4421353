use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use mauth::{AuthError, AuthHooks, AuthPhase};
use mtooling::{DispatchHooks, InvocationRequest, InvocationResult, ToolError};

pub struct SafeDispatchHooks<H> {
    inner: H,
}

impl<H> SafeDispatchHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> DispatchHooks for SafeDispatchHooks<H>
where
    H: DispatchHooks,
{
    fn on_invocation_start(&self, request: &InvocationRequest) {
        let _ = catch_unwind(AssertUnwindSafe(|| self.inner.on_invocation_start(request)));
    }

    fn on_cache_hit(&self, request: &InvocationRequest) {
        let _ = catch_unwind(AssertUnwindSafe(|| self.inner.on_cache_hit(request)));
    }

    fn on_retry_scheduled(
        &self,
        request: &InvocationRequest,
        attempt: u32,
        delay: Duration,
        error: &ToolError,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_retry_scheduled(request, attempt, delay, error)
        }));
    }

    fn on_invocation_success(&self, request: &InvocationRequest, result: &InvocationResult) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_invocation_success(request, result)
        }));
    }

    fn on_invocation_failure(
        &self,
        request: &InvocationRequest,
        error: &ToolError,
        elapsed: Duration,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_invocation_failure(request, error, elapsed)
        }));
    }

    fn on_fallback(&self, request: &InvocationRequest, error: &ToolError) {
        let _ = catch_unwind(AssertUnwindSafe(|| self.inner.on_fallback(request, error)));
    }
}

pub struct SafeAuthHooks<H> {
    inner: H,
}

impl<H> SafeAuthHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> AuthHooks for SafeAuthHooks<H>
where
    H: AuthHooks,
{
    fn on_acquire_start(&self, phase: AuthPhase) {
        let _ = catch_unwind(AssertUnwindSafe(|| self.inner.on_acquire_start(phase)));
    }

    fn on_acquire_retry(&self, attempt: u32, delay: Duration, error: &AuthError) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_acquire_retry(attempt, delay, error)
        }));
    }

    fn on_acquire_success(&self, phase: AuthPhase, attempts: u32, expires_in: Option<Duration>) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_acquire_success(phase, attempts, expires_in)
        }));
    }

    fn on_acquire_failure(&self, attempts: u32, error: &AuthError) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_acquire_failure(attempts, error)
        }));
    }

    fn on_forbidden(&self, error: &AuthError) {
        let _ = catch_unwind(AssertUnwindSafe(|| self.inner.on_forbidden(error)));
    }
}
