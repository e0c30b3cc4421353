//! Lifecycle hooks for tool invocations.
//!
//! ```rust
//! use mtooling::{DispatchHooks, NoopDispatchHooks};
//!
//! fn assert_hooks_trait(_hooks: &dyn DispatchHooks) {}
//!
//! let hooks = NoopDispatchHooks;
//! assert_hooks_trait(&hooks);
//! ```

use std::time::Duration;

use crate::{InvocationRequest, InvocationResult, ToolError};

pub trait DispatchHooks: Send + Sync {
    fn on_invocation_start(&self, _request: &InvocationRequest) {}

    fn on_cache_hit(&self, _request: &InvocationRequest) {}

    fn on_retry_scheduled(
        &self,
        _request: &InvocationRequest,
        _attempt: u32,
        _delay: Duration,
        _error: &ToolError,
    ) {
    }

    fn on_invocation_success(&self, _request: &InvocationRequest, _result: &InvocationResult) {}

    fn on_invocation_failure(
        &self,
        _request: &InvocationRequest,
        _error: &ToolError,
        _elapsed: Duration,
    ) {
    }

    fn on_fallback(&self, _request: &InvocationRequest, _error: &ToolError) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDispatchHooks;

impl DispatchHooks for NoopDispatchHooks {}
