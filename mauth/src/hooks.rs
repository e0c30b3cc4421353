//! Lifecycle hooks for credential acquisition.

use std::time::Duration;

use crate::{AuthError, AuthPhase};

pub trait AuthHooks: Send + Sync {
    fn on_acquire_start(&self, _phase: AuthPhase) {}

    fn on_acquire_retry(&self, _attempt: u32, _delay: Duration, _error: &AuthError) {}

    fn on_acquire_success(&self, _phase: AuthPhase, _attempts: u32, _expires_in: Option<Duration>) {
    }

    fn on_acquire_failure(&self, _attempts: u32, _error: &AuthError) {}

    fn on_forbidden(&self, _error: &AuthError) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAuthHooks;

impl AuthHooks for NoopAuthHooks {}
