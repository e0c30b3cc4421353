//! Authorization Resolver: keeps one process-wide credential fresh and scoped.
//!
//! Phases follow `Unauthenticated → Authenticating → Authenticated → Expiring →
//! Refreshing → Authenticated | Failed`. A credential older than
//! `max_token_age` is `Failed` even when its expiry is still ahead.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use mcommon::{RetryPolicy, execute_with_retry};
use mconfig::{AuthLevel, AuthorizationConfig, McpConfig};
use tokio::time::Instant;

use crate::{
    AuthError, AuthHooks, AuthRequirement, Credential, NoopAuthHooks, TokenSource,
    token_source_from_config,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthPhase {
    Unauthenticated,
    Authenticating,
    Authenticated,
    Expiring,
    Refreshing,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthPolicy {
    pub refresh_threshold: Duration,
    pub max_token_age: Duration,
    pub retry: RetryPolicy,
    /// Scopes assumed granted when the issuer does not report any.
    pub default_scopes: Vec<String>,
    pub level: AuthLevel,
}

impl Default for AuthPolicy {
    fn default() -> Self {
        Self {
            refresh_threshold: Duration::from_secs(300),
            max_token_age: Duration::from_secs(3600),
            retry: RetryPolicy::fixed(2, Duration::from_secs(1)),
            default_scopes: Vec::new(),
            level: AuthLevel::default(),
        }
    }
}

impl AuthPolicy {
    pub fn from_config(config: &McpConfig) -> Self {
        let (default_scopes, level) = match &config.mcp_server.authorization {
            AuthorizationConfig::None => (Vec::new(), AuthLevel::Anonymous),
            AuthorizationConfig::Bearer {
                scopes, auth_level, ..
            }
            | AuthorizationConfig::Oauth2 {
                scopes, auth_level, ..
            } => (scopes.clone(), *auth_level),
        };
        let auth_retry = &config.error_handling.auth_retry;

        Self {
            refresh_threshold: config.security.token_refresh_threshold(),
            max_token_age: config.security.max_token_age(),
            retry: RetryPolicy::fixed(auth_retry.effective_retries(), auth_retry.retry_delay()),
            default_scopes,
            level,
        }
    }

    /// Phase of `credential` at `now`, ignoring any acquisition in flight.
    pub fn classify(&self, credential: &Credential, now: Instant) -> AuthPhase {
        if now.saturating_duration_since(credential.issued_at) > self.max_token_age {
            return AuthPhase::Failed;
        }

        match credential.expires_at {
            Some(expires_at)
                if expires_at.saturating_duration_since(now) <= self.refresh_threshold =>
            {
                AuthPhase::Expiring
            }
            _ => AuthPhase::Authenticated,
        }
    }
}

#[derive(Default)]
struct AuthState {
    credential: Option<Credential>,
    in_flight: Option<AuthPhase>,
    last_error: Option<AuthError>,
    generation: u64,
}

pub struct AuthorizationResolver {
    source: Box<dyn TokenSource>,
    policy: AuthPolicy,
    state: Mutex<AuthState>,
    acquire: tokio::sync::Mutex<()>,
    hooks: Arc<dyn AuthHooks>,
}

impl AuthorizationResolver {
    pub fn new(source: Box<dyn TokenSource>, policy: AuthPolicy) -> Self {
        Self {
            source,
            policy,
            state: Mutex::new(AuthState::default()),
            acquire: tokio::sync::Mutex::new(()),
            hooks: Arc::new(NoopAuthHooks),
        }
    }

    /// Resolver for the document's authorization block; `None` when disabled.
    pub fn from_config(config: &McpConfig) -> Result<Option<Self>, AuthError> {
        let source = token_source_from_config(
            &config.mcp_server.authorization,
            &config.security,
            config.mcp_server.timeout(),
        )?;

        Ok(source.map(|source| Self::new(source, AuthPolicy::from_config(config))))
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn AuthHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn policy(&self) -> &AuthPolicy {
        &self.policy
    }

    pub fn phase(&self) -> AuthPhase {
        let Ok(state) = self.state.lock() else {
            return AuthPhase::Failed;
        };

        if let Some(phase) = state.in_flight {
            return phase;
        }

        match &state.credential {
            Some(credential) => self.policy.classify(credential, Instant::now()),
            None if state.last_error.is_some() => AuthPhase::Failed,
            None => AuthPhase::Unauthenticated,
        }
    }

    /// Drops the cached credential so the next call re-authenticates.
    pub fn invalidate(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.credential = None;
            state.last_error = None;
            state.generation += 1;
        }
    }

    /// Returns a fresh credential that satisfies `requirement`, renewing it
    /// first when it is missing, inside the refresh window, or too old.
    ///
    /// Renewals are serialized; callers that queued behind a renewal reuse
    /// its outcome, success or failure, instead of starting another one.
    pub async fn ensure_authorized(
        &self,
        requirement: &AuthRequirement,
    ) -> Result<Credential, AuthError> {
        let observed = {
            let state = self.lock_state()?;
            if let Some(credential) = self.usable(&state) {
                return self.authorize(credential, requirement);
            }
            state.generation
        };

        let _acquire = self.acquire.lock().await;

        let phase = {
            let mut state = self.lock_state()?;
            if state.generation != observed {
                if let Some(credential) = self.usable(&state) {
                    return self.authorize(credential, requirement);
                }
                if let Some(error) = &state.last_error {
                    return Err(error.clone());
                }
            }

            let phase = if state.credential.is_some() {
                AuthPhase::Refreshing
            } else {
                AuthPhase::Authenticating
            };
            state.in_flight = Some(phase);
            phase
        };

        self.hooks.on_acquire_start(phase);
        let hooks = Arc::clone(&self.hooks);
        let outcome = execute_with_retry(
            &self.policy.retry,
            |_| self.source.fetch(),
            |attempt, delay, error: &AuthError| hooks.on_acquire_retry(attempt, delay, error),
            tokio::time::sleep,
        )
        .await;

        let mut state = self.lock_state()?;
        state.in_flight = None;
        state.generation += 1;

        match outcome.result {
            Ok(issued) => {
                let now = Instant::now();
                let expires_in = issued.expires_in;
                if expires_in == Some(Duration::ZERO) {
                    let error = AuthError::refresh_failed("issued token is already expired")
                        .into_terminal();
                    state.credential = None;
                    state.last_error = Some(error.clone());
                    drop(state);
                    self.hooks.on_acquire_failure(outcome.attempts, &error);
                    return Err(error);
                }

                let scopes = issued
                    .scopes
                    .unwrap_or_else(|| self.policy.default_scopes.clone());
                let credential = Credential::new(
                    issued.access_token,
                    scopes,
                    self.policy.level,
                    now,
                    // Past the clock's range means no expiry; max_token_age still applies.
                    expires_in.and_then(|lifetime| now.checked_add(lifetime)),
                );
                state.credential = Some(credential.clone());
                state.last_error = None;
                drop(state);

                self.hooks
                    .on_acquire_success(phase, outcome.attempts, expires_in);
                self.authorize(credential, requirement)
            }
            Err(error) => {
                let error = error.into_terminal();
                state.credential = None;
                state.last_error = Some(error.clone());
                drop(state);

                self.hooks.on_acquire_failure(outcome.attempts, &error);
                Err(error)
            }
        }
    }

    fn usable(&self, state: &AuthState) -> Option<Credential> {
        state
            .credential
            .as_ref()
            .filter(|credential| {
                self.policy.classify(credential, Instant::now()) == AuthPhase::Authenticated
            })
            .cloned()
    }

    fn authorize(
        &self,
        credential: Credential,
        requirement: &AuthRequirement,
    ) -> Result<Credential, AuthError> {
        match credential.check(requirement) {
            Ok(()) => Ok(credential),
            Err(error) => {
                self.hooks.on_forbidden(&error);
                Err(error)
            }
        }
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, AuthState>, AuthError> {
        self.state
            .lock()
            .map_err(|_| AuthError::unauthenticated("authorization state lock poisoned"))
    }
}

impl std::fmt::Debug for AuthorizationResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationResolver")
            .field("policy", &self.policy)
            .field("phase", &self.phase())
            .finish()
    }
}
