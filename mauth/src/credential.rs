//! Secret handling and the credential handed to the dispatcher.

use std::collections::BTreeSet;
use std::sync::Arc;

use mconfig::AuthLevel;
use tokio::time::Instant;

use crate::AuthError;

#[derive(PartialEq, Eq)]
pub struct SecretString {
    value: String,
}

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn expose(&self) -> &str {
        self.value.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl Drop for SecretString {
    fn drop(&mut self) {
        // SAFETY: zero bytes are valid UTF-8 and the string is never read again.
        unsafe {
            self.value.as_mut_vec().fill(0);
        }
    }
}

/// What a tool demands from the credential before it may be dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthRequirement {
    pub required_scopes: BTreeSet<String>,
    pub min_level: Option<AuthLevel>,
}

impl AuthRequirement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.required_scopes.insert(scope.into());
        self
    }

    pub fn with_scopes(mut self, scopes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.required_scopes
            .extend(scopes.into_iter().map(Into::into));
        self
    }

    pub fn with_min_level(mut self, level: AuthLevel) -> Self {
        self.min_level = Some(level);
        self
    }
}

/// An access token plus what it grants. Cheap to clone; the secret is shared.
#[derive(Clone)]
pub struct Credential {
    token: Arc<SecretString>,
    pub scopes: BTreeSet<String>,
    pub level: AuthLevel,
    pub issued_at: Instant,
    pub expires_at: Option<Instant>,
}

impl Credential {
    pub fn new(
        token: SecretString,
        scopes: impl IntoIterator<Item = impl Into<String>>,
        level: AuthLevel,
        issued_at: Instant,
        expires_at: Option<Instant>,
    ) -> Self {
        Self {
            token: Arc::new(token),
            scopes: scopes.into_iter().map(Into::into).collect(),
            level,
            issued_at,
            expires_at,
        }
    }

    pub fn access_token(&self) -> &str {
        self.token.expose()
    }

    /// Scope subset and minimum level check; failures are never retried.
    pub fn check(&self, requirement: &AuthRequirement) -> Result<(), AuthError> {
        if let Some(min_level) = requirement.min_level {
            if self.level < min_level {
                return Err(AuthError::forbidden(format!(
                    "credential level {:?} is below required {:?}",
                    self.level, min_level
                )));
            }
        }

        let missing = requirement
            .required_scopes
            .difference(&self.scopes)
            .cloned()
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(AuthError::forbidden(format!(
                "credential is missing required scopes: {}",
                missing.join(", ")
            )));
        }

        Ok(())
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"[REDACTED]")
            .field("scopes", &self.scopes)
            .field("level", &self.level)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
