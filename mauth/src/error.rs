//! Authorization failures and their retry classification.
//!
//! ```rust
//! use mauth::AuthError;
//!
//! let forbidden = AuthError::forbidden("missing scope");
//! assert!(!forbidden.retryable);
//!
//! let refresh = AuthError::refresh_failed("token endpoint unavailable");
//! assert!(refresh.retryable);
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};

use mcommon::Retryable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    Unauthenticated,
    Forbidden,
    RefreshFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthError {
    pub kind: AuthErrorKind,
    pub message: String,
    pub retryable: bool,
}

impl AuthError {
    pub fn new(kind: AuthErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable,
        }
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(AuthErrorKind::Unauthenticated, message, false)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(AuthErrorKind::Forbidden, message, false)
    }

    pub fn refresh_failed(message: impl Into<String>) -> Self {
        Self::new(AuthErrorKind::RefreshFailed, message, true)
    }

    /// Marks the error as final once the retry budget is spent.
    pub fn into_terminal(mut self) -> Self {
        self.retryable = false;
        self
    }
}

impl Display for AuthError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for AuthError {}

impl Retryable for AuthError {
    fn is_retryable(&self) -> bool {
        self.retryable
    }
}
