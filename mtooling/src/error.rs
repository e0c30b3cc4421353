//! Tool invocation errors and their fallback categories.
//!
//! ```rust
//! use mtooling::{ToolError, ToolErrorKind};
//!
//! let error = ToolError::timeout("call exceeded 30s").with_tool_name("secure_search");
//! assert_eq!(error.kind, ToolErrorKind::Timeout);
//! assert_eq!(error.category(), "timeout_error");
//! assert!(error.retryable);
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};

use mauth::{AuthError, AuthErrorKind};
use mcommon::Retryable;
use mconfig::{
    FALLBACK_AUTH_ERROR, FALLBACK_CONNECTION_ERROR, FALLBACK_FORBIDDEN_ERROR,
    FALLBACK_NO_RESULTS, FALLBACK_TIMEOUT_ERROR,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolErrorKind {
    NotFound,
    Disabled,
    Validation,
    Unauthenticated,
    Forbidden,
    RefreshFailed,
    Connection,
    Timeout,
    Throttled,
    ShapeMismatch,
    Truncated,
    NoResults,
    Remote,
}

impl ToolErrorKind {
    /// Key used to look up a fallback message for this failure.
    pub fn category(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Disabled => "disabled",
            Self::Validation => "validation_error",
            Self::Unauthenticated | Self::RefreshFailed => FALLBACK_AUTH_ERROR,
            Self::Forbidden => FALLBACK_FORBIDDEN_ERROR,
            Self::Connection => FALLBACK_CONNECTION_ERROR,
            Self::Timeout => FALLBACK_TIMEOUT_ERROR,
            Self::Throttled => "throttled",
            Self::ShapeMismatch => "shape_mismatch",
            Self::Truncated => "truncated",
            Self::NoResults => FALLBACK_NO_RESULTS,
            Self::Remote => "remote_error",
        }
    }

    /// Kinds named by a category string, as reported by a remote error body.
    pub fn from_category(category: &str) -> Option<Self> {
        let kind = match category {
            FALLBACK_NO_RESULTS => Self::NoResults,
            FALLBACK_CONNECTION_ERROR => Self::Connection,
            FALLBACK_TIMEOUT_ERROR => Self::Timeout,
            FALLBACK_AUTH_ERROR => Self::Unauthenticated,
            FALLBACK_FORBIDDEN_ERROR => Self::Forbidden,
            "throttled" => Self::Throttled,
            _ => return None,
        };
        Some(kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolError {
    pub kind: ToolErrorKind,
    pub message: String,
    pub retryable: bool,
    pub tool_name: Option<String>,
    pub call_id: Option<String>,
    /// Argument the error refers to, for validation failures.
    pub field: Option<String>,
}

impl ToolError {
    pub fn new(kind: ToolErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable,
            tool_name: None,
            call_id: None,
            field: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::NotFound, message, false)
    }

    pub fn disabled(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Disabled, message, false)
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Validation, message, false).with_field(field)
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Unauthenticated, message, false)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Forbidden, message, false)
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Connection, message, true)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Timeout, message, true)
    }

    pub fn throttled(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Throttled, message, false)
    }

    pub fn shape_mismatch(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::ShapeMismatch, message, false)
    }

    pub fn truncated(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Truncated, message, false)
    }

    pub fn no_results(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::NoResults, message, false)
    }

    pub fn remote(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Remote, message, false)
    }

    /// Error of `kind` with that kind's usual retry behavior.
    pub fn of_kind(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        match kind {
            ToolErrorKind::NotFound => Self::not_found(message),
            ToolErrorKind::Disabled => Self::disabled(message),
            ToolErrorKind::Validation => Self::new(kind, message, false),
            ToolErrorKind::Unauthenticated => Self::unauthenticated(message),
            ToolErrorKind::Forbidden => Self::forbidden(message),
            ToolErrorKind::RefreshFailed => Self::new(kind, message, false),
            ToolErrorKind::Connection => Self::connection(message),
            ToolErrorKind::Timeout => Self::timeout(message),
            ToolErrorKind::Throttled => Self::throttled(message),
            ToolErrorKind::ShapeMismatch => Self::shape_mismatch(message),
            ToolErrorKind::Truncated => Self::truncated(message),
            ToolErrorKind::NoResults => Self::no_results(message),
            ToolErrorKind::Remote => Self::remote(message),
        }
    }

    pub fn with_tool_name(mut self, tool_name: impl Into<String>) -> Self {
        self.tool_name = Some(tool_name.into());
        self
    }

    pub fn with_call_id(mut self, call_id: impl Into<String>) -> Self {
        self.call_id = Some(call_id.into());
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn category(&self) -> &'static str {
        self.kind.category()
    }

    pub fn is_user_error(&self) -> bool {
        matches!(
            self.kind,
            ToolErrorKind::Validation | ToolErrorKind::NotFound | ToolErrorKind::Disabled
        )
    }

    pub(crate) fn into_terminal(mut self) -> Self {
        self.retryable = false;
        self
    }
}

impl Display for ToolError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match (&self.tool_name, &self.call_id) {
            (Some(tool_name), Some(call_id)) => write!(
                f,
                "{:?} [tool={}, call_id={}]: {}",
                self.kind, tool_name, call_id, self.message
            ),
            (Some(tool_name), None) => {
                write!(f, "{:?} [tool={}]: {}", self.kind, tool_name, self.message)
            }
            _ => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

impl Error for ToolError {}

impl Retryable for ToolError {
    fn is_retryable(&self) -> bool {
        self.retryable
    }
}

impl From<AuthError> for ToolError {
    fn from(value: AuthError) -> Self {
        let kind = match value.kind {
            AuthErrorKind::Unauthenticated => ToolErrorKind::Unauthenticated,
            AuthErrorKind::Forbidden => ToolErrorKind::Forbidden,
            AuthErrorKind::RefreshFailed => ToolErrorKind::RefreshFailed,
        };
        // The resolver has already spent its own retry budget.
        Self::new(kind, value.message, false)
    }
}
