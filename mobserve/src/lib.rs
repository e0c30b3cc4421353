//! Observability hooks for dispatch and authorization phases.
//!
//! ```rust
//! use mobserve::{
//!     MetricsObservabilityHooks, SafeAuthHooks, SafeDispatchHooks, TracingObservabilityHooks,
//! };
//!
//! let _dispatch_hooks = SafeDispatchHooks::new(TracingObservabilityHooks::default());
//! let _auth_hooks = SafeAuthHooks::new(MetricsObservabilityHooks);
//! ```

mod metrics_hooks;
mod observability;
mod redact;
mod safe_hooks;
mod tracing_hooks;

pub use metrics_hooks::MetricsObservabilityHooks;
pub use observability::ObservabilityHooks;
pub use redact::{REDACTED, Redactor};
pub use safe_hooks::{SafeAuthHooks, SafeDispatchHooks};
pub use tracing_hooks::TracingObservabilityHooks;

pub mod prelude {
    pub use crate::{
        MetricsObservabilityHooks, ObservabilityHooks, Redactor, SafeAuthHooks,
        SafeDispatchHooks, TracingObservabilityHooks,
    };
}

#[cfg(test)]
mod tests;
