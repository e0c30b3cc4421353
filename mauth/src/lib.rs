//! Credential acquisition, refresh, and scope checks for tool invocations.
//!
//! ```rust
//! use mauth::{AuthPhase, AuthPolicy, AuthorizationResolver, EnvTokenSource};
//!
//! let resolver = AuthorizationResolver::new(
//!     Box::new(EnvTokenSource::new("MCP_TOKEN")),
//!     AuthPolicy::default(),
//! );
//! assert_eq!(resolver.phase(), AuthPhase::Unauthenticated);
//! ```

mod credential;
mod error;
mod hooks;
mod resolver;
mod token;

pub mod prelude {
    pub use crate::{
        AuthError, AuthErrorKind, AuthPhase, AuthPolicy, AuthRequirement, AuthorizationResolver,
        Credential, TokenSource,
    };
}

pub use credential::{AuthRequirement, Credential, SecretString};
pub use error::{AuthError, AuthErrorKind};
pub use hooks::{AuthHooks, NoopAuthHooks};
pub use resolver::{AuthPhase, AuthPolicy, AuthorizationResolver};
pub use token::{
    AuthFuture, ClientCredentialsSource, EnvTokenSource, IssuedToken, TokenSource,
    token_source_from_config,
};
