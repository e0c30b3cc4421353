//! Runtime wiring from a configuration document.

use std::path::Path;
use std::sync::Arc;

use crate::{
    AuthorizationResolver, ConfigError, FunctionRegistry, McpConfig, McpHttpTransport,
    McpToolRuntime, ObservabilityHooks, RuntimeSettings, SafeAuthHooks, SafeDispatchHooks,
    ToolTransport, TurnBudget,
};

#[derive(Clone)]
pub struct RuntimeBundle {
    pub runtime: Arc<McpToolRuntime>,
    pub authorization: Option<Arc<AuthorizationResolver>>,
    pub budget: TurnBudget,
}

impl std::fmt::Debug for RuntimeBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeBundle")
            .field("authorization", &self.authorization.is_some())
            .field("budget", &self.budget)
            .finish_non_exhaustive()
    }
}

impl RuntimeBundle {
    pub fn registry(&self) -> Arc<FunctionRegistry> {
        self.runtime.registry()
    }
}

/// Loads, validates, and wires the document at `path`.
pub fn load_runtime(path: impl AsRef<Path>) -> Result<RuntimeBundle, ConfigError> {
    let config = McpConfig::from_path(path)?;
    build_runtime(&config)
}

/// Wires the HTTP transport and, when the document enables it, an
/// authorization resolver.
pub fn build_runtime(config: &McpConfig) -> Result<RuntimeBundle, ConfigError> {
    config.validate()?;

    let transport = McpHttpTransport::from_config(config)
        .map_err(|err| ConfigError::invalid(format!("transport setup failed: {err}")))?;
    let authorization = AuthorizationResolver::from_config(config)
        .map_err(|err| ConfigError::invalid(format!("authorization setup failed: {err}")))?
        .map(|resolver| {
            resolver.with_hooks(Arc::new(SafeAuthHooks::new(
                ObservabilityHooks::from_config(config),
            )))
        });

    build_runtime_with(config, Arc::new(transport), authorization)
}

pub fn build_runtime_with(
    config: &McpConfig,
    transport: Arc<dyn ToolTransport>,
    authorization: Option<AuthorizationResolver>,
) -> Result<RuntimeBundle, ConfigError> {
    let registry = FunctionRegistry::from_config(config)?;
    let authorization = authorization.map(Arc::new);

    let mut builder = McpToolRuntime::builder(registry, transport)
        .settings(RuntimeSettings::from_config(config))
        .hooks(Arc::new(SafeDispatchHooks::new(
            ObservabilityHooks::from_config(config),
        )));
    if let Some(resolver) = &authorization {
        builder = builder.authorization(Arc::clone(resolver));
    }

    Ok(RuntimeBundle {
        runtime: Arc::new(builder.build()),
        authorization,
        budget: TurnBudget::from_config(config),
    })
}
