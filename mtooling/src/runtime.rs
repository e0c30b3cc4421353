//! Tool runtime trait and the configuration-driven pipeline behind it.
//!
//! A call moves through registry lookup, argument validation,
//! authorization, dispatch, and normalization. `respond` additionally
//! swaps terminal failures for fallback text.

use std::sync::Arc;

use futures_util::future::join_all;
use mauth::{AuthorizationResolver, Credential};
use mconfig::McpConfig;
use tokio::time::Instant;

use crate::{
    DispatchHooks, DispatchSettings, FallbackPolicy, FunctionRegistry, InvocationDispatcher,
    InvocationRequest, InvocationResult, NoopDispatchHooks, NormalizeLimits, ResponseNormalizer,
    SchemaValidator, ToolDefinition, ToolError, ToolErrorKind, ToolFuture, ToolResponse,
    ToolTransport,
};

pub trait ToolRuntime: Send + Sync {
    fn execute<'a>(
        &'a self,
        request: InvocationRequest,
    ) -> ToolFuture<'a, Result<InvocationResult, ToolError>>;

    /// Like `execute`, with failures replaced by fallback messages where the
    /// fallback policy has one.
    fn respond<'a>(
        &'a self,
        request: InvocationRequest,
    ) -> ToolFuture<'a, Result<ToolResponse, ToolError>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeSettings {
    pub dispatch: DispatchSettings,
    pub limits: NormalizeLimits,
    pub fallback: FallbackPolicy,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self::from_config(&McpConfig::default())
    }
}

impl RuntimeSettings {
    pub fn from_config(config: &McpConfig) -> Self {
        Self {
            dispatch: DispatchSettings::from_config(config),
            limits: NormalizeLimits::from_config(&config.response_limits),
            fallback: FallbackPolicy::from_config(&config.error_handling),
        }
    }
}

pub struct McpToolRuntime {
    registry: Arc<FunctionRegistry>,
    validator: SchemaValidator,
    authorization: Option<Arc<AuthorizationResolver>>,
    dispatcher: InvocationDispatcher,
    normalizer: ResponseNormalizer,
    fallback: FallbackPolicy,
    hooks: Arc<dyn DispatchHooks>,
}

impl McpToolRuntime {
    pub fn builder(
        registry: FunctionRegistry,
        transport: Arc<dyn ToolTransport>,
    ) -> McpToolRuntimeBuilder {
        McpToolRuntimeBuilder {
            registry: Arc::new(registry),
            transport,
            settings: RuntimeSettings::default(),
            authorization: None,
            hooks: Arc::new(NoopDispatchHooks),
        }
    }

    pub fn registry(&self) -> Arc<FunctionRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn dispatcher(&self) -> &InvocationDispatcher {
        &self.dispatcher
    }

    pub fn fallback_policy(&self) -> &FallbackPolicy {
        &self.fallback
    }

    /// Runs sibling calls from one model turn concurrently. Results come
    /// back in the order of `requests`.
    pub async fn respond_all(
        &self,
        requests: Vec<InvocationRequest>,
    ) -> Vec<Result<ToolResponse, ToolError>> {
        join_all(requests.into_iter().map(|request| self.respond(request))).await
    }

    async fn run(
        &self,
        request: &InvocationRequest,
        started: Instant,
    ) -> Result<InvocationResult, ToolError> {
        let definition = self.registry.resolve(&request.function)?;
        if !definition.enabled {
            return Err(ToolError::disabled(format!(
                "function '{}' is disabled",
                definition.name
            )));
        }

        let arguments = self
            .validator
            .prepare(&definition, request.arguments.clone())?;
        let credential = self.authorize(&definition).await?;

        let outcome = match self
            .dispatcher
            .invoke(&definition, request, &arguments, credential)
            .await
        {
            Err(error)
                if error.kind == ToolErrorKind::Unauthenticated && definition.requires_auth =>
            {
                // The endpoint rejected the token; renew it once and retry.
                let Some(resolver) = &self.authorization else {
                    return Err(error);
                };
                resolver.invalidate();
                let credential = resolver
                    .ensure_authorized(&definition.rule.requirement)
                    .await?;
                self.dispatcher
                    .invoke(&definition, request, &arguments, Some(credential))
                    .await?
            }
            outcome => outcome?,
        };

        let answer = self
            .normalizer
            .normalize(&definition.response, &outcome.response)?;

        Ok(InvocationResult {
            call_id: request.call_id.clone(),
            function: request.function.clone(),
            answer,
            attempts: outcome.attempts,
            cached: outcome.cached,
            latency: started.elapsed(),
        })
    }

    async fn authorize(
        &self,
        definition: &ToolDefinition,
    ) -> Result<Option<Credential>, ToolError> {
        if !definition.requires_auth {
            return Ok(None);
        }

        let resolver = self.authorization.as_ref().ok_or_else(|| {
            ToolError::unauthenticated(format!(
                "function '{}' requires authorization but none is configured",
                definition.name
            ))
        })?;
        let credential = resolver
            .ensure_authorized(&definition.rule.requirement)
            .await?;
        Ok(Some(credential))
    }
}

impl ToolRuntime for McpToolRuntime {
    fn execute<'a>(
        &'a self,
        request: InvocationRequest,
    ) -> ToolFuture<'a, Result<InvocationResult, ToolError>> {
        Box::pin(async move {
            let started = Instant::now();
            self.hooks.on_invocation_start(&request);

            let result = self.run(&request, started).await.map_err(|error| {
                error
                    .with_tool_name(request.function.clone())
                    .with_call_id(request.call_id.as_str())
            });

            match &result {
                Ok(result) => self.hooks.on_invocation_success(&request, result),
                Err(error) => self
                    .hooks
                    .on_invocation_failure(&request, error, started.elapsed()),
            }
            result
        })
    }

    fn respond<'a>(
        &'a self,
        request: InvocationRequest,
    ) -> ToolFuture<'a, Result<ToolResponse, ToolError>> {
        Box::pin(async move {
            match self.execute(request.clone()).await {
                Ok(result) => Ok(ToolResponse::from_result(&result)),
                Err(error) => {
                    if self.fallback.fallback_for(error.category()).is_some() {
                        self.hooks.on_fallback(&request, &error);
                    }
                    self.fallback.resolve(&request, error)
                }
            }
        })
    }
}

pub struct McpToolRuntimeBuilder {
    registry: Arc<FunctionRegistry>,
    transport: Arc<dyn ToolTransport>,
    settings: RuntimeSettings,
    authorization: Option<Arc<AuthorizationResolver>>,
    hooks: Arc<dyn DispatchHooks>,
}

impl McpToolRuntimeBuilder {
    pub fn settings(mut self, settings: RuntimeSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn authorization(mut self, resolver: Arc<AuthorizationResolver>) -> Self {
        self.authorization = Some(resolver);
        self
    }

    pub fn hooks(mut self, hooks: Arc<dyn DispatchHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn build(self) -> McpToolRuntime {
        let dispatcher = InvocationDispatcher::new(self.transport, self.settings.dispatch)
            .with_hooks(Arc::clone(&self.hooks));

        McpToolRuntime {
            registry: self.registry,
            validator: SchemaValidator,
            authorization: self.authorization,
            dispatcher,
            normalizer: ResponseNormalizer::new(self.settings.limits),
            fallback: self.settings.fallback,
            hooks: self.hooks,
        }
    }
}

/// Caps how many rounds of function calls one model turn may run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnBudget {
    max_iterations: u32,
    auto_invoke: bool,
    used: u32,
}

impl TurnBudget {
    pub fn new(max_iterations: u32, auto_invoke: bool) -> Self {
        Self {
            max_iterations,
            auto_invoke,
            used: 0,
        }
    }

    pub fn from_config(config: &McpConfig) -> Self {
        Self::new(
            config.function_calling.max_iterations,
            config.function_calling.auto_invoke,
        )
    }

    /// Whether the chat loop may run requested calls without confirmation.
    pub fn auto_invoke(&self) -> bool {
        self.auto_invoke
    }

    /// Claims one round; false once the turn has used them all.
    pub fn try_consume(&mut self) -> bool {
        if self.used >= self.max_iterations {
            return false;
        }
        self.used += 1;
        true
    }

    pub fn remaining(&self) -> u32 {
        self.max_iterations.saturating_sub(self.used)
    }

    pub fn reset(&mut self) {
        self.used = 0;
    }
}
