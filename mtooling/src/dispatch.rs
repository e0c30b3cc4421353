//! Invocation Dispatcher: cache, admission, retry, and timeout around one
//! transport call.

use std::sync::Arc;

use mauth::Credential;
use mcommon::{RetryOutcome, RetryPolicy, execute_with_retry};
use mconfig::McpConfig;
use serde_json::Value;

use crate::{
    AdmissionController, DispatchHooks, Fingerprint, InvocationRequest, NoopDispatchHooks,
    ResponseCache, ToolDefinition, ToolError, ToolTransport, TransportRequest,
};

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchSettings {
    pub retry: RetryPolicy,
    pub max_concurrent_functions: usize,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self::from_config(&McpConfig::default())
    }
}

impl DispatchSettings {
    pub fn from_config(config: &McpConfig) -> Self {
        Self {
            retry: RetryPolicy::from_retries(
                config.dispatch_retries(),
                config.mcp_server.retry_delay(),
            ),
            max_concurrent_functions: config.response_limits.max_concurrent_functions,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    pub response: Value,
    /// Network attempts made; zero when the response came from the cache.
    pub attempts: u32,
    pub cached: bool,
}

pub struct InvocationDispatcher {
    transport: Arc<dyn ToolTransport>,
    cache: ResponseCache<Value>,
    admission: AdmissionController,
    retry: RetryPolicy,
    hooks: Arc<dyn DispatchHooks>,
}

impl InvocationDispatcher {
    pub fn new(transport: Arc<dyn ToolTransport>, settings: DispatchSettings) -> Self {
        Self {
            transport,
            cache: ResponseCache::new(),
            admission: AdmissionController::new(settings.max_concurrent_functions),
            retry: settings.retry,
            hooks: Arc::new(NoopDispatchHooks),
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn DispatchHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn cache(&self) -> &ResponseCache<Value> {
        &self.cache
    }

    pub fn admission(&self) -> &AdmissionController {
        &self.admission
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Calls the tool bound to `definition` with already validated
    /// arguments. Cached tools answer from the cache inside their TTL.
    pub async fn invoke(
        &self,
        definition: &ToolDefinition,
        request: &InvocationRequest,
        arguments: &Value,
        credential: Option<Credential>,
    ) -> Result<DispatchOutcome, ToolError> {
        let transport_request = TransportRequest {
            call_id: request.call_id.clone(),
            trace_id: request.trace_id.clone(),
            binding: definition.binding.clone(),
            arguments: arguments.clone(),
            credential,
        };

        if definition.cache_ttl.is_zero() {
            let outcome = self.admit_and_send(definition, request, &transport_request).await;
            return outcome.result.map(|response| DispatchOutcome {
                response,
                attempts: outcome.attempts,
                cached: false,
            });
        }

        let key = Fingerprint::of(&definition.binding.tool, arguments)?;
        let mut attempts = 0;
        let lookup = {
            let attempts = &mut attempts;
            let transport_request = &transport_request;
            self.cache
                .get_or_fetch(&key, definition.cache_ttl, move || async move {
                    let outcome = self.admit_and_send(definition, request, transport_request).await;
                    *attempts = outcome.attempts;
                    outcome.result
                })
                .await?
        };

        if lookup.hit {
            self.hooks.on_cache_hit(request);
        }
        Ok(DispatchOutcome {
            response: lookup.value,
            attempts: if lookup.hit { 0 } else { attempts },
            cached: lookup.hit,
        })
    }

    async fn admit_and_send(
        &self,
        definition: &ToolDefinition,
        request: &InvocationRequest,
        transport_request: &TransportRequest,
    ) -> RetryOutcome<Value, ToolError> {
        let _permit = match self.admission.admit(definition).await {
            Ok(permit) => permit,
            Err(error) => {
                return RetryOutcome {
                    result: Err(error),
                    attempts: 0,
                };
            }
        };

        execute_with_retry(
            &self.retry,
            |_attempt| async move {
                let response = match tokio::time::timeout(
                    definition.timeout,
                    self.transport.send(transport_request),
                )
                .await
                {
                    Ok(result) => result?,
                    Err(_) => {
                        return Err(ToolError::timeout(format!(
                            "tool '{}' did not answer within {:?}",
                            definition.binding.tool, definition.timeout
                        )));
                    }
                };

                // A body carrying an error is a failed attempt, never a cacheable answer.
                match definition.response.reported_error(&response) {
                    Some(error) => Err(error),
                    None => Ok(response),
                }
            },
            |attempt, delay, error| self.hooks.on_retry_scheduled(request, attempt, delay, error),
            tokio::time::sleep,
        )
        .await
    }
}
