//! Admission control: per-tool and global concurrency gates.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use mconfig::AdmissionConfig;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};

use crate::{ToolDefinition, ToolError};

struct Gate {
    semaphore: Arc<Semaphore>,
    limit: usize,
    waiting: AtomicUsize,
}

impl Gate {
    fn new(limit: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
            waiting: AtomicUsize::new(0),
        }
    }

    fn in_flight(&self) -> usize {
        self.limit.saturating_sub(self.semaphore.available_permits())
    }
}

/// Holding this keeps one slot in both the tool gate and the global gate.
#[derive(Debug)]
pub struct AdmissionPermit {
    _tool: OwnedSemaphorePermit,
    _global: OwnedSemaphorePermit,
}

/// Keeps the `waiting` count honest when a queued caller is cancelled.
struct WaitingGuard<'a>(&'a AtomicUsize);

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

pub struct AdmissionController {
    global: Gate,
    tools: Mutex<HashMap<String, Arc<Gate>>>,
}

impl AdmissionController {
    pub fn new(max_concurrent_functions: usize) -> Self {
        Self {
            global: Gate::new(max_concurrent_functions.max(1)),
            tools: Mutex::new(HashMap::new()),
        }
    }

    /// Takes the tool's gate, then the global gate. Under `fail_fast` a full
    /// gate rejects at once; under `queue` the caller waits unless
    /// `max_waiters` callers are already waiting on this tool.
    pub async fn admit(&self, definition: &ToolDefinition) -> Result<AdmissionPermit, ToolError> {
        let tool = self.gate(definition)?;

        match definition.admission {
            AdmissionConfig::FailFast => {
                let tool_permit = try_acquire(&tool.semaphore, &definition.binding.tool)?;
                let global_permit = try_acquire(&self.global.semaphore, "global")?;
                Ok(AdmissionPermit {
                    _tool: tool_permit,
                    _global: global_permit,
                })
            }
            AdmissionConfig::Queue { max_waiters } => {
                if let (Ok(tool_permit), Ok(global_permit)) = (
                    Arc::clone(&tool.semaphore).try_acquire_owned(),
                    Arc::clone(&self.global.semaphore).try_acquire_owned(),
                ) {
                    return Ok(AdmissionPermit {
                        _tool: tool_permit,
                        _global: global_permit,
                    });
                }

                let queued = tool.waiting.fetch_add(1, Ordering::AcqRel);
                let _waiting = WaitingGuard(&tool.waiting);
                if queued >= max_waiters {
                    return Err(ToolError::throttled(format!(
                        "tool '{}' already has {max_waiters} queued calls",
                        definition.binding.tool
                    )));
                }

                let tool_permit = acquire(&tool.semaphore).await?;
                let global_permit = acquire(&self.global.semaphore).await?;
                Ok(AdmissionPermit {
                    _tool: tool_permit,
                    _global: global_permit,
                })
            }
        }
    }

    pub fn in_flight(&self, tool: &str) -> usize {
        self.tools
            .lock()
            .ok()
            .and_then(|tools| tools.get(tool).map(|gate| gate.in_flight()))
            .unwrap_or(0)
    }

    pub fn global_in_flight(&self) -> usize {
        self.global.in_flight()
    }

    pub fn global_limit(&self) -> usize {
        self.global.limit
    }

    fn gate(&self, definition: &ToolDefinition) -> Result<Arc<Gate>, ToolError> {
        let mut tools = self
            .tools
            .lock()
            .map_err(|_| ToolError::throttled("admission state lock poisoned"))?;
        let gate = tools
            .entry(definition.binding.tool.clone())
            .or_insert_with(|| Arc::new(Gate::new(definition.max_concurrent_requests.max(1))));
        Ok(Arc::clone(gate))
    }
}

fn try_acquire(semaphore: &Arc<Semaphore>, scope: &str) -> Result<OwnedSemaphorePermit, ToolError> {
    Arc::clone(semaphore)
        .try_acquire_owned()
        .map_err(|err| match err {
            TryAcquireError::NoPermits => {
                ToolError::throttled(format!("concurrency limit reached for '{scope}'"))
            }
            TryAcquireError::Closed => ToolError::throttled("admission gate closed"),
        })
}

async fn acquire(semaphore: &Arc<Semaphore>) -> Result<OwnedSemaphorePermit, ToolError> {
    Arc::clone(semaphore)
        .acquire_owned()
        .await
        .map_err(|_| ToolError::throttled("admission gate closed"))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{ResponseShape, ToolErrorKind};

    fn definition(name: &str, limit: usize, admission: AdmissionConfig) -> ToolDefinition {
        ToolDefinition::new(name, ResponseShape::parse("result").expect("path"))
            .with_concurrency(limit, admission)
    }

    #[tokio::test]
    async fn fail_fast_rejects_when_tool_gate_is_full() {
        let controller = AdmissionController::new(5);
        let search = definition("search", 1, AdmissionConfig::FailFast);

        let held = controller.admit(&search).await.expect("first call admitted");
        assert_eq!(controller.in_flight("search"), 1);

        let error = controller.admit(&search).await.expect_err("gate is full");
        assert_eq!(error.kind, ToolErrorKind::Throttled);

        drop(held);
        assert_eq!(controller.in_flight("search"), 0);
        assert!(controller.admit(&search).await.is_ok());
    }

    #[tokio::test]
    async fn global_gate_caps_calls_across_tools() {
        let controller = AdmissionController::new(2);
        let first = controller
            .admit(&definition("a", 2, AdmissionConfig::FailFast))
            .await
            .expect("a admitted");
        let second = controller
            .admit(&definition("b", 2, AdmissionConfig::FailFast))
            .await
            .expect("b admitted");

        let error = controller
            .admit(&definition("c", 2, AdmissionConfig::FailFast))
            .await
            .expect_err("global limit reached");
        assert_eq!(error.kind, ToolErrorKind::Throttled);
        assert_eq!(controller.global_in_flight(), 2);
        assert_eq!(controller.in_flight("c"), 0);

        drop((first, second));
        assert_eq!(controller.global_in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn queue_waits_for_a_slot_and_bounds_waiters() {
        let controller = Arc::new(AdmissionController::new(5));
        let search = definition("search", 1, AdmissionConfig::Queue { max_waiters: 1 });

        let held = controller.admit(&search).await.expect("first call admitted");

        let waiter = {
            let controller = Arc::clone(&controller);
            let search = search.clone();
            tokio::spawn(async move { controller.admit(&search).await.map(|_| ()) })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let error = controller
            .admit(&search)
            .await
            .expect_err("waiter queue is full");
        assert_eq!(error.kind, ToolErrorKind::Throttled);

        drop(held);
        waiter
            .await
            .expect("task")
            .expect("queued caller admitted once the slot frees");
    }
}
