//! Response cache keyed by call fingerprint, with single-flight fetches.
//!
//! ```rust
//! use mtooling::Fingerprint;
//! use serde_json::json;
//!
//! let left = Fingerprint::of("search", &json!({"q": "rust", "limit": 5})).expect("hash");
//! let right = Fingerprint::of("search", &json!({"limit": 5, "q": "rust"})).expect("hash");
//! assert_eq!(left, right);
//! assert_eq!(left.as_str().len(), 64);
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::time::Instant;

use crate::ToolError;

/// SHA-256 over the tool name and the RFC 8785 form of the arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(tool: &str, arguments: &Value) -> Result<Self, ToolError> {
        let canonical = serde_jcs::to_vec(arguments).map_err(|err| {
            ToolError::validation("$", format!("arguments cannot be canonicalized: {err}"))
        })?;

        let mut hasher = Sha256::new();
        hasher.update(tool.as_bytes());
        hasher.update([0u8]);
        hasher.update(&canonical);
        Ok(Self(hex_encode(&hasher.finalize())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}

/// Upper bound on how far ahead an entry may expire.
const MAX_LIFETIME: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// `now + ttl`, clamped so oversized TTLs cannot overflow the clock.
fn expiry_after(now: Instant, ttl: Duration) -> Instant {
    now.checked_add(ttl.min(MAX_LIFETIME)).unwrap_or(now)
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheLookup<T> {
    pub value: T,
    /// False only for the caller whose fetch produced the value.
    pub hit: bool,
}

struct CachedValue<T> {
    value: T,
    expires_at: Instant,
}

struct SlotState<T> {
    cached: Option<CachedValue<T>>,
    failure: Option<ToolError>,
}

struct Slot<T> {
    state: tokio::sync::Mutex<SlotState<T>>,
    /// Bumped after every completed fetch.
    generation: AtomicU64,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            state: tokio::sync::Mutex::new(SlotState {
                cached: None,
                failure: None,
            }),
            generation: AtomicU64::new(0),
        }
    }
}

/// Successful values live for their TTL. Concurrent callers with the same
/// fingerprint wait for one fetch and share its outcome; failures are handed
/// to those waiters but never stored past them.
pub struct ResponseCache<T = Value> {
    slots: Mutex<HashMap<Fingerprint, Arc<Slot<T>>>>,
}

impl<T> Default for ResponseCache<T> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<T: Clone> ResponseCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: &Fingerprint,
        ttl: Duration,
        fetch: F,
    ) -> Result<CacheLookup<T>, ToolError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ToolError>>,
    {
        let slot = self.slot(key)?;
        let observed = slot.generation.load(Ordering::Acquire);
        let mut state = slot.state.lock().await;

        if let Some(cached) = &state.cached
            && cached.expires_at > Instant::now()
        {
            return Ok(CacheLookup {
                value: cached.value.clone(),
                hit: true,
            });
        }
        if slot.generation.load(Ordering::Acquire) != observed
            && let Some(failure) = &state.failure
        {
            return Err(failure.clone());
        }

        let outcome = fetch().await;
        match &outcome {
            Ok(value) => {
                state.cached = Some(CachedValue {
                    value: value.clone(),
                    expires_at: expiry_after(Instant::now(), ttl),
                });
                state.failure = None;
            }
            Err(error) => {
                state.cached = None;
                state.failure = Some(error.clone());
            }
        }
        slot.generation.fetch_add(1, Ordering::AcqRel);
        drop(state);

        self.evict_expired();
        outcome.map(|value| CacheLookup { value, hit: false })
    }

    pub fn get(&self, key: &Fingerprint) -> Option<T> {
        let slots = self.slots.lock().ok()?;
        let state = slots.get(key)?.state.try_lock().ok()?;
        state
            .cached
            .as_ref()
            .filter(|cached| cached.expires_at > Instant::now())
            .map(|cached| cached.value.clone())
    }

    pub fn invalidate(&self, key: &Fingerprint) {
        if let Ok(mut slots) = self.slots.lock() {
            slots.remove(key);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut slots) = self.slots.lock() {
            slots.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.slots.lock().map(|slots| slots.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops idle slots whose value has expired or that hold no value.
    pub fn evict_expired(&self) {
        let Ok(mut slots) = self.slots.lock() else {
            return;
        };
        let now = Instant::now();
        slots.retain(|_, slot| {
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            match slot.state.try_lock() {
                Ok(state) => state
                    .cached
                    .as_ref()
                    .is_some_and(|cached| cached.expires_at > now),
                Err(_) => true,
            }
        });
    }

    fn slot(&self, key: &Fingerprint) -> Result<Arc<Slot<T>>, ToolError> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| ToolError::connection("response cache lock poisoned").into_terminal())?;
        Ok(Arc::clone(slots.entry(key.clone()).or_default()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use serde_json::json;

    use super::*;
    use crate::ToolErrorKind;

    fn key(query: &str) -> Fingerprint {
        Fingerprint::of("secure_search", &json!({ "query": query })).expect("fingerprint")
    }

    #[test]
    fn fingerprint_depends_on_tool_and_arguments() {
        let args = json!({"query": "rust"});
        let base = Fingerprint::of("search", &args).expect("hash");
        assert_ne!(base, Fingerprint::of("lookup", &args).expect("hash"));
        assert_ne!(
            base,
            Fingerprint::of("search", &json!({"query": "go"})).expect("hash")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn values_expire_after_ttl() {
        let cache = ResponseCache::<Value>::new();
        let fetches = AtomicUsize::new(0);
        let counter = &fetches;
        let fetch = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(json!("fresh"))
        };

        let first = cache
            .get_or_fetch(&key("a"), Duration::from_secs(60), fetch)
            .await
            .expect("first fetch");
        assert!(!first.hit);

        let second = cache
            .get_or_fetch(&key("a"), Duration::from_secs(60), fetch)
            .await
            .expect("cached");
        assert!(second.hit);
        assert_eq!(fetches.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(61)).await;
        let third = cache
            .get_or_fetch(&key("a"), Duration::from_secs(60), fetch)
            .await
            .expect("refetched");
        assert!(!third.hit);
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_ttl_keeps_the_value_without_overflowing() {
        let cache = ResponseCache::<Value>::new();
        let ttl = Duration::from_secs(u64::MAX);

        let first = cache
            .get_or_fetch(&key("huge"), ttl, || async { Ok(json!("kept")) })
            .await
            .expect("fetch succeeds");
        assert!(!first.hit);

        tokio::time::advance(Duration::from_secs(365 * 24 * 60 * 60)).await;
        let second = cache
            .get_or_fetch(&key("huge"), ttl, || async { Ok(json!("refetched")) })
            .await
            .expect("cached");
        assert!(second.hit);
        assert_eq!(second.value, json!("kept"));
    }

    #[tokio::test(start_paused = true)]
    async fn failures_are_not_cached() {
        let cache = ResponseCache::<Value>::new();
        let error = cache
            .get_or_fetch(&key("b"), Duration::from_secs(60), || async {
                Err(ToolError::connection("reset"))
            })
            .await
            .expect_err("fetch fails");
        assert_eq!(error.kind, ToolErrorKind::Connection);
        assert!(cache.get(&key("b")).is_none());

        let recovered = cache
            .get_or_fetch(&key("b"), Duration::from_secs(60), || async {
                Ok(json!("ok"))
            })
            .await
            .expect("later call fetches again");
        assert!(!recovered.hit);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_identical_calls_share_one_fetch() {
        let cache = Arc::new(ResponseCache::<Value>::new());
        let fetches = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let cache = Arc::clone(&cache);
            let fetches = Arc::clone(&fetches);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_fetch(&key("c"), Duration::from_secs(60), || async move {
                        fetches.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Ok(json!("shared"))
                    })
                    .await
            }));
        }

        let mut misses = 0;
        for handle in handles {
            let lookup = handle.await.expect("task").expect("value");
            assert_eq!(lookup.value, json!("shared"));
            misses += usize::from(!lookup.hit);
        }
        assert_eq!(misses, 1);
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn waiters_share_a_failed_fetch() {
        let cache = Arc::new(ResponseCache::<Value>::new());
        let fetches = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..3 {
            let cache = Arc::clone(&cache);
            let fetches = Arc::clone(&fetches);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_fetch(&key("d"), Duration::from_secs(60), || async move {
                        fetches.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Err(ToolError::timeout("slow"))
                    })
                    .await
            }));
        }

        for handle in handles {
            let error = handle.await.expect("task").expect_err("shared failure");
            assert_eq!(error.kind, ToolErrorKind::Timeout);
        }
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }
}
