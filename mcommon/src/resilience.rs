//! Retry/backoff policy shared by dispatch and token refresh.
//!
//! ```rust
//! use std::time::Duration;
//! use mcommon::RetryPolicy;
//!
//! let policy = RetryPolicy::from_retries(2, Duration::from_millis(100));
//! assert_eq!(policy.max_attempts, 3);
//! assert_eq!(policy.backoff_for_attempt(2), Duration::from_millis(200));
//! ```

use std::future::Future;
use std::time::Duration;

/// Errors that know whether a repeat attempt could succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Builds a policy from a retry count, so `0` means a single attempt.
    pub fn from_retries(max_retries: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts: max_retries.saturating_add(1),
            initial_backoff,
            ..Self::default()
        }
    }

    /// Constant spacing between attempts.
    pub fn fixed(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_retries.saturating_add(1),
            initial_backoff: delay,
            max_backoff: delay,
            backoff_multiplier: 1.0,
        }
    }

    pub fn no_retry() -> Self {
        Self::new(1)
    }

    pub fn max_retries(&self) -> u32 {
        self.max_attempts.saturating_sub(1)
    }

    pub fn should_retry<E: Retryable>(&self, attempt: u32, error: &E) -> bool {
        error.is_retryable() && attempt < self.max_attempts
    }

    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = (attempt.saturating_sub(1)) as i32;
        let unbounded = self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        Duration::try_from_secs_f64(unbounded.min(self.max_backoff.as_secs_f64()))
            .unwrap_or(self.max_backoff)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryOutcome<T, E> {
    pub result: Result<T, E>,
    pub attempts: u32,
}

/// Runs `execute` until it succeeds, fails with a non-retryable error, or
/// exhausts the policy. `on_retry` fires before every scheduled sleep.
pub async fn execute_with_retry<T, E, Op, OpFuture, OnRetry, Sleep, SleepFuture>(
    policy: &RetryPolicy,
    mut execute: Op,
    mut on_retry: OnRetry,
    mut sleep: Sleep,
) -> RetryOutcome<T, E>
where
    E: Retryable,
    Op: FnMut(u32) -> OpFuture,
    OpFuture: Future<Output = Result<T, E>>,
    OnRetry: FnMut(u32, Duration, &E),
    Sleep: FnMut(Duration) -> SleepFuture,
    SleepFuture: Future<Output = ()>,
{
    let mut attempt = 1;

    loop {
        match execute(attempt).await {
            Ok(value) => {
                return RetryOutcome {
                    result: Ok(value),
                    attempts: attempt,
                };
            }
            Err(error) => {
                if policy.should_retry(attempt, &error) {
                    let delay = policy.backoff_for_attempt(attempt);
                    on_retry(attempt, delay, &error);
                    sleep(delay).await;
                    attempt += 1;
                    continue;
                }

                return RetryOutcome {
                    result: Err(error),
                    attempts: attempt,
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct FakeError {
        retryable: bool,
    }

    impl Retryable for FakeError {
        fn is_retryable(&self) -> bool {
            self.retryable
        }
    }

    #[test]
    fn retry_policy_uses_retryable_flag_and_attempt_limit() {
        let policy = RetryPolicy::from_retries(2, Duration::from_millis(10));
        let retryable = FakeError { retryable: true };
        let terminal = FakeError { retryable: false };

        assert!(policy.should_retry(1, &retryable));
        assert!(policy.should_retry(2, &retryable));
        assert!(!policy.should_retry(3, &retryable));
        assert!(!policy.should_retry(1, &terminal));
        assert_eq!(policy.max_retries(), 2);
    }

    #[test]
    fn retry_policy_backoff_grows_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(250),
            backoff_multiplier: 2.0,
        };

        assert_eq!(policy.backoff_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_for_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_for_attempt(3), Duration::from_millis(250));
        assert_eq!(policy.backoff_for_attempt(4), Duration::from_millis(250));
    }

    #[test]
    fn backoff_at_the_duration_limit_does_not_panic() {
        let policy = RetryPolicy::fixed(2, Duration::MAX);
        assert_eq!(policy.backoff_for_attempt(1), Duration::MAX);
        assert_eq!(policy.backoff_for_attempt(2), Duration::MAX);
    }

    #[test]
    fn fixed_policy_keeps_constant_spacing() {
        let policy = RetryPolicy::fixed(3, Duration::from_secs(2));
        assert_eq!(policy.backoff_for_attempt(1), Duration::from_secs(2));
        assert_eq!(policy.backoff_for_attempt(3), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn execute_with_retry_retries_then_succeeds() {
        let policy = RetryPolicy::from_retries(3, Duration::from_millis(5));
        let sleeps = Arc::new(Mutex::new(Vec::new()));
        let retries = Arc::new(Mutex::new(Vec::new()));

        let outcome = execute_with_retry(
            &policy,
            |attempt| async move {
                if attempt < 3 {
                    Err(FakeError { retryable: true })
                } else {
                    Ok("ok")
                }
            },
            {
                let retries = Arc::clone(&retries);
                move |attempt, _delay, _error: &FakeError| {
                    retries.lock().expect("retries lock").push(attempt);
                }
            },
            {
                let sleeps = Arc::clone(&sleeps);
                move |delay| {
                    let sleeps = Arc::clone(&sleeps);
                    async move {
                        sleeps.lock().expect("sleep lock").push(delay);
                    }
                }
            },
        )
        .await;

        assert_eq!(outcome.result, Ok("ok"));
        assert_eq!(outcome.attempts, 3);
        assert_eq!(*retries.lock().expect("retries lock"), vec![1, 2]);
        assert_eq!(
            *sleeps.lock().expect("sleep lock"),
            vec![Duration::from_millis(5), Duration::from_millis(10)]
        );
    }

    #[tokio::test]
    async fn execute_with_retry_stops_on_non_retryable_error() {
        let policy = RetryPolicy::from_retries(5, Duration::from_millis(5));

        let outcome = execute_with_retry::<(), _, _, _, _, _, _>(
            &policy,
            |_| async move { Err(FakeError { retryable: false }) },
            |_, _, _| {},
            |_| async move {},
        )
        .await;

        assert_eq!(outcome.result, Err(FakeError { retryable: false }));
        assert_eq!(outcome.attempts, 1);
    }

    #[tokio::test]
    async fn execute_with_retry_gives_up_after_max_attempts() {
        let policy = RetryPolicy::from_retries(2, Duration::from_millis(1));

        let outcome = execute_with_retry::<(), _, _, _, _, _, _>(
            &policy,
            |_| async move { Err(FakeError { retryable: true }) },
            |_, _, _| {},
            |_| async move {},
        )
        .await;

        assert!(outcome.result.is_err());
        assert_eq!(outcome.attempts, 3);
    }
}
