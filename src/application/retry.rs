//! Bounded retry with a fixed back-off.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use thiserror::Error;
use tokio_retry::strategy::FixedInterval;
use tokio_retry::Retry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, delay }
    }

    fn strategy(&self) -> std::iter::Take<FixedInterval> {
        FixedInterval::new(self.delay).take(self.max_attempts.saturating_sub(1) as usize)
    }
}

#[derive(Debug, Error)]
pub enum RetryError<E> {
    #[error("condition not met after {attempts} attempts")]
    Exhausted { attempts: u32 },
    #[error("failed after {attempts} attempts: {last_error}")]
    Failed { attempts: u32, last_error: E },
}

impl<E> RetryError<E> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts } | RetryError::Failed { attempts, .. } => *attempts,
        }
    }
}

enum Attempt<E> {
    Rejected,
    Failed(E),
}

/// Run `action` until it yields a value `accept` agrees with, sleeping
/// `policy.delay` between attempts and giving up after `policy.max_attempts`.
///
/// Errors from `action` are retried like rejected values; the last one is
/// reported if every attempt fails.
pub async fn retry_until<T, E, A, Fut, P>(
    policy: RetryPolicy,
    mut action: A,
    accept: P,
) -> Result<T, RetryError<E>>
where
    A: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&T) -> bool,
{
    let attempts = AtomicU32::new(0);
    let counter = &attempts;
    let accept = &accept;

    let outcome = Retry::spawn(policy.strategy(), move || {
        let attempt = counter.fetch_add(1, Ordering::Relaxed) + 1;
        let fut = action();
        async move {
            match fut.await {
                Ok(value) if accept(&value) => Ok(value),
                Ok(_) => {
                    tracing::debug!("Attempt {}/{} not satisfied", attempt, policy.max_attempts);
                    Err(Attempt::Rejected)
                }
                Err(e) => {
                    tracing::debug!("Attempt {}/{} failed", attempt, policy.max_attempts);
                    Err(Attempt::Failed(e))
                }
            }
        }
    })
    .await;

    let attempts = attempts.load(Ordering::Relaxed);
    match outcome {
        Ok(value) => Ok(value),
        Err(Attempt::Rejected) => Err(RetryError::Exhausted { attempts }),
        Err(Attempt::Failed(last_error)) => Err(RetryError::Failed { attempts, last_error }),
    }
}

/// Sleep for `duration`, returning immediately for a zero duration
pub async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;

    fn immediate(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::ZERO)
    }

    #[tokio::test]
    async fn test_succeeds_when_accepted() {
        let calls = AtomicU64::new(0);
        let result: Result<u64, RetryError<String>> = retry_until(
            immediate(5),
            || async { Ok(calls.fetch_add(1, Ordering::SeqCst) + 1) },
            |v| *v >= 3,
        )
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_after_max_attempts() {
        let calls = AtomicU64::new(0);
        let result: Result<u64, RetryError<String>> = retry_until(
            immediate(4),
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(0)
            },
            |v| *v > 0,
        )
        .await;

        let err = result.unwrap_err();
        assert!(matches!(err, RetryError::Exhausted { attempts: 4 }));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_errors_are_retried_and_last_is_reported() {
        let calls = AtomicU64::new(0);
        let result: Result<u64, RetryError<String>> = retry_until(
            immediate(3),
            || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Err(format!("error {n}"))
            },
            |_| true,
        )
        .await;

        match result {
            Err(RetryError::Failed { attempts, last_error }) => {
                assert_eq!(attempts, 3);
                assert_eq!(last_error, "error 3");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_error_then_success() {
        let calls = AtomicU64::new(0);
        let result: Result<u64, RetryError<String>> = retry_until(
            immediate(3),
            || async {
                match calls.fetch_add(1, Ordering::SeqCst) {
                    0 => Err("not yet".to_string()),
                    _ => Ok(7),
                }
            },
            |_| true,
        )
        .await;

        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let calls = AtomicU64::new(0);
        let _ = retry_until::<u64, String, _, _, _>(
            immediate(0),
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(0)
            },
            |v| *v > 0,
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
