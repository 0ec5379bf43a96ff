//! Caller-side retry with exponential backoff.
//!
//! Only errors for which [`ZkPassError::is_transient`] holds are retried:
//! proof generation that never got a response, or got a 5xx/429. Trust
//! failures, malformed input and 4xx responses return immediately. The
//! protocol layer itself never retries; this helper is for callers such as
//! the CLI wrapping proof generation.

use std::future::Future;
use std::time::Duration;

use zkpass_core::ZkPassError;

/// Maximum number of retry attempts after the initial call.
pub const MAX_RETRIES: u32 = 3;

/// Base delay between retries (doubles each attempt: 200ms, 400ms, 800ms).
pub const BASE_DELAY_MS: u64 = 200;

/// Retry schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            base_delay: Duration::from_millis(BASE_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    fn delay(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Run `f` with the default policy.
pub async fn retry_transient<F, Fut, T>(f: F) -> Result<T, ZkPassError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, ZkPassError>>,
{
    retry_with_policy(RetryPolicy::default(), f).await
}

/// Run `f`, retrying transient failures on `policy`'s schedule.
///
/// `f` is called at most `max_retries + 1` times.
pub async fn retry_with_policy<F, Fut, T>(policy: RetryPolicy, f: F) -> Result<T, ZkPassError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, ZkPassError>>,
{
    for attempt in 0..policy.max_retries {
        match f().await {
            Err(e) if e.is_transient() => {
                let delay = policy.delay(attempt);
                tracing::warn!(
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    code = e.code(),
                    "transient failure, retrying in {delay:?}: {e}"
                );
                tokio::time::sleep(delay).await;
            }
            other => return other,
        }
    }
    // Final attempt.
    f().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(1),
        }
    }

    fn unavailable() -> ZkPassError {
        ZkPassError::ProofGeneration {
            stage: "RequestingProof".into(),
            status: Some(503),
            status_text: "Service Unavailable".into(),
        }
    }

    #[tokio::test]
    async fn retry_exhausts_all_attempts_on_transient_failure() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result: Result<(), _> = retry_with_policy(fast(), || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err(unavailable())
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn recovers_after_transient_failure() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result = retry_with_policy(fast(), || {
            let c = c.clone();
            async move {
                if c.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(unavailable())
                } else {
                    Ok("proof")
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "proof");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn trust_failures_are_never_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result: Result<(), _> = retry_with_policy(fast(), || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err(ZkPassError::MismatchedDvrVerifyingKey)
            }
        })
        .await;
        assert!(matches!(result, Err(ZkPassError::MismatchedDvrVerifyingKey)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let _: Result<(), _> = retry_with_policy(fast(), || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err(ZkPassError::ProofGeneration {
                    stage: "RequestingProof".into(),
                    status: Some(401),
                    status_text: "Unauthorized".into(),
                })
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn default_schedule_doubles() {
        let p = RetryPolicy::default();
        assert_eq!(p.delay(0), Duration::from_millis(200));
        assert_eq!(p.delay(1), Duration::from_millis(400));
        assert_eq!(p.delay(2), Duration::from_millis(800));
    }
}
