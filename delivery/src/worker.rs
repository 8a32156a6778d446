//! The retry loop around a single outbound provider call.

use crate::error::Error;
use crate::retry::RetryPolicy;
use log::*;
use std::future::Future;

/// Wraps one outbound call with the retry policy.
///
/// Each `send` runs on its caller's task; the between-attempt delay is an
/// async sleep, so concurrent deliveries never block one another. There is
/// no mid-flight cancellation: an attempt runs to completion before the next
/// retry decision.
pub struct DeliveryWorker {
    policy: RetryPolicy,
}

impl DeliveryWorker {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Invoke `action` until it succeeds, the error classifies as terminal,
    /// or the attempt budget is exhausted. The last error propagates to the
    /// caller; persisting it is the failure surfacer's job, not this one's.
    pub async fn send<T, F, Fut>(&self, label: &str, mut action: F) -> Result<T, Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let max_attempts = self.policy.max_attempts();
        let mut attempt = 1;

        loop {
            match action().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!("Delivery [{label}] succeeded on attempt {attempt}/{max_attempts}");
                    }
                    return Ok(value);
                }
                Err(error) => {
                    if attempt >= max_attempts || !self.policy.is_retryable(&error) {
                        return Err(error);
                    }

                    let delay = self.policy.delay(attempt);
                    warn!(
                        "Delivery [{label}] attempt {attempt}/{max_attempts} failed: {error}; retrying in {}ms",
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for DeliveryWorker {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NetworkErrorKind;
    use crate::retry::RetryConfig;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn worker(max_attempts: u32) -> DeliveryWorker {
        DeliveryWorker::new(RetryPolicy::new(RetryConfig {
            max_attempts,
            ..RetryConfig::default()
        }))
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures_with_default_backoff() {
        let worker = worker(3);
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let started = tokio::time::Instant::now();
        let result = worker
            .send("provider-notify", move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(Error::network(NetworkErrorKind::Timeout))
                    } else {
                        Ok("delivered")
                    }
                }
            })
            .await;

        assert_eq!(result.ok(), Some("delivered"));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        // Two backoff sleeps: 1200ms then 1200 * 1.75 = 2100ms.
        assert_eq!(started.elapsed(), Duration::from_millis(3300));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_error_exhausts_attempt_budget() {
        let worker = worker(3);
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let result: Result<(), Error> = worker
            .send("provider-notify", move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(Error::network(NetworkErrorKind::ConnectionReset))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn terminal_error_fails_on_first_attempt() {
        let worker = worker(3);
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let result: Result<(), Error> = worker
            .send("provider-notify", move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(Error::provider("invalid recipient address"))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn immediate_success_does_not_sleep() {
        let worker = worker(3);
        let result = worker.send("provider-notify", || async { Ok::<_, Error>(42) }).await;
        assert_eq!(result.ok(), Some(42));
    }
}
