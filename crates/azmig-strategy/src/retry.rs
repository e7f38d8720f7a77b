//! Bounded retry for typed provider errors
//!
//! Retry decisions look at the [`ProviderError`] kind only, never at message
//! text. Validation and authorization errors are never retried.

use azmig_resource::ProviderError;
use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

/// Fixed back-off retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before each retry
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Exactly one retry after `backoff`, only on `SnapshotCountExceeded`
    #[must_use]
    pub const fn snapshot_limit(backoff: Duration) -> Self {
        Self {
            max_retries: 1,
            backoff,
        }
    }

    fn retries(error: &ProviderError) -> bool {
        matches!(error, ProviderError::SnapshotCountExceeded(_))
    }

    /// Run `operation`, retrying per policy
    ///
    /// Returns the final result together with the number of attempts made.
    pub async fn run<F, Fut, T>(&self, operation_name: &str, mut operation: F) -> (Result<T, ProviderError>, u32)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            match operation().await {
                Ok(value) => return (Ok(value), attempt),
                Err(e) if attempt <= self.max_retries && Self::retries(&e) => {
                    warn!(
                        operation = %operation_name,
                        attempt = attempt,
                        error = %e,
                        delay_ms = self.backoff.as_millis(),
                        "Provider operation failed, retrying"
                    );
                    tokio::time::sleep(self.backoff).await;
                }
                Err(e) => {
                    if attempt > 1 {
                        error!(
                            operation = %operation_name,
                            attempt = attempt,
                            error = %e,
                            "Provider operation failed after retry"
                        );
                    }
                    return (Err(e), attempt);
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::snapshot_limit(Duration::from_secs(30))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use azmig_resource::ResourceIdentifier;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn vm() -> ResourceIdentifier {
        ResourceIdentifier::new("s", "rg", "Microsoft.Compute", "virtualMachines", "vm1").unwrap()
    }

    #[tokio::test]
    async fn succeeds_after_one_snapshot_retry() {
        let counter = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::snapshot_limit(Duration::from_millis(1));

        let (result, attempts) = policy
            .run("replace_disk", || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(ProviderError::SnapshotCountExceeded(vm()))
                    } else {
                        Ok("converted")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "converted");
        assert_eq!(attempts, 2);
    }

    #[tokio::test]
    async fn retries_exactly_once() {
        let counter = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::snapshot_limit(Duration::from_millis(1));

        let (result, attempts) = policy
            .run("replace_disk", || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(ProviderError::SnapshotCountExceeded(vm()))
                }
            })
            .await;

        assert!(matches!(result, Err(ProviderError::SnapshotCountExceeded(_))));
        assert_eq!(attempts, 2);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let policy = RetryPolicy::snapshot_limit(Duration::from_millis(1));

        for err in [
            ProviderError::Transient("throttled".into()),
            ProviderError::permission_denied(&vm(), "denied"),
            ProviderError::InvalidRequest("bad".into()),
        ] {
            let counter = AtomicU32::new(0);
            let (result, attempts) = policy
                .run("replace_disk", || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    let err = err.clone();
                    async move { Err::<(), _>(err) }
                })
                .await;
            assert!(result.is_err());
            assert_eq!(attempts, 1);
            assert_eq!(counter.load(Ordering::SeqCst), 1);
        }
    }
}
