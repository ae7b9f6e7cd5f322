//! Retry logic with exponential backoff
//!
//! Used to re-attempt unit-of-work commits that fail for transient reasons
//! (deadlocks, lock timeouts, dropped connections).

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Options for retry behavior
#[derive(Debug, Clone, PartialEq)]
pub struct RetryOptions {
    /// Maximum number of retry attempts
    pub max_attempts: u32,
    /// Initial delay before first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Backoff multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryOptions {
    /// Options that make exactly one attempt
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }
}

/// Retry manager for executing operations with exponential backoff
///
/// # Examples
///
/// ```no_run
/// use content_publishing::core::{RetryManager, RetryOptions};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let manager = RetryManager::new(RetryOptions::default());
///
///     manager.retry(|| async {
///         // commit the unit of work here
///         Ok::<_, anyhow::Error>(())
///     }).await?;
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RetryManager {
    options: RetryOptions,
}

impl Default for RetryManager {
    fn default() -> Self {
        Self::new(RetryOptions::default())
    }
}

impl RetryManager {
    /// Create a new RetryManager with the given options
    ///
    /// # Examples
    ///
    /// ```
    /// use content_publishing::core::{RetryManager, RetryOptions};
    ///
    /// let manager = RetryManager::new(RetryOptions::default());
    /// ```
    pub fn new(options: RetryOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RetryOptions {
        &self.options
    }

    /// Execute the given async operation with retry logic
    ///
    /// # Arguments
    ///
    /// * `operation` - Async function that returns a Result
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use content_publishing::core::{RetryManager, RetryOptions};
    /// # #[tokio::main]
    /// # async fn main() -> anyhow::Result<()> {
    /// let manager = RetryManager::new(RetryOptions::default());
    ///
    /// let result = manager.retry(|| async {
    ///     // Simulated commit
    ///     Ok::<_, anyhow::Error>(42)
    /// }).await?;
    ///
    /// assert_eq!(result, 42);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn retry<F, Fut, T, E>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let max_attempts = self.options.max_attempts.max(1);
        let mut delay = self.options.initial_delay;
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(error) => {
                    if !self.is_retryable_error(&error) || attempt >= max_attempts {
                        return Err(error);
                    }

                    warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "transient commit failure, retrying"
                    );

                    sleep(delay).await;

                    delay = Duration::from_secs_f64(
                        delay.as_secs_f64() * self.options.backoff_multiplier,
                    )
                    .min(self.options.max_delay);
                    attempt += 1;
                }
            }
        }
    }

    /// Check if an error should be retried
    ///
    /// Only transient storage conditions are retried; anything else is
    /// returned on the first failure.
    fn is_retryable_error<E: std::fmt::Display>(&self, error: &E) -> bool {
        let error_msg = error.to_string().to_lowercase();

        let retryable_patterns = [
            "deadlock",
            "lock timeout",
            "timeout",
            "timed out",
            "database is locked",
            "database is busy",
            "sqlite_busy",
            "connection reset",
            "connection refused",
            "serialization failure",
        ];

        retryable_patterns
            .iter()
            .any(|pattern| error_msg.contains(pattern))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_options(max_attempts: u32) -> RetryOptions {
        RetryOptions {
            max_attempts,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(100),
            backoff_multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn test_retry_success_on_first_attempt() {
        let manager = RetryManager::new(RetryOptions::default());

        let result = manager.retry(|| async { Ok::<_, anyhow::Error>(42) }).await;

        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_retry_success_after_deadlocks() {
        let manager = RetryManager::new(fast_options(3));

        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = manager
            .retry(move || {
                let count = counter_clone.fetch_add(1, Ordering::SeqCst);
                async move {
                    if count < 2 {
                        Err(anyhow::anyhow!("deadlock detected"))
                    } else {
                        Ok::<_, anyhow::Error>("committed")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "committed");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_max_attempts_reached() {
        let manager = RetryManager::new(fast_options(3));

        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = manager
            .retry(move || {
                counter_clone.fetch_add(1, Ordering::SeqCst);
                async move { Err::<i32, _>(anyhow::anyhow!("database is locked")) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error() {
        let manager = RetryManager::new(fast_options(5));

        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = manager
            .retry(move || {
                counter_clone.fetch_add(1, Ordering::SeqCst);
                async move { Err::<i32, _>(anyhow::anyhow!("unique constraint violated")) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let manager = RetryManager::new(fast_options(0));

        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = manager
            .retry(move || {
                counter_clone.fetch_add(1, Ordering::SeqCst);
                async move { Err::<i32, _>(anyhow::anyhow!("timeout")) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exponential_backoff() {
        let manager = RetryManager::new(RetryOptions {
            max_attempts: 3,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(50),
            backoff_multiplier: 2.0,
        });

        let start = std::time::Instant::now();

        let _result = manager
            .retry(|| async { Err::<i32, _>(anyhow::anyhow!("lock timeout")) })
            .await;

        // 10ms + 20ms, the last attempt does not wait
        assert!(
            start.elapsed() >= Duration::from_millis(30),
            "Expected at least 30ms, got {:?}",
            start.elapsed()
        );
    }

    #[test]
    fn test_retryable_error_patterns() {
        let manager = RetryManager::new(RetryOptions::default());

        for error_msg in [
            "Deadlock found when trying to get lock",
            "SQLITE_BUSY: database is locked",
            "statement timed out",
            "Connection reset by peer",
            "could not serialize access: serialization failure",
        ] {
            assert!(
                manager.is_retryable_error(&anyhow::anyhow!("{}", error_msg)),
                "Expected '{}' to be retryable",
                error_msg
            );
        }

        assert!(!manager.is_retryable_error(&anyhow::anyhow!("permission denied")));
    }

    #[test]
    fn test_busy_only_retried_for_storage() {
        let manager = RetryManager::default();

        assert!(manager.is_retryable_error(&anyhow::anyhow!("SQLITE_BUSY")));
        assert!(manager.is_retryable_error(&anyhow::anyhow!("database is busy")));
        assert!(!manager.is_retryable_error(&anyhow::anyhow!("resource busy: permission")));
    }

    #[test]
    fn test_retry_manager_default() {
        let manager = RetryManager::default();

        assert_eq!(manager.options(), &RetryOptions::default());
    }

    #[test]
    fn test_retry_options_default() {
        let options = RetryOptions::default();

        assert_eq!(options.max_attempts, 3);
        assert_eq!(options.initial_delay, Duration::from_millis(100));
        assert_eq!(options.max_delay, Duration::from_secs(5));
        assert_eq!(options.backoff_multiplier, 2.0);
        assert_eq!(RetryOptions::no_retry().max_attempts, 1);
    }
}
