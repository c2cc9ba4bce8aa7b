/// Deadline-bounded polling for long-running remote operations
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::error::{OkeError, OkeResult};

/// Configuration for polling operations
#[derive(Debug, Clone)]
pub struct PollingConfig {
    pub timeout: Duration,
    pub interval: Duration,
    pub description: String,
}

impl PollingConfig {
    /// Create a new polling configuration
    pub fn new(timeout: Duration, interval: Duration, description: impl Into<String>) -> Self {
        Self {
            timeout,
            interval,
            description: description.into(),
        }
    }

    /// Same timing, different description
    pub fn describe(&self, description: impl Into<String>) -> Self {
        Self {
            timeout: self.timeout,
            interval: self.interval,
            description: description.into(),
        }
    }

    /// Poll until condition is met or the deadline passes
    ///
    /// The condition function should return:
    /// - Ok(Some(T)) when condition is met (returns T)
    /// - Ok(None) when condition is not yet met (continues polling)
    /// - Err(e) when an error occurs (stops polling and returns error)
    pub async fn poll<F, Fut, T>(&self, mut condition: F) -> OkeResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = OkeResult<Option<T>>>,
    {
        info!("{}...", self.description);

        let start = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            if let Some(value) = condition().await? {
                info!("✓ {}", self.description);
                return Ok(value);
            }

            if start.elapsed() >= self.timeout {
                return Err(OkeError::WaitExceeded {
                    description: self.description.clone(),
                    secs: self.timeout.as_secs(),
                });
            }

            debug!(
                "{}: attempt {} not complete, sleeping {:?}",
                self.description, attempt, self.interval
            );
            tokio::time::sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast(description: &str) -> PollingConfig {
        PollingConfig::new(
            Duration::from_secs(5),
            Duration::from_millis(5),
            description,
        )
    }

    #[tokio::test]
    async fn test_polling_success() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = fast("test polling")
            .poll(|| {
                let c = counter_clone.clone();
                async move {
                    let val = c.fetch_add(1, Ordering::SeqCst);
                    if val >= 2 {
                        Ok(Some(val))
                    } else {
                        Ok(None)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_polling_timeout() {
        let config = PollingConfig::new(
            Duration::from_millis(30),
            Duration::from_millis(5),
            "test timeout",
        );

        let result = config.poll(|| async { Ok::<Option<()>, OkeError>(None) }).await;

        match result {
            Err(OkeError::WaitExceeded { description, .. }) => {
                assert_eq!(description, "test timeout")
            }
            other => panic!("expected WaitExceeded, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_polling_error_stops_loop() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result: OkeResult<()> = fast("test error")
            .poll(|| {
                let c = counter_clone.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err(OkeError::MissingInput("boom".to_string()))
                }
            })
            .await;

        assert!(matches!(result, Err(OkeError::MissingInput(_))));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
