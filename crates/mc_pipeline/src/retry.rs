use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use mc_core::{Error, Result};

use crate::logging::Logger;

/// Retry configuration for one unit of work (a batch, a summary)
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Attempts including the first one
    pub max_attempts: u32,
    /// Wait after the first failure
    pub initial_backoff: Duration,
    /// Growth factor applied after each further failure
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Wait after failed attempt number `attempt` (1-based): 1s, 2s, 4s with defaults.
    pub fn next_backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        self.initial_backoff.mul_f64(self.multiplier.powi(exponent))
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::Configuration("max_attempts must be at least 1".to_string()));
        }
        if !(self.multiplier.is_finite() && self.multiplier >= 1.0) {
            return Err(Error::Configuration(format!(
                "backoff multiplier must be >= 1.0, got {}",
                self.multiplier
            )));
        }
        Ok(())
    }
}

/// Where backoff waits happen; swapped out in tests to observe them.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or runs
/// out of attempts. The last error is returned unchanged.
///
/// On success also returns how many attempts it took.
pub async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    sleeper: &dyn Sleeper,
    logger: &Logger,
    mut operation: F,
) -> Result<(T, u32)>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match operation(attempt).await {
            Ok(value) => return Ok((value, attempt)),
            Err(error) => {
                logger.warn(&format!(
                    "! attempt {}/{} failed: {}",
                    attempt, config.max_attempts, error
                ));
                if !error.is_retryable() || attempt >= config.max_attempts {
                    logger.error(&format!("✖ giving up after {} attempt(s)", attempt));
                    return Err(error);
                }
                let backoff = config.next_backoff(attempt);
                logger.info(&format!("↺ retrying in {:.1}s", backoff.as_secs_f64()));
                sleeper.sleep(backoff).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records requested waits instead of sleeping.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingSleeper {
        pub(crate) waits: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        pub(crate) fn waits(&self) -> Vec<Duration> {
            self.waits.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.waits.lock().unwrap().push(duration);
        }
    }

    #[test]
    fn test_next_backoff_doubles() {
        let config = RetryConfig::default();
        assert_eq!(config.next_backoff(1), Duration::from_secs(1));
        assert_eq!(config.next_backoff(2), Duration::from_secs(2));
        assert_eq!(config.next_backoff(3), Duration::from_secs(4));
    }

    #[test]
    fn test_validate() {
        assert!(RetryConfig::default().validate().is_ok());
        let zero = RetryConfig { max_attempts: 0, ..RetryConfig::default() };
        assert!(matches!(zero.validate(), Err(Error::Configuration(_))));
        let shrinking = RetryConfig { multiplier: 0.5, ..RetryConfig::default() };
        assert!(shrinking.validate().is_err());
    }

    #[tokio::test]
    async fn test_succeeds_on_third_attempt_after_two_waits() {
        let sleeper = RecordingSleeper::default();
        let calls = Mutex::new(0u32);
        let result = with_retry(&RetryConfig::default(), &sleeper, &Logger::new(), |attempt| {
            *calls.lock().unwrap() += 1;
            async move {
                if attempt < 3 {
                    Err(Error::Extraction("no JSON array found".to_string()))
                } else {
                    Ok("listo")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), ("listo", 3));
        assert_eq!(*calls.lock().unwrap(), 3);
        assert_eq!(sleeper.waits(), vec![Duration::from_secs(1), Duration::from_secs(2)]);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let sleeper = RecordingSleeper::default();
        let result: Result<((), u32)> =
            with_retry(&RetryConfig::default(), &sleeper, &Logger::new(), |attempt| async move {
                Err(Error::Transport(format!("attempt {attempt}")))
            })
            .await;

        match result {
            Err(Error::Transport(msg)) => assert_eq!(msg, "attempt 3"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(sleeper.waits().len(), 2);
    }

    #[tokio::test]
    async fn test_configuration_errors_are_not_retried() {
        let sleeper = RecordingSleeper::default();
        let result: Result<((), u32)> =
            with_retry(&RetryConfig::default(), &sleeper, &Logger::new(), |_| async {
                Err(Error::Configuration("missing key".to_string()))
            })
            .await;

        assert!(matches!(result, Err(Error::Configuration(_))));
        assert!(sleeper.waits().is_empty());
    }
}
