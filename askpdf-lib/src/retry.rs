//! Bounded retry with exponential backoff
//!
//! Used around generation calls: one initial attempt plus up to
//! `max_retries` more, doubling the delay each time up to a cap.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use crate::Result;

/// Delay before the first retry
const BASE_DELAY: Duration = Duration::from_millis(500);

/// Maximum delay cap
const MAX_DELAY: Duration = Duration::from_secs(8);

/// Retry policy
#[derive(Debug, Clone)]
pub struct Backoff {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl Backoff {
    /// Policy allowing `max_retries` attempts after the first.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: BASE_DELAY,
            max_delay: MAX_DELAY,
        }
    }

    /// Override the initial delay (zero disables waiting).
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay)
    }

    /// Run `operation` until it succeeds or retries run out, returning the last error.
    pub async fn run<T, F, Fut>(&self, what: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_retries => {
                    let delay = self.delay_for(attempt);
                    warn!(what, attempt = attempt + 1, max_retries = self.max_retries, ?delay, error = %e, "retrying");
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
