use std::future::Future;
use std::time::Duration;

/// Exponential backoff policy: `base * 2^attempt` between attempts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Backoff {
    /// Delay before the first retry.
    pub base: Duration,
    /// Number of retries after the initial attempt.
    pub retries: u32,
}
impl Default for Backoff {
    fn default() -> Self {
        Self { base: Duration::from_millis(400), retries: 3 }
    }
}
impl Backoff {
    pub const fn new(base: Duration, retries: u32) -> Self {
        Self { base, retries }
    }

    /// Same base delay, different retry count.
    #[must_use]
    pub const fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Delay to wait after the given (zero-based) failed attempt.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Total number of attempts, including the first.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }
}

/// Run `op` until it succeeds, `should_retry` rejects an error, or the
/// backoff's retries are exhausted. The last error is returned.
///
/// `op` receives the zero-based attempt number.
pub async fn retry<T, E, F, Fut, R>(backoff: Backoff, mut op: F, should_retry: R) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
{
    let mut attempt = 0;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < backoff.retries && should_retry(&err) => {
                let delay = backoff.delay(attempt);
                tracing::trace!(attempt, delay_ms = delay.as_millis() as u64, "retrying after backoff");
                tokio::time::sleep(delay).await;
                attempt += 1;
            },
            Err(err) => return Err(err),
        }
    }
}
