use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Source of delays between attempts. Tests swap in a recording sleeper so
/// retry loops run without touching the clock.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Bounded retry: `attempts` tries in total, waiting `backoff(n)` before
/// attempt `n` (1-based) for every attempt after the first.
#[derive(Clone)]
pub struct RetryPolicy {
    attempts: u32,
    backoff: Arc<dyn Fn(u32) -> Duration + Send + Sync>,
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("attempts", &self.attempts)
            .finish_non_exhaustive()
    }
}

impl RetryPolicy {
    /// Same delay before every retry.
    pub fn fixed(attempts: u32, delay: Duration) -> Self {
        Self::with_backoff(attempts, move |_| delay)
    }

    /// Delay grows by `step` with every retry.
    pub fn linear(attempts: u32, step: Duration) -> Self {
        Self::with_backoff(attempts, move |attempt| step * attempt.saturating_sub(1))
    }

    /// A policy always makes at least one attempt.
    pub fn with_backoff<F>(attempts: u32, backoff: F) -> Self
    where
        F: Fn(u32) -> Duration + Send + Sync + 'static,
    {
        Self {
            attempts: attempts.max(1),
            backoff: Arc::new(backoff),
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn delay_before(&self, attempt: u32) -> Duration {
        (self.backoff)(attempt)
    }

    /// Run `op` until it succeeds or attempts run out. The last error is
    /// returned as is.
    pub async fn run<T, E, F, Fut>(&self, sleeper: &dyn Sleeper, op: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run_if(sleeper, op, |_| true).await
    }

    /// Like [`run`](Self::run) but stops early on errors `retryable` rejects.
    pub async fn run_if<T, E, F, Fut, R>(
        &self,
        sleeper: &dyn Sleeper,
        mut op: F,
        retryable: R,
    ) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        R: Fn(&E) -> bool,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= self.attempts || !retryable(&e) => return Err(e),
                Err(_) => {
                    attempt += 1;
                    sleeper.sleep(self.delay_before(attempt)).await;
                }
            }
        }
    }
}
