use core::{fmt::Display, future::Future, time::Duration};

use async_trait::async_trait;

/// Source of delays, swapped out in tests so retries run instantly.
#[async_trait]
pub trait Sleep: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleep;

#[async_trait]
impl Sleep for TokioSleep {
    #[inline]
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Bounded retry with a fixed back-off and a courtesy pause before every attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub throttle: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: const { Duration::from_secs(2) },
            throttle: const { Duration::from_secs(1) },
        }
    }
}

#[derive(Debug)]
pub struct Exhausted<E> {
    pub attempts: u32,
    pub last: E,
}

impl RetryPolicy {
    /// Runs `op` (given the 1-based attempt number) until it succeeds or the
    /// budget is spent. A zero budget still makes one attempt.
    pub async fn run<T, E, F, Fut>(
        &self,
        sleeper: &dyn Sleep,
        label: &str,
        mut op: F,
    ) -> Result<T, Exhausted<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let budget = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            sleeper.sleep(self.throttle).await;
            attempt += 1;
            match op(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!(target: "retry", "{label} succeeded after {attempt} attempts");
                    }
                    return Ok(value);
                }
                Err(e) => {
                    tracing::warn!(target: "retry", "attempt {attempt} failed for {label}: {e}");
                    if attempt >= budget {
                        return Err(Exhausted { attempts: attempt, last: e });
                    }
                    tracing::info!(target: "retry", "retrying {label} in {:?} ...", self.delay);
                    sleeper.sleep(self.delay).await;
                }
            }
        }
    }
}
