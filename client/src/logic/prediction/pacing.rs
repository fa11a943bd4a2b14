//! Batch pacing
//!
//! Pause between consecutive batch requests. The pause optionally grows after
//! consecutive failures and never exceeds `max_interval`.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::logic::error::{ApiError, ApiResult};

#[derive(Debug, Clone, PartialEq)]
pub struct PacingPolicy {
    /// Pause after a successful request
    pub interval: Duration,
    /// Multiplier applied per consecutive failure (1.0 = fixed pause)
    pub backoff_factor: f64,
    /// Upper bound of the pause
    pub max_interval: Duration,
}

impl PacingPolicy {
    /// No pause at all
    pub fn none() -> Self {
        Self {
            interval: Duration::ZERO,
            backoff_factor: 1.0,
            max_interval: Duration::ZERO,
        }
    }

    /// Fixed pause of `interval`
    pub fn fixed(interval: Duration) -> Self {
        Self {
            interval,
            backoff_factor: 1.0,
            max_interval: interval,
        }
    }

    /// Pause to take after a request that ended a streak of
    /// `consecutive_failures` failed requests
    pub fn delay_after(&self, consecutive_failures: u32) -> Duration {
        let factor = if self.backoff_factor.is_finite() && self.backoff_factor > 1.0 {
            self.backoff_factor.powi(consecutive_failures.min(32) as i32)
        } else {
            1.0
        };

        let ceiling = self
            .max_interval
            .max(self.interval)
            .min(Duration::from_millis(crate::constants::PACING_LIMIT_MS));
        let nanos = (self.interval.as_nanos() as f64 * factor).round();
        if nanos >= ceiling.as_nanos() as f64 {
            ceiling
        } else {
            Duration::from_nanos(nanos as u64)
        }
    }

    /// Sleep for the pause, returning early with `Cancelled` when `cancel`
    /// fires
    pub async fn wait(&self, consecutive_failures: u32, cancel: &CancellationToken) -> ApiResult<()> {
        let delay = self.delay_after(consecutive_failures);
        if delay.is_zero() {
            return if cancel.is_cancelled() { Err(ApiError::Cancelled) } else { Ok(()) };
        }

        tokio::select! {
            _ = cancel.cancelled() => Err(ApiError::Cancelled),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(crate::constants::DEFAULT_PACING_MS),
            backoff_factor: crate::constants::DEFAULT_PACING_BACKOFF,
            max_interval: Duration::from_millis(crate::constants::DEFAULT_PACING_MAX_MS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_policy_ignores_failures() {
        let policy = PacingPolicy::fixed(Duration::from_millis(300));
        assert_eq!(policy.delay_after(0), Duration::from_millis(300));
        assert_eq!(policy.delay_after(4), Duration::from_millis(300));
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = PacingPolicy {
            interval: Duration::from_millis(300),
            backoff_factor: 2.0,
            max_interval: Duration::from_millis(1_000),
        };
        assert_eq!(policy.delay_after(0), Duration::from_millis(300));
        assert_eq!(policy.delay_after(1), Duration::from_millis(600));
        assert_eq!(policy.delay_after(2), Duration::from_millis(1_000));
        assert_eq!(policy.delay_after(40), Duration::from_millis(1_000));
    }

    #[test]
    fn test_bad_backoff_factor_is_fixed() {
        let policy = PacingPolicy {
            interval: Duration::from_millis(300),
            backoff_factor: f64::NAN,
            max_interval: Duration::from_millis(1_000),
        };
        assert_eq!(policy.delay_after(3), Duration::from_millis(300));
    }

    #[test]
    fn test_huge_ceiling_is_limited() {
        let policy = PacingPolicy {
            interval: Duration::from_millis(300),
            backoff_factor: 10.0,
            max_interval: Duration::from_millis(u64::MAX),
        };
        let limit = Duration::from_millis(crate::constants::PACING_LIMIT_MS);
        assert_eq!(policy.delay_after(1), Duration::from_millis(3_000));
        assert_eq!(policy.delay_after(32), limit);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_sleeps_for_interval() {
        let policy = PacingPolicy::fixed(Duration::from_millis(300));
        let started = tokio::time::Instant::now();

        policy.wait(0, &CancellationToken::new()).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_interrupted_by_cancel() {
        let policy = PacingPolicy::fixed(Duration::from_secs(60));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let started = tokio::time::Instant::now();
        assert_eq!(policy.wait(0, &cancel).await, Err(ApiError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(60));
    }
}
