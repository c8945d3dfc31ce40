use anyhow::{Result, anyhow};
use std::time::Duration;

/// Exponential retry schedule: retry attempt `i` waits `unit * base^i`.
///
/// `max_attempts` is the number of retries, one per delay in the schedule,
/// so the default policy sleeps 1+2+4+8+16 seconds across six calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    base: u32,
    unit: Duration,
    max_attempts: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self { base: 2, unit: Duration::from_secs(1), max_attempts: 5 }
    }
}

impl BackoffPolicy {
    pub fn new(base: u32, unit: Duration, max_attempts: u32) -> Result<Self> {
        if base == 0 {
            return Err(anyhow!("Backoff base must be at least 1"));
        }
        if max_attempts == 0 {
            return Err(anyhow!("Backoff max_attempts must be at least 1"));
        }

        Ok(Self { base, unit, max_attempts })
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn unit(&self) -> Duration {
        self.unit
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Total remote calls a lookup may make: the first one plus every retry.
    pub fn max_calls(&self) -> u32 {
        self.max_attempts.saturating_add(1)
    }

    /// Sum of every delay in the schedule.
    pub fn total_backoff(&self) -> Duration {
        self.schedule().fold(Duration::ZERO, |acc, d| acc.saturating_add(d))
    }

    /// `base^attempt`, the multiplier applied to `unit`.
    pub fn factor(&self, attempt: u32) -> Option<u64> {
        if attempt >= self.max_attempts {
            return None;
        }
        Some(u64::from(self.base).saturating_pow(attempt))
    }

    /// Delay for `attempt`, or `None` once the schedule is exhausted.
    pub fn delay(&self, attempt: u32) -> Option<Duration> {
        let factor = self.factor(attempt)?;
        let factor = u32::try_from(factor).unwrap_or(u32::MAX);
        Some(self.unit.saturating_mul(factor))
    }

    pub fn schedule(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.max_attempts).filter_map(|i| self.delay(i))
    }
}
