//! Polling for page conditions

use std::time::Duration;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Polls a check at a fixed period until it yields a value
#[derive(Debug, Clone, Copy)]
pub struct ConditionWatcher {
    period: Duration,
}

impl ConditionWatcher {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Probe once per period, giving up after `max_attempts` misses
    ///
    /// The first check runs one period after the call.
    pub async fn poll_until<T, F>(&self, mut check: F, max_attempts: u32) -> Option<T>
    where
        F: FnMut() -> Option<T>,
    {
        for attempt in 1..=max_attempts {
            sleep(self.period).await;
            if let Some(value) = check() {
                tracing::debug!("Condition met after {} attempt(s)", attempt);
                return Some(value);
            }
        }
        tracing::debug!("Condition not met after {} attempts", max_attempts);
        None
    }

    /// Probe now and then once per period until a value or cancellation
    pub async fn observe<T, F>(&self, mut check: F, cancel: &CancellationToken) -> Option<T>
    where
        F: FnMut() -> Option<T>,
    {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("Condition watch cancelled");
                    return None;
                }
                _ = ticker.tick() => {
                    if let Some(value) = check() {
                        return Some(value);
                    }
                }
            }
        }
    }
}
