//! Countdown and elapsed-time ticks
//!
//! One timer task at a time. Each start bumps a generation counter that the
//! running task checks before every callback, so a stopped timer never
//! delivers a late tick even if its task is mid-wakeup.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Which timer is running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Countdown,
    Elapsed,
}

struct ActiveTimer {
    kind: TimerKind,
    handle: JoinHandle<()>,
}

/// Drives the pre-recording countdown and the recording clock
pub struct PhaseTimer {
    period: Duration,
    generation: Arc<AtomicU64>,
    active: Option<ActiveTimer>,
}

impl PhaseTimer {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            generation: Arc::new(AtomicU64::new(0)),
            active: None,
        }
    }

    /// Tick `duration, duration-1, .., 1` starting now, then complete once
    pub fn start_countdown<T, C>(&mut self, duration: u32, mut on_tick: T, on_complete: C)
    where
        T: FnMut(u32) + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        let (generation, current) = self.next_generation();
        let period = self.period;

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            for remaining in (1..=duration).rev() {
                ticker.tick().await;
                if current.load(Ordering::SeqCst) != generation {
                    return;
                }
                tracing::debug!("Countdown {}", remaining);
                on_tick(remaining);
            }
            ticker.tick().await;
            if current.load(Ordering::SeqCst) != generation {
                return;
            }
            on_complete();
        });

        self.active = Some(ActiveTimer {
            kind: TimerKind::Countdown,
            handle,
        });
    }

    /// Tick `0, 1, 2, ..` once per period until stopped
    pub fn start_elapsed<T>(&mut self, mut on_tick: T)
    where
        T: FnMut(u64) + Send + 'static,
    {
        let (generation, current) = self.next_generation();
        let period = self.period;

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut elapsed: u64 = 0;
            loop {
                ticker.tick().await;
                if current.load(Ordering::SeqCst) != generation {
                    return;
                }
                on_tick(elapsed);
                elapsed += 1;
            }
        });

        self.active = Some(ActiveTimer {
            kind: TimerKind::Elapsed,
            handle,
        });
    }

    /// Cancel whichever timer is running; returns whether one was
    pub fn stop(&mut self) -> bool {
        self.generation.fetch_add(1, Ordering::SeqCst);
        match self.active.take() {
            Some(active) => {
                let was_running = !active.handle.is_finished();
                active.handle.abort();
                was_running
            }
            None => false,
        }
    }

    /// The running timer, if any
    pub fn kind(&self) -> Option<TimerKind> {
        self.active
            .as_ref()
            .filter(|a| !a.handle.is_finished())
            .map(|a| a.kind)
    }

    fn next_generation(&mut self) -> (u64, Arc<AtomicU64>) {
        self.stop();
        (
            self.generation.load(Ordering::SeqCst),
            Arc::clone(&self.generation),
        )
    }
}

impl Drop for PhaseTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// `MM:SS`, zero padded; minutes are not capped at 59
pub fn format_elapsed(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use tokio::time::sleep;

    const SECOND: Duration = Duration::from_secs(1);

    #[tokio::test(start_paused = true)]
    async fn test_countdown_ticks_then_completes_once() {
        let ticks = Arc::new(Mutex::new(Vec::new()));
        let completions = Arc::new(AtomicU64::new(0));
        let mut timer = PhaseTimer::new(SECOND);

        let t = ticks.clone();
        let c = completions.clone();
        timer.start_countdown(
            3,
            move |n| t.lock().push(n),
            move || {
                c.fetch_add(1, Ordering::SeqCst);
            },
        );
        assert_eq!(timer.kind(), Some(TimerKind::Countdown));

        sleep(Duration::from_millis(2_500)).await;
        assert_eq!(*ticks.lock(), vec![3, 2, 1]);
        assert_eq!(completions.load(Ordering::SeqCst), 0);

        sleep(SECOND).await;
        assert_eq!(completions.load(Ordering::SeqCst), 1);

        sleep(SECOND * 5).await;
        assert_eq!(*ticks.lock(), vec![3, 2, 1]);
        assert_eq!(completions.load(Ordering::SeqCst), 1);
        assert_eq!(timer.kind(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_countdown_goes_quiet() {
        let ticks = Arc::new(Mutex::new(Vec::new()));
        let completions = Arc::new(AtomicU64::new(0));
        let mut timer = PhaseTimer::new(SECOND);

        let t = ticks.clone();
        let c = completions.clone();
        timer.start_countdown(
            3,
            move |n| t.lock().push(n),
            move || {
                c.fetch_add(1, Ordering::SeqCst);
            },
        );

        sleep(Duration::from_millis(1_500)).await;
        assert!(timer.stop());
        assert!(!timer.stop());

        sleep(SECOND * 5).await;
        assert_eq!(*ticks.lock(), vec![3, 2]);
        assert_eq!(completions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_counts_until_stopped() {
        let ticks = Arc::new(Mutex::new(Vec::new()));
        let mut timer = PhaseTimer::new(SECOND);

        let t = ticks.clone();
        timer.start_elapsed(move |n| t.lock().push(n));

        sleep(Duration::from_millis(4_500)).await;
        timer.stop();
        sleep(SECOND * 3).await;

        assert_eq!(*ticks.lock(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_starting_one_timer_cancels_the_other() {
        let countdown = Arc::new(Mutex::new(Vec::new()));
        let elapsed = Arc::new(Mutex::new(Vec::new()));
        let mut timer = PhaseTimer::new(SECOND);

        let c = countdown.clone();
        timer.start_countdown(5, move |n| c.lock().push(n), || {});
        sleep(Duration::from_millis(500)).await;

        let e = elapsed.clone();
        timer.start_elapsed(move |n| e.lock().push(n));
        assert_eq!(timer.kind(), Some(TimerKind::Elapsed));

        sleep(Duration::from_millis(2_200)).await;
        assert_eq!(*countdown.lock(), vec![5]);
        assert_eq!(*elapsed.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(0), "00:00");
        assert_eq!(format_elapsed(5), "00:05");
        assert_eq!(format_elapsed(65), "01:05");
        assert_eq!(format_elapsed(3_600), "60:00");
    }
}
