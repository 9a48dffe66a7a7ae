use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    time::Duration,
};

use tokio::{
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, warn};

pub const TICK_PERIOD: Duration = Duration::from_secs(1);
/// Shortest accepted period; `interval_at` panics on zero.
pub const MIN_TICK_PERIOD: Duration = Duration::from_millis(1);

struct ActiveRun {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Single-flight countdown. Starting a run cancels the previous one.
pub struct CountdownTimer {
    period: Duration,
    generation: Arc<AtomicU64>,
    active: Arc<Mutex<Option<ActiveRun>>>,
}

impl Default for CountdownTimer {
    fn default() -> Self {
        Self::new(TICK_PERIOD)
    }
}

impl CountdownTimer {
    pub fn new(period: Duration) -> Self {
        if period < MIN_TICK_PERIOD {
            warn!(?period, "countdown period too short; clamping");
        }
        Self {
            period: period.max(MIN_TICK_PERIOD),
            generation: Arc::new(AtomicU64::new(0)),
            active: Arc::new(Mutex::new(None)),
        }
    }

    /// Calls `on_tick` once per period with the decremented remaining time
    /// and `on_expire` once when it would drop below zero. Must be called
    /// from within a tokio runtime.
    pub fn start<T, E>(&self, initial_seconds: i64, mut on_tick: T, on_expire: E)
    where
        T: FnMut(i64) + Send + 'static,
        E: FnOnce() + Send + 'static,
    {
        let mut slot = lock(&self.active);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(previous) = slot.take() {
            previous.handle.abort();
            debug!(
                cancelled = previous.generation,
                replacement = generation,
                "countdown replaced"
            );
        }

        let current = Arc::clone(&self.generation);
        let active = Arc::clone(&self.active);
        let period = self.period;
        let handle = tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut remaining = initial_seconds;
            loop {
                ticks.tick().await;
                if current.load(Ordering::SeqCst) != generation {
                    return;
                }
                remaining -= 1;
                if remaining < 0 {
                    {
                        let mut slot = lock(&active);
                        if slot.as_ref().is_some_and(|run| run.generation == generation) {
                            slot.take();
                        }
                    }
                    debug!(generation, "countdown expired");
                    on_expire();
                    return;
                }
                on_tick(remaining);
            }
        });

        *slot = Some(ActiveRun { generation, handle });
    }

    /// Cancels the running countdown, if any.
    pub fn stop(&self) {
        let mut slot = lock(&self.active);
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(run) = slot.take() {
            run.handle.abort();
            debug!(generation = run.generation, "countdown stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        lock(&self.active).is_some()
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn lock(active: &Mutex<Option<ActiveRun>>) -> MutexGuard<'_, Option<ActiveRun>> {
    active.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[path = "tests/timer_tests.rs"]
mod tests;
