use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use super::service::ProgressEngine;

/// One training minute per tick.
pub const DEFAULT_TICK: Duration = Duration::from_secs(60);

/// Shortest accepted tick; shorter periods are raised to this.
pub const MIN_TICK: Duration = Duration::from_secs(1);

/// Background task that credits training time while a session is open.
///
/// Ticks share the engine with user calls through the mutex, so they
/// interleave in lock order. Dropping the timer stops it.
#[derive(Debug)]
pub struct TrainingTimer {
    handle: Option<JoinHandle<()>>,
}

impl TrainingTimer {
    /// Start ticking every `period`; the first tick fires one period from now.
    /// Periods below [`MIN_TICK`] are clamped.
    #[must_use]
    pub fn start(engine: Arc<Mutex<ProgressEngine>>, period: Duration) -> Self {
        if period < MIN_TICK {
            warn!(requested_ms = period.as_millis(), "training tick too short; clamping");
        }
        let period = period.max(MIN_TICK);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                engine.lock().await.record_training_minute().await;
            }
        });
        debug!(period_secs = period.as_secs(), "training timer started");
        Self {
            handle: Some(handle),
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("training timer stopped");
        }
    }
}

impl Drop for TrainingTimer {
    fn drop(&mut self) {
        self.stop();
    }
}
