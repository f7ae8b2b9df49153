use crate::Counter;
use core::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

/// One progress observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// Counter value at the tick.
    pub generated: u64,
    /// Values generated since the previous tick.
    pub delta: u64,
    /// `delta` per second over the tick period.
    pub rate: f64,
}

/// Periodically logs the shared [`Counter`].
///
/// The monitor only reads the counter; it has no effect on what is generated
/// or persisted, and it can be aborted at any time.
#[derive(Debug, Clone)]
pub struct ProgressMonitor {
    counter: Counter,
    period: Duration,
}

impl ProgressMonitor {
    pub const fn new(counter: Counter, period: Duration) -> Self {
        Self { counter, period }
    }

    /// Spawns the monitor on the current Tokio runtime.
    ///
    /// The first report happens one full period after spawning. The task runs
    /// until aborted through the returned handle.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        let start = Instant::now() + self.period;
        let mut ticker = interval_at(start, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut last = self.counter.get();
        let mut last_tick = Instant::now();

        loop {
            let now = ticker.tick().await;
            let progress = self.observe(last, now.saturating_duration_since(last_tick));
            last = progress.generated;
            last_tick = now;

            tracing::info!(
                generated = progress.generated,
                per_sec = progress.rate.round(),
                "Generated {} values so far",
                progress.generated
            );
        }
    }

    /// Reads the counter and computes the change since `last`.
    pub fn observe(&self, last: u64, elapsed: Duration) -> Progress {
        let generated = self.counter.get();
        let delta = generated.saturating_sub(last);
        let secs = elapsed.as_secs_f64();
        let rate = if secs > 0.0 { delta as f64 / secs } else { 0.0 };
        Progress {
            generated,
            delta,
            rate,
        }
    }
}
