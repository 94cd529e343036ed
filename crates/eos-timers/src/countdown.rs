//! Timer that reports its remaining time every second

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::debug;

/// A one-shot timer that ticks once a second with the time remaining
///
/// `on_tick` receives the remaining time rounded to whole seconds each
/// second (and a final zero), typically forwarded to a display item;
/// `on_expire` runs once when the countdown reaches zero. Cancelling
/// reports a final zero tick without running `on_expire`.
pub struct CountdownTimer {
    task: JoinHandle<()>,
    on_tick: Arc<dyn Fn(Duration) + Send + Sync>,
}

impl CountdownTimer {
    /// Start the countdown immediately
    pub fn start(
        duration: Duration,
        on_tick: impl Fn(Duration) + Send + Sync + 'static,
        on_expire: impl FnOnce() + Send + 'static,
    ) -> Self {
        let on_tick: Arc<dyn Fn(Duration) + Send + Sync> = Arc::new(on_tick);
        let tick = Arc::clone(&on_tick);
        let task = tokio::spawn(async move {
            let end = Instant::now() + duration;
            loop {
                let left = end.saturating_duration_since(Instant::now());
                if left.is_zero() {
                    break;
                }
                debug!(remaining = ?left, "countdown tick");
                tick(round_to_second(left));
                // the final sleep covers only the fraction left
                time::sleep(left.min(Duration::from_secs(1))).await;
            }
            tick(Duration::ZERO);
            on_expire();
        });
        Self { task, on_tick }
    }

    /// Whether the countdown ran to completion or was cancelled
    pub fn has_terminated(&self) -> bool {
        self.task.is_finished()
    }

    /// Abort the countdown, reporting a final zero tick
    pub fn cancel(&self) {
        self.task.abort();
        (self.on_tick)(Duration::ZERO);
    }
}

/// Render a remaining duration as `[D day[s], ]H:MM:SS`
pub fn format_remaining(remaining: Duration) -> String {
    let total = remaining.as_secs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let mins = (total % 3_600) / 60;
    let secs = total % 60;
    match days {
        0 => format!("{hours}:{mins:02}:{secs:02}"),
        1 => format!("1 day, {hours}:{mins:02}:{secs:02}"),
        n => format!("{n} days, {hours}:{mins:02}:{secs:02}"),
    }
}

fn round_to_second(d: Duration) -> Duration {
    Duration::from_secs(d.as_secs_f64().round() as u64)
}
