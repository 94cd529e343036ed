//! Cooldown-based call dropping

use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// Drops calls arriving before a cooldown has expired
///
/// The counterpart to [`Gatekeeper`](crate::Gatekeeper): the gatekeeper
/// runs every command but spreads them out, a rate limit discards
/// repeated calls outright.
#[derive(Debug)]
pub struct RateLimit {
    until: Instant,
}

impl RateLimit {
    pub fn new() -> Self {
        Self {
            until: Instant::now(),
        }
    }

    /// Run `func` unless a previous run's cooldown is still active
    ///
    /// When the call is allowed, the next `cooldown` window starts from
    /// now. Dropped calls do not extend the window.
    pub fn run(&mut self, cooldown: Duration, func: impl FnOnce()) {
        let now = Instant::now();
        if now >= self.until {
            self.until = now + cooldown;
            func();
        } else {
            trace!(remaining = ?(self.until - now), "rate limited, call dropped");
        }
    }
}

impl Default for RateLimit {
    fn default() -> Self {
        Self::new()
    }
}
