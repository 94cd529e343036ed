//! Timer utilities for Eos
//!
//! Small wrappers over tokio timers for rule and automation code:
//!
//! - [`Gatekeeper`]: queues commands and enforces a pause after each one
//! - [`RateLimit`]: drops calls arriving before a cooldown expires
//! - [`TimerMgr`]: at most one pending timer per key, with reschedule
//!   and flapping detection
//! - [`CountdownTimer`]: a timer that reports its remaining time every
//!   second until it fires
//!
//! Cancellation everywhere is best effort: a pending timer is aborted
//! if still waiting, with no acknowledgment.

pub mod countdown;
pub mod gatekeeper;
pub mod rate_limit;
pub mod timer_mgr;

pub use countdown::{format_remaining, CountdownTimer};
pub use gatekeeper::Gatekeeper;
pub use rate_limit::RateLimit;
pub use timer_mgr::TimerMgr;
