//! Keyed one-shot timers, at most one pending per key

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::trace;

struct TimerEntry {
    deadline: watch::Sender<Instant>,
    task: JoinHandle<()>,
}

/// Manages a map of timers keyed on an item name
///
/// Each key has at most one pending timer. [`check`](TimerMgr::check)
/// either starts a timer or reacts to the one already pending: cancel
/// it (flapping detection) or push its deadline out (reschedule). The
/// expiry callback runs once and the entry cleans itself up.
pub struct TimerMgr {
    timers: Arc<DashMap<String, TimerEntry>>,
}

impl TimerMgr {
    pub fn new() -> Self {
        Self {
            timers: Arc::new(DashMap::new()),
        }
    }

    /// Start a timer for `key`, or handle the one already pending
    ///
    /// With no pending timer, `on_expire` is scheduled to run after
    /// `interval`. With a pending timer, it is rescheduled to a fresh
    /// `interval` when `reschedule` is true and cancelled otherwise;
    /// `on_expire` is dropped in both cases.
    pub fn check(
        &self,
        key: &str,
        interval: Duration,
        on_expire: impl FnOnce() + Send + 'static,
        reschedule: bool,
    ) {
        self.check_or(key, interval, on_expire, || {}, reschedule)
    }

    /// Like [`check`](TimerMgr::check), additionally running
    /// `on_flapping` when a timer was already pending
    pub fn check_or(
        &self,
        key: &str,
        interval: Duration,
        on_expire: impl FnOnce() + Send + 'static,
        on_flapping: impl FnOnce(),
        reschedule: bool,
    ) {
        let deadline = Instant::now() + interval;
        if let Some(entry) = self.timers.get(key) {
            if reschedule {
                trace!(key, "rescheduling pending timer");
                let _ = entry.deadline.send(deadline);
                drop(entry);
            } else {
                trace!(key, "cancelling pending timer");
                drop(entry);
                self.cancel(key);
            }
            // map ref released above so the callback may touch this key
            on_flapping();
            return;
        }

        let (deadline_tx, mut deadline_rx) = watch::channel(deadline);
        let timers = Arc::clone(&self.timers);
        let key_owned = key.to_string();
        let task = tokio::spawn(async move {
            loop {
                let deadline = *deadline_rx.borrow_and_update();
                tokio::select! {
                    _ = time::sleep_until(deadline) => break,
                    changed = deadline_rx.changed() => {
                        // sender gone means the entry was dropped
                        if changed.is_err() {
                            return;
                        }
                    }
                }
            }
            on_expire();
            timers.remove(&key_owned);
        });
        self.timers.insert(
            key.to_string(),
            TimerEntry {
                deadline: deadline_tx,
                task,
            },
        );
    }

    /// Whether a timer is pending for `key`
    pub fn has_timer(&self, key: &str) -> bool {
        self.timers.contains_key(key)
    }

    /// Cancel the pending timer for `key`, if any; true if one existed
    pub fn cancel(&self, key: &str) -> bool {
        match self.timers.remove(key) {
            Some((_, entry)) => {
                entry.task.abort();
                true
            }
            None => false,
        }
    }

    /// Cancel every pending timer
    pub fn cancel_all(&self) {
        let keys: Vec<String> = self.timers.iter().map(|e| e.key().clone()).collect();
        for key in keys {
            self.cancel(&key);
        }
    }
}

impl Default for TimerMgr {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TimerMgr {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = count.clone();
        (count, move || {
            inner.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_expires_and_cleans_up() {
        let mgr = TimerMgr::new();
        let (count, on_expire) = counter();

        mgr.check("Front_Door", Duration::from_secs(60), on_expire, false);
        assert!(mgr.has_timer("Front_Door"));

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!mgr.has_timer("Front_Door"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_flapping_cancels_without_reschedule() {
        let mgr = TimerMgr::new();
        let (count, on_expire) = counter();
        mgr.check("Front_Door", Duration::from_secs(60), on_expire, false);

        tokio::time::sleep(Duration::from_secs(30)).await;
        let mut flapped = false;
        let (second, on_expire) = counter();
        mgr.check_or(
            "Front_Door",
            Duration::from_secs(60),
            on_expire,
            || flapped = true,
            false,
        );
        assert!(flapped);
        assert!(!mgr.has_timer("Front_Door"));

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_pushes_deadline() {
        let mgr = TimerMgr::new();
        let (count, on_expire) = counter();
        mgr.check("Front_Door", Duration::from_secs(60), on_expire, true);

        tokio::time::sleep(Duration::from_secs(45)).await;
        let (dropped, on_expire) = counter();
        mgr.check("Front_Door", Duration::from_secs(60), on_expire, true);

        // the original deadline passes without firing
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(mgr.has_timer("Front_Door"));

        tokio::time::sleep(Duration::from_secs(31)).await;
        // the first callback fires, the replacement was dropped
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(dropped.load(Ordering::SeqCst), 0);
        assert!(!mgr.has_timer("Front_Door"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel() {
        let mgr = TimerMgr::new();
        let (count, on_expire) = counter();
        mgr.check("Hall_Light", Duration::from_secs(10), on_expire, false);

        assert!(mgr.cancel("Hall_Light"));
        assert!(!mgr.cancel("Hall_Light"));

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_independent_keys() {
        let mgr = TimerMgr::new();
        let (first, on_expire) = counter();
        mgr.check("A", Duration::from_secs(10), on_expire, false);
        let (second, on_expire) = counter();
        mgr.check("B", Duration::from_secs(20), on_expire, false);

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
        assert!(mgr.has_timer("B"));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }
}
