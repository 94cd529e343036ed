//! Command queue with an enforced pause between commands

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

type Command = Box<dyn FnOnce() + Send + 'static>;

/// Queues commands and makes sure they do not execute too quickly
///
/// Each queued command carries the pause to enforce after it runs;
/// the time the command itself takes counts against the pause. Adding
/// a command never blocks. Commands run in submission order on a
/// dedicated task.
///
/// ```no_run
/// # use std::time::Duration;
/// # use eos_timers::Gatekeeper;
/// let gk = Gatekeeper::new();
/// // run now, then hold the queue for a second
/// gk.add_command(Duration::from_secs(1), || println!("ON"));
/// // waits for the pause above before running
/// gk.add_command(Duration::from_millis(1500), || println!("Hello"));
/// ```
pub struct Gatekeeper {
    tx: mpsc::UnboundedSender<(Duration, Command)>,
    worker: JoinHandle<()>,
}

impl Gatekeeper {
    /// Create the gatekeeper and spawn its worker task
    pub fn new() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<(Duration, Command)>();
        let worker = tokio::spawn(async move {
            while let Some((pause, command)) = rx.recv().await {
                let started = Instant::now();
                command();
                // the command's own runtime counts against the pause
                if let Some(remaining) = pause.checked_sub(started.elapsed()) {
                    debug!(?remaining, "holding command queue");
                    tokio::time::sleep(remaining).await;
                }
            }
        });
        Self { tx, worker }
    }

    /// Queue a command with the pause to enforce after it
    pub fn add_command(&self, pause: Duration, command: impl FnOnce() + Send + 'static) {
        let _ = self.tx.send((pause, Box::new(command)));
    }
}

impl Default for Gatekeeper {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Gatekeeper {
    fn drop(&mut self) {
        // pending commands are discarded
        self.worker.abort();
    }
}
