//! Cycle scheduler with cooperative shutdown.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tracing::info;

/// Create the shutdown channel. Send `true` to stop.
pub fn shutdown_channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

pub fn is_shutdown(rx: &watch::Receiver<bool>) -> bool {
    *rx.borrow()
}

/// Sleep for `duration` unless shutdown is requested first.
///
/// Returns false if woken by shutdown.
pub async fn sleep_or_shutdown(duration: Duration, rx: &mut watch::Receiver<bool>) -> bool {
    if is_shutdown(rx) {
        return false;
    }
    tokio::select! {
        _ = tokio::time::sleep(duration) => true,
        changed = rx.changed() => match changed {
            Ok(()) => !is_shutdown(rx),
            // Sender gone: nobody can ask us to stop any more.
            Err(_) => {
                tokio::time::sleep(duration).await;
                true
            }
        },
    }
}

/// Runs a cycle, sleeps, and repeats until shut down.
pub struct Scheduler {
    interval: Duration,
    once: bool,
    shutdown: watch::Receiver<bool>,
}

impl Scheduler {
    pub fn new(interval: Duration, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            interval,
            once: false,
            shutdown,
        }
    }

    /// Run a single cycle and return.
    pub fn once(mut self, once: bool) -> Self {
        self.once = once;
        self
    }

    /// Drive `cycle` with the 1-based cycle number. Returns cycles run.
    pub async fn run<F, Fut>(&mut self, mut cycle: F) -> u64
    where
        F: FnMut(u64) -> Fut,
        Fut: Future<Output = ()>,
    {
        let mut completed = 0;
        loop {
            if is_shutdown(&self.shutdown) {
                break;
            }
            cycle(completed + 1).await;
            completed += 1;

            if self.once {
                break;
            }
            info!(
                "Cycle {} finished, next in {}s",
                completed,
                self.interval.as_secs()
            );
            if !sleep_or_shutdown(self.interval, &mut self.shutdown).await {
                break;
            }
        }
        info!("Scheduler stopped after {} cycle(s)", completed);
        completed
    }
}
