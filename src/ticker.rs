//! Periodic background task.
//!
//! A `Ticker` owns one named OS thread that runs a tick body, then sleeps
//! for the interval, until it is stopped. The sleep is a `select!` on a stop
//! channel, so `stop` wakes the thread at once instead of waiting out the
//! interval.
//!
//! Stopping is a signal, not a join: the thread may already be inside its
//! body waiting for the engine's writer lock. Engines pair each ticker with
//! an epoch checked under that lock, so a tick that loses the race against
//! `stop` is discarded rather than applied.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, select, Sender};
use tracing::{debug, info};

use crate::error::{EcoResult, RuntimeError};

/// What the loop does after a tick body returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    /// Sleep for the interval and tick again.
    Continue,
    /// Exit the loop.
    Stop,
}

/// Handle to a running periodic task.
#[derive(Debug)]
pub struct Ticker {
    name: String,
    epoch: u64,
    stop_tx: Option<Sender<()>>,
    join: Option<JoinHandle<()>>,
}

impl Ticker {
    /// Spawns a thread that calls `body` immediately and then once per `interval`.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeError::SpawnFailed` if the OS refuses the thread.
    pub fn spawn<F>(name: &str, epoch: u64, interval: Duration, mut body: F) -> EcoResult<Self>
    where
        F: FnMut() -> TickControl + Send + 'static,
    {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let thread_name = format!("ecosync-{name}-{epoch}");
        let log_name = name.to_string();

        let join = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                let mut ticks = 0u64;
                loop {
                    if body() == TickControl::Stop {
                        break;
                    }
                    ticks += 1;
                    select! {
                        // A message or a dropped sender both mean stop.
                        recv(stop_rx) -> _ => break,
                        default(interval) => {}
                    }
                }
                debug!(target: "ecosync::ticker", ticker = %log_name, epoch, ticks, "ticker loop exited");
            })
            .map_err(|e| RuntimeError::SpawnFailed {
                name: thread_name,
                message: e.to_string(),
            })?;

        info!(
            target: "ecosync::ticker",
            ticker = %name,
            epoch,
            interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
            "ticker started"
        );

        Ok(Self {
            name: name.to_string(),
            epoch,
            stop_tx: Some(stop_tx),
            join: Some(join),
        })
    }

    /// The epoch this ticker was started with.
    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    /// True once the thread has left its loop.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Signals the thread to stop and detaches it.
    pub fn stop(mut self) {
        self.signal_stop();
    }

    fn signal_stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.try_send(());
            info!(target: "ecosync::ticker", ticker = %self.name, epoch = self.epoch, "ticker stopped");
        }
        // Never join here: the thread may be waiting on a lock the caller holds.
        drop(self.join.take());
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.signal_stop();
    }
}
