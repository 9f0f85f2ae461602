//! Published engine snapshots.
//!
//! Every engine owns one [`SnapshotCell`]. A committed transition replaces
//! the cell's `Arc<S>` wholesale; readers clone the `Arc` and never observe
//! a partially applied command. Subscribers get each new snapshot over a
//! bounded channel. Publishing never blocks: a subscriber whose buffer is
//! full misses that snapshot, and a subscriber whose stream was dropped
//! is removed on the next publish.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EcoResult, RuntimeError};

/// Unique identifier for a snapshot subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Create a new random subscription id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Latest committed snapshot plus its subscribers.
#[derive(Debug)]
pub struct SnapshotCell<S> {
    path: &'static str,
    current: RwLock<Arc<S>>,
    subscribers: Mutex<HashMap<SubscriptionId, Sender<Arc<S>>>>,
    stream_capacity: usize,
    dropped_snapshots: AtomicU64,
}

impl<S> SnapshotCell<S> {
    /// Creates a cell holding `initial`. `path` names the cell in errors and logs.
    #[must_use]
    pub fn new(path: &'static str, initial: S, stream_capacity: usize) -> Self {
        Self {
            path,
            current: RwLock::new(Arc::new(initial)),
            subscribers: Mutex::new(HashMap::new()),
            stream_capacity: stream_capacity.max(1),
            dropped_snapshots: AtomicU64::new(0),
        }
    }

    /// The latest committed snapshot.
    #[must_use]
    pub fn current(&self) -> Arc<S> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replaces the current snapshot and notifies subscribers.
    ///
    /// Callers serialize publishes through their own writer lock so
    /// subscribers see snapshots in commit order.
    pub fn publish(&self, next: S) -> Arc<S> {
        let next = Arc::new(next);

        // Lock order: subscribers, then current.
        let mut subs = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&next);
        subs.retain(|_, tx| match tx.try_send(Arc::clone(&next)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.dropped_snapshots.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
        next
    }

    /// Registers a subscriber. The stream starts with the current snapshot.
    pub fn subscribe(&self) -> SnapshotStream<S> {
        let subscription_id = SubscriptionId::new();
        let (tx, rx) = bounded::<Arc<S>>(self.stream_capacity);

        let mut subs = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        // Taken under the subscriber lock so no publish is skipped or duplicated.
        let _ = tx.try_send(self.current());
        subs.insert(subscription_id, tx);

        SnapshotStream {
            subscription_id,
            path: self.path,
            rx,
        }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Snapshots not delivered because a subscriber buffer was full.
    #[must_use]
    pub fn dropped_snapshots(&self) -> u64 {
        self.dropped_snapshots.load(Ordering::Relaxed)
    }
}

/// A subscription to an engine's snapshots.
#[derive(Debug)]
pub struct SnapshotStream<S> {
    subscription_id: SubscriptionId,
    path: &'static str,
    rx: Receiver<Arc<S>>,
}

impl<S> SnapshotStream<S> {
    /// The subscription id backing this stream.
    #[must_use]
    pub const fn subscription_id(&self) -> SubscriptionId {
        self.subscription_id
    }

    /// Receive the next snapshot (blocking).
    pub fn recv(&self) -> EcoResult<Arc<S>> {
        self.rx.recv().map_err(|_| self.disconnected())
    }

    /// Receive the next snapshot with a timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> EcoResult<Arc<S>> {
        self.rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => RuntimeError::Timeout {
                duration_ms: timeout.as_millis().min(u128::from(u64::MAX)) as u64,
            }
            .into(),
            RecvTimeoutError::Disconnected => self.disconnected(),
        })
    }

    /// Receive a pending snapshot without waiting.
    pub fn try_recv(&self) -> EcoResult<Arc<S>> {
        self.rx.try_recv().map_err(|err| match err {
            TryRecvError::Empty => RuntimeError::Empty {
                path: self.path.to_string(),
            }
            .into(),
            TryRecvError::Disconnected => self.disconnected(),
        })
    }

    /// Drain every pending snapshot and return the newest one.
    pub fn latest(&self) -> EcoResult<Arc<S>> {
        let mut newest = self.try_recv()?;
        while let Ok(next) = self.rx.try_recv() {
            newest = next;
        }
        Ok(newest)
    }

    fn disconnected(&self) -> crate::error::EcoError {
        RuntimeError::Disconnected {
            path: self.path.to_string(),
        }
        .into()
    }
}
