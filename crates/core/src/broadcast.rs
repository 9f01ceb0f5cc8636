//! Fan-out of progress snapshots to subscribers.
//!
//! Every subscriber owns a bounded queue. Publishing never waits: a full
//! queue loses that one update, a closed queue is detached.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::jobs::ProgressUpdate;
use crate::metrics;

/// Handle identifying one attached subscriber.
pub type SubscriberId = u64;

/// Receiving end handed to the transport layer.
#[derive(Debug)]
pub struct Subscriber {
    id: SubscriberId,
    rx: mpsc::Receiver<ProgressUpdate>,
}

impl Subscriber {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Waits for the next update. `None` once detached and drained.
    pub async fn recv(&mut self) -> Option<ProgressUpdate> {
        self.rx.recv().await
    }

    /// Next queued update without waiting.
    pub fn try_recv(&mut self) -> Option<ProgressUpdate> {
        self.rx.try_recv().ok()
    }
}

/// Subscriber registry with non-blocking publish.
#[derive(Debug)]
pub struct Broadcaster {
    capacity: usize,
    next_id: AtomicU64,
    subscribers: RwLock<Vec<(SubscriberId, mpsc::Sender<ProgressUpdate>)>>,
}

impl Broadcaster {
    /// Creates a broadcaster whose subscribers hold up to `capacity` updates.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            next_id: AtomicU64::new(1),
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Registers a new subscriber queue.
    pub fn attach(&self) -> Subscriber {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.capacity);
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, tx));
        metrics::SUBSCRIBERS_ACTIVE.inc();
        debug!(subscriber = id, "Subscriber attached");
        Subscriber { id, rx }
    }

    /// Removes a subscriber. Returns false if it was already gone.
    pub fn detach(&self, id: SubscriberId) -> bool {
        let mut subscribers = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        let removed = subscribers.len() != before;
        if removed {
            metrics::SUBSCRIBERS_ACTIVE.dec();
            debug!(subscriber = id, "Subscriber detached");
        }
        removed
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Delivers `update` to every subscriber that has room for it.
    ///
    /// Returns how many subscribers received it.
    pub fn publish(&self, update: &ProgressUpdate) -> usize {
        let snapshot = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let mut delivered = 0;
        let mut closed = Vec::new();

        for (id, tx) in &snapshot {
            match tx.try_send(update.clone()) {
                Ok(()) => {
                    delivered += 1;
                    debug!(subscriber = id, job = %update.id, "Sent update");
                }
                Err(TrySendError::Full(_)) => {
                    metrics::UPDATES_DROPPED.inc();
                    warn!(subscriber = id, job = %update.id, "Subscriber queue full, dropping update");
                }
                Err(TrySendError::Closed(_)) => closed.push(*id),
            }
        }

        for id in closed {
            self.detach(id);
        }

        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(n: usize) -> ProgressUpdate {
        ProgressUpdate {
            id: "dl_1".to_string(),
            progress: n as f64 / 2.0,
            speed: String::new(),
            eta: String::new(),
            status: "downloading".to_string(),
            message: format!("update {}", n),
        }
    }

    #[tokio::test]
    async fn test_every_subscriber_receives() {
        let broadcaster = Broadcaster::new(10);
        let mut a = broadcaster.attach();
        let mut b = broadcaster.attach();

        assert_eq!(broadcaster.publish(&update(1)), 2);
        assert_eq!(a.recv().await, Some(update(1)));
        assert_eq!(b.recv().await, Some(update(1)));
    }

    #[test]
    fn test_overflow_drops_newest_without_error() {
        let broadcaster = Broadcaster::new(100);
        let mut sub = broadcaster.attach();

        for n in 0..101 {
            broadcaster.publish(&update(n));
        }

        let mut received = Vec::new();
        while let Some(u) = sub.try_recv() {
            received.push(u);
        }
        assert_eq!(received.len(), 100);
        assert_eq!(received.first(), Some(&update(0)));
        assert_eq!(received.last(), Some(&update(99)));
    }

    #[test]
    fn test_slow_subscriber_does_not_affect_others() {
        let broadcaster = Broadcaster::new(1);
        let _slow = broadcaster.attach();
        let mut fast = broadcaster.attach();

        assert_eq!(broadcaster.publish(&update(1)), 2);
        assert_eq!(fast.try_recv(), Some(update(1)));
        assert_eq!(broadcaster.publish(&update(2)), 1);
        assert_eq!(fast.try_recv(), Some(update(2)));
    }

    #[test]
    fn test_detach() {
        let broadcaster = Broadcaster::new(4);
        let sub = broadcaster.attach();
        assert_eq!(broadcaster.subscriber_count(), 1);
        assert!(broadcaster.detach(sub.id()));
        assert!(!broadcaster.detach(sub.id()));
        assert_eq!(broadcaster.publish(&update(1)), 0);
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let broadcaster = Broadcaster::new(4);
        let sub = broadcaster.attach();
        drop(sub);
        assert_eq!(broadcaster.publish(&update(1)), 0);
        assert_eq!(broadcaster.subscriber_count(), 0);
    }
}
