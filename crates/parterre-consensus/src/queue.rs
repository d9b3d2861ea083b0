//! The entry queue: fleet-wide mutual-exclusion arbitration.

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use thiserror::Error;
use tokio::sync::oneshot;

/// Result type for entry arbitration.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors from entry arbitration.
#[derive(Debug, Error)]
pub enum Error {
    /// The wait handle was dropped before the request reached the queue
    /// head, usually because a newer request from the same server
    /// superseded it.
    #[error("entry wait abandoned before reaching the queue head")]
    WaitAbandoned,
}

/// A pending claim on the critical section.
///
/// Ordered by `(timestamp, server_id)`; the ordering is what every fleet
/// member agrees on. Identity on the wire is the server id alone: a
/// later request from the same server supersedes the earlier one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct EntryRequest {
    /// Logical time the request was stamped.
    pub timestamp: u64,
    /// The requesting server.
    pub server_id: u32,
}

#[derive(Debug, Default)]
struct Inner {
    requests: BTreeSet<EntryRequest>,
    waiters: HashMap<u32, oneshot::Sender<()>>,
}

impl Inner {
    /// Wake the waiter whose request is now the minimum, if any.
    fn signal_head(&mut self) {
        if let Some(head) = self.requests.first().copied() {
            if let Some(tx) = self.waiters.remove(&head.server_id) {
                let _ = tx.send(());
            }
        }
    }
}

/// Min-ordered set of pending entry requests plus the local wait table.
///
/// One lock guards both as a unit: any insert or removal that changes
/// the head signals the wait handle registered for the new head. The
/// head identifies the server currently entitled to mutate.
#[derive(Debug, Default)]
pub struct EntryQueue {
    inner: Mutex<Inner>,
}

impl EntryQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a request, superseding any live request from the same
    /// server.
    pub fn insert(&self, request: EntryRequest) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .requests
            .retain(|r| r.server_id != request.server_id);
        inner.requests.insert(request);
        inner.signal_head();
    }

    /// Remove a server's request regardless of its timestamp, waking the
    /// next head's waiter. Returns whether anything was removed.
    pub fn remove(&self, server_id: u32) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.requests.len();
        inner.requests.retain(|r| r.server_id != server_id);
        let removed = inner.requests.len() < before;
        if removed {
            inner.signal_head();
        }
        removed
    }

    /// The current queue minimum.
    pub fn head(&self) -> Option<EntryRequest> {
        self.inner.lock().unwrap().requests.first().copied()
    }

    /// Number of pending requests.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().requests.len()
    }

    /// Whether no requests are pending.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().requests.is_empty()
    }

    /// Wait until `server_id`'s request is the queue minimum.
    ///
    /// The request must already be enqueued. Registers a wait handle
    /// keyed by the server id (replacing any stale one) and resolves it
    /// exactly when that request becomes head; resolves immediately if
    /// it already is. Callers bound the wait with a timeout of their
    /// choosing and withdraw the request themselves on expiry.
    pub async fn enter(&self, server_id: u32) -> Result<()> {
        let rx = {
            let mut inner = self.inner.lock().unwrap();
            let (tx, rx) = oneshot::channel();
            inner.waiters.insert(server_id, tx);
            inner.signal_head();
            rx
        };
        rx.await.map_err(|_| Error::WaitAbandoned)
    }

    /// Drop the wait handle registered for a server, if any. Used on
    /// the timeout path after the request itself has been withdrawn.
    pub fn cancel_wait(&self, server_id: u32) {
        self.inner.lock().unwrap().waiters.remove(&server_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(timestamp: u64, server_id: u32) -> EntryRequest {
        EntryRequest {
            timestamp,
            server_id,
        }
    }

    #[test]
    fn head_is_minimum_by_timestamp_then_id() {
        let queue = EntryQueue::new();
        queue.insert(request(5, 1));
        queue.insert(request(3, 2));
        queue.insert(request(3, 3));

        assert_eq!(queue.head(), Some(request(3, 2)));
    }

    #[test]
    fn later_request_supersedes() {
        let queue = EntryQueue::new();
        queue.insert(request(1, 1));
        queue.insert(request(9, 1));

        assert_eq!(queue.len(), 1);
        assert_eq!(queue.head(), Some(request(9, 1)));
    }

    #[test]
    fn remove_is_by_server_id_alone() {
        let queue = EntryQueue::new();
        queue.insert(request(1, 1));
        queue.insert(request(2, 2));

        // The timestamp recorded for server 1 is irrelevant to removal.
        assert!(queue.remove(1));
        assert!(!queue.remove(1));
        assert_eq!(queue.head(), Some(request(2, 2)));
    }

    #[tokio::test]
    async fn enter_resolves_immediately_at_head() {
        let queue = EntryQueue::new();
        queue.insert(request(1, 1));
        queue.enter(1).await.unwrap();
    }

    #[tokio::test]
    async fn enter_waits_for_release() {
        use std::sync::Arc;

        let queue = Arc::new(EntryQueue::new());
        queue.insert(request(1, 1));
        queue.insert(request(2, 2));

        let waiter = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.enter(2).await })
        };

        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        queue.remove(1);
        waiter.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn superseded_waiter_is_abandoned() {
        use std::sync::Arc;

        let queue = Arc::new(EntryQueue::new());
        queue.insert(request(5, 1));
        queue.insert(request(1, 2));

        let stale = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.enter(1).await })
        };
        tokio::task::yield_now().await;

        // A second local wait for the same server replaces the handle.
        let fresh = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.enter(1).await })
        };
        tokio::task::yield_now().await;

        assert!(matches!(stale.await.unwrap(), Err(Error::WaitAbandoned)));

        queue.remove(2);
        fresh.await.unwrap().unwrap();
    }

    mod ordering_properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Every server that observes the same request set computes
            /// the same entry order, regardless of arrival order.
            #[test]
            fn entry_order_is_arrival_independent(
                mut pairs in proptest::collection::vec((0u64..50, 1u32..8), 1..12),
                seed in 0u64..1000,
            ) {
                // One live request per server: keep the last stamp.
                let mut latest = std::collections::HashMap::new();
                for (ts, id) in pairs.drain(..) {
                    latest.insert(id, ts);
                }
                let requests: Vec<_> = latest
                    .into_iter()
                    .map(|(server_id, timestamp)| EntryRequest { timestamp, server_id })
                    .collect();

                // Two replicas receive the same set in different orders.
                let mut shuffled = requests.clone();
                let n = shuffled.len();
                for i in 0..n {
                    shuffled.swap(i, (seed as usize + i * 7) % n);
                }

                let a = EntryQueue::new();
                let b = EntryQueue::new();
                for r in &requests {
                    a.insert(*r);
                }
                for r in &shuffled {
                    b.insert(*r);
                }

                // Drain both queues; the dequeue order must match.
                let mut order_a = Vec::new();
                while let Some(head) = a.head() {
                    order_a.push(head);
                    a.remove(head.server_id);
                }
                let mut order_b = Vec::new();
                while let Some(head) = b.head() {
                    order_b.push(head);
                    b.remove(head.server_id);
                }
                prop_assert_eq!(order_a, order_b);
            }
        }
    }
}
