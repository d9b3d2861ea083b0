//! Critical-section coordinator.
//!
//! Orchestrates the request/acknowledge/release exchange that serializes
//! every state-mutating command across the fleet:
//!
//! 1. Stamp and enqueue our own entry request, then broadcast it.
//! 2. Run every acknowledge reply through the snapshot version gate
//!    (peers answer entry bids with their full state).
//! 3. Block, bounded by the entry timeout, until our request is the
//!    fleet-wide queue minimum.
//! 4. Apply the local operation; if it mutated, bump the data version
//!    and broadcast the new snapshot.
//! 5. Dequeue ourselves and broadcast the release.
//!
//! The receive side of the same protocol (`request`, `release`,
//! `update` from peers) is handled here as well, so one component owns
//! the whole entry state machine.

use std::sync::Arc;

use parterre_consensus::EntryRequest;
use parterre_protocol::{parse_acknowledge, Command, Response, Snapshot};
use parterre_registry::{BookOutcome, ReserveOutcome, SeatRegistry};
use tracing::{debug, trace, warn};

use crate::context::ServerContext;
use crate::error::{Error, Result};
use crate::messenger::PeerReply;

/// Coordinator for fleet-wide serialized mutations.
#[derive(Debug)]
pub struct Coordinator {
    ctx: Arc<ServerContext>,
}

impl Coordinator {
    /// Create a coordinator over the shared context.
    pub fn new(ctx: Arc<ServerContext>) -> Self {
        Self { ctx }
    }

    /// Book the first free seat for `name`, serialized fleet-wide.
    pub async fn reserve(&self, name: &str) -> Result<ReserveOutcome> {
        self.with_entry(|registry| {
            let outcome = registry.reserve(name);
            let mutated = matches!(outcome, ReserveOutcome::Assigned(_));
            (outcome, mutated)
        })
        .await
    }

    /// Book the exact seat `seat_num` for `name`, serialized fleet-wide.
    pub async fn book_seat(&self, name: &str, seat_num: u32) -> Result<BookOutcome> {
        self.with_entry(|registry| {
            let outcome = registry.book_seat(name, seat_num);
            let mutated = matches!(outcome, BookOutcome::Assigned(_));
            (outcome, mutated)
        })
        .await
    }

    /// Find the seat held by `name`. Queries take the same fleet-wide
    /// turn as mutations but never advance the data version.
    pub async fn search(&self, name: &str) -> Result<Option<u32>> {
        self.with_entry(|registry| (registry.search(name), false)).await
    }

    /// Free the seat held by `name`, serialized fleet-wide.
    pub async fn delete(&self, name: &str) -> Result<Option<u32>> {
        self.with_entry(|registry| {
            let freed = registry.delete(name);
            (freed, freed.is_some())
        })
        .await
    }

    /// Peer entry bid: observe the sender's clock, enqueue the request
    /// (superseding any earlier one from that server) and answer with
    /// our full state so a lagging peer can repair itself.
    pub fn handle_request(&self, server_id: u32, timestamp: u64) -> Response {
        self.ctx.clock.observe(timestamp);
        self.ctx.queue.insert(EntryRequest {
            timestamp,
            server_id,
        });
        trace!(peer = server_id, timestamp, "enqueued peer entry request");
        Response::Acknowledge {
            version: self.ctx.version.current(),
            snapshot: Snapshot::new(self.ctx.registry.snapshot()),
        }
    }

    /// Peer exit: dequeue that server's request and wake whichever local
    /// waiter is now at the head.
    pub fn handle_release(&self, server_id: u32) -> Response {
        if !self.ctx.queue.remove(server_id) {
            debug!(peer = server_id, "release for unknown request");
        }
        Response::RequestRemoved(server_id)
    }

    /// Peer snapshot: apply through the version gate; stale versions are
    /// silently dropped.
    pub fn handle_update(&self, version: u64, snapshot: &Snapshot) -> Response {
        self.absorb_snapshot(version, snapshot);
        Response::SeatsUpdated
    }

    /// Replace local state iff the incoming version is strictly newer.
    /// Returns whether the snapshot was applied.
    fn absorb_snapshot(&self, version: u64, snapshot: &Snapshot) -> bool {
        // Gate and replacement must be atomic with respect to each
        // other, or two concurrent snapshots could apply out of order.
        let _guard = self.ctx.apply_gate.lock().unwrap();
        if !self.ctx.version.record_if_newer(version) {
            trace!(version, local = self.ctx.version.current(), "snapshot dropped");
            return false;
        }
        self.ctx.registry.replace(&snapshot.seats);
        debug!(version, "applied peer snapshot");
        true
    }

    /// Run acknowledge replies from an entry broadcast through the
    /// version gate.
    fn absorb_acknowledgements(&self, replies: &[PeerReply]) {
        for reply in replies {
            let Some(line) = reply.line.as_deref() else {
                continue;
            };
            match parse_acknowledge(line) {
                Ok((version, snapshot)) => {
                    self.absorb_snapshot(version, &snapshot);
                }
                Err(err) => {
                    warn!(peer = reply.server_id, %err, "bad acknowledge reply");
                }
            }
        }
    }

    /// The full entry wrapper around one local operation. The closure
    /// returns its outcome plus whether it mutated the registry.
    async fn with_entry<T>(&self, op: impl FnOnce(&SeatRegistry) -> (T, bool)) -> Result<T> {
        let ctx = &self.ctx;

        // One pending entry per server at a time: a second local request
        // would supersede the first on every peer.
        let _local = ctx.entry_gate.lock().await;

        let timestamp = ctx.clock.tick();
        let request = EntryRequest {
            timestamp,
            server_id: ctx.server_id,
        };
        ctx.queue.insert(request);

        let bid = Command::Request {
            server_id: ctx.server_id,
            timestamp,
        };
        let replies = ctx.messenger.broadcast(&bid.to_string()).await;
        self.absorb_acknowledgements(&replies);

        trace!(timestamp, "waiting for queue head");
        match tokio::time::timeout(ctx.entry_timeout, ctx.queue.enter(ctx.server_id)).await {
            Ok(entered) => entered?,
            Err(_) => {
                // Withdraw everywhere, then give up.
                ctx.queue.cancel_wait(ctx.server_id);
                ctx.queue.remove(ctx.server_id);
                self.broadcast_release().await;
                warn!(timestamp, "entry request withdrawn after timeout");
                return Err(Error::EntryTimeout(ctx.entry_timeout));
            }
        }

        let (value, mutated) = op(&ctx.registry);

        if mutated {
            let version = ctx.version.advance();
            let update = Command::Update {
                version,
                snapshot: Snapshot::new(ctx.registry.snapshot()),
            };
            debug!(version, "broadcasting state update");
            ctx.messenger.broadcast(&update.to_string()).await;
        }

        ctx.queue.remove(ctx.server_id);
        self.broadcast_release().await;
        Ok(value)
    }

    async fn broadcast_release(&self) {
        let release = Command::Release {
            server_id: self.ctx.server_id,
        };
        self.ctx.messenger.broadcast(&release.to_string()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::config::FleetConfig;
    use crate::roster::PeerAddr;
    use parterre_registry::SeatRecord;

    /// A single-member fleet: broadcasts have no recipients, so the
    /// whole entry protocol runs locally.
    fn solo_coordinator(num_seats: u32) -> Coordinator {
        let config = FleetConfig {
            server_id: 1,
            num_seats,
            peers: vec![PeerAddr::new("127.0.0.1", 1)],
            entry_timeout: Duration::from_secs(1),
            connect_timeout: Duration::from_millis(50),
        };
        Coordinator::new(Arc::new(ServerContext::new(&config)))
    }

    fn snapshot_with(id: u32, name: &str) -> Snapshot {
        Snapshot::new(vec![SeatRecord {
            id,
            booked_by: Some(name.into()),
            booked: true,
        }])
    }

    #[tokio::test]
    async fn mutation_advances_version_and_releases() {
        let coordinator = solo_coordinator(3);

        let outcome = coordinator.reserve("ada").await.unwrap();
        assert_eq!(outcome, ReserveOutcome::Assigned(1));
        assert_eq!(coordinator.ctx.version.current(), 1);
        assert!(coordinator.ctx.queue.is_empty());
    }

    #[tokio::test]
    async fn query_does_not_advance_version() {
        let coordinator = solo_coordinator(3);
        coordinator.reserve("ada").await.unwrap();

        assert_eq!(coordinator.search("ada").await.unwrap(), Some(1));
        assert_eq!(coordinator.search("bob").await.unwrap(), None);
        assert_eq!(coordinator.ctx.version.current(), 1);
    }

    #[tokio::test]
    async fn failed_mutation_does_not_advance_version() {
        let coordinator = solo_coordinator(1);
        coordinator.reserve("ada").await.unwrap();

        let outcome = coordinator.reserve("grace").await.unwrap();
        assert_eq!(outcome, ReserveOutcome::SoldOut);
        assert_eq!(coordinator.delete("nobody").await.unwrap(), None);
        assert_eq!(coordinator.ctx.version.current(), 1);
    }

    #[tokio::test]
    async fn update_gate_accepts_only_newer() {
        let coordinator = solo_coordinator(1);

        let response = coordinator.handle_update(5, &snapshot_with(1, "ada"));
        assert_eq!(response, Response::SeatsUpdated);
        assert_eq!(coordinator.ctx.registry.search("ada"), Some(1));
        assert_eq!(coordinator.ctx.version.current(), 5);

        // Stale and equal versions are dropped without complaint.
        coordinator.handle_update(5, &snapshot_with(1, "grace"));
        coordinator.handle_update(3, &snapshot_with(1, "grace"));
        assert_eq!(coordinator.ctx.registry.search("ada"), Some(1));
        assert_eq!(coordinator.ctx.registry.search("grace"), None);
    }

    #[tokio::test]
    async fn request_reply_carries_state() {
        let coordinator = solo_coordinator(2);
        coordinator.reserve("ada").await.unwrap();

        let response = coordinator.handle_request(2, 99);
        match response {
            Response::Acknowledge { version, snapshot } => {
                assert_eq!(version, 1);
                assert_eq!(snapshot.seats[0].booked_by.as_deref(), Some("ada"));
            }
            other => panic!("unexpected response: {other:?}"),
        }

        // The bid is enqueued and the clock jumped past the sender's.
        assert_eq!(coordinator.ctx.queue.len(), 1);
        assert!(coordinator.ctx.clock.now() > 99);

        coordinator.handle_release(2);
        assert!(coordinator.ctx.queue.is_empty());
    }

    #[tokio::test]
    async fn blocked_entry_times_out_and_withdraws() {
        let config = FleetConfig {
            server_id: 1,
            num_seats: 1,
            peers: vec![PeerAddr::new("127.0.0.1", 1)],
            entry_timeout: Duration::from_millis(50),
            connect_timeout: Duration::from_millis(20),
        };
        let coordinator = Coordinator::new(Arc::new(ServerContext::new(&config)));

        // A peer holds the head forever; our request can never win.
        coordinator.handle_request(2, 0);

        let result = coordinator.reserve("ada").await;
        assert!(matches!(result, Err(Error::EntryTimeout(_))));

        // Our own request is gone; the peer's is untouched.
        assert_eq!(coordinator.ctx.queue.len(), 1);
        assert_eq!(coordinator.ctx.queue.head().map(|r| r.server_id), Some(2));
        assert_eq!(coordinator.ctx.registry.search("ada"), None);
    }
}
