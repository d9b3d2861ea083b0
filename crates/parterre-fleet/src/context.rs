//! Per-process server context.
//!
//! Everything a fleet member shares across its connection workers lives
//! here, constructed once at startup and threaded through as an `Arc`.
//! There are no ambient globals.

use std::time::Duration;

use parterre_consensus::{DataVersion, EntryQueue, LamportClock};
use parterre_registry::SeatRegistry;

use crate::config::FleetConfig;
use crate::messenger::PeerMessenger;
use crate::roster::PeerRoster;

/// Shared state of one fleet member.
#[derive(Debug)]
pub struct ServerContext {
    /// This member's 1-based server id.
    pub server_id: u32,
    /// The replicated seat state.
    pub registry: SeatRegistry,
    /// Process-wide logical clock.
    pub clock: LamportClock,
    /// Version tag governing snapshot acceptance.
    pub version: DataVersion,
    /// Pending critical-section claims, fleet-wide.
    pub queue: EntryQueue,
    /// Outbound fan-out to the rest of the fleet.
    pub messenger: PeerMessenger,
    /// Bound on the wait for critical-section entry.
    pub entry_timeout: Duration,
    /// Serializes this member's own critical-section entries so at most
    /// one local request is pending at a time.
    pub(crate) entry_gate: tokio::sync::Mutex<()>,
    /// Serializes snapshot application (version gate + replace).
    pub(crate) apply_gate: std::sync::Mutex<()>,
}

impl ServerContext {
    /// Build the context from a parsed configuration.
    pub fn new(config: &FleetConfig) -> Self {
        let roster = PeerRoster::new(config.server_id, config.peers.clone());
        Self {
            server_id: config.server_id,
            registry: SeatRegistry::new(config.num_seats),
            clock: LamportClock::new(),
            version: DataVersion::new(),
            queue: EntryQueue::new(),
            messenger: PeerMessenger::new(roster, config.connect_timeout),
            entry_timeout: config.entry_timeout,
            entry_gate: tokio::sync::Mutex::new(()),
            apply_gate: std::sync::Mutex::new(()),
        }
    }

    /// The fleet roster.
    pub fn roster(&self) -> &PeerRoster {
        self.messenger.roster()
    }
}
