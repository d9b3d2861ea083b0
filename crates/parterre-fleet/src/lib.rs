//! Parterre Fleet
//!
//! A peer-replicated booking service with no central coordinator. Each
//! fleet member accepts client commands over a line-oriented TCP
//! protocol, wins a fleet-wide total order before touching shared seat
//! state, and converges every peer afterwards with a version-tagged
//! full-state broadcast.
//!
//! # Architecture
//!
//! ```text
//! client ── listener ── worker ── dispatcher ── coordinator
//!                                                   │
//!                              ┌────────────────────┼─────────────┐
//!                              ▼                    ▼             ▼
//!                         entry queue         seat registry   messenger
//!                      (lamport ordering)    (per-seat locks) (fan-out)
//!                                                                 │
//!                                                   peers ◄───────┘
//! ```
//!
//! Data flow for a mutating command:
//!
//! 1. Stamp and broadcast an entry request.
//! 2. Wait until it is the fleet-wide queue minimum.
//! 3. Apply the mutation locally.
//! 4. Broadcast the version-tagged snapshot, then the release.
//! 5. Answer the client.

pub mod config;
pub mod context;
pub mod coordinator;
pub mod dispatch;
pub mod error;
pub mod messenger;
pub mod roster;
pub mod server;

pub use config::FleetConfig;
pub use context::ServerContext;
pub use coordinator::Coordinator;
pub use dispatch::Dispatcher;
pub use error::{Error, Result};
pub use messenger::{PeerMessenger, PeerReply, BROADCAST_WORKERS};
pub use roster::{PeerAddr, PeerRoster};
pub use server::{Server, ShutdownHandle};
