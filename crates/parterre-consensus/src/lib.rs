//! Leader-less Entry Arbitration
//!
//! The booking fleet has no coordinator. Before mutating shared state a
//! server must win a fleet-wide total order derived purely from logical
//! time:
//!
//! 1. Stamp a request with the local Lamport clock and enqueue it.
//! 2. Broadcast the request; every receiver enqueues it too.
//! 3. Enter the critical section once the request is the queue minimum
//!    by `(timestamp, server id)`.
//! 4. Broadcast a release; every receiver dequeues and the next minimum
//!    proceeds.
//!
//! Because every server orders the same request set by the same key,
//! they all agree on who enters next without ever electing a leader.
//!
//! # Invariants
//!
//! - The queue holds at most one live request per server; a later
//!   request from the same server supersedes, never duplicates.
//! - A release removes exactly that server's request, regardless of the
//!   timestamp it currently carries.
//! - The clock never goes backwards: local events tick it, received
//!   timestamps advance it to `max(local, received) + 1`.

mod clock;
mod queue;

pub use clock::{DataVersion, LamportClock};
pub use queue::{EntryQueue, EntryRequest, Error, Result};
