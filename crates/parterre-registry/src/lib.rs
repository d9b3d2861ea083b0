//! Parterre Seat Registry
//!
//! The replicated state jointly owned by every member of the booking
//! fleet: a fixed, ordered collection of numbered seats.
//!
//! # Design
//!
//! Seats carry 1-based ids matching the wire protocol. Each seat guards
//! its own booking state with a per-seat lock, so operations on different
//! seats never contend. There is no cross-seat atomicity: two scans may
//! race on different seats but can never double-book the same one.
//!
//! # Replication
//!
//! The registry serializes to a list of [`SeatRecord`]s (the snapshot
//! carried by the fleet's convergence messages) and supports wholesale
//! replacement from such a list under a registry-wide lock. Conflict
//! resolution between snapshots is the caller's concern; the registry
//! only applies what it is given.

mod registry;
mod seat;

pub use registry::{BookOutcome, ReserveOutcome, SeatRegistry};
pub use seat::{Seat, SeatRecord};
