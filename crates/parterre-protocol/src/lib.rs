//! Parterre Wire Protocol
//!
//! Line-oriented UTF-8 text over TCP: one command per connection, one
//! response line written back, then the connection closes.
//!
//! # Commands
//!
//! ```text
//! reserve <name>                      client: book first free seat
//! bookSeat <name> <seatNum>           client: book an exact seat (1-indexed)
//! search <name>                       client: find the seat held by name
//! delete <name>                       client: free the seat held by name
//! update <version> <snapshot>         peer: version-gated state replacement
//! request <serverId> <timestamp>      peer: critical-section entry bid
//! release <serverId>                  peer: critical-section exit
//! ```
//!
//! # Snapshot codec
//!
//! Snapshots travel as JSON: `{"seats":[{"id":"1","bookedBy":null,
//! "booked":false},...]}` with seat ids as decimal strings. The codec is
//! plain serde_json, so names containing delimiter characters round-trip.

mod command;
mod error;
mod snapshot;

pub use command::{parse_acknowledge, Command, Response};
pub use error::{Error, Result};
pub use snapshot::Snapshot;
