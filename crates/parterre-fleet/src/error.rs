//! Error types for parterre-fleet.

use std::time::Duration;

use thiserror::Error;

/// Result type for parterre-fleet operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running a fleet member.
#[derive(Debug, Error)]
pub enum Error {
    /// Startup configuration could not be parsed. Process-fatal.
    #[error("invalid configuration line {line}: {reason}")]
    Config { line: usize, reason: String },

    /// A peer address was not `<ip>:<port>`.
    #[error("invalid peer address: {0:?}")]
    PeerAddr(String),

    /// Socket-level failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A wire line could not be parsed.
    #[error("protocol error: {0}")]
    Protocol(#[from] parterre_protocol::Error),

    /// Entry arbitration failed.
    #[error("entry arbitration failed: {0}")]
    Arbitration(#[from] parterre_consensus::Error),

    /// The critical section was not entered in time; the request has
    /// been withdrawn.
    #[error("timed out waiting for the critical section after {0:?}")]
    EntryTimeout(Duration),
}
