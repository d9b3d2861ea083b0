//! Error types for parterre-protocol.

use thiserror::Error;

/// Result type for parterre-protocol operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing wire lines.
#[derive(Debug, Error)]
pub enum Error {
    /// The verb is not part of the protocol.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// A command was missing a required field.
    #[error("malformed {command} command: missing {field}")]
    MissingField {
        command: String,
        field: &'static str,
    },

    /// An integer field did not parse.
    #[error("invalid {field}: {value:?}")]
    InvalidInt {
        field: &'static str,
        value: String,
    },

    /// The snapshot payload was not valid JSON of the expected shape.
    #[error("invalid snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// The line was empty.
    #[error("empty command line")]
    Empty,
}
