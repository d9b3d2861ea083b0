//! Command parsing and response rendering.

use std::fmt;

use parterre_registry::{BookOutcome, ReserveOutcome};

use crate::error::{Error, Result};
use crate::snapshot::Snapshot;

/// A parsed client or peer command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Book the first free seat for a name.
    Reserve { name: String },
    /// Book an exact seat (1-indexed) for a name.
    BookSeat { name: String, seat_num: u32 },
    /// Find the seat held by a name.
    Search { name: String },
    /// Free the seat held by a name.
    Delete { name: String },
    /// Peer state replacement, gated by version.
    Update { version: u64, snapshot: Snapshot },
    /// Peer critical-section entry bid.
    Request { server_id: u32, timestamp: u64 },
    /// Peer critical-section exit.
    Release { server_id: u32 },
}

fn parse_int<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T> {
    value.parse().map_err(|_| Error::InvalidInt {
        field,
        value: value.to_owned(),
    })
}

impl Command {
    /// Parse one wire line.
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let mut tokens = line.split_whitespace();
        let verb = tokens.next().ok_or(Error::Empty)?;

        let missing = |field| Error::MissingField {
            command: verb.to_owned(),
            field,
        };

        match verb {
            "reserve" => Ok(Self::Reserve {
                name: tokens.next().ok_or_else(|| missing("name"))?.to_owned(),
            }),
            "bookSeat" => {
                let name = tokens.next().ok_or_else(|| missing("name"))?.to_owned();
                let seat_num =
                    parse_int("seat number", tokens.next().ok_or_else(|| missing("seat number"))?)?;
                Ok(Self::BookSeat { name, seat_num })
            }
            "search" => Ok(Self::Search {
                name: tokens.next().ok_or_else(|| missing("name"))?.to_owned(),
            }),
            "delete" => Ok(Self::Delete {
                name: tokens.next().ok_or_else(|| missing("name"))?.to_owned(),
            }),
            "update" => {
                // The snapshot is everything after the version token; JSON
                // may contain spaces inside quoted names.
                let mut parts = line.splitn(3, ' ');
                parts.next();
                let version = parse_int(
                    "version",
                    parts.next().ok_or_else(|| missing("version"))?,
                )?;
                let snapshot =
                    Snapshot::decode(parts.next().ok_or_else(|| missing("snapshot"))?.trim())?;
                Ok(Self::Update { version, snapshot })
            }
            "request" => {
                let server_id = parse_int(
                    "server id",
                    tokens.next().ok_or_else(|| missing("server id"))?,
                )?;
                let timestamp = parse_int(
                    "timestamp",
                    tokens.next().ok_or_else(|| missing("timestamp"))?,
                )?;
                Ok(Self::Request {
                    server_id,
                    timestamp,
                })
            }
            "release" => Ok(Self::Release {
                server_id: parse_int(
                    "server id",
                    tokens.next().ok_or_else(|| missing("server id"))?,
                )?,
            }),
            other => Err(Error::UnknownCommand(other.to_owned())),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reserve { name } => write!(f, "reserve {name}"),
            Self::BookSeat { name, seat_num } => write!(f, "bookSeat {name} {seat_num}"),
            Self::Search { name } => write!(f, "search {name}"),
            Self::Delete { name } => write!(f, "delete {name}"),
            Self::Update { version, snapshot } => write!(f, "update {version} {snapshot}"),
            Self::Request {
                server_id,
                timestamp,
            } => write!(f, "request {server_id} {timestamp}"),
            Self::Release { server_id } => write!(f, "release {server_id}"),
        }
    }
}

/// A response line written back to a client or peer.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// A seat was assigned.
    SeatAssigned(u32),
    /// The name already holds a seat.
    AlreadyReserved,
    /// No free seat remained.
    SoldOut,
    /// The requested seat cannot be booked.
    SeatUnavailable(u32),
    /// Bare seat id, for `search` and `delete`.
    SeatFound(u32),
    /// No seat is held by the name.
    NoReservation(String),
    /// Peer snapshot processed.
    SeatsUpdated,
    /// Reply to a peer entry bid, carrying our state for repair.
    Acknowledge { version: u64, snapshot: Snapshot },
    /// Reply to a peer release.
    RequestRemoved(u32),
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SeatAssigned(id) => write!(f, "Seat assigned to you is {id}"),
            Self::AlreadyReserved => {
                f.write_str("Seat already booked against the name provided")
            }
            Self::SoldOut => f.write_str("Sold out - No seat available"),
            Self::SeatUnavailable(n) => write!(f, "Seat {n} is not available"),
            Self::SeatFound(id) => write!(f, "{id}"),
            Self::NoReservation(name) => write!(f, "No reservation found for {name}"),
            Self::SeatsUpdated => f.write_str("Seats updated successfully"),
            Self::Acknowledge { version, snapshot } => {
                write!(f, "acknowledge {version} {snapshot}")
            }
            Self::RequestRemoved(id) => write!(f, "Removed request from {id}"),
        }
    }
}

impl From<ReserveOutcome> for Response {
    fn from(outcome: ReserveOutcome) -> Self {
        match outcome {
            ReserveOutcome::Assigned(id) => Self::SeatAssigned(id),
            ReserveOutcome::AlreadyReserved => Self::AlreadyReserved,
            ReserveOutcome::SoldOut => Self::SoldOut,
        }
    }
}

impl From<BookOutcome> for Response {
    fn from(outcome: BookOutcome) -> Self {
        match outcome {
            BookOutcome::Assigned(id) => Self::SeatAssigned(id),
            BookOutcome::Unavailable(n) => Self::SeatUnavailable(n),
        }
    }
}

/// Parse a peer's `acknowledge <version> <snapshot>` reply line.
pub fn parse_acknowledge(line: &str) -> Result<(u64, Snapshot)> {
    let line = line.trim();
    let mut parts = line.splitn(3, ' ');
    let missing = |field| Error::MissingField {
        command: "acknowledge".to_owned(),
        field,
    };
    match parts.next() {
        Some("acknowledge") => {}
        Some(other) => return Err(Error::UnknownCommand(other.to_owned())),
        None => return Err(Error::Empty),
    }
    let version = parse_int("version", parts.next().ok_or_else(|| missing("version"))?)?;
    let snapshot = Snapshot::decode(parts.next().ok_or_else(|| missing("snapshot"))?)?;
    Ok((version, snapshot))
}
