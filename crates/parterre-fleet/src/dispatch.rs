//! Transport-agnostic command dispatch.
//!
//! One dispatcher serves every transport adapter: a command line goes
//! in, an optional response line comes out. The TCP listener is the only
//! adapter today, but nothing here knows about sockets.

use std::sync::Arc;

use parterre_protocol::{Command, Response};
use tracing::{debug, warn};

use crate::context::ServerContext;
use crate::coordinator::Coordinator;
use crate::error::Result;

/// Shared command dispatcher.
#[derive(Debug)]
pub struct Dispatcher {
    coordinator: Coordinator,
}

impl Dispatcher {
    /// Create a dispatcher over the shared context.
    pub fn new(ctx: Arc<ServerContext>) -> Self {
        Self {
            coordinator: Coordinator::new(ctx),
        }
    }

    /// Dispatch one command line.
    ///
    /// `None` means nothing is written back: unparseable input, or a
    /// failure with no defined wire response. Both are logged here, and
    /// neither ever tears down the transport.
    pub async fn dispatch(&self, line: &str) -> Option<String> {
        let command = match Command::parse(line) {
            Ok(command) => command,
            Err(err) => {
                debug!(%err, line, "ignoring unparseable command");
                return None;
            }
        };
        match self.execute(command).await {
            Ok(response) => Some(response.to_string()),
            Err(err) => {
                warn!(%err, "command failed");
                None
            }
        }
    }

    async fn execute(&self, command: Command) -> Result<Response> {
        match command {
            Command::Reserve { name } => {
                Ok(self.coordinator.reserve(&name).await?.into())
            }
            Command::BookSeat { name, seat_num } => {
                Ok(self.coordinator.book_seat(&name, seat_num).await?.into())
            }
            Command::Search { name } => {
                Ok(match self.coordinator.search(&name).await? {
                    Some(id) => Response::SeatFound(id),
                    None => Response::NoReservation(name),
                })
            }
            Command::Delete { name } => {
                Ok(match self.coordinator.delete(&name).await? {
                    Some(id) => Response::SeatFound(id),
                    None => Response::NoReservation(name),
                })
            }
            Command::Update { version, snapshot } => {
                Ok(self.coordinator.handle_update(version, &snapshot))
            }
            Command::Request {
                server_id,
                timestamp,
            } => Ok(self.coordinator.handle_request(server_id, timestamp)),
            Command::Release { server_id } => {
                Ok(self.coordinator.handle_release(server_id))
            }
        }
    }
}
