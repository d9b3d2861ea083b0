//! Startup configuration for a fleet member.
//!
//! The wire format is fixed: line 1 is `<selfServerId> <numServers>
//! <numSeats>`, followed by `numServers` lines of `<ip>:<port>` whose
//! 1-indexed ordinal is the server id. Parse failures here are the only
//! process-fatal errors in the system.

use std::io::BufRead;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::roster::PeerAddr;

/// How long a worker waits to enter the critical section before
/// withdrawing its request.
pub const DEFAULT_ENTRY_TIMEOUT: Duration = Duration::from_secs(30);

/// Connect timeout for outbound peer sends.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(100);

/// Configuration of one fleet member.
#[derive(Debug, Clone)]
pub struct FleetConfig {
    /// This member's 1-based server id.
    pub server_id: u32,
    /// Number of seats jointly managed by the fleet.
    pub num_seats: u32,
    /// Every member's address, self included; index 0 is server 1.
    pub peers: Vec<PeerAddr>,
    /// Bound on the wait for critical-section entry.
    pub entry_timeout: Duration,
    /// Connect timeout for peer broadcasts.
    pub connect_timeout: Duration,
}

impl FleetConfig {
    /// Parse the startup configuration from a reader.
    pub fn parse<R: BufRead>(reader: R) -> Result<Self> {
        let mut lines = reader.lines().enumerate();

        let (_, first) = lines
            .next()
            .ok_or_else(|| config_error(1, "missing header line"))?;
        let first = first.map_err(Error::Io)?;
        let mut header = first.split_whitespace();
        let server_id = parse_field(1, "server id", header.next())?;
        let num_servers: u32 = parse_field(1, "server count", header.next())?;
        let num_seats = parse_field(1, "seat count", header.next())?;

        let mut peers = Vec::with_capacity(num_servers as usize);
        for _ in 0..num_servers {
            let (index, line) = lines
                .next()
                .ok_or_else(|| config_error(peers.len() + 2, "missing peer address line"))?;
            let line = line.map_err(Error::Io)?;
            let addr: PeerAddr = line
                .trim()
                .parse()
                .map_err(|e| config_error(index + 1, &format!("{e}")))?;
            peers.push(addr);
        }

        if server_id == 0 || server_id > num_servers {
            return Err(config_error(
                1,
                &format!("server id {server_id} outside fleet of {num_servers}"),
            ));
        }

        Ok(Self {
            server_id,
            num_seats,
            peers,
            entry_timeout: DEFAULT_ENTRY_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        })
    }

    /// Set the critical-section entry timeout.
    #[must_use]
    pub fn with_entry_timeout(mut self, timeout: Duration) -> Self {
        self.entry_timeout = timeout;
        self
    }

    /// Set the peer connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// This member's own address.
    pub fn self_addr(&self) -> &PeerAddr {
        &self.peers[self.server_id as usize - 1]
    }
}

fn config_error(line: usize, reason: &str) -> Error {
    Error::Config {
        line,
        reason: reason.to_owned(),
    }
}

fn parse_field<T: std::str::FromStr>(
    line: usize,
    what: &str,
    token: Option<&str>,
) -> Result<T> {
    let token = token.ok_or_else(|| config_error(line, &format!("missing {what}")))?;
    token
        .parse()
        .map_err(|_| config_error(line, &format!("invalid {what}: {token:?}")))
}
