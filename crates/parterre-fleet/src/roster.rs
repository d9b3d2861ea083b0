//! Static fleet roster.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Address of one fleet member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerAddr {
    /// Host or IP address.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl PeerAddr {
    /// Create an address.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for PeerAddr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        // rsplit once so IPv6-ish hosts with embedded colons still work.
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| Error::PeerAddr(s.to_owned()))?;
        if host.is_empty() {
            return Err(Error::PeerAddr(s.to_owned()));
        }
        let port = port.parse().map_err(|_| Error::PeerAddr(s.to_owned()))?;
        Ok(Self::new(host, port))
    }
}

/// The fixed set of servers jointly owning replicated seat state.
///
/// Loaded once at startup and never changed: the fleet has static
/// membership. Server ids are the 1-based ordinals of the address list.
#[derive(Debug, Clone)]
pub struct PeerRoster {
    self_id: u32,
    peers: Vec<PeerAddr>,
}

impl PeerRoster {
    /// Build a roster. `peers[0]` is server 1, and `self_id` must name
    /// one of the entries.
    pub fn new(self_id: u32, peers: Vec<PeerAddr>) -> Self {
        debug_assert!(self_id >= 1 && (self_id as usize) <= peers.len());
        Self { self_id, peers }
    }

    /// This member's server id.
    pub const fn self_id(&self) -> u32 {
        self.self_id
    }

    /// Fleet size, this member included.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Whether the roster is empty (never the case for a valid fleet).
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Address of a member by server id.
    pub fn addr_of(&self, server_id: u32) -> Option<&PeerAddr> {
        server_id
            .checked_sub(1)
            .and_then(|i| self.peers.get(i as usize))
    }

    /// This member's own address.
    pub fn self_addr(&self) -> &PeerAddr {
        &self.peers[self.self_id as usize - 1]
    }

    /// Every fleet member except this one, with their server ids.
    pub fn others(&self) -> impl Iterator<Item = (u32, &PeerAddr)> {
        self.peers
            .iter()
            .enumerate()
            .map(|(i, addr)| (i as u32 + 1, addr))
            .filter(|(id, _)| *id != self.self_id)
    }
}
