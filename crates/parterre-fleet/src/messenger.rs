//! Bounded fan-out messenger for peer broadcast.
//!
//! Every broadcast sends one line to every fleet member except self,
//! through a fresh pool of at most [`BROADCAST_WORKERS`] concurrent
//! sends. Each send is independent and best-effort: a dead peer is
//! logged and skipped, never retried, and never fails the broadcast as
//! a whole.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::roster::{PeerAddr, PeerRoster};

/// Size of the per-broadcast outbound worker pool.
pub const BROADCAST_WORKERS: usize = 5;

/// One peer's reply within a broadcast.
#[derive(Debug)]
pub struct PeerReply {
    /// The peer's server id.
    pub server_id: u32,
    /// The reply line, or `None` when the send failed (already logged).
    pub line: Option<String>,
}

/// Fan-out broadcaster over the static roster.
#[derive(Debug)]
pub struct PeerMessenger {
    roster: PeerRoster,
    connect_timeout: Duration,
}

impl PeerMessenger {
    /// Create a messenger for the given roster.
    pub fn new(roster: PeerRoster, connect_timeout: Duration) -> Self {
        Self {
            roster,
            connect_timeout,
        }
    }

    /// The roster this messenger fans out over.
    pub fn roster(&self) -> &PeerRoster {
        &self.roster
    }

    /// Send `line` to every peer except self and collect each reply
    /// line. The pool is created and torn down within this call.
    pub async fn broadcast(&self, line: &str) -> Vec<PeerReply> {
        let pool = Arc::new(Semaphore::new(BROADCAST_WORKERS));
        let mut sends = JoinSet::new();

        for (server_id, addr) in self.roster.others() {
            let pool = pool.clone();
            let addr = addr.clone();
            let line = line.to_owned();
            let connect_timeout = self.connect_timeout;
            sends.spawn(async move {
                // Pool permits bound concurrency; acquire cannot fail
                // while the semaphore is alive.
                let _permit = pool.acquire_owned().await;
                match exchange(&addr, &line, connect_timeout).await {
                    Ok(reply) => {
                        debug!(peer = server_id, %addr, "peer replied");
                        PeerReply {
                            server_id,
                            line: Some(reply),
                        }
                    }
                    Err(err) => {
                        warn!(peer = server_id, %addr, %err, "peer send failed");
                        PeerReply {
                            server_id,
                            line: None,
                        }
                    }
                }
            });
        }

        let mut replies = Vec::with_capacity(self.roster.len().saturating_sub(1));
        while let Some(joined) = sends.join_next().await {
            if let Ok(reply) = joined {
                replies.push(reply);
            }
        }
        replies
    }
}

/// One request/response exchange with a single peer: connect (bounded),
/// write the line, read one reply line.
async fn exchange(addr: &PeerAddr, line: &str, connect_timeout: Duration) -> io::Result<String> {
    let connect = TcpStream::connect((addr.host.as_str(), addr.port));
    let stream = tokio::time::timeout(connect_timeout, connect)
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "connect timed out"))??;

    let (read_half, mut write_half) = stream.into_split();
    write_half.write_all(line.as_bytes()).await?;
    write_half.write_all(b"\n").await?;

    let mut reply = String::new();
    BufReader::new(read_half).read_line(&mut reply).await?;
    Ok(reply.trim_end().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn echo_peer() -> PeerAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                tokio::spawn(async move {
                    let (read_half, mut write_half) = stream.into_split();
                    let mut line = String::new();
                    let mut reader = BufReader::new(read_half);
                    if reader.read_line(&mut line).await.is_ok() {
                        let reply = format!("echo {}\n", line.trim_end());
                        let _ = write_half.write_all(reply.as_bytes()).await;
                    }
                });
            }
        });
        PeerAddr::new("127.0.0.1", addr.port())
    }

    #[tokio::test]
    async fn broadcast_collects_replies_and_skips_self() {
        let peer_a = echo_peer().await;
        let peer_b = echo_peer().await;
        // Self gets a port nothing listens on; it must not be contacted.
        let roster = PeerRoster::new(
            3,
            vec![peer_a, peer_b, PeerAddr::new("127.0.0.1", 1)],
        );
        let messenger = PeerMessenger::new(roster, Duration::from_millis(500));

        let mut replies = messenger.broadcast("ping").await;
        replies.sort_by_key(|r| r.server_id);

        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].line.as_deref(), Some("echo ping"));
        assert_eq!(replies[1].line.as_deref(), Some("echo ping"));
    }

    #[tokio::test]
    async fn dead_peer_is_best_effort() {
        let live = echo_peer().await;
        let roster = PeerRoster::new(
            1,
            vec![
                PeerAddr::new("127.0.0.1", 9),
                // Discard port: almost certainly nothing listening.
                PeerAddr::new("127.0.0.1", 9),
                live,
            ],
        );
        let messenger = PeerMessenger::new(roster, Duration::from_millis(200));

        let mut replies = messenger.broadcast("ping").await;
        replies.sort_by_key(|r| r.server_id);

        assert_eq!(replies.len(), 2);
        assert!(replies[0].line.is_none());
        assert_eq!(replies[1].line.as_deref(), Some("echo ping"));
    }
}
