//! TCP listener and per-connection workers.
//!
//! One worker task per accepted connection: read one command line,
//! dispatch it, write the response line, close. Worker failures are
//! logged and never stop the listener; the listener itself stops on an
//! explicit shutdown signal.
//!
//! The shared logical clock advances on accept, on receipt of the
//! command line, and once dispatch completes.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::context::ServerContext;
use crate::dispatch::Dispatcher;
use crate::error::Result;

/// Handle for stopping a running server.
#[derive(Debug, Clone)]
pub struct ShutdownHandle(Arc<watch::Sender<bool>>);

impl ShutdownHandle {
    /// Ask the listener to stop accepting connections.
    pub fn shutdown(&self) {
        self.0.send_replace(true);
    }
}

/// The connection listener of one fleet member.
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
    ctx: Arc<ServerContext>,
    stop: Arc<watch::Sender<bool>>,
}

impl Server {
    /// Bind the listener.
    ///
    /// The address normally comes from the roster's own entry; tests
    /// bind port 0 first and build the roster from the resulting
    /// addresses via [`Server::from_listener`].
    pub async fn bind(addr: &str, ctx: Arc<ServerContext>) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self::from_listener(listener, ctx))
    }

    /// Wrap an already-bound listener.
    pub fn from_listener(listener: TcpListener, ctx: Arc<ServerContext>) -> Self {
        let (stop, _) = watch::channel(false);
        Self {
            listener,
            dispatcher: Arc::new(Dispatcher::new(ctx.clone())),
            ctx,
            stop: Arc::new(stop),
        }
    }

    /// The bound address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// A handle that stops the accept loop.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle(self.stop.clone())
    }

    /// Accept connections until shut down, spawning one worker per
    /// connection.
    pub async fn run(self) -> Result<()> {
        let mut stop = self.stop.subscribe();
        info!(
            server = self.ctx.server_id,
            addr = %self.listener.local_addr()?,
            "listening"
        );

        loop {
            tokio::select! {
                _ = stop.wait_for(|stopped| *stopped) => {
                    info!(server = self.ctx.server_id, "server stopping");
                    return Ok(());
                }
                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(accepted) => accepted,
                        Err(err) => {
                            warn!(%err, "failed to accept connection");
                            continue;
                        }
                    };
                    self.ctx.clock.tick();
                    debug!(%peer, "accepted connection");

                    let dispatcher = self.dispatcher.clone();
                    let ctx = self.ctx.clone();
                    tokio::spawn(async move {
                        if let Err(err) = serve_connection(stream, dispatcher, ctx).await {
                            warn!(%peer, %err, "connection worker failed");
                        }
                    });
                }
            }
        }
    }
}

/// One worker: read a line, dispatch, answer, close.
async fn serve_connection(
    stream: TcpStream,
    dispatcher: Arc<Dispatcher>,
    ctx: Arc<ServerContext>,
) -> std::io::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Ok(());
    }
    ctx.clock.tick();

    let response = dispatcher.dispatch(line.trim_end()).await;
    ctx.clock.tick();

    if let Some(response) = response {
        write_half.write_all(response.as_bytes()).await?;
        write_half.write_all(b"\n").await?;
    }
    Ok(())
}
