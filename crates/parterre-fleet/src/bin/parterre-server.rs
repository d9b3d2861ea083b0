//! Parterre booking fleet member.
//!
//! Reads the fleet configuration from a file path argument (or stdin
//! when no argument is given) and serves the line protocol on this
//! member's configured port.

use std::env;
use std::fs::File;
use std::io::{self, BufReader};
use std::sync::Arc;

use parterre_fleet::{FleetConfig, Server, ServerContext};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let config = match args.get(1) {
        Some(path) => FleetConfig::parse(BufReader::new(File::open(path)?))?,
        None => FleetConfig::parse(io::stdin().lock())?,
    };

    println!(
        "Parterre fleet member {} of {}",
        config.server_id,
        config.peers.len()
    );
    println!("Managing {} seats", config.num_seats);

    let bind_addr = format!("0.0.0.0:{}", config.self_addr().port);
    let ctx = Arc::new(ServerContext::new(&config));
    let server = Server::bind(&bind_addr, ctx).await?;
    println!("Listening on {}", server.local_addr()?);

    server.run().await?;
    Ok(())
}
