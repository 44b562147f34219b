// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tally-remote: authoritative endpoint for tally clients.
//!
//! This server keeps the canonical tabs in memory and answers each forwarded
//! operation with its authoritative result.

mod server;
mod state;

use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use state::ServerState;

/// tally-remote: Tab service endpoint
#[derive(Parser, Debug)]
#[command(name = "tally-remote")]
#[command(about = "Authoritative endpoint for optimistic tally clients")]
struct Args {
    /// Address to bind the server to
    #[arg(short, long, default_value = "127.0.0.1:7890")]
    bind: SocketAddr,

    /// Artificial delay before handling each operation, in milliseconds
    #[arg(long, default_value = "0")]
    latency_ms: u64,

    /// Start with three open demo tabs
    #[arg(long)]
    seed: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting tally-remote server");
    info!("  Bind address: {}", args.bind);
    info!("  Latency: {}ms", args.latency_ms);

    let latency = Duration::from_millis(args.latency_ms);
    let state = if args.seed {
        ServerState::seeded(latency)
    } else {
        ServerState::new(latency)
    };
    info!("  Tabs: {}", state.tab_count().await);

    server::run(args.bind, state).await?;

    Ok(())
}
