//! frame-relay
//!
//! # Architecture Overview
//!
//! ```text
//!                          ┌───────────────────────────────────────────────┐
//!                          │                  FRAME RELAY                  │
//!                          │                                               │
//!   GET /proxy?url=...     │  ┌─────────┐   ┌──────────┐   ┌───────────┐   │
//!   ───────────────────────┼─▶│ handler │──▶│ upstream │──▶│  headers  │   │──── Target site
//!                          │  └─────────┘   └──────────┘   │  rewrite  │   │
//!   ◀──────────────────────┼───────────────────────────────└───────────┘   │
//!                          │                                               │
//!   WebSocket (any path)   │  ┌─────────┐   ┌──────────────┐              │
//!   ───────────────────────┼─▶│ session │──▶│ RoomRegistry │──▶ peers     │
//!   ?type=&room=           │  └─────────┘   └──────────────┘              │
//!                          └───────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use frame_relay::lifecycle::startup::{self, StartupOptions};

#[derive(Parser)]
#[command(name = "frame-relay")]
#[command(about = "Framing proxy and WebSocket room relay", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listening port (overrides PORT and the config file)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    startup::run(StartupOptions {
        config_path: cli.config,
        port: cli.port,
    })
    .await?;

    Ok(())
}
