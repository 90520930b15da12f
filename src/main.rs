//! Edge gateway binary.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────┐
//!                     │                 EDGE GATEWAY                  │
//!                     │                                               │
//!   Client request    │  ┌──────────┐   ┌─────────┐   ┌───────────┐  │
//!   ──────────────────┼─▶│  http    │──▶│ routing │──▶│ security  │  │
//!                     │  │ server   │   │  table  │   │rate limit │  │
//!                     │  └──────────┘   └────┬────┘   └─────┬─────┘  │
//!                     │                      │              │        │
//!                     │    ┌─────────────────┼──────────────┘        │
//!                     │    ▼                 ▼                        │
//!                     │  ┌──────────┐   ┌──────────┐                 │
//!   Client response   │  │  static  │   │ upstream │◀────────────────┼── Backends
//!   ◀─────────────────┼──│  assets  │   │  pools   │   (dashboard,   │
//!                     │  └──────────┘   └──────────┘    detection)   │
//!                     │                                               │
//!                     │  config · observability · lifecycle           │
//!                     └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use edge_gateway::config::validation::validate_config;
use edge_gateway::config::{load_config, GatewayConfig};
use edge_gateway::lifecycle::{signals, Shutdown};
use edge_gateway::observability::{logging, metrics};
use edge_gateway::GatewayServer;

#[derive(Parser, Debug)]
#[command(name = "edge-gateway", about = "HTTP gateway for the detection/dashboard deployment")]
struct Args {
    /// Path to a TOML configuration file. Without it, the built-in
    /// deployment defaults apply.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    listen: Option<String>,

    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("invalid configuration: {}", e);
                std::process::exit(1);
            }
        },
        None => GatewayConfig::standard(),
    };

    if let Some(listen) = args.listen {
        config.listener.bind_address = listen;
    }
    if let Err(errors) = validate_config(&config) {
        for error in &errors {
            eprintln!("invalid configuration: {}", error);
        }
        std::process::exit(1);
    }

    if args.print_config {
        println!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    logging::init(&config.observability.log_level);

    tracing::info!(
        bind_address = %config.listener.bind_address,
        pools = config.pools.len(),
        zones = config.zones.len(),
        static_root = %config.static_assets.root.display(),
        "edge-gateway starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        signal_shutdown.trigger();
    });

    let server = GatewayServer::new(config);
    server.run(listener, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
