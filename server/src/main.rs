use clap::Parser;
use log::{error, info};
use server::game::Simulation;
use server::network::Server;
use shared::now_millis;
use std::time::Duration;

/// Parses command-line arguments, builds the simulation and runs the
/// server until it stops or Ctrl+C arrives.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Command line arguments
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// Server IP address to bind to
        #[clap(short = 'H', long, default_value = "127.0.0.1")]
        host: String,
        /// Server port to listen on
        #[clap(short, long, default_value = "8080")]
        port: u16,
        /// Tick rate (updates per second)
        #[clap(short, long, default_value = "60")]
        tick_rate: u32,
        /// Maximum number of connected players
        #[clap(short, long, default_value = "4")]
        max_clients: usize,
        /// Number of enemies to spawn
        #[clap(short, long, default_value = "6")]
        enemies: usize,
        /// Seed for enemy behavior; omit for a time-based one
        #[clap(long)]
        seed: Option<u64>,
    }

    let args = Args::parse();

    let address = format!("{}:{}", args.host, args.port);
    let tick_duration = Duration::from_secs_f64(1.0 / args.tick_rate.max(1) as f64);
    let seed = args.seed.unwrap_or_else(now_millis);

    info!(
        "Starting server on {} at {}Hz ({} enemies, seed {})",
        address, args.tick_rate, args.enemies, seed
    );

    let simulation = Simulation::new(args.enemies, seed);
    let mut server = Server::new(&address, tick_duration, args.max_clients, simulation).await?;

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
