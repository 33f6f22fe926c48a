//! Relay server for pocket_uno rooms.

use std::net::SocketAddr;

use anyhow::Error;
use ctrlc::set_handler;
use log::info;
use pico_args::Arguments;
use pu_relay::{
    api::{RelayState, create_router},
    config::RelayConfig,
};

const HELP: &str = "\
Run a pocket_uno rendezvous relay

USAGE:
  pu_relay [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Relay socket bind address  [default: env POCKET_UNO_BIND or 127.0.0.1:7878]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  POCKET_UNO_BIND          Relay bind address (e.g., 0.0.0.0:7878)
  RELAY_MAX_ROOMS          Rooms hosted at once [default: 1024]
  RELAY_FRAMES_PER_SECOND  Frames one socket may send per second [default: 50]
  RUST_LOG                 Log filter (e.g., info)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let bind: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;
    let config = RelayConfig::from_env(bind)?;

    // Catching signals for exit.
    set_handler(|| std::process::exit(0))?;

    env_logger::builder().format_target(false).init();
    info!(
        "Starting relay at {} (max {} rooms, {} frames/s per socket)",
        config.bind, config.max_rooms, config.frames_per_second
    );

    let bind = config.bind;
    let app = create_router(RelayState::new(config));
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", bind, e))?;

    info!("Relay is running at ws://{}/ws. Press Ctrl+C to stop.", bind);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
