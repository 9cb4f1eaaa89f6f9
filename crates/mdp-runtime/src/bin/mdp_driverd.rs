//! Line-oriented demo driver for the MDP-M01/M02.
//!
//! Not a UI — no channel cards, no charts. Opens the serial port, runs the
//! event loop, and logs every command-layer action to stdout via
//! `tracing-subscriber`.
//!
//! # Usage
//!
//! ```bash
//! mdp-driverd --port /dev/ttyACM0
//! ```

use clap::Parser;
use mdp_runtime::{DriverConfig, Runtime, SerialTransport, TransportConfig};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// MDP-M01/M02 driver daemon.
#[derive(Parser, Debug)]
#[command(name = "mdp-driverd")]
#[command(about = "Line-oriented demo driver for the MDP-M01/M02 power supply")]
#[command(version)]
struct Args {
    /// Serial device to open.
    #[arg(short, long, default_value = "/dev/ttyACM0")]
    port: String,

    /// Baud rate.
    #[arg(long, default_value = "115200")]
    baud: u32,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    tracing::info!(port = %args.port, baud = args.baud, "opening transport");

    let transport_config = TransportConfig {
        baud: args.baud,
        ..Default::default()
    };
    let transport = SerialTransport::open(&args.port, transport_config)?;

    let mut runtime = Runtime::with_config(transport, mdp_core::RealClock, DriverConfig::default());
    runtime.subscribe(|action| {
        tracing::info!(?action, "action");
    });

    runtime.run().await?;

    Ok(())
}
