use clap::Parser;
use client::checkpoints::load_checkpoint_positions;
use client::drive::{NoVehicle, ScriptedDrive};
use client::network::Client;
use client::publisher::TransformSource;
use log::info;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Display name to race under (empty lets the server assign one)
    #[arg(short = 'n', long, default_value = "")]
    name: String,

    /// Checkpoint layout file (defaults to the built-in ring)
    #[arg(long)]
    track_config: Option<PathBuf>,

    /// Endpoint for saving edited track layouts
    #[arg(long)]
    persist_url: Option<String>,

    /// Drive the scripted demo lap instead of spectating
    #[arg(long)]
    drive: bool,

    /// Park the scripted drive after this many laps (soak runs)
    #[arg(long)]
    laps: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting client...");
    info!("Connecting to: {}", args.server);

    let source: Box<dyn TransformSource + Send> = if args.drive {
        match args.laps {
            Some(laps) => {
                info!("Driving the scripted demo lap, parking after {} laps", laps);
                Box::new(ScriptedDrive::with_lap_limit(laps))
            }
            None => {
                info!("Driving the scripted demo lap");
                Box::new(ScriptedDrive::new())
            }
        }
    } else {
        info!("Spectating (run with --drive to race)");
        Box::new(NoVehicle)
    };

    let positions = load_checkpoint_positions(args.track_config.as_deref());

    let mut client = Client::new(
        &args.server,
        &args.name,
        source,
        positions,
        args.persist_url,
    )
    .await?;

    tokio::select! {
        result = client.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down...");
            Ok(())
        }
    }
}
