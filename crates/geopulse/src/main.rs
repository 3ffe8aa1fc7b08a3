//! Geopulse - geospatial context pipeline.

use anyhow::Result;
use clap::{Parser, Subcommand};
use geopulse::{
    run_adapter, run_daemon, AdapterConfig, DaemonConfig, LoggingSession, SensorConfig,
    SimulatedSensor,
};
use geopulse_ipc::SEGMENT_NAME;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::{mpsc, Arc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "geopulse")]
#[command(about = "Geospatial context pipeline: location daemon and session adapter")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the location daemon (producer). Reads free-text commands such as
    /// "start cycling" from stdin.
    Daemon {
        /// Loop rate
        #[arg(long, default_value_t = 10)]
        tick_hz: u32,

        /// Spatial cell level for transition detection
        #[arg(long, default_value_t = 16)]
        level: u32,

        /// Provider to activate at startup
        #[arg(long, default_value = "cycling")]
        provider: String,

        /// JSON file with provider configuration (API keys, endpoints)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Stop after this many ticks (run forever when omitted)
        #[arg(long)]
        ticks: Option<u64>,

        /// Simulated sensor seed
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Run the session adapter (consumer).
    Adapter {
        /// Snapshot cadence
        #[arg(long, default_value_t = 500)]
        poll_ms: u64,

        /// How long to wait for the daemon before giving up
        #[arg(long, default_value_t = 3000)]
        grace_ms: u64,

        /// Stop after this many polls (run forever when omitted)
        #[arg(long)]
        polls: Option<u64>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let running = Arc::new(AtomicBool::new(true));

    match cli.command {
        Commands::Daemon {
            tick_hz,
            level,
            provider,
            config,
            ticks,
            seed,
        } => {
            let provider_config = match config {
                Some(path) => serde_json::from_str(&std::fs::read_to_string(&path)?)?,
                None => serde_json::json!({}),
            };
            let daemon_config = DaemonConfig {
                segment_name: SEGMENT_NAME.to_owned(),
                tick_hz,
                cell_level: level,
                provider,
                provider_config,
                max_ticks: ticks,
            };

            // Commands are typed on stdin and serialised onto the daemon
            // thread; the reader thread dies with the process.
            let (tx, rx) = mpsc::channel();
            std::thread::spawn(move || {
                for line in std::io::stdin().lock().lines() {
                    let Ok(line) = line else { break };
                    if !line.trim().is_empty() && tx.send(line).is_err() {
                        break;
                    }
                }
            });

            let mut sensor = SimulatedSensor::new(SensorConfig {
                seed,
                ..SensorConfig::default()
            });
            let stats = run_daemon(&daemon_config, &mut sensor, rx, running)?;
            println!(
                "daemon finished: {} ticks, {} context refreshes",
                stats.ticks, stats.context_refreshes
            );
        }
        Commands::Adapter {
            poll_ms,
            grace_ms,
            polls,
        } => {
            let adapter_config = AdapterConfig {
                segment_name: SEGMENT_NAME.to_owned(),
                poll_ms,
                grace_ms,
                max_polls: polls,
            };
            let mut session = LoggingSession::new();
            let stats = run_adapter(&adapter_config, &mut session, running)?;
            println!(
                "adapter finished: {} polls, {} context forwards",
                stats.polls, stats.forwards
            );
        }
    }

    Ok(())
}
