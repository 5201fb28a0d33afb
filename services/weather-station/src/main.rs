//! Weather Station CLI
//!
//! Command-line interface for the telemetry ingestion and query service.

use std::path::PathBuf;

use clap::Parser;
use tracing::Level;
use weather_station::{load_config, Config, StationBuilder};

#[derive(Parser)]
#[command(name = "weather-station")]
#[command(about = "Weather station telemetry ingestion and derived-metrics service")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database file (overrides config file)
    #[arg(long)]
    database: Option<PathBuf>,

    /// Query API port (overrides config file)
    #[arg(long)]
    server_port: Option<u16>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    tracing::debug!(
        "Parsed command line arguments: config={:?}, database={:?}, server_port={:?}, log_level={:?}",
        args.config,
        args.database,
        args.server_port,
        args.log_level
    );

    let mut config = if let Some(config_path) = &args.config {
        tracing::debug!("Loading configuration from {:?}", config_path);
        load_config(config_path)?
    } else {
        tracing::debug!("Using default configuration");
        Config::default()
    };

    if let Some(database) = args.database {
        config.database.path = database;
    }
    if let Some(server_port) = args.server_port {
        config.server.port = server_port;
    }

    tracing::info!("Starting weather station");
    tracing::debug!(
        "Database: {:?}, interval: {:?}, sensors: {}",
        config.database.path,
        config.sampling.interval,
        config.sensors.type_name()
    );

    StationBuilder::new(config).build()?.start().await?;

    Ok(())
}
