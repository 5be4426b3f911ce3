//! quoter - Entry Point

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Automated market-making engine
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via QUOTER_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    quoter_telemetry::init_logging()?;

    info!("Starting quoter v{}", env!("CARGO_PKG_VERSION"));

    // CLI arg > QUOTER_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("QUOTER_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");

    let config = quoter_bot::AppConfig::from_file(&config_path)?;
    info!(jobs = config.jobs.len(), "Configuration loaded");

    let app = quoter_bot::Application::new(config)?;
    app.run().await?;

    Ok(())
}
