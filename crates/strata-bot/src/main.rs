//! Strata - Entry Point
//!
//! Reconciles strategy positions against the portfolio, then tracks the
//! configured exchange session until interrupted.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Strata trading coordination core
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via STRATA_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    strata_telemetry::init_logging()?;

    info!("Starting strata v{}", env!("CARGO_PKG_VERSION"));

    let config = match args.config {
        Some(path) => {
            info!(config_path = %path, "Loading configuration");
            strata_bot::AppConfig::from_file(&path)?
        }
        None => strata_bot::AppConfig::load()?,
    };
    info!(
        strategies = config.strategies.len(),
        portfolio_instruments = config.portfolio.len(),
        has_session = config.session_record.is_some(),
        "Configuration loaded"
    );

    let mut app = strata_bot::Application::new(config)?;

    info!("Running preflight reconciliation...");
    app.run_preflight().await?;

    app.run().await?;

    Ok(())
}
