//! NBA Market Service
//!
//! Runs the scheduled stats and valuation jobs until Ctrl+C or SIGTERM.

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::info;

use market_service::{initialize_logging, load_configuration, setup_signal_handlers, MarketService};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let config = load_configuration()?;
    initialize_logging(&config.logging)?;

    info!("Starting NBA Market Service v{}", env!("CARGO_PKG_VERSION"));
    info!(season = %config.fetcher.season, "Configuration loaded successfully");

    let service = MarketService::new(config).await?;

    let cancel = CancellationToken::new();
    setup_signal_handlers(cancel.clone());
    info!("NBA Market Service is running. Press Ctrl+C to shutdown gracefully.");

    service.run(cancel).await?;

    info!("NBA Market Service shutdown complete");
    Ok(())
}
