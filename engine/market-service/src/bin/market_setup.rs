//! One-time catalog seeding and initial pricing

use anyhow::Result;
use clap::Parser;
use tracing::info;

use market_service::{initialize_logging, load_configuration, MarketService};

#[derive(Debug, Parser)]
#[command(name = "market-setup", about = "Seed the player catalog and compute initial values")]
struct Args {
    /// Minimum games played for a player to be listed
    #[arg(long)]
    min_games: Option<i32>,

    /// Season to seed from (defaults to the configured season)
    #[arg(long)]
    season: Option<String>,

    /// Skip the career stats refresh
    #[arg(long)]
    skip_career: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let mut config = load_configuration()?;
    initialize_logging(&config.logging)?;

    if let Some(season) = args.season {
        config.fetcher.season = season.clone();
        config.valuation.season = season;
    }
    let min_games = args.min_games.unwrap_or(config.fetcher.seed_min_games);

    info!(season = %config.fetcher.season, min_games, "Running market setup");
    let service = MarketService::new(config).await?;
    service.setup(min_games, !args.skip_career).await?;
    service.store.close().await;

    info!("Market setup complete");
    Ok(())
}
