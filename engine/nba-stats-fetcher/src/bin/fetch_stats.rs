//! One-shot stats refresh from the command line

use anyhow::Context;
use clap::{Parser, ValueEnum};
use market_store::{DatabaseConfig, PgStore};
use nba_stats_fetcher::{FetcherConfig, NbaStatsClient, StatsIngestor};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Season,
    Weekly,
    Career,
    Seed,
}

#[derive(Debug, Parser)]
#[command(name = "fetch-stats", about = "Refresh NBA stats in the market database")]
struct Args {
    /// What to refresh
    #[arg(value_enum)]
    mode: Mode,

    /// Season to fetch (defaults to NBA_SEASON or the configured season)
    #[arg(long)]
    season: Option<String>,

    /// Minimum games played when seeding
    #[arg(long)]
    min_games: Option<i32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = FetcherConfig::from_env();
    let season = args.season.unwrap_or_else(|| config.season.clone());

    let store = Arc::new(
        PgStore::connect(&DatabaseConfig::from_env())
            .await
            .context("Failed to connect to database")?,
    );
    let client = NbaStatsClient::new(&config).context("Failed to create stats client")?;
    let ingestor = StatsIngestor::new(Arc::new(client), store.clone(), store, config.clone());

    match args.mode {
        Mode::Season => {
            let summary = ingestor.update_all_season_stats(&season).await?;
            info!("Season stats: {:?}", summary);
        }
        Mode::Weekly => {
            let summary = ingestor.update_all_weekly_stats(&season).await?;
            info!("Weekly stats: {:?}", summary);
        }
        Mode::Career => {
            let summary = ingestor.update_all_career_stats().await?;
            info!("Career stats: {:?}", summary);
        }
        Mode::Seed => {
            let min_games = args.min_games.unwrap_or(config.seed_min_games);
            let summary = ingestor.seed_players(&season, min_games).await?;
            info!("Seeding: {:?}", summary);
        }
    }

    Ok(())
}
