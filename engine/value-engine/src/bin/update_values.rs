//! Recompute player values from the command line

use anyhow::Context;
use clap::Parser;
use market_store::{DatabaseConfig, PgStore};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use value_engine::{ValuationConfig, ValueEngine};

#[derive(Debug, Parser)]
#[command(name = "update-values", about = "Recompute player values from stored stats")]
struct Args {
    /// Only value these player ids
    #[arg(long, value_delimiter = ',')]
    players: Vec<i64>,

    /// Season whose stats drive the season component
    #[arg(long)]
    season: Option<String>,

    /// Worker count for full runs
    #[arg(long)]
    workers: Option<usize>,

    /// Print computed values without writing them
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = ValuationConfig::from_env();
    if let Some(season) = args.season {
        config.season = season;
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }

    let store = Arc::new(
        PgStore::connect(&DatabaseConfig::from_env())
            .await
            .context("Failed to connect to database")?,
    );
    let engine = ValueEngine::new(store.clone(), store, config);

    if args.dry_run {
        for player_id in &args.players {
            let valuation = engine.calculate_player_value(*player_id).await?;
            println!("{}", serde_json::to_string(&valuation)?);
        }
        return Ok(());
    }

    let summary = if args.players.is_empty() {
        engine.update_all_values().await?
    } else {
        engine.update_values_for_players(&args.players).await?
    };
    info!("Valuation: {:?}", summary);

    Ok(())
}
