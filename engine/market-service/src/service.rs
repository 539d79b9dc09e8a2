//! Service state management and job registration

use anyhow::{Context, Result};
use job_scheduler::{job_fn, CancellationToken, Job, Recurrence, Scheduler};
use market_store::{player_with_stats, PgStore, PlayerWithStats, PositionFilter};
use nba_stats_fetcher::{NbaStatsClient, StatsIngestor};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use trading_ledger::TradingLedger;
use value_engine::ValueEngine;

use crate::config::{SchedulerConfig, ServiceConfig};
use crate::signals::graceful_shutdown;

pub const SEASON_STATS_JOB: &str = "season-stats";
pub const VALUE_REFRESH_JOB: &str = "value-refresh";
pub const WEEKLY_STATS_JOB: &str = "weekly-stats";
pub const CAREER_STATS_JOB: &str = "career-stats";
pub const NIGHTLY_CHAIN: &str = "nightly-refresh";

/// Everything the running service owns
pub struct MarketService {
    pub config: ServiceConfig,
    pub store: Arc<PgStore>,
    pub ingestor: Arc<StatsIngestor>,
    pub values: ValueEngine,
    ledger: TradingLedger,
}

impl MarketService {
    /// Connect to the database and build every component
    pub async fn new(config: ServiceConfig) -> Result<Self> {
        info!("Initializing service components...");

        let store = Arc::new(
            PgStore::connect(&config.database)
                .await
                .context("Failed to connect to market database")?,
        );
        store.ping().await.context("Market database health check failed")?;

        let client = NbaStatsClient::new(&config.fetcher).context("Failed to create stats client")?;
        let ingestor = Arc::new(StatsIngestor::new(
            Arc::new(client),
            store.clone(),
            store.clone(),
            config.fetcher.clone(),
        ));
        let values = ValueEngine::new(store.clone(), store.clone(), config.valuation.clone());
        let ledger =
            TradingLedger::new(store.clone(), store.clone(), store.clone(), config.ledger.clone());

        info!("Service components initialized");
        Ok(Self { config, store, ingestor, values, ledger })
    }

    /// Trading entry point for request handlers
    pub fn ledger(&self) -> &TradingLedger {
        &self.ledger
    }

    /// A catalog player with its stats for the configured season
    pub async fn player_with_stats(&self, player_id: i64) -> Result<Option<PlayerWithStats>> {
        let found = player_with_stats(
            self.store.as_ref(),
            self.store.as_ref(),
            player_id,
            &self.config.fetcher.season,
        )
        .await?;
        Ok(found)
    }

    pub fn build_scheduler(&self) -> Result<Scheduler> {
        let mut scheduler = Scheduler::new();
        register_jobs(
            &mut scheduler,
            &self.config.scheduler,
            self.ingestor.clone(),
            self.values.clone(),
            &self.config.fetcher.season,
        )?;
        Ok(scheduler)
    }

    /// Run the scheduled jobs until `cancel` fires, then let in-flight runs finish
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        ledger_ready(&self.ledger).await?;

        let scheduler = self.build_scheduler()?;
        if scheduler.is_empty() {
            warn!("No scheduled jobs are enabled");
        }
        for job in scheduler.jobs() {
            info!(job = %job.name, at = %job.at, recurrence = %job.recurrence, "Job scheduled");
        }

        let handle = scheduler.start(cancel.clone());
        cancel.cancelled().await;

        let limit = Duration::from_secs(self.config.service.shutdown_timeout_secs);
        graceful_shutdown(handle.join(), limit).await;

        self.store.close().await;
        Ok(())
    }

    /// First-time population: seed the catalog, load stats, price everything
    pub async fn setup(&self, min_games: i32, with_career: bool) -> Result<()> {
        let season = &self.config.fetcher.season;

        let seeded = self.ingestor.seed_players(season, min_games).await.context("Seeding failed")?;
        info!(created = seeded.created, already_mapped = seeded.already_mapped, "Catalog seeded");

        if with_career {
            self.ingestor.update_all_career_stats().await.context("Career stats refresh failed")?;
        }
        self.ingestor.update_all_season_stats(season).await.context("Season stats refresh failed")?;

        let summary = self.values.update_all_values().await.context("Value refresh failed")?;
        info!(updated = summary.updated, failed = summary.failed, "Initial values computed");
        Ok(())
    }
}

/// Read the positions view once so a broken ledger fails at startup
pub async fn ledger_ready(ledger: &TradingLedger) -> Result<usize> {
    let open = ledger
        .get_positions(PositionFilter::All)
        .await
        .context("Positions view is unreadable")?
        .len();
    info!(open_positions = open, "Ledger ready");
    Ok(open)
}

fn season_stats_job(ingestor: Arc<StatsIngestor>, season: String) -> Arc<dyn Job> {
    job_fn(SEASON_STATS_JOB, move |_| {
        let ingestor = ingestor.clone();
        let season = season.clone();
        async move {
            ingestor.update_all_season_stats(&season).await?;
            Ok::<(), anyhow::Error>(())
        }
    })
}

fn weekly_stats_job(ingestor: Arc<StatsIngestor>, season: String) -> Arc<dyn Job> {
    job_fn(WEEKLY_STATS_JOB, move |_| {
        let ingestor = ingestor.clone();
        let season = season.clone();
        async move {
            ingestor.update_all_weekly_stats(&season).await?;
            Ok::<(), anyhow::Error>(())
        }
    })
}

fn career_stats_job(ingestor: Arc<StatsIngestor>) -> Arc<dyn Job> {
    job_fn(CAREER_STATS_JOB, move |_| {
        let ingestor = ingestor.clone();
        async move {
            ingestor.update_all_career_stats().await?;
            Ok::<(), anyhow::Error>(())
        }
    })
}

fn value_refresh_job(values: ValueEngine) -> Arc<dyn Job> {
    job_fn(VALUE_REFRESH_JOB, move |_| {
        let values = values.clone();
        async move {
            values.update_all_values().await?;
            Ok::<(), anyhow::Error>(())
        }
    })
}

/// Register the stats and value jobs enabled in `config`
pub fn register_jobs(
    scheduler: &mut Scheduler,
    config: &SchedulerConfig,
    ingestor: Arc<StatsIngestor>,
    values: ValueEngine,
    season: &str,
) -> Result<()> {
    let season_enabled = config.season_stats.enabled;
    let values_enabled = config.value_refresh.enabled;

    if config.chain_value_refresh && season_enabled && values_enabled {
        scheduler.add_chain(
            NIGHTLY_CHAIN,
            vec![season_stats_job(ingestor.clone(), season.to_string()), value_refresh_job(values)],
            config.season_stats.run_at()?,
            Recurrence::Daily,
        )?;
    } else {
        if season_enabled {
            scheduler.add_daily(
                season_stats_job(ingestor.clone(), season.to_string()),
                config.season_stats.run_at()?,
            )?;
        }
        if values_enabled {
            scheduler.add_daily(value_refresh_job(values), config.value_refresh.run_at()?)?;
        }
    }

    if config.weekly_stats.enabled {
        scheduler.add_weekly(
            weekly_stats_job(ingestor.clone(), season.to_string()),
            config.weekly_stats.run_at()?,
        )?;
    }

    if config.career_stats.enabled {
        scheduler.add_weekly(career_stats_job(ingestor), config.career_stats.run_at()?)?;
    }

    Ok(())
}
