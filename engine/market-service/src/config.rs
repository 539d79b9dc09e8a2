//! Service configuration management

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use job_scheduler::RunAt;
use market_store::DatabaseConfig;
use nba_stats_fetcher::FetcherConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use trading_ledger::LedgerConfig;
use value_engine::ValuationConfig;

/// Default location of the optional config file
pub const DEFAULT_CONFIG_PATH: &str = "config/market-service.toml";

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub database: DatabaseConfig,
    pub fetcher: FetcherConfig,
    pub valuation: ValuationConfig,
    pub scheduler: SchedulerConfig,
    pub ledger: LedgerConfig,
    pub logging: LoggingConfig,
    pub service: ServiceSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Seconds to wait for running jobs after a shutdown signal
    pub shutdown_timeout_secs: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self { shutdown_timeout_secs: 300 }
    }
}

/// One recurring job's trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSchedule {
    pub enabled: bool,
    pub hour: u32,
    pub minute: u32,
}

impl JobSchedule {
    pub const fn at(hour: u32, minute: u32) -> Self {
        Self { enabled: true, hour, minute }
    }

    pub fn run_at(&self) -> Result<RunAt> {
        Ok(RunAt::new(self.hour, self.minute)?)
    }
}

/// Job times, all UTC
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Nightly season stats refresh
    pub season_stats: JobSchedule,

    /// Nightly value refresh; ignored when chained
    pub value_refresh: JobSchedule,

    /// Weekly trailing-window stats refresh
    pub weekly_stats: JobSchedule,

    /// Weekly career stats refresh
    pub career_stats: JobSchedule,

    /// Run the value refresh right after the season stats refresh under one timer
    pub chain_value_refresh: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            season_stats: JobSchedule::at(2, 0),
            value_refresh: JobSchedule::at(2, 40),
            weekly_stats: JobSchedule::at(4, 0),
            career_stats: JobSchedule { enabled: false, hour: 3, minute: 0 },
            chain_value_refresh: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "pretty".to_string() }
    }
}

/// Load configuration from the default file location and the environment
pub fn load_config() -> Result<ServiceConfig> {
    let path = std::env::var("MARKET_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
    load_config_from(&path)
}

/// Layer an optional TOML file, `MARKET__*` variables and the conventional
/// `DATABASE_URL` / `NBA_SEASON` variables over the defaults
pub fn load_config_from(path: &Path) -> Result<ServiceConfig> {
    if path.exists() {
        tracing::debug!("Loading configuration from file: {:?}", path);
    }

    let mut config: ServiceConfig = Config::builder()
        .add_source(File::from(path.to_path_buf()).required(false))
        .add_source(Environment::with_prefix("MARKET").separator("__").try_parsing(true))
        .build()
        .context("Failed to read configuration sources")?
        .try_deserialize()
        .context("Failed to parse configuration")?;

    if let Ok(url) = std::env::var("DATABASE_URL") {
        config.database.url = url;
    }

    if let Ok(season) = std::env::var("NBA_SEASON") {
        config.fetcher.season = season.clone();
        config.valuation.season = season;
    }

    validate_config(&config)?;
    Ok(config)
}

/// Validate configuration
pub fn validate_config(config: &ServiceConfig) -> Result<()> {
    match config.logging.level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow::anyhow!("Invalid log level: {}", config.logging.level)),
    }

    match config.logging.format.as_str() {
        "json" | "pretty" | "compact" => {}
        _ => return Err(anyhow::anyhow!("Invalid log format: {}", config.logging.format)),
    }

    if config.valuation.workers == 0 {
        return Err(anyhow::anyhow!("Valuation needs at least one worker"));
    }

    if config.fetcher.batch_size == 0 {
        return Err(anyhow::anyhow!("Fetcher batch size must be positive"));
    }

    if config.fetcher.requests_per_minute == 0 {
        return Err(anyhow::anyhow!("Fetcher rate limit must be positive"));
    }

    let jobs = [
        ("season_stats", &config.scheduler.season_stats),
        ("value_refresh", &config.scheduler.value_refresh),
        ("weekly_stats", &config.scheduler.weekly_stats),
        ("career_stats", &config.scheduler.career_stats),
    ];
    for (name, schedule) in jobs {
        schedule.run_at().with_context(|| format!("Invalid schedule for {name}"))?;
    }

    if config.valuation.season != config.fetcher.season {
        tracing::warn!(
            fetcher = %config.fetcher.season,
            valuation = %config.valuation.season,
            "Fetcher and valuation seasons differ"
        );
    }

    Ok(())
}
