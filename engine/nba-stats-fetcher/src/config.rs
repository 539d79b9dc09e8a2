use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the NBA stats fetcher
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Stats API base URL
    pub base_url: String,

    /// Current season (e.g., "2025-26")
    pub season: String,

    /// Deadline for a single upstream call, in seconds
    pub request_timeout_secs: u64,

    /// Upstream request budget
    pub requests_per_minute: u32,

    /// Records written per store transaction
    pub batch_size: usize,

    /// Trailing window length for weekly stats, in days
    pub weekly_window_days: i64,

    /// Minimum games played for a player to be seeded into the catalog
    pub seed_min_games: i32,

    /// Units available per seeded player
    pub initial_capacity: i64,

    /// Seed value per point-per-game
    pub initial_value_per_point: f64,

    /// Lowest seed value
    pub initial_value_floor: f64,

    /// Progress is logged every this many players
    pub progress_every: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            base_url: "https://stats.nba.com/stats".to_string(),
            season: "2025-26".to_string(),
            request_timeout_secs: 30,
            requests_per_minute: 300,
            batch_size: 50,
            weekly_window_days: 7,
            seed_min_games: 10,
            initial_capacity: 10,
            initial_value_per_point: 10.0,
            initial_value_floor: 10.0,
            progress_every: 50,
        }
    }
}

impl FetcherConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(season) = std::env::var("NBA_SEASON") {
            config.season = season;
        }

        if let Ok(url) = std::env::var("NBA_STATS_BASE_URL") {
            config.base_url = url;
        }

        if let Ok(rpm) = std::env::var("NBA_STATS_REQUESTS_PER_MINUTE") {
            config.requests_per_minute = rpm.parse().unwrap_or(config.requests_per_minute);
        }

        config
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
