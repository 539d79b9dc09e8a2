use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Valuation formula parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueWeights {
    // Season per-game weights
    pub season_ppg: f64,
    pub season_apg: f64,
    pub season_rpg: f64,
    pub season_spg: f64,
    pub season_bpg: f64,

    // Career total weights
    pub career_points: f64,
    pub career_rebounds: f64,
    pub career_assists: f64,
    pub career_steals: f64,
    pub career_blocks: f64,
    pub career_minutes: f64,

    pub season_mult: f64,
    pub career_mult: f64,

    /// Maximum extra price fraction at full demand
    pub demand_scaling: f64,

    /// Season line only counts above this many games
    pub min_games_played: i32,

    /// Value floor
    pub min_value: f64,
}

impl Default for ValueWeights {
    fn default() -> Self {
        Self {
            season_ppg: 1.0,
            season_apg: 2.0,
            season_rpg: 2.0,
            season_spg: 3.0,
            season_bpg: 3.0,

            career_points: 0.001,
            career_rebounds: 0.002,
            career_assists: 0.002,
            career_steals: 0.0025,
            career_blocks: 0.0025,
            career_minutes: 0.00001,

            season_mult: 1.0,
            career_mult: 1.0,

            demand_scaling: 0.4,
            min_games_played: 10,
            min_value: 10.0,
        }
    }
}

/// Configuration for the value engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuationConfig {
    /// Season whose stats drive the season component (e.g., "2025-26")
    pub season: String,

    /// Concurrent valuation workers
    pub workers: usize,

    /// Deadline for valuing a single player, in seconds
    pub player_timeout_secs: u64,

    pub weights: ValueWeights,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            season: "2025-26".to_string(),
            workers: 10,
            player_timeout_secs: 30,
            weights: ValueWeights::default(),
        }
    }
}

impl ValuationConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(season) = std::env::var("NBA_SEASON") {
            config.season = season;
        }

        if let Ok(workers) = std::env::var("VALUATION_WORKERS") {
            config.workers = workers.parse().unwrap_or(config.workers);
        }

        config
    }

    pub fn player_timeout(&self) -> Duration {
        Duration::from_secs(self.player_timeout_secs)
    }
}
