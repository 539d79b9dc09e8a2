//! NBA Stats Fetcher
//!
//! Fetches rosters, game logs and career lines from the NBA stats API, aggregates
//! them into season and trailing-window stat lines, and stores them through the
//! market store. Also seeds the tradeable catalog from qualifying players.

pub mod aggregation;
pub mod client;
pub mod config;
pub mod error;
pub mod ingestion;
pub mod models;
pub mod provider;

pub use client::NbaStatsClient;
pub use config::FetcherConfig;
pub use error::FetcherError;
pub use ingestion::StatsIngestor;
pub use models::*;
pub use provider::StatsProvider;

pub type Result<T> = std::result::Result<T, FetcherError>;
