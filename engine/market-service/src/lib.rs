//! NBA Market Service Library
//!
//! Wires the market store, stats fetcher, value engine, trading ledger and job
//! scheduler into one process: layered configuration, logging, signal-driven
//! shutdown and the nightly/weekly refresh jobs.

use anyhow::{Context, Result};

pub mod config;
pub mod logging;
pub mod service;
pub mod signals;

pub use config::ServiceConfig;
pub use logging::initialize_logging;
pub use service::{register_jobs, MarketService};
pub use signals::{graceful_shutdown, setup_signal_handlers};

/// Load configuration from files and environment variables
pub fn load_configuration() -> Result<ServiceConfig> {
    config::load_config().context("Failed to load service configuration")
}
