//! Value Engine
//!
//! Turns season and career stats plus market demand into a two-decimal player
//! price, and sweeps the catalog on a bounded worker pool, committing every
//! successful valuation in a single write.

pub mod calculator;
pub mod config;
pub mod engine;
pub mod error;

pub use calculator::{smoothstep, ValueBreakdown, ValueCalculator};
pub use config::{ValuationConfig, ValueWeights};
pub use engine::{PlayerValuation, ValuationSummary, ValueEngine};
pub use error::ValueEngineError;

pub type Result<T> = std::result::Result<T, ValueEngineError>;
