//! Trading Ledger
//!
//! Executes buys and sells at the current player value as single units of work
//! against the market store, keeps currency and capacity consistent with the
//! append-only transaction log, and answers position and value queries.

pub mod config;
pub mod error;
pub mod ledger;
pub mod trade;

pub use config::LedgerConfig;
pub use error::LedgerError;
pub use ledger::{LedgerAudit, TradingLedger};
pub use trade::{plan_buy, plan_sell};

pub type Result<T> = std::result::Result<T, LedgerError>;
