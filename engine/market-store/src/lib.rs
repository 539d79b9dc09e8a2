//! MarketStore - Relational store for the NBA player market
//!
//! This crate owns the schema and every read/write the rest of the system makes:
//! NBA statistics, the external-id mapping, the tradeable player catalog, users,
//! the append-only transaction log and the derived positions view. Consumers
//! depend on the repository traits so they can run against [`memory::MemoryStore`]
//! in tests and [`postgres::PgStore`] in production.

pub mod config;
pub mod error;
pub mod memory;
pub mod models;
pub mod position;
pub mod postgres;
pub mod repository;
pub mod slug;
pub mod trade;
mod validation;

pub use config::DatabaseConfig;
pub use error::StoreError;
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use repository::{
    player_with_stats, CatalogRepository, LedgerRepository, StatsRepository, UserRepository,
};
pub use slug::slugify;

// Re-export commonly used types
pub use models::{
    CareerStats, ExternalPlayer, NewPlayer, NewUser, PerMode, Player, PlayerExternalMapping,
    PlayerStats, PlayerWithStats, Position, PositionFilter, PricePoint, PriceRange, SeasonStats,
    StatLine, TradeSide, Transaction, TransactionFilter, User, WeeklyStats,
};
pub use position::{replay_positions, Holding};
pub use trade::{TradePlan, TradePlanner, TradeRejection, TradeSnapshot};

// Result type alias
pub type Result<T> = std::result::Result<T, StoreError>;
