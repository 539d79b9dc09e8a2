//! Rows persisted by the market store

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A tradeable player in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Player {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub value: Decimal,
    pub total_capacity: i64,
    pub remaining_capacity: i64,
}

impl Player {
    /// Fraction of capacity consumed, clamped to [0, 1]
    pub fn demand(&self) -> f64 {
        if self.total_capacity <= 0 {
            return 0.0;
        }
        let consumed = (self.total_capacity - self.remaining_capacity) as f64;
        (consumed / self.total_capacity as f64).clamp(0.0, 1.0)
    }
}

/// Catalog entry to be created by seeding
#[derive(Debug, Clone, PartialEq)]
pub struct NewPlayer {
    pub name: String,
    pub slug: String,
    pub value: Decimal,
    pub capacity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub handle: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub currency: Decimal,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub handle: String,
    pub email: String,
    pub password_hash: String,
    pub currency: Decimal,
}

/// Player identity as reported by the stats provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ExternalPlayer {
    pub id: i64,
    pub full_name: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PlayerExternalMapping {
    pub player_id: i64,
    pub external_id: i64,
}

/// Counting totals and per-game averages over some window of games
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct StatLine {
    pub games_played: i32,
    pub total_points: i64,
    pub total_rebounds: i64,
    pub total_assists: i64,
    pub total_steals: i64,
    pub total_blocks: i64,
    pub points_per_game: f64,
    pub rebounds_per_game: f64,
    pub assists_per_game: f64,
    pub steals_per_game: f64,
    pub blocks_per_game: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SeasonStats {
    pub external_id: i64,
    pub season: String,
    #[sqlx(flatten)]
    pub line: StatLine,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct WeeklyStats {
    pub external_id: i64,
    pub season: String,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    #[sqlx(flatten)]
    pub line: StatLine,
}

/// Which flavour of career numbers a row holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PerMode {
    PerGame,
    Totals,
}

impl PerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PerMode::PerGame => "PerGame",
            PerMode::Totals => "Totals",
        }
    }
}

impl fmt::Display for PerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PerGame" => Ok(PerMode::PerGame),
            "Totals" => Ok(PerMode::Totals),
            other => Err(format!("unknown per mode: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CareerStats {
    pub external_id: i64,
    pub per_mode: PerMode,
    pub games_played: i32,
    pub minutes: f64,
    pub points: f64,
    pub rebounds: f64,
    pub assists: f64,
    pub steals: f64,
    pub blocks: f64,
    pub fg_pct: f64,
    pub fg3_pct: f64,
    pub ft_pct: f64,
}

/// Every stored stats row for one external player
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub season: Option<SeasonStats>,
    pub latest_weekly: Option<WeeklyStats>,
    pub career_per_game: Option<CareerStats>,
    pub career_totals: Option<CareerStats>,
}

/// A catalog player joined to its external identity and stats
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerWithStats {
    pub player: Player,
    pub external: Option<ExternalPlayer>,
    pub stats: PlayerStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "BUY",
            TradeSide::Sell => "SELL",
        }
    }
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY" => Ok(TradeSide::Buy),
            "SELL" => Ok(TradeSide::Sell),
            other => Err(format!("unknown trade side: {other}")),
        }
    }
}

/// Immutable ledger row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    pub player_id: i64,
    pub side: TradeSide,
    pub quantity: i64,
    pub price: Decimal,
    pub executed_at: DateTime<Utc>,
}

impl Transaction {
    /// Signed effect on the user's currency: negative for buys
    pub fn cash_impact(&self) -> Decimal {
        let gross = self.price * Decimal::from(self.quantity);
        match self.side {
            TradeSide::Buy => -gross,
            TradeSide::Sell => gross,
        }
    }

    /// Signed effect on the held quantity
    pub fn position_impact(&self) -> i64 {
        match self.side {
            TradeSide::Buy => self.quantity,
            TradeSide::Sell => -self.quantity,
        }
    }
}

/// Row of the positions view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Position {
    pub user_id: i64,
    pub player_id: i64,
    pub quantity: i64,
    pub average_cost: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PositionFilter {
    #[default]
    All,
    User(i64),
    Player(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionFilter {
    #[default]
    All,
    User(i64),
    Player(i64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PricePoint {
    pub player_id: i64,
    pub price: Decimal,
    pub recorded_at: DateTime<Utc>,
}

/// Lookback window for price history queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PriceRange {
    #[serde(rename = "7d")]
    Week,
    #[default]
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "90d")]
    Quarter,
    #[serde(rename = "1y")]
    Year,
    #[serde(rename = "all")]
    All,
}

impl PriceRange {
    /// Unknown or empty input falls back to the 30 day window
    pub fn parse_or_default(raw: &str) -> Self {
        raw.parse().unwrap_or_default()
    }

    pub fn lookback(&self) -> Duration {
        match self {
            PriceRange::Week => Duration::days(7),
            PriceRange::Month => Duration::days(30),
            PriceRange::Quarter => Duration::days(90),
            PriceRange::Year => Duration::days(365),
            PriceRange::All => Duration::days(365 * 100),
        }
    }

    pub fn since(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.lookback()
    }
}

impl FromStr for PriceRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "7d" => Ok(PriceRange::Week),
            "30d" => Ok(PriceRange::Month),
            "90d" => Ok(PriceRange::Quarter),
            "1y" => Ok(PriceRange::Year),
            "all" => Ok(PriceRange::All),
            other => Err(format!("unknown price range: {other}")),
        }
    }
}
