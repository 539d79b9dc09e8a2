//! Unit-of-work types for ledger writes
//!
//! The store locks the user and player rows, hands a [`TradeSnapshot`] to a
//! planner, and applies the returned [`TradePlan`] inside the same database
//! transaction. A [`TradeRejection`] rolls everything back.

use crate::models::{Player, Position, TradeSide, User};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Locked state visible to a trade planner
#[derive(Debug, Clone)]
pub struct TradeSnapshot {
    pub user: Option<User>,
    pub player: Option<Player>,
    pub position: Option<Position>,
}

/// Writes to apply for one accepted trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradePlan {
    pub side: TradeSide,
    pub quantity: i64,
    pub price: Decimal,
    /// Added to the user's currency (negative for buys)
    pub currency_delta: Decimal,
    /// Added to the player's remaining capacity
    pub capacity_delta: i64,
}

/// Business-rule refusals raised while planning a trade
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TradeRejection {
    #[error("user {user_id} not found")]
    UserNotFound { user_id: i64 },

    #[error("player {player_id} not found")]
    PlayerNotFound { player_id: i64 },

    #[error("quantity must be positive, got {quantity}")]
    InvalidQuantity { quantity: i64 },

    #[error("insufficient funds: cost {cost}, balance {balance}")]
    InsufficientFunds { cost: Decimal, balance: Decimal },

    #[error("capacity exceeded: requested {requested}, remaining {remaining}")]
    CapacityExceeded { requested: i64, remaining: i64 },

    #[error("user {user_id} holds no position in player {player_id}")]
    NoPosition { user_id: i64, player_id: i64 },

    #[error("quantity {requested} exceeds held position {held}")]
    QuantityExceedsPosition { requested: i64, held: i64 },
}

/// Decides, from locked state, what a trade writes
pub type TradePlanner<'a> =
    &'a (dyn Fn(&TradeSnapshot) -> Result<TradePlan, TradeRejection> + Send + Sync);
