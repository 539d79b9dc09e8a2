//! Error types for the trading ledger

use market_store::{StoreError, TradeRejection};
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("User not found: {user_id}")]
    UserNotFound { user_id: i64 },

    #[error("Player not found: {player_id}")]
    PlayerNotFound { player_id: i64 },

    #[error("Quantity must be positive, got {quantity}")]
    InvalidQuantity { quantity: i64 },

    #[error("Insufficient funds: cost {cost}, balance {balance}")]
    InsufficientFunds { cost: Decimal, balance: Decimal },

    #[error("Capacity exceeded: requested {requested}, remaining {remaining}")]
    CapacityExceeded { requested: i64, remaining: i64 },

    #[error("User {user_id} holds no position in player {player_id}")]
    NoPosition { user_id: i64, player_id: i64 },

    #[error("Quantity {requested} exceeds held position {held}")]
    QuantityExceedsPosition { requested: i64, held: i64 },

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl LedgerError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::UserNotFound { .. } => "USER_NOT_FOUND",
            LedgerError::PlayerNotFound { .. } => "PLAYER_NOT_FOUND",
            LedgerError::InvalidQuantity { .. } => "QUANTITY_INVALID",
            LedgerError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            LedgerError::CapacityExceeded { .. } => "CAPACITY_EXCEEDED",
            LedgerError::NoPosition { .. } => "NO_POSITION",
            LedgerError::QuantityExceedsPosition { .. } => "QUANTITY_EXCEEDS_POSITION",
            LedgerError::Store(_) | LedgerError::Internal { .. } => "INTERNAL",
        }
    }

    /// True when the caller can fix the request; false for server-side failures
    pub fn is_client_error(&self) -> bool {
        !matches!(self, LedgerError::Store(_) | LedgerError::Internal { .. })
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }
}

impl From<TradeRejection> for LedgerError {
    fn from(rejection: TradeRejection) -> Self {
        match rejection {
            TradeRejection::UserNotFound { user_id } => Self::UserNotFound { user_id },
            TradeRejection::PlayerNotFound { player_id } => Self::PlayerNotFound { player_id },
            TradeRejection::InvalidQuantity { quantity } => Self::InvalidQuantity { quantity },
            TradeRejection::InsufficientFunds { cost, balance } => {
                Self::InsufficientFunds { cost, balance }
            }
            TradeRejection::CapacityExceeded { requested, remaining } => {
                Self::CapacityExceeded { requested, remaining }
            }
            TradeRejection::NoPosition { user_id, player_id } => {
                Self::NoPosition { user_id, player_id }
            }
            TradeRejection::QuantityExceedsPosition { requested, held } => {
                Self::QuantityExceedsPosition { requested, held }
            }
        }
    }
}

impl From<StoreError> for LedgerError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Rejected(rejection) => rejection.into(),
            StoreError::UserNotFound { user_id } => Self::UserNotFound { user_id },
            StoreError::PlayerNotFound { player_id } => Self::PlayerNotFound { player_id },
            other => Self::Store(other),
        }
    }
}
