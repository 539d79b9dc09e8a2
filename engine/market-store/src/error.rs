//! Error types for the market store

use crate::trade::TradeRejection;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Player not found: {player_id}")]
    PlayerNotFound { player_id: i64 },

    #[error("User not found: {user_id}")]
    UserNotFound { user_id: i64 },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Invalid record: {message}")]
    InvalidRecord { message: String },

    #[error("Corrupt row: {message}")]
    CorruptRow { message: String },

    /// A trade plan was refused inside the unit of work; nothing was written.
    #[error("Trade rejected: {0}")]
    Rejected(#[from] TradeRejection),

    #[error("Store unavailable: {message}")]
    Unavailable { message: String },
}

impl StoreError {
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict { message: message.into() }
    }

    pub fn invalid_record(message: impl Into<String>) -> Self {
        Self::InvalidRecord { message: message.into() }
    }

    pub fn corrupt_row(message: impl Into<String>) -> Self {
        Self::CorruptRow { message: message.into() }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable { message: message.into() }
    }
}
