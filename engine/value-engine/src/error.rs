//! Error types for the value engine

use market_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValueEngineError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Player not found: {player_id}")]
    PlayerNotFound { player_id: i64 },

    #[error("Player {player_id} has no external stats mapping")]
    Unmapped { player_id: i64 },

    #[error("Valuation of player {player_id} timed out after {secs}s")]
    Timeout { player_id: i64, secs: u64 },
}
