//! Error types for the stats fetcher

use market_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetcherError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Stats API returned {status} for {endpoint}")]
    Status { endpoint: String, status: u16 },

    #[error("Malformed stats payload: {message}")]
    Parse { message: String },

    #[error("Stats request timed out after {secs}s: {operation}")]
    Timeout { operation: String, secs: u64 },

    #[error("Provider error: {message}")]
    Provider { message: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl FetcherError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse { message: message.into() }
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider { message: message.into() }
    }
}
