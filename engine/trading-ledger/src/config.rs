use serde::{Deserialize, Serialize};

/// Trading ledger configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Buys consume remaining capacity and sells release it up to the total.
    /// When off, buys only check capacity and sells release the sold quantity.
    pub reserve_capacity_on_buy: bool,
}

impl LedgerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(reserve) = std::env::var("LEDGER_RESERVE_CAPACITY_ON_BUY") {
            config.reserve_capacity_on_buy = reserve.parse().unwrap_or(config.reserve_capacity_on_buy);
        }

        config
    }
}
