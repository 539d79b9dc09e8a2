//! TradingLedger implementation

use crate::config::LedgerConfig;
use crate::trade::{plan_buy, plan_sell};
use crate::{LedgerError, Result};
use market_store::{
    replay_positions, CatalogRepository, LedgerRepository, Player, Position, PositionFilter,
    PricePoint, PriceRange, TradeSnapshot, Transaction, TransactionFilter, UserRepository,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Result of checking one user's balance and positions against the log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerAudit {
    pub user_id: i64,
    pub starting_balance: Decimal,
    pub expected_balance: Decimal,
    pub actual_balance: Decimal,
    pub replayed_positions: Vec<Position>,
    pub stored_positions: Vec<Position>,
}

impl LedgerAudit {
    pub fn is_consistent(&self) -> bool {
        self.expected_balance == self.actual_balance
            && self.replayed_positions == self.stored_positions
    }
}

/// Buy, sell and position queries over the transaction log
#[derive(Clone)]
pub struct TradingLedger {
    ledger: Arc<dyn LedgerRepository>,
    catalog: Arc<dyn CatalogRepository>,
    users: Arc<dyn UserRepository>,
    config: LedgerConfig,
}

impl TradingLedger {
    pub fn new(
        ledger: Arc<dyn LedgerRepository>,
        catalog: Arc<dyn CatalogRepository>,
        users: Arc<dyn UserRepository>,
        config: LedgerConfig,
    ) -> Self {
        Self { ledger, catalog, users, config }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Buy `quantity` units at the current value
    pub async fn buy(&self, user_id: i64, player_id: i64, quantity: i64) -> Result<Transaction> {
        if quantity <= 0 {
            return Err(LedgerError::InvalidQuantity { quantity });
        }

        let reserve = self.config.reserve_capacity_on_buy;
        let planner = move |snapshot: &TradeSnapshot| {
            plan_buy(snapshot, user_id, player_id, quantity, reserve)
        };

        let transaction = match self.ledger.execute_trade(user_id, player_id, &planner).await {
            Ok(transaction) => transaction,
            Err(e) => {
                let err = LedgerError::from(e);
                warn!(user_id, player_id, quantity, code = err.code(), "Buy refused: {}", err);
                return Err(err);
            }
        };

        info!(
            user_id,
            player_id,
            quantity,
            price = %transaction.price,
            transaction_id = transaction.id,
            "Buy executed"
        );
        Ok(transaction)
    }

    /// Sell `quantity` held units at the current value and return the proceeds
    pub async fn sell(&self, user_id: i64, player_id: i64, quantity: i64) -> Result<Decimal> {
        if quantity <= 0 {
            return Err(LedgerError::InvalidQuantity { quantity });
        }

        let reserve = self.config.reserve_capacity_on_buy;
        let planner = move |snapshot: &TradeSnapshot| {
            plan_sell(snapshot, user_id, player_id, quantity, reserve)
        };

        let transaction = match self.ledger.execute_trade(user_id, player_id, &planner).await {
            Ok(transaction) => transaction,
            Err(e) => {
                let err = LedgerError::from(e);
                warn!(user_id, player_id, quantity, code = err.code(), "Sell refused: {}", err);
                return Err(err);
            }
        };

        let proceeds = transaction.cash_impact();
        info!(
            user_id,
            player_id,
            quantity,
            price = %transaction.price,
            proceeds = %proceeds,
            transaction_id = transaction.id,
            "Sell executed"
        );
        Ok(proceeds)
    }

    pub async fn get_positions(&self, filter: PositionFilter) -> Result<Vec<Position>> {
        Ok(self.ledger.list_positions(filter).await?)
    }

    pub async fn get_position(&self, user_id: i64, player_id: i64) -> Result<Option<Position>> {
        Ok(self.ledger.get_position(user_id, player_id).await?)
    }

    /// Current price of a player
    pub async fn get_value(&self, player_id: i64) -> Result<Decimal> {
        self.catalog
            .get_player(player_id)
            .await?
            .map(|player| player.value)
            .ok_or(LedgerError::PlayerNotFound { player_id })
    }

    pub async fn get_player(&self, player_id: i64) -> Result<Player> {
        self.catalog
            .get_player(player_id)
            .await?
            .ok_or(LedgerError::PlayerNotFound { player_id })
    }

    pub async fn get_player_by_slug(&self, slug: &str) -> Result<Option<Player>> {
        Ok(self.catalog.get_player_by_slug(slug).await?)
    }

    /// Known players among `ids`; unknown ids are left out
    pub async fn get_players(&self, ids: &[i64]) -> Result<Vec<Player>> {
        Ok(self.catalog.get_players_by_ids(ids).await?)
    }

    pub async fn price_history(&self, player_id: i64, range: PriceRange) -> Result<Vec<PricePoint>> {
        if self.catalog.get_player(player_id).await?.is_none() {
            return Err(LedgerError::PlayerNotFound { player_id });
        }
        Ok(self.catalog.price_history(player_id, range).await?)
    }

    pub async fn get_transaction(&self, transaction_id: i64) -> Result<Option<Transaction>> {
        Ok(self.ledger.get_transaction(transaction_id).await?)
    }

    pub async fn get_transactions(&self, filter: TransactionFilter) -> Result<Vec<Transaction>> {
        Ok(self.ledger.list_transactions(filter).await?)
    }

    /// Replay a user's log and compare it with the stored balance and positions
    pub async fn audit_user(&self, user_id: i64, starting_balance: Decimal) -> Result<LedgerAudit> {
        let user = self
            .users
            .get_user(user_id)
            .await?
            .ok_or(LedgerError::UserNotFound { user_id })?;

        let transactions = self.ledger.list_transactions(TransactionFilter::User(user_id)).await?;
        let expected_balance = transactions
            .iter()
            .fold(starting_balance, |balance, t| balance + t.cash_impact());

        let replayed_positions = replay_positions(&transactions);
        let mut stored_positions = self.ledger.list_positions(PositionFilter::User(user_id)).await?;
        stored_positions.sort_by_key(|p| p.player_id);

        let audit = LedgerAudit {
            user_id,
            starting_balance,
            expected_balance,
            actual_balance: user.currency,
            replayed_positions,
            stored_positions,
        };
        if !audit.is_consistent() {
            warn!(
                user_id,
                expected = %audit.expected_balance,
                actual = %audit.actual_balance,
                "Ledger audit found a mismatch"
            );
        }
        Ok(audit)
    }
}
