//! In-memory store used by tests and dry runs
//!
//! Every trait method takes one lock over the whole state, so each call is
//! atomic the same way a single database transaction is.

use crate::models::*;
use crate::position::replay_positions;
use crate::repository::{CatalogRepository, LedgerRepository, StatsRepository, UserRepository};
use crate::trade::{TradePlanner, TradeSnapshot};
use crate::validation::{validate_career, validate_line};
use crate::{Result, StoreError};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct MemoryState {
    external_players: HashMap<i64, ExternalPlayer>,
    season_stats: HashMap<(i64, String), SeasonStats>,
    weekly_stats: HashMap<(i64, NaiveDate), WeeklyStats>,
    career_stats: HashMap<(i64, PerMode), CareerStats>,
    players: BTreeMap<i64, Player>,
    // player id -> external id
    mappings: HashMap<i64, i64>,
    users: BTreeMap<i64, User>,
    transactions: Vec<Transaction>,
    positions: BTreeMap<(i64, i64), Position>,
    price_history: Vec<PricePoint>,
    next_player_id: i64,
    next_user_id: i64,
    next_transaction_id: i64,
    unavailable_external_ids: HashSet<i64>,
}

impl MemoryState {
    fn refresh_positions(&mut self) {
        self.positions = replay_positions(&self.transactions)
            .into_iter()
            .map(|p| ((p.user_id, p.player_id), p))
            .collect();
    }

    fn check_readable(&self, external_id: i64) -> Result<()> {
        if self.unavailable_external_ids.contains(&external_id) {
            return Err(StoreError::unavailable(format!(
                "stats for external id {external_id} are unreadable"
            )));
        }
        Ok(())
    }
}

/// Store holding everything in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a catalog player without a mapping
    pub async fn insert_player(&self, player: &NewPlayer) -> Player {
        let mut state = self.state.lock().await;
        state.next_player_id += 1;
        let created = Player {
            id: state.next_player_id,
            name: player.name.clone(),
            slug: player.slug.clone(),
            value: player.value,
            total_capacity: player.capacity,
            remaining_capacity: player.capacity,
        };
        state.players.insert(created.id, created.clone());
        created
    }

    pub async fn insert_mapping(&self, player_id: i64, external_id: i64) {
        self.state.lock().await.mappings.insert(player_id, external_id);
    }

    /// Overwrite a player's current value without recording history
    pub async fn set_value(&self, player_id: i64, value: Decimal) {
        if let Some(player) = self.state.lock().await.players.get_mut(&player_id) {
            player.value = value;
        }
    }

    /// Make stats reads for one external id fail
    pub async fn make_stats_unavailable(&self, external_id: i64) {
        self.state.lock().await.unavailable_external_ids.insert(external_id);
    }

    pub async fn transaction_count(&self) -> usize {
        self.state.lock().await.transactions.len()
    }

    pub async fn season_stats_count(&self) -> usize {
        self.state.lock().await.season_stats.len()
    }

    pub async fn weekly_stats_count(&self) -> usize {
        self.state.lock().await.weekly_stats.len()
    }

    pub async fn career_stats_count(&self) -> usize {
        self.state.lock().await.career_stats.len()
    }
}

#[async_trait::async_trait]
impl StatsRepository for MemoryStore {
    async fn upsert_player(&self, player: &ExternalPlayer) -> Result<()> {
        self.state.lock().await.external_players.insert(player.id, player.clone());
        Ok(())
    }

    async fn get_external_player(&self, external_id: i64) -> Result<Option<ExternalPlayer>> {
        Ok(self.state.lock().await.external_players.get(&external_id).cloned())
    }

    async fn save_season_stats(&self, stats: &SeasonStats) -> Result<()> {
        self.batch_save_season_stats(std::slice::from_ref(stats)).await
    }

    async fn save_weekly_stats(&self, stats: &WeeklyStats) -> Result<()> {
        self.batch_save_weekly_stats(std::slice::from_ref(stats)).await
    }

    async fn save_career_stats(&self, stats: &CareerStats) -> Result<()> {
        self.batch_save_career_stats(std::slice::from_ref(stats)).await
    }

    async fn batch_save_season_stats(&self, stats: &[SeasonStats]) -> Result<()> {
        for record in stats {
            validate_line(record.external_id, &record.line)?;
        }
        let mut state = self.state.lock().await;
        for record in stats {
            state
                .season_stats
                .insert((record.external_id, record.season.clone()), record.clone());
        }
        Ok(())
    }

    async fn batch_save_weekly_stats(&self, stats: &[WeeklyStats]) -> Result<()> {
        for record in stats {
            validate_line(record.external_id, &record.line)?;
        }
        let mut state = self.state.lock().await;
        for record in stats {
            state.weekly_stats.insert((record.external_id, record.week_end), record.clone());
        }
        Ok(())
    }

    async fn batch_save_career_stats(&self, stats: &[CareerStats]) -> Result<()> {
        for record in stats {
            validate_career(record)?;
        }
        let mut state = self.state.lock().await;
        for record in stats {
            state.career_stats.insert((record.external_id, record.per_mode), record.clone());
        }
        Ok(())
    }

    async fn get_season_stats(&self, external_id: i64, season: &str) -> Result<Option<SeasonStats>> {
        let state = self.state.lock().await;
        state.check_readable(external_id)?;
        Ok(state.season_stats.get(&(external_id, season.to_string())).cloned())
    }

    async fn get_latest_weekly_stats(&self, external_id: i64) -> Result<Option<WeeklyStats>> {
        let state = self.state.lock().await;
        state.check_readable(external_id)?;
        Ok(state
            .weekly_stats
            .values()
            .filter(|w| w.external_id == external_id)
            .max_by_key(|w| w.week_end)
            .cloned())
    }

    async fn get_career_stats(
        &self,
        external_id: i64,
        per_mode: PerMode,
    ) -> Result<Option<CareerStats>> {
        let state = self.state.lock().await;
        state.check_readable(external_id)?;
        Ok(state.career_stats.get(&(external_id, per_mode)).cloned())
    }
}

#[async_trait::async_trait]
impl CatalogRepository for MemoryStore {
    async fn get_player(&self, player_id: i64) -> Result<Option<Player>> {
        Ok(self.state.lock().await.players.get(&player_id).cloned())
    }

    async fn get_player_by_slug(&self, slug: &str) -> Result<Option<Player>> {
        let state = self.state.lock().await;
        Ok(state.players.values().find(|p| p.slug == slug).cloned())
    }

    async fn get_players_by_ids(&self, ids: &[i64]) -> Result<Vec<Player>> {
        let wanted: HashSet<i64> = ids.iter().copied().collect();
        let state = self.state.lock().await;
        Ok(state.players.values().filter(|p| wanted.contains(&p.id)).cloned().collect())
    }

    async fn list_players(&self) -> Result<Vec<Player>> {
        Ok(self.state.lock().await.players.values().cloned().collect())
    }

    async fn list_player_ids(&self) -> Result<Vec<i64>> {
        Ok(self.state.lock().await.players.keys().copied().collect())
    }

    async fn external_id_for(&self, player_id: i64) -> Result<Option<i64>> {
        Ok(self.state.lock().await.mappings.get(&player_id).copied())
    }

    async fn player_id_for_external(&self, external_id: i64) -> Result<Option<i64>> {
        let state = self.state.lock().await;
        Ok(state
            .mappings
            .iter()
            .find(|(_, ext)| **ext == external_id)
            .map(|(player_id, _)| *player_id))
    }

    async fn create_mapped_player(&self, player: &NewPlayer, external_id: i64) -> Result<Player> {
        let mut state = self.state.lock().await;
        if state.mappings.values().any(|ext| *ext == external_id) {
            return Err(StoreError::conflict(format!("mapping for external id {external_id}")));
        }
        if state.players.values().any(|p| p.slug == player.slug) {
            return Err(StoreError::conflict("player slug already exists"));
        }

        state.next_player_id += 1;
        let created = Player {
            id: state.next_player_id,
            name: player.name.clone(),
            slug: player.slug.clone(),
            value: player.value,
            total_capacity: player.capacity,
            remaining_capacity: player.capacity,
        };
        state.players.insert(created.id, created.clone());
        state.mappings.insert(created.id, external_id);
        Ok(created)
    }

    async fn update_values(&self, values: &HashMap<i64, Decimal>) -> Result<u64> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let mut updated = 0u64;

        let mut ordered: Vec<(&i64, &Decimal)> = values.iter().collect();
        ordered.sort_by_key(|(id, _)| **id);
        for (player_id, value) in ordered {
            let Some(player) = state.players.get_mut(player_id) else {
                continue;
            };
            player.value = *value;
            state.price_history.push(PricePoint {
                player_id: *player_id,
                price: *value,
                recorded_at: now,
            });
            updated += 1;
        }
        Ok(updated)
    }

    async fn price_history(&self, player_id: i64, range: PriceRange) -> Result<Vec<PricePoint>> {
        let since = range.since(Utc::now());
        Ok(self
            .state
            .lock()
            .await
            .price_history
            .iter()
            .filter(|p| p.player_id == player_id && p.recorded_at >= since)
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl UserRepository for MemoryStore {
    async fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        Ok(self.state.lock().await.users.get(&user_id).cloned())
    }

    async fn create_user(&self, user: &NewUser) -> Result<User> {
        let mut state = self.state.lock().await;
        if state.users.values().any(|u| u.handle == user.handle || u.email == user.email) {
            return Err(StoreError::conflict("user handle or email already exists"));
        }
        if user.currency < Decimal::ZERO {
            return Err(StoreError::invalid_record("currency must not be negative"));
        }

        state.next_user_id += 1;
        let created = User {
            id: state.next_user_id,
            name: user.name.clone(),
            handle: user.handle.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            currency: user.currency,
        };
        state.users.insert(created.id, created.clone());
        Ok(created)
    }
}

#[async_trait::async_trait]
impl LedgerRepository for MemoryStore {
    async fn execute_trade(
        &self,
        user_id: i64,
        player_id: i64,
        planner: TradePlanner<'_>,
    ) -> Result<Transaction> {
        let mut state = self.state.lock().await;

        let snapshot = TradeSnapshot {
            user: state.users.get(&user_id).cloned(),
            player: state.players.get(&player_id).cloned(),
            position: state.positions.get(&(user_id, player_id)).cloned(),
        };
        let plan = planner(&snapshot)?;

        let (Some(user), Some(player)) = (snapshot.user, snapshot.player) else {
            return Err(StoreError::invalid_record("trade planned against a missing row"));
        };

        // Same constraints the schema enforces
        let currency = user.currency + plan.currency_delta;
        let remaining = player.remaining_capacity + plan.capacity_delta;
        if currency < Decimal::ZERO {
            return Err(StoreError::invalid_record("currency would go negative"));
        }
        if remaining < 0 {
            return Err(StoreError::invalid_record("remaining capacity would go negative"));
        }
        if plan.quantity <= 0 {
            return Err(StoreError::invalid_record("quantity must be positive"));
        }

        state.next_transaction_id += 1;
        let transaction = Transaction {
            id: state.next_transaction_id,
            user_id,
            player_id,
            side: plan.side,
            quantity: plan.quantity,
            price: plan.price,
            executed_at: Utc::now(),
        };
        state.transactions.push(transaction.clone());

        if let Some(user) = state.users.get_mut(&user_id) {
            user.currency = currency;
        }
        if let Some(player) = state.players.get_mut(&player_id) {
            player.remaining_capacity = remaining;
        }
        state.refresh_positions();

        Ok(transaction)
    }

    async fn get_position(&self, user_id: i64, player_id: i64) -> Result<Option<Position>> {
        Ok(self.state.lock().await.positions.get(&(user_id, player_id)).cloned())
    }

    async fn list_positions(&self, filter: PositionFilter) -> Result<Vec<Position>> {
        let state = self.state.lock().await;
        Ok(state
            .positions
            .values()
            .filter(|p| match filter {
                PositionFilter::All => true,
                PositionFilter::User(id) => p.user_id == id,
                PositionFilter::Player(id) => p.player_id == id,
            })
            .cloned()
            .collect())
    }

    async fn get_transaction(&self, transaction_id: i64) -> Result<Option<Transaction>> {
        let state = self.state.lock().await;
        Ok(state.transactions.iter().find(|t| t.id == transaction_id).cloned())
    }

    async fn list_transactions(&self, filter: TransactionFilter) -> Result<Vec<Transaction>> {
        let state = self.state.lock().await;
        Ok(state
            .transactions
            .iter()
            .filter(|t| match filter {
                TransactionFilter::All => true,
                TransactionFilter::User(id) => t.user_id == id,
                TransactionFilter::Player(id) => t.player_id == id,
            })
            .cloned()
            .collect())
    }

    async fn refresh_positions(&self) -> Result<()> {
        self.state.lock().await.refresh_positions();
        Ok(())
    }
}
