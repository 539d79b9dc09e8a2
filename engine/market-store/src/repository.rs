//! Store boundaries consumed by the fetcher, value engine and ledger

use crate::models::*;
use crate::trade::TradePlanner;
use crate::Result;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// NBA statistics persistence
#[async_trait::async_trait]
pub trait StatsRepository: Send + Sync {
    /// Insert or update an external player identity
    async fn upsert_player(&self, player: &ExternalPlayer) -> Result<()>;

    async fn get_external_player(&self, external_id: i64) -> Result<Option<ExternalPlayer>>;

    /// Insert or update keyed by (external id, season)
    async fn save_season_stats(&self, stats: &SeasonStats) -> Result<()>;

    /// Insert or update keyed by (external id, week end)
    async fn save_weekly_stats(&self, stats: &WeeklyStats) -> Result<()>;

    /// Insert or update keyed by (external id, per mode)
    async fn save_career_stats(&self, stats: &CareerStats) -> Result<()>;

    /// All rows or none
    async fn batch_save_season_stats(&self, stats: &[SeasonStats]) -> Result<()>;

    /// All rows or none
    async fn batch_save_weekly_stats(&self, stats: &[WeeklyStats]) -> Result<()>;

    /// All rows or none
    async fn batch_save_career_stats(&self, stats: &[CareerStats]) -> Result<()>;

    async fn get_season_stats(&self, external_id: i64, season: &str) -> Result<Option<SeasonStats>>;

    /// Most recent trailing-window row for a player
    async fn get_latest_weekly_stats(&self, external_id: i64) -> Result<Option<WeeklyStats>>;

    async fn get_career_stats(
        &self,
        external_id: i64,
        per_mode: PerMode,
    ) -> Result<Option<CareerStats>>;

    /// Season, latest weekly and both career rows in one read
    async fn player_stats(&self, external_id: i64, season: &str) -> Result<PlayerStats> {
        Ok(PlayerStats {
            season: self.get_season_stats(external_id, season).await?,
            latest_weekly: self.get_latest_weekly_stats(external_id).await?,
            career_per_game: self.get_career_stats(external_id, PerMode::PerGame).await?,
            career_totals: self.get_career_stats(external_id, PerMode::Totals).await?,
        })
    }
}

/// Tradeable player catalog
#[async_trait::async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn get_player(&self, player_id: i64) -> Result<Option<Player>>;

    async fn get_player_by_slug(&self, slug: &str) -> Result<Option<Player>>;

    /// Players for the ids that exist, ordered by id
    async fn get_players_by_ids(&self, ids: &[i64]) -> Result<Vec<Player>>;

    async fn list_players(&self) -> Result<Vec<Player>>;

    async fn list_player_ids(&self) -> Result<Vec<i64>>;

    async fn external_id_for(&self, player_id: i64) -> Result<Option<i64>>;

    async fn player_id_for_external(&self, external_id: i64) -> Result<Option<i64>>;

    /// Create a player and its external mapping together
    async fn create_mapped_player(&self, player: &NewPlayer, external_id: i64) -> Result<Player>;

    /// Set many values at once and record a price history point for each.
    /// Returns the number of players updated.
    async fn update_values(&self, values: &HashMap<i64, Decimal>) -> Result<u64>;

    async fn price_history(&self, player_id: i64, range: PriceRange) -> Result<Vec<PricePoint>>;
}

#[async_trait::async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_user(&self, user_id: i64) -> Result<Option<User>>;

    async fn create_user(&self, user: &NewUser) -> Result<User>;
}

/// Transaction log and derived positions
#[async_trait::async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Run one trade as a single unit of work: lock user and player, plan,
    /// append the transaction, adjust currency and capacity, refresh positions.
    async fn execute_trade(
        &self,
        user_id: i64,
        player_id: i64,
        planner: TradePlanner<'_>,
    ) -> Result<Transaction>;

    async fn get_position(&self, user_id: i64, player_id: i64) -> Result<Option<Position>>;

    async fn list_positions(&self, filter: PositionFilter) -> Result<Vec<Position>>;

    async fn get_transaction(&self, transaction_id: i64) -> Result<Option<Transaction>>;

    /// Ordered by id
    async fn list_transactions(&self, filter: TransactionFilter) -> Result<Vec<Transaction>>;

    /// Recompute the positions view from the full log
    async fn refresh_positions(&self) -> Result<()>;
}

/// Load a catalog player with its stats for `season`. Unmapped players come
/// back with empty stats.
pub async fn player_with_stats(
    catalog: &dyn CatalogRepository,
    stats: &dyn StatsRepository,
    player_id: i64,
    season: &str,
) -> Result<Option<PlayerWithStats>> {
    let Some(player) = catalog.get_player(player_id).await? else {
        return Ok(None);
    };

    let Some(external_id) = catalog.external_id_for(player_id).await? else {
        return Ok(Some(PlayerWithStats { player, external: None, stats: PlayerStats::default() }));
    };

    Ok(Some(PlayerWithStats {
        player,
        external: stats.get_external_player(external_id).await?,
        stats: stats.player_stats(external_id, season).await?,
    }))
}
