//! Statistics provider boundary

use crate::models::{DateRange, GameLogEntry};
use crate::Result;
use market_store::{CareerStats, ExternalPlayer, PerMode};

/// Source of NBA rosters, game logs and career numbers
#[async_trait::async_trait]
pub trait StatsProvider: Send + Sync {
    /// Players on a current roster
    async fn list_active_players(&self) -> Result<Vec<ExternalPlayer>>;

    /// Regular season games, optionally narrowed to a date window
    async fn game_log(
        &self,
        external_id: i64,
        season: &str,
        range: Option<DateRange>,
    ) -> Result<Vec<GameLogEntry>>;

    /// Regular season career line in the requested flavour
    async fn career_totals(&self, external_id: i64, per_mode: PerMode) -> Result<CareerStats>;
}
