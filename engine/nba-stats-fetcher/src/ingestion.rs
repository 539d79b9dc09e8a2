//! Stats ingestion: sweeps the provider and writes the stats store

use crate::aggregation::{aggregate_season, aggregate_window};
use crate::config::FetcherConfig;
use crate::models::{DateRange, IngestionSummary, SeedSummary};
use crate::provider::StatsProvider;
use crate::{FetcherError, Result};
use chrono::{NaiveDate, Utc};
use market_store::{
    slugify, CareerStats, CatalogRepository, ExternalPlayer, NewPlayer, PerMode, SeasonStats,
    StatsRepository, StoreError, WeeklyStats,
};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Records of one kind headed for a batch write
#[derive(Debug, Clone, Copy)]
enum StatsBatch<'a> {
    Season(&'a [SeasonStats]),
    Weekly(&'a [WeeklyStats]),
    Career(&'a [CareerStats]),
}

impl<'a> StatsBatch<'a> {
    fn len(&self) -> usize {
        match self {
            StatsBatch::Season(records) => records.len(),
            StatsBatch::Weekly(records) => records.len(),
            StatsBatch::Career(records) => records.len(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            StatsBatch::Season(_) => "season",
            StatsBatch::Weekly(_) => "weekly",
            StatsBatch::Career(_) => "career",
        }
    }

    fn chunks(&self, size: usize) -> Vec<StatsBatch<'a>> {
        let size = size.max(1);
        match *self {
            StatsBatch::Season(records) => records.chunks(size).map(StatsBatch::Season).collect(),
            StatsBatch::Weekly(records) => records.chunks(size).map(StatsBatch::Weekly).collect(),
            StatsBatch::Career(records) => records.chunks(size).map(StatsBatch::Career).collect(),
        }
    }
}

/// Pulls NBA stats from a provider into the store
pub struct StatsIngestor {
    provider: Arc<dyn StatsProvider>,
    stats: Arc<dyn StatsRepository>,
    catalog: Arc<dyn CatalogRepository>,
    config: FetcherConfig,
}

impl StatsIngestor {
    pub fn new(
        provider: Arc<dyn StatsProvider>,
        stats: Arc<dyn StatsRepository>,
        catalog: Arc<dyn CatalogRepository>,
        config: FetcherConfig,
    ) -> Self {
        Self { provider, stats, catalog, config }
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Run one provider call under the configured deadline
    async fn bounded<T>(
        &self,
        operation: impl Into<String>,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let deadline = self.config.request_timeout();
        match tokio::time::timeout(deadline, call).await {
            Ok(result) => result,
            Err(_) => Err(FetcherError::Timeout {
                operation: operation.into(),
                secs: deadline.as_secs(),
            }),
        }
    }

    async fn active_players(&self) -> Result<Vec<ExternalPlayer>> {
        let players =
            self.bounded("list active players", self.provider.list_active_players()).await?;
        info!("Fetched {} active players", players.len());
        Ok(players)
    }

    fn log_progress(&self, job: &str, index: usize, total: usize) {
        if self.config.progress_every > 0 && index % self.config.progress_every == 0 {
            info!(job, "Progress: {}/{} players", index, total);
        }
    }

    async fn fetch_season(&self, external_id: i64, season: &str) -> Result<SeasonStats> {
        let games = self
            .bounded(
                format!("game log for {external_id}"),
                self.provider.game_log(external_id, season, None),
            )
            .await?;
        Ok(aggregate_season(external_id, season, &games))
    }

    async fn fetch_window(
        &self,
        external_id: i64,
        season: &str,
        range: DateRange,
    ) -> Result<WeeklyStats> {
        let games = self
            .bounded(
                format!("windowed game log for {external_id}"),
                self.provider.game_log(external_id, season, Some(range)),
            )
            .await?;
        Ok(aggregate_window(external_id, season, range, &games))
    }

    async fn fetch_career(&self, external_id: i64, per_mode: PerMode) -> Result<CareerStats> {
        self.bounded(
            format!("{per_mode} career for {external_id}"),
            self.provider.career_totals(external_id, per_mode),
        )
        .await
    }

    async fn save_chunk(&self, chunk: StatsBatch<'_>) -> market_store::Result<()> {
        match chunk {
            StatsBatch::Season(records) => self.stats.batch_save_season_stats(records).await,
            StatsBatch::Weekly(records) => self.stats.batch_save_weekly_stats(records).await,
            StatsBatch::Career(records) => self.stats.batch_save_career_stats(records).await,
        }
    }

    /// Write in fixed-size transactions; a failed batch is logged and skipped
    async fn save_in_batches(&self, records: StatsBatch<'_>, summary: &mut IngestionSummary) {
        let total = records.len();
        for (index, chunk) in records.chunks(self.config.batch_size).into_iter().enumerate() {
            let rows = chunk.len();
            match self.save_chunk(chunk).await {
                Ok(()) => {
                    summary.saved += rows;
                    debug!(kind = records.kind(), batch = index, rows, "Saved batch");
                }
                Err(e) => {
                    summary.failed_batches += 1;
                    error!(kind = records.kind(), batch = index, rows, "Failed to save batch: {}", e);
                }
            }
        }
        info!(kind = records.kind(), saved = summary.saved, total, "Finished saving stats");
    }

    async fn register_player(&self, player: &ExternalPlayer) {
        if let Err(e) = self.stats.upsert_player(player).await {
            warn!(external_id = player.id, "Failed to upsert player identity: {}", e);
        }
    }

    /// Season stats for every active player
    pub async fn update_all_season_stats(&self, season: &str) -> Result<IngestionSummary> {
        let mut summary = IngestionSummary::new(format!("season-stats {season}"));
        let players = self.active_players().await?;
        summary.attempted = players.len();

        let mut records = Vec::new();
        for (index, player) in players.iter().enumerate() {
            self.log_progress("season-stats", index, players.len());
            self.register_player(player).await;

            match self.fetch_season(player.id, season).await {
                Ok(stats) if stats.line.games_played > 0 => records.push(stats),
                Ok(_) => summary.skipped_empty += 1,
                Err(e) => {
                    summary.failed += 1;
                    warn!(external_id = player.id, "Skipping {}: {}", player.full_name, e);
                }
            }
        }
        summary.fetched = records.len();

        self.save_in_batches(StatsBatch::Season(&records), &mut summary).await;
        Ok(summary.finish())
    }

    /// Trailing-window stats ending today
    pub async fn update_all_weekly_stats(&self, season: &str) -> Result<IngestionSummary> {
        self.update_all_weekly_stats_ending(season, Utc::now().date_naive()).await
    }

    /// Trailing-window stats ending on `end`
    pub async fn update_all_weekly_stats_ending(
        &self,
        season: &str,
        end: NaiveDate,
    ) -> Result<IngestionSummary> {
        let range = DateRange::trailing(end, self.config.weekly_window_days);
        let mut summary = IngestionSummary::new(format!("weekly-stats {season} {}", range.to));
        let players = self.active_players().await?;
        summary.attempted = players.len();

        let mut records = Vec::new();
        for (index, player) in players.iter().enumerate() {
            self.log_progress("weekly-stats", index, players.len());

            match self.fetch_window(player.id, season, range).await {
                Ok(stats) if stats.line.games_played > 0 => records.push(stats),
                Ok(_) => summary.skipped_empty += 1,
                Err(e) => {
                    summary.failed += 1;
                    warn!(external_id = player.id, "Skipping {}: {}", player.full_name, e);
                }
            }
        }
        summary.fetched = records.len();

        self.save_in_batches(StatsBatch::Weekly(&records), &mut summary).await;
        Ok(summary.finish())
    }

    /// Career lines, both per-game and totals, for every active player
    pub async fn update_all_career_stats(&self) -> Result<IngestionSummary> {
        let mut summary = IngestionSummary::new("career-stats");
        let players = self.active_players().await?;
        summary.attempted = players.len();

        let mut records = Vec::new();
        for (index, player) in players.iter().enumerate() {
            self.log_progress("career-stats", index, players.len());

            let totals = self.fetch_career(player.id, PerMode::Totals).await;
            let per_game = self.fetch_career(player.id, PerMode::PerGame).await;
            match (totals, per_game) {
                (Ok(totals), Ok(per_game)) if totals.games_played > 0 => {
                    records.push(totals);
                    records.push(per_game);
                }
                (Ok(_), Ok(_)) => summary.skipped_empty += 1,
                (Err(e), _) | (_, Err(e)) => {
                    summary.failed += 1;
                    warn!(external_id = player.id, "Skipping {}: {}", player.full_name, e);
                }
            }
        }
        summary.fetched = records.len();

        self.save_in_batches(StatsBatch::Career(&records), &mut summary).await;
        Ok(summary.finish())
    }

    /// Refresh one player's season line
    pub async fn update_player_season_stats(
        &self,
        external_id: i64,
        season: &str,
    ) -> Result<SeasonStats> {
        let stats = self.fetch_season(external_id, season).await?;
        self.stats.save_season_stats(&stats).await?;
        Ok(stats)
    }

    /// Refresh one player's trailing-window line
    pub async fn update_player_weekly_stats(
        &self,
        external_id: i64,
        season: &str,
    ) -> Result<WeeklyStats> {
        let range = DateRange::trailing(Utc::now().date_naive(), self.config.weekly_window_days);
        let stats = self.fetch_window(external_id, season, range).await?;
        self.stats.save_weekly_stats(&stats).await?;
        Ok(stats)
    }

    /// Aggregate an arbitrary window without storing it
    pub async fn custom_range_stats(
        &self,
        external_id: i64,
        season: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<WeeklyStats> {
        self.fetch_window(external_id, season, DateRange::new(from, to)).await
    }

    fn initial_value(&self, points_per_game: f64) -> Decimal {
        let raw = (points_per_game * self.config.initial_value_per_point)
            .max(self.config.initial_value_floor);
        Decimal::from_f64(raw)
            .or_else(|| Decimal::from_f64(self.config.initial_value_floor))
            .unwrap_or(Decimal::TEN)
            .round_dp(2)
    }

    /// Create catalog players for qualifying active players that are not yet mapped
    pub async fn seed_players(&self, season: &str, min_games: i32) -> Result<SeedSummary> {
        let players = self.active_players().await?;
        let mut summary = SeedSummary { candidates: players.len(), ..SeedSummary::default() };
        let mut fetched = Vec::new();

        for (index, player) in players.iter().enumerate() {
            self.log_progress("seed", index, players.len());

            let stats = match self.fetch_season(player.id, season).await {
                Ok(stats) => stats,
                Err(e) => {
                    summary.failed += 1;
                    warn!(external_id = player.id, "Skipping {}: {}", player.full_name, e);
                    continue;
                }
            };

            if stats.line.games_played < min_games {
                summary.below_threshold += 1;
                continue;
            }

            self.register_player(player).await;
            match self.seed_one(player, &stats).await {
                Ok(true) => summary.created += 1,
                Ok(false) => summary.already_mapped += 1,
                Err(e) => {
                    summary.failed += 1;
                    warn!(external_id = player.id, "Failed to seed {}: {}", player.full_name, e);
                }
            }
            fetched.push(stats);
        }

        let mut ingest = IngestionSummary::new(format!("seed-season-stats {season}"));
        ingest.attempted = fetched.len();
        ingest.fetched = fetched.len();
        self.save_in_batches(StatsBatch::Season(&fetched), &mut ingest).await;

        info!(
            candidates = summary.candidates,
            created = summary.created,
            already_mapped = summary.already_mapped,
            below_threshold = summary.below_threshold,
            failed = summary.failed,
            "Seeding finished"
        );
        Ok(summary)
    }

    /// Returns false when the player already has a mapping
    async fn seed_one(&self, player: &ExternalPlayer, stats: &SeasonStats) -> Result<bool> {
        if self.catalog.player_id_for_external(player.id).await?.is_some() {
            return Ok(false);
        }

        let new_player = NewPlayer {
            name: player.full_name.clone(),
            slug: slugify(&player.full_name),
            value: self.initial_value(stats.line.points_per_game),
            capacity: self.config.initial_capacity,
        };

        match self.catalog.create_mapped_player(&new_player, player.id).await {
            Ok(created) => {
                info!(player_id = created.id, external_id = player.id, "Seeded {}", created.name);
                Ok(true)
            }
            Err(StoreError::Conflict { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GameLogEntry;
    use market_store::MemoryStore;
    use std::collections::{HashMap, HashSet};
    use std::time::Duration;

    #[derive(Default)]
    struct ScriptedProvider {
        players: Vec<ExternalPlayer>,
        logs: HashMap<i64, Vec<GameLogEntry>>,
        failing: HashSet<i64>,
        stalled: HashSet<i64>,
        roster_down: bool,
    }

    impl ScriptedProvider {
        fn with_player(mut self, id: i64, name: &str, points: &[i64]) -> Self {
            self.players.push(ExternalPlayer {
                id,
                full_name: name.to_string(),
                first_name: String::new(),
                last_name: String::new(),
                is_active: true,
            });
            self.logs.insert(
                id,
                points
                    .iter()
                    .map(|p| GameLogEntry { points: *p, rebounds: 5, ..GameLogEntry::default() })
                    .collect(),
            );
            self
        }
    }

    #[async_trait::async_trait]
    impl StatsProvider for ScriptedProvider {
        async fn list_active_players(&self) -> Result<Vec<ExternalPlayer>> {
            if self.roster_down {
                return Err(FetcherError::provider("roster unavailable"));
            }
            Ok(self.players.clone())
        }

        async fn game_log(
            &self,
            external_id: i64,
            _season: &str,
            _range: Option<DateRange>,
        ) -> Result<Vec<GameLogEntry>> {
            if self.stalled.contains(&external_id) {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            if self.failing.contains(&external_id) {
                return Err(FetcherError::provider("upstream 500"));
            }
            Ok(self.logs.get(&external_id).cloned().unwrap_or_default())
        }

        async fn career_totals(&self, external_id: i64, per_mode: PerMode) -> Result<CareerStats> {
            if self.failing.contains(&external_id) {
                return Err(FetcherError::provider("upstream 500"));
            }
            let games = self.logs.get(&external_id).map(|l| l.len()).unwrap_or(0) as i32;
            Ok(CareerStats {
                external_id,
                per_mode,
                games_played: games,
                minutes: 30.0 * games as f64,
                points: 20.0 * games as f64,
                rebounds: 5.0 * games as f64,
                assists: 4.0 * games as f64,
                steals: 1.0 * games as f64,
                blocks: 0.5 * games as f64,
                fg_pct: 0.5,
                fg3_pct: 0.4,
                ft_pct: 0.8,
            })
        }
    }

    fn ingestor(provider: ScriptedProvider, store: Arc<MemoryStore>) -> StatsIngestor {
        let config = FetcherConfig { request_timeout_secs: 5, batch_size: 2, ..FetcherConfig::default() };
        StatsIngestor::new(Arc::new(provider), store.clone(), store, config)
    }

    #[tokio::test]
    async fn test_season_sweep_skips_failures_and_empty_logs() {
        let mut provider = ScriptedProvider::default()
            .with_player(1, "Alpha One", &[20, 30])
            .with_player(2, "Beta Two", &[10])
            .with_player(3, "Gamma Three", &[])
            .with_player(4, "Delta Four", &[12, 14, 16]);
        provider.failing.insert(2);

        let store = Arc::new(MemoryStore::new());
        let summary = ingestor(provider, store.clone()).update_all_season_stats("2025-26").await.unwrap();

        assert_eq!(summary.attempted, 4);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped_empty, 1);
        assert_eq!(summary.saved, 2);
        assert_eq!(summary.failed_batches, 0);

        let alpha = store.get_season_stats(1, "2025-26").await.unwrap().unwrap();
        assert_eq!(alpha.line.points_per_game, 25.0);
        assert!(store.get_season_stats(3, "2025-26").await.unwrap().is_none());
        assert!(store.get_external_player(4).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_roster_failure_is_fatal() {
        let provider = ScriptedProvider { roster_down: true, ..ScriptedProvider::default() };
        let store = Arc::new(MemoryStore::new());

        let result = ingestor(provider, store.clone()).update_all_season_stats("2025-26").await;

        assert!(result.is_err());
        assert_eq!(store.season_stats_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_call_times_out() {
        let mut provider = ScriptedProvider::default()
            .with_player(1, "Alpha One", &[20])
            .with_player(2, "Stuck Two", &[30]);
        provider.stalled.insert(2);

        let store = Arc::new(MemoryStore::new());
        let summary = ingestor(provider, store.clone()).update_all_season_stats("2025-26").await.unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.saved, 1);
    }

    #[tokio::test]
    async fn test_weekly_sweep_uses_trailing_window() {
        let provider = ScriptedProvider::default().with_player(7, "Weekly Guy", &[18, 22]);
        let store = Arc::new(MemoryStore::new());
        let end = NaiveDate::from_ymd_opt(2025, 12, 7).unwrap();

        let summary = ingestor(provider, store.clone())
            .update_all_weekly_stats_ending("2025-26", end)
            .await
            .unwrap();

        assert_eq!(summary.saved, 1);
        let weekly = store.get_latest_weekly_stats(7).await.unwrap().unwrap();
        assert_eq!(weekly.week_end, end);
        assert_eq!(weekly.week_start, NaiveDate::from_ymd_opt(2025, 11, 30).unwrap());
        assert_eq!(weekly.line.points_per_game, 20.0);
    }

    #[tokio::test]
    async fn test_career_sweep_saves_both_modes() {
        let provider = ScriptedProvider::default()
            .with_player(1, "Alpha One", &[20, 30])
            .with_player(2, "Rookie Two", &[]);
        let store = Arc::new(MemoryStore::new());

        let summary = ingestor(provider, store.clone()).update_all_career_stats().await.unwrap();

        assert_eq!(summary.saved, 2);
        assert_eq!(summary.skipped_empty, 1);
        assert!(store.get_career_stats(1, PerMode::Totals).await.unwrap().is_some());
        assert!(store.get_career_stats(1, PerMode::PerGame).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_single_player_refresh() {
        let mut provider = ScriptedProvider::default()
            .with_player(1, "Alpha One", &[20, 30])
            .with_player(2, "Beta Two", &[10]);
        provider.failing.insert(2);
        let store = Arc::new(MemoryStore::new());
        let ingestor = ingestor(provider, store.clone());

        let stats = ingestor.update_player_season_stats(1, "2025-26").await.unwrap();
        assert_eq!(stats.line.games_played, 2);
        assert_eq!(store.get_season_stats(1, "2025-26").await.unwrap(), Some(stats));

        assert!(ingestor.update_player_season_stats(2, "2025-26").await.is_err());
        assert_eq!(store.season_stats_count().await, 1);
    }

    #[tokio::test]
    async fn test_custom_range_is_not_stored() {
        let provider = ScriptedProvider::default().with_player(7, "Window Guy", &[10, 20, 30]);
        let store = Arc::new(MemoryStore::new());
        let from = NaiveDate::from_ymd_opt(2025, 11, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2025, 11, 15).unwrap();

        let stats = ingestor(provider, store.clone())
            .custom_range_stats(7, "2025-26", from, to)
            .await
            .unwrap();

        assert_eq!(stats.week_start, from);
        assert_eq!(stats.week_end, to);
        assert_eq!(stats.line.points_per_game, 20.0);
        assert_eq!(store.weekly_stats_count().await, 0);
    }

    #[tokio::test]
    async fn test_seed_players_is_idempotent() {
        let games = vec![25; 12];
        let provider = ScriptedProvider::default()
            .with_player(201939, "Stephen Curry", &games)
            .with_player(99, "Bench Guy", &[2, 4]);
        let store = Arc::new(MemoryStore::new());
        let ingestor = ingestor(provider, store.clone());

        let first = ingestor.seed_players("2025-26", 10).await.unwrap();
        assert_eq!(first.created, 1);
        assert_eq!(first.below_threshold, 1);

        let player_id = store.player_id_for_external(201939).await.unwrap().unwrap();
        let player = store.get_player(player_id).await.unwrap().unwrap();
        assert_eq!(player.slug, "stephen-curry");
        assert_eq!(player.value, Decimal::from(250));
        assert_eq!(player.total_capacity, 10);
        assert_eq!(player.remaining_capacity, 10);

        let second = ingestor.seed_players("2025-26", 10).await.unwrap();
        assert_eq!(second.created, 0);
        assert_eq!(second.already_mapped, 1);
        assert_eq!(store.list_players().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_initial_value_is_floored() {
        let store = Arc::new(MemoryStore::new());
        let ingestor = ingestor(ScriptedProvider::default(), store);

        assert_eq!(ingestor.initial_value(0.4), Decimal::from(10));
        assert_eq!(ingestor.initial_value(12.5), Decimal::from(125));
    }
}
