//! Valuation sweeps over the player catalog

use crate::calculator::{ValueBreakdown, ValueCalculator};
use crate::config::ValuationConfig;
use crate::{Result, ValueEngineError};
use chrono::{DateTime, Utc};
use market_store::{CatalogRepository, PerMode, StatsRepository};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// One computed player value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerValuation {
    pub player_id: i64,
    pub external_id: i64,
    pub previous: Decimal,
    pub breakdown: ValueBreakdown,
}

impl PlayerValuation {
    pub fn value(&self) -> Decimal {
        self.breakdown.price
    }
}

/// Outcome of a valuation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub updated: u64,
    pub failed_players: Vec<i64>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ValuationSummary {
    fn new(attempted: usize) -> Self {
        let now = Utc::now();
        Self {
            attempted,
            succeeded: 0,
            failed: 0,
            updated: 0,
            failed_players: Vec::new(),
            started_at: now,
            finished_at: now,
        }
    }

    fn finish(mut self) -> Self {
        self.failed_players.sort_unstable();
        self.finished_at = Utc::now();
        info!(
            attempted = self.attempted,
            succeeded = self.succeeded,
            failed = self.failed,
            updated = self.updated,
            "Valuation run finished"
        );
        self
    }
}

/// Computes and commits player values
#[derive(Clone)]
pub struct ValueEngine {
    catalog: Arc<dyn CatalogRepository>,
    stats: Arc<dyn StatsRepository>,
    calculator: ValueCalculator,
    config: ValuationConfig,
}

impl ValueEngine {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        stats: Arc<dyn StatsRepository>,
        config: ValuationConfig,
    ) -> Self {
        Self { catalog, stats, calculator: ValueCalculator::new(config.weights.clone()), config }
    }

    pub fn config(&self) -> &ValuationConfig {
        &self.config
    }

    pub fn calculator(&self) -> &ValueCalculator {
        &self.calculator
    }

    /// Compute a player's value without writing it
    pub async fn calculate_player_value(&self, player_id: i64) -> Result<PlayerValuation> {
        let player = self
            .catalog
            .get_player(player_id)
            .await?
            .ok_or(ValueEngineError::PlayerNotFound { player_id })?;

        let external_id = self
            .catalog
            .external_id_for(player_id)
            .await?
            .ok_or(ValueEngineError::Unmapped { player_id })?;

        let season = self.stats.get_season_stats(external_id, &self.config.season).await?;
        let career = self.stats.get_career_stats(external_id, PerMode::Totals).await?;

        let breakdown = self.calculator.calculate(season.as_ref(), career.as_ref(), player.demand());
        debug!(
            player_id,
            external_id,
            season_value = breakdown.season_value,
            career_value = breakdown.career_value,
            demand = breakdown.demand,
            value = %breakdown.price,
            "Computed player value"
        );

        Ok(PlayerValuation { player_id, external_id, previous: player.value, breakdown })
    }

    async fn calculate_bounded(&self, player_id: i64) -> Result<PlayerValuation> {
        let deadline = self.config.player_timeout();
        match tokio::time::timeout(deadline, self.calculate_player_value(player_id)).await {
            Ok(result) => result,
            Err(_) => Err(ValueEngineError::Timeout { player_id, secs: deadline.as_secs() }),
        }
    }

    /// Compute and commit one player's value
    pub async fn update_player_value(&self, player_id: i64) -> Result<PlayerValuation> {
        let valuation = self.calculate_bounded(player_id).await?;

        let mut values = HashMap::new();
        values.insert(player_id, valuation.value());
        self.catalog.update_values(&values).await?;

        info!(player_id, previous = %valuation.previous, value = %valuation.value(), "Updated player value");
        Ok(valuation)
    }

    /// Sequential refresh of a subset; failures are skipped and nothing is
    /// written when no player succeeded
    pub async fn update_values_for_players(&self, player_ids: &[i64]) -> Result<ValuationSummary> {
        let mut summary = ValuationSummary::new(player_ids.len());
        let mut values = HashMap::new();

        for &player_id in player_ids {
            match self.calculate_bounded(player_id).await {
                Ok(valuation) => {
                    values.insert(player_id, valuation.value());
                    summary.succeeded += 1;
                }
                Err(e) => {
                    warn!(player_id, "Failed to value player: {}", e);
                    summary.failed += 1;
                    summary.failed_players.push(player_id);
                }
            }
        }

        if !values.is_empty() {
            summary.updated = self.catalog.update_values(&values).await?;
        }
        Ok(summary.finish())
    }

    /// Value the whole catalog on a fixed-size worker pool and commit all
    /// successful results in one write
    pub async fn update_all_values(&self) -> Result<ValuationSummary> {
        let player_ids = self.catalog.list_player_ids().await?;
        let workers = self.config.workers.max(1);
        info!(players = player_ids.len(), workers, "Starting valuation run");

        let mut summary = ValuationSummary::new(player_ids.len());
        if player_ids.is_empty() {
            return Ok(summary.finish());
        }

        let (job_tx, job_rx) = mpsc::channel::<i64>(player_ids.len());
        let job_rx = Arc::new(Mutex::new(job_rx));
        let (result_tx, mut result_rx) = mpsc::channel::<(i64, Result<PlayerValuation>)>(workers * 2);

        let mut pool = JoinSet::new();
        for worker_id in 0..workers {
            let engine = self.clone();
            let jobs = Arc::clone(&job_rx);
            let results = result_tx.clone();
            pool.spawn(async move {
                loop {
                    let next = jobs.lock().await.recv().await;
                    let Some(player_id) = next else {
                        break;
                    };
                    let outcome = engine.calculate_bounded(player_id).await;
                    if results.send((player_id, outcome)).await.is_err() {
                        break;
                    }
                }
                debug!(worker_id, "Valuation worker drained");
            });
        }
        drop(result_tx);

        // Capacity matches the job count, so this never waits on workers
        for &player_id in &player_ids {
            if job_tx.send(player_id).await.is_err() {
                break;
            }
        }
        drop(job_tx);

        let mut values = HashMap::with_capacity(player_ids.len());
        while let Some((player_id, outcome)) = result_rx.recv().await {
            match outcome {
                Ok(valuation) => {
                    values.insert(player_id, valuation.value());
                    summary.succeeded += 1;
                }
                Err(e) => {
                    warn!(player_id, "Failed to value player: {}", e);
                    summary.failed += 1;
                    summary.failed_players.push(player_id);
                }
            }
        }

        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                error!("Valuation worker panicked: {}", e);
            }
        }

        // Jobs lost to a panicked worker never reported back
        let reported = summary.succeeded + summary.failed;
        if reported < summary.attempted {
            let missing = summary.attempted - reported;
            error!(missing, "Some players were never valued");
            summary.failed += missing;
        }

        if !values.is_empty() {
            summary.updated = self.catalog.update_values(&values).await?;
        }
        Ok(summary.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValueWeights;
    use market_store::{
        CareerStats, LedgerRepository, MemoryStore, NewPlayer, NewUser, SeasonStats, StatLine,
        TradePlan, TradeRejection, TradeSide, TradeSnapshot, UserRepository,
    };

    struct Fixture {
        store: Arc<MemoryStore>,
        engine: ValueEngine,
    }

    async fn fixture(workers: usize) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let config = ValuationConfig { workers, weights: ValueWeights::default(), ..ValuationConfig::default() };
        let engine = ValueEngine::new(store.clone(), store.clone(), config);
        Fixture { store, engine }
    }

    async fn add_player(store: &MemoryStore, name: &str, external_id: i64, ppg: f64) -> i64 {
        let player = store
            .insert_player(&NewPlayer {
                name: name.to_string(),
                slug: market_store::slugify(name),
                value: Decimal::from(50),
                capacity: 10,
            })
            .await;
        store.insert_mapping(player.id, external_id).await;

        store
            .save_season_stats(&SeasonStats {
                external_id,
                season: "2025-26".to_string(),
                line: StatLine { games_played: 30, points_per_game: ppg, ..StatLine::default() },
            })
            .await
            .unwrap();
        store
            .save_career_stats(&CareerStats {
                external_id,
                per_mode: PerMode::Totals,
                games_played: 300,
                minutes: 0.0,
                points: 5000.0,
                rebounds: 0.0,
                assists: 0.0,
                steals: 0.0,
                blocks: 0.0,
                fg_pct: 0.0,
                fg3_pct: 0.0,
                ft_pct: 0.0,
            })
            .await
            .unwrap();
        player.id
    }

    async fn value_of(store: &MemoryStore, player_id: i64) -> Decimal {
        store.get_player(player_id).await.unwrap().unwrap().value
    }

    #[tokio::test]
    async fn test_failed_player_keeps_old_value() {
        let fx = fixture(10).await;
        let a = add_player(&fx.store, "Player A", 100, 20.0).await;
        let b = add_player(&fx.store, "Player B", 200, 30.0).await;
        let c = add_player(&fx.store, "Player C", 300, 40.0).await;
        fx.store.make_stats_unavailable(200).await;

        let summary = fx.engine.update_all_values().await.unwrap();

        assert_eq!(summary.attempted, 3);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed_players, vec![b]);
        assert_eq!(summary.updated, 2);
        assert_eq!(value_of(&fx.store, a).await, Decimal::from(25));
        assert_eq!(value_of(&fx.store, b).await, Decimal::from(50));
        assert_eq!(value_of(&fx.store, c).await, Decimal::from(45));
    }

    #[tokio::test]
    async fn test_unmapped_player_is_reported() {
        let fx = fixture(2).await;
        let mapped = add_player(&fx.store, "Mapped", 100, 12.0).await;
        let orphan = fx
            .store
            .insert_player(&NewPlayer {
                name: "Orphan".to_string(),
                slug: "orphan".to_string(),
                value: Decimal::from(33),
                capacity: 10,
            })
            .await;

        let summary = fx.engine.update_all_values().await.unwrap();

        assert_eq!(summary.failed_players, vec![orphan.id]);
        assert_eq!(value_of(&fx.store, orphan.id).await, Decimal::from(33));
        assert_eq!(value_of(&fx.store, mapped).await, Decimal::from(17));
    }

    #[tokio::test]
    async fn test_pool_handles_more_players_than_workers() {
        let fx = fixture(3).await;
        let mut ids = Vec::new();
        for i in 0..25 {
            ids.push(add_player(&fx.store, &format!("Player {i}"), 1000 + i, 15.0).await);
        }

        let summary = fx.engine.update_all_values().await.unwrap();

        assert_eq!(summary.succeeded, 25);
        assert_eq!(summary.updated, 25);
        for id in ids {
            assert_eq!(value_of(&fx.store, id).await, Decimal::from(20));
        }
    }

    #[tokio::test]
    async fn test_subset_update_with_no_successes_writes_nothing() {
        let fx = fixture(2).await;
        let a = add_player(&fx.store, "Player A", 100, 20.0).await;
        fx.store.make_stats_unavailable(100).await;

        let summary = fx.engine.update_values_for_players(&[a, 999]).await.unwrap();

        assert_eq!(summary.failed, 2);
        assert_eq!(summary.updated, 0);
        assert!(fx.store.price_history(a, market_store::PriceRange::All).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_consumed_capacity_raises_stored_value() {
        let fx = fixture(2).await;
        let held = add_player(&fx.store, "Held Guard", 100, 20.0).await;
        let idle = add_player(&fx.store, "Idle Guard", 200, 20.0).await;
        let user = fx
            .store
            .create_user(&NewUser {
                name: "Holder".to_string(),
                handle: "holder".to_string(),
                email: "holder@example.com".to_string(),
                password_hash: "hash".to_string(),
                currency: Decimal::from(1000),
            })
            .await
            .unwrap();

        // Take half the float out of circulation
        let reserve_half = |snapshot: &TradeSnapshot| -> std::result::Result<TradePlan, TradeRejection> {
            let price = snapshot.player.as_ref().map(|p| p.value).unwrap_or_default();
            Ok(TradePlan {
                side: TradeSide::Buy,
                quantity: 5,
                price,
                currency_delta: -(price * Decimal::from(5)),
                capacity_delta: -5,
            })
        };
        fx.store.execute_trade(user.id, held, &reserve_half).await.unwrap();

        let summary = fx.engine.update_all_values().await.unwrap();
        assert_eq!(summary.updated, 2);

        let held_value = value_of(&fx.store, held).await;
        let idle_value = value_of(&fx.store, idle).await;
        assert_eq!(idle_value, Decimal::from(25));
        assert!(held_value > idle_value);

        let valuation = fx.engine.calculate_player_value(held).await.unwrap();
        assert_eq!(valuation.breakdown.demand, 0.5);
        assert!(valuation.breakdown.demand_multiplier > 1.0);
        assert_eq!(valuation.value(), held_value);
    }

    #[tokio::test]
    async fn test_update_player_value_records_history() {
        let fx = fixture(1).await;
        let a = add_player(&fx.store, "Player A", 100, 20.0).await;

        let valuation = fx.engine.update_player_value(a).await.unwrap();

        assert_eq!(valuation.previous, Decimal::from(50));
        assert_eq!(valuation.value(), Decimal::from(25));
        let history = fx.store.price_history(a, market_store::PriceRange::Month).await.unwrap();
        assert_eq!(history.len(), 1);
    }
}
