//! PostgreSQL implementation of the store traits

use crate::config::DatabaseConfig;
use crate::models::*;
use crate::repository::{CatalogRepository, LedgerRepository, StatsRepository, UserRepository};
use crate::trade::{TradePlanner, TradeSnapshot};
use crate::validation::{validate_career, validate_line};
use crate::{Result, StoreError};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::PgExecutor;
use std::collections::HashMap;
use tracing::{debug, info};

const PLAYER_COLUMNS: &str = "id, name, slug, value, total_capacity, remaining_capacity";
const USER_COLUMNS: &str = "id, name, handle, email, password_hash, currency";
const TRANSACTION_COLUMNS: &str = "id, user_id, player_id, side, quantity, price, executed_at";
/// Advisory lock key taken by every transaction that refreshes `positions_mv`.
/// A refresh needs ACCESS EXCLUSIVE on the view, so trades that read the view
/// first must queue on this key or they deadlock on the lock upgrade.
const POSITIONS_LOCK_KEY: i64 = 0x706f_7369_7469_6f6e;

const STAT_LINE_COLUMNS: &str = "games_played, total_points, total_rebounds, total_assists, \
     total_steals, total_blocks, points_per_game, rebounds_per_game, assists_per_game, \
     steals_per_game, blocks_per_game";

/// Store backed by a Postgres pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct TransactionRow {
    id: i64,
    user_id: i64,
    player_id: i64,
    side: String,
    quantity: i64,
    price: Decimal,
    executed_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = StoreError;

    fn try_from(row: TransactionRow) -> Result<Self> {
        Ok(Transaction {
            id: row.id,
            user_id: row.user_id,
            player_id: row.player_id,
            side: row.side.parse().map_err(StoreError::corrupt_row)?,
            quantity: row.quantity,
            price: row.price,
            executed_at: row.executed_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CareerRow {
    external_id: i64,
    per_mode: String,
    games_played: i32,
    minutes: f64,
    points: f64,
    rebounds: f64,
    assists: f64,
    steals: f64,
    blocks: f64,
    fg_pct: f64,
    fg3_pct: f64,
    ft_pct: f64,
}

impl TryFrom<CareerRow> for CareerStats {
    type Error = StoreError;

    fn try_from(row: CareerRow) -> Result<Self> {
        Ok(CareerStats {
            external_id: row.external_id,
            per_mode: row.per_mode.parse().map_err(StoreError::corrupt_row)?,
            games_played: row.games_played,
            minutes: row.minutes,
            points: row.points,
            rebounds: row.rebounds,
            assists: row.assists,
            steals: row.steals,
            blocks: row.blocks,
            fg_pct: row.fg_pct,
            fg3_pct: row.fg3_pct,
            ft_pct: row.ft_pct,
        })
    }
}

/// Unique violations surface as conflicts
fn map_unique_violation(err: sqlx::Error, what: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            StoreError::conflict(format!("{what} already exists"))
        }
        _ => StoreError::Database(err),
    }
}

impl PgStore {
    /// Connect a pool and optionally run migrations
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect(&config.url)
            .await?;

        let store = Self { pool };
        if config.run_migrations {
            store.migrate().await?;
        }

        info!(max_connections = config.max_connections, "Connected to market database");
        Ok(store)
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Health check
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

async fn upsert_season<'e, E: PgExecutor<'e>>(executor: E, stats: &SeasonStats) -> Result<()> {
    validate_line(stats.external_id, &stats.line)?;
    let line = &stats.line;
    sqlx::query(
        "INSERT INTO nba_season_stats (external_id, season, games_played, total_points, \
         total_rebounds, total_assists, total_steals, total_blocks, points_per_game, \
         rebounds_per_game, assists_per_game, steals_per_game, blocks_per_game, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, NOW()) \
         ON CONFLICT (external_id, season) DO UPDATE SET \
         games_played = EXCLUDED.games_played, total_points = EXCLUDED.total_points, \
         total_rebounds = EXCLUDED.total_rebounds, total_assists = EXCLUDED.total_assists, \
         total_steals = EXCLUDED.total_steals, total_blocks = EXCLUDED.total_blocks, \
         points_per_game = EXCLUDED.points_per_game, rebounds_per_game = EXCLUDED.rebounds_per_game, \
         assists_per_game = EXCLUDED.assists_per_game, steals_per_game = EXCLUDED.steals_per_game, \
         blocks_per_game = EXCLUDED.blocks_per_game, updated_at = NOW()",
    )
    .bind(stats.external_id)
    .bind(&stats.season)
    .bind(line.games_played)
    .bind(line.total_points)
    .bind(line.total_rebounds)
    .bind(line.total_assists)
    .bind(line.total_steals)
    .bind(line.total_blocks)
    .bind(line.points_per_game)
    .bind(line.rebounds_per_game)
    .bind(line.assists_per_game)
    .bind(line.steals_per_game)
    .bind(line.blocks_per_game)
    .execute(executor)
    .await?;

    Ok(())
}

async fn upsert_weekly<'e, E: PgExecutor<'e>>(executor: E, stats: &WeeklyStats) -> Result<()> {
    validate_line(stats.external_id, &stats.line)?;
    let line = &stats.line;
    sqlx::query(
        "INSERT INTO nba_weekly_stats (external_id, season, week_start, week_end, games_played, \
         total_points, total_rebounds, total_assists, total_steals, total_blocks, \
         points_per_game, rebounds_per_game, assists_per_game, steals_per_game, \
         blocks_per_game, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, NOW()) \
         ON CONFLICT (external_id, week_end) DO UPDATE SET \
         season = EXCLUDED.season, week_start = EXCLUDED.week_start, \
         games_played = EXCLUDED.games_played, total_points = EXCLUDED.total_points, \
         total_rebounds = EXCLUDED.total_rebounds, total_assists = EXCLUDED.total_assists, \
         total_steals = EXCLUDED.total_steals, total_blocks = EXCLUDED.total_blocks, \
         points_per_game = EXCLUDED.points_per_game, rebounds_per_game = EXCLUDED.rebounds_per_game, \
         assists_per_game = EXCLUDED.assists_per_game, steals_per_game = EXCLUDED.steals_per_game, \
         blocks_per_game = EXCLUDED.blocks_per_game, updated_at = NOW()",
    )
    .bind(stats.external_id)
    .bind(&stats.season)
    .bind(stats.week_start)
    .bind(stats.week_end)
    .bind(line.games_played)
    .bind(line.total_points)
    .bind(line.total_rebounds)
    .bind(line.total_assists)
    .bind(line.total_steals)
    .bind(line.total_blocks)
    .bind(line.points_per_game)
    .bind(line.rebounds_per_game)
    .bind(line.assists_per_game)
    .bind(line.steals_per_game)
    .bind(line.blocks_per_game)
    .execute(executor)
    .await?;

    Ok(())
}

async fn upsert_career<'e, E: PgExecutor<'e>>(executor: E, stats: &CareerStats) -> Result<()> {
    validate_career(stats)?;
    sqlx::query(
        "INSERT INTO nba_career_stats (external_id, per_mode, games_played, minutes, points, \
         rebounds, assists, steals, blocks, fg_pct, fg3_pct, ft_pct, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, NOW()) \
         ON CONFLICT (external_id, per_mode) DO UPDATE SET \
         games_played = EXCLUDED.games_played, minutes = EXCLUDED.minutes, \
         points = EXCLUDED.points, rebounds = EXCLUDED.rebounds, assists = EXCLUDED.assists, \
         steals = EXCLUDED.steals, blocks = EXCLUDED.blocks, fg_pct = EXCLUDED.fg_pct, \
         fg3_pct = EXCLUDED.fg3_pct, ft_pct = EXCLUDED.ft_pct, updated_at = NOW()",
    )
    .bind(stats.external_id)
    .bind(stats.per_mode.as_str())
    .bind(stats.games_played)
    .bind(stats.minutes)
    .bind(stats.points)
    .bind(stats.rebounds)
    .bind(stats.assists)
    .bind(stats.steals)
    .bind(stats.blocks)
    .bind(stats.fg_pct)
    .bind(stats.fg3_pct)
    .bind(stats.ft_pct)
    .execute(executor)
    .await?;

    Ok(())
}

/// Serialize position-view writers until the transaction ends
async fn lock_positions(tx: &mut sqlx::Transaction<'_, sqlx::Postgres>) -> Result<()> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(POSITIONS_LOCK_KEY)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

#[async_trait::async_trait]
impl StatsRepository for PgStore {
    async fn upsert_player(&self, player: &ExternalPlayer) -> Result<()> {
        sqlx::query(
            "INSERT INTO nba_players (id, full_name, first_name, last_name, is_active, updated_at) \
             VALUES ($1, $2, $3, $4, $5, NOW()) \
             ON CONFLICT (id) DO UPDATE SET full_name = EXCLUDED.full_name, \
             first_name = EXCLUDED.first_name, last_name = EXCLUDED.last_name, \
             is_active = EXCLUDED.is_active, updated_at = NOW()",
        )
        .bind(player.id)
        .bind(&player.full_name)
        .bind(&player.first_name)
        .bind(&player.last_name)
        .bind(player.is_active)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_external_player(&self, external_id: i64) -> Result<Option<ExternalPlayer>> {
        let player = sqlx::query_as::<_, ExternalPlayer>(
            "SELECT id, full_name, first_name, last_name, is_active FROM nba_players WHERE id = $1",
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(player)
    }

    async fn save_season_stats(&self, stats: &SeasonStats) -> Result<()> {
        upsert_season(&self.pool, stats).await
    }

    async fn save_weekly_stats(&self, stats: &WeeklyStats) -> Result<()> {
        upsert_weekly(&self.pool, stats).await
    }

    async fn save_career_stats(&self, stats: &CareerStats) -> Result<()> {
        upsert_career(&self.pool, stats).await
    }

    async fn batch_save_season_stats(&self, stats: &[SeasonStats]) -> Result<()> {
        for record in stats {
            validate_line(record.external_id, &record.line)?;
        }
        let mut tx = self.pool.begin().await?;
        for record in stats {
            upsert_season(&mut *tx, record).await?;
        }
        tx.commit().await?;

        debug!(rows = stats.len(), "Saved season stats batch");
        Ok(())
    }

    async fn batch_save_weekly_stats(&self, stats: &[WeeklyStats]) -> Result<()> {
        for record in stats {
            validate_line(record.external_id, &record.line)?;
        }
        let mut tx = self.pool.begin().await?;
        for record in stats {
            upsert_weekly(&mut *tx, record).await?;
        }
        tx.commit().await?;

        debug!(rows = stats.len(), "Saved weekly stats batch");
        Ok(())
    }

    async fn batch_save_career_stats(&self, stats: &[CareerStats]) -> Result<()> {
        for record in stats {
            validate_career(record)?;
        }
        let mut tx = self.pool.begin().await?;
        for record in stats {
            upsert_career(&mut *tx, record).await?;
        }
        tx.commit().await?;

        debug!(rows = stats.len(), "Saved career stats batch");
        Ok(())
    }

    async fn get_season_stats(&self, external_id: i64, season: &str) -> Result<Option<SeasonStats>> {
        let sql = format!(
            "SELECT external_id, season, {STAT_LINE_COLUMNS} FROM nba_season_stats \
             WHERE external_id = $1 AND season = $2"
        );
        let stats = sqlx::query_as::<_, SeasonStats>(&sql)
            .bind(external_id)
            .bind(season)
            .fetch_optional(&self.pool)
            .await?;

        Ok(stats)
    }

    async fn get_latest_weekly_stats(&self, external_id: i64) -> Result<Option<WeeklyStats>> {
        let sql = format!(
            "SELECT external_id, season, week_start, week_end, {STAT_LINE_COLUMNS} \
             FROM nba_weekly_stats WHERE external_id = $1 ORDER BY week_end DESC LIMIT 1"
        );
        let stats = sqlx::query_as::<_, WeeklyStats>(&sql)
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(stats)
    }

    async fn get_career_stats(
        &self,
        external_id: i64,
        per_mode: PerMode,
    ) -> Result<Option<CareerStats>> {
        let row = sqlx::query_as::<_, CareerRow>(
            "SELECT external_id, per_mode, games_played, minutes, points, rebounds, assists, \
             steals, blocks, fg_pct, fg3_pct, ft_pct \
             FROM nba_career_stats WHERE external_id = $1 AND per_mode = $2",
        )
        .bind(external_id)
        .bind(per_mode.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(CareerStats::try_from).transpose()
    }
}

#[async_trait::async_trait]
impl CatalogRepository for PgStore {
    async fn get_player(&self, player_id: i64) -> Result<Option<Player>> {
        let sql = format!("SELECT {PLAYER_COLUMNS} FROM players WHERE id = $1");
        let player = sqlx::query_as::<_, Player>(&sql)
            .bind(player_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(player)
    }

    async fn get_player_by_slug(&self, slug: &str) -> Result<Option<Player>> {
        let sql = format!("SELECT {PLAYER_COLUMNS} FROM players WHERE slug = $1");
        let player = sqlx::query_as::<_, Player>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        Ok(player)
    }

    async fn get_players_by_ids(&self, ids: &[i64]) -> Result<Vec<Player>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("SELECT {PLAYER_COLUMNS} FROM players WHERE id = ANY($1) ORDER BY id");
        let players = sqlx::query_as::<_, Player>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(players)
    }

    async fn list_players(&self) -> Result<Vec<Player>> {
        let sql = format!("SELECT {PLAYER_COLUMNS} FROM players ORDER BY id");
        let players = sqlx::query_as::<_, Player>(&sql).fetch_all(&self.pool).await?;
        Ok(players)
    }

    async fn list_player_ids(&self) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>("SELECT id FROM players ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn external_id_for(&self, player_id: i64) -> Result<Option<i64>> {
        let id = sqlx::query_scalar::<_, i64>(
            "SELECT external_id FROM player_external_mapping WHERE player_id = $1",
        )
        .bind(player_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    async fn player_id_for_external(&self, external_id: i64) -> Result<Option<i64>> {
        let id = sqlx::query_scalar::<_, i64>(
            "SELECT player_id FROM player_external_mapping WHERE external_id = $1",
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    async fn create_mapped_player(&self, player: &NewPlayer, external_id: i64) -> Result<Player> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT player_id FROM player_external_mapping WHERE external_id = $1",
        )
        .bind(external_id)
        .fetch_optional(&mut *tx)
        .await?;
        if existing.is_some() {
            return Err(StoreError::conflict(format!("mapping for external id {external_id}")));
        }

        let sql = format!(
            "INSERT INTO players (name, slug, value, total_capacity, remaining_capacity) \
             VALUES ($1, $2, $3, $4, $4) RETURNING {PLAYER_COLUMNS}"
        );
        let created = sqlx::query_as::<_, Player>(&sql)
            .bind(&player.name)
            .bind(&player.slug)
            .bind(player.value)
            .bind(player.capacity)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_unique_violation(e, "player slug"))?;

        sqlx::query("INSERT INTO player_external_mapping (player_id, external_id) VALUES ($1, $2)")
            .bind(created.id)
            .bind(external_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_unique_violation(e, "player mapping"))?;

        tx.commit().await?;
        Ok(created)
    }

    async fn update_values(&self, values: &HashMap<i64, Decimal>) -> Result<u64> {
        if values.is_empty() {
            return Ok(0);
        }

        // Stable lock order across concurrent writers
        let mut ordered: Vec<(&i64, &Decimal)> = values.iter().collect();
        ordered.sort_by_key(|(id, _)| **id);

        let mut tx = self.pool.begin().await?;
        let mut updated = 0u64;
        for (player_id, value) in ordered {
            let result =
                sqlx::query("UPDATE players SET value = $2, updated_at = NOW() WHERE id = $1")
                    .bind(player_id)
                    .bind(value)
                    .execute(&mut *tx)
                    .await?;

            if result.rows_affected() == 0 {
                continue;
            }

            sqlx::query("INSERT INTO player_price_history (player_id, price) VALUES ($1, $2)")
                .bind(player_id)
                .bind(value)
                .execute(&mut *tx)
                .await?;
            updated += 1;
        }
        tx.commit().await?;

        Ok(updated)
    }

    async fn price_history(&self, player_id: i64, range: PriceRange) -> Result<Vec<PricePoint>> {
        let points = sqlx::query_as::<_, PricePoint>(
            "SELECT player_id, price, recorded_at FROM player_price_history \
             WHERE player_id = $1 AND recorded_at >= $2 ORDER BY recorded_at ASC, id ASC",
        )
        .bind(player_id)
        .bind(range.since(Utc::now()))
        .fetch_all(&self.pool)
        .await?;

        Ok(points)
    }
}

#[async_trait::async_trait]
impl UserRepository for PgStore {
    async fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn create_user(&self, user: &NewUser) -> Result<User> {
        let sql = format!(
            "INSERT INTO users (name, handle, email, password_hash, currency) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        );
        let created = sqlx::query_as::<_, User>(&sql)
            .bind(&user.name)
            .bind(&user.handle)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.currency)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, "user handle or email"))?;
        Ok(created)
    }
}

#[async_trait::async_trait]
impl LedgerRepository for PgStore {
    async fn execute_trade(
        &self,
        user_id: i64,
        player_id: i64,
        planner: TradePlanner<'_>,
    ) -> Result<Transaction> {
        let mut tx = self.pool.begin().await?;
        lock_positions(&mut tx).await?;

        let user_sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 FOR UPDATE");
        let user = sqlx::query_as::<_, User>(&user_sql)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;

        let player_sql = format!("SELECT {PLAYER_COLUMNS} FROM players WHERE id = $1 FOR UPDATE");
        let player = sqlx::query_as::<_, Player>(&player_sql)
            .bind(player_id)
            .fetch_optional(&mut *tx)
            .await?;

        let position = sqlx::query_as::<_, Position>(
            "SELECT user_id, player_id, quantity, average_cost FROM positions_mv \
             WHERE user_id = $1 AND player_id = $2",
        )
        .bind(user_id)
        .bind(player_id)
        .fetch_optional(&mut *tx)
        .await?;

        // Dropping `tx` on rejection rolls back and releases the row locks
        let plan = planner(&TradeSnapshot { user, player, position })?;

        let insert_sql = format!(
            "INSERT INTO transactions (user_id, player_id, side, quantity, price) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {TRANSACTION_COLUMNS}"
        );
        let row = sqlx::query_as::<_, TransactionRow>(&insert_sql)
            .bind(user_id)
            .bind(player_id)
            .bind(plan.side.as_str())
            .bind(plan.quantity)
            .bind(plan.price)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query("UPDATE users SET currency = currency + $2 WHERE id = $1")
            .bind(user_id)
            .bind(plan.currency_delta)
            .execute(&mut *tx)
            .await?;

        if plan.capacity_delta != 0 {
            sqlx::query(
                "UPDATE players SET remaining_capacity = remaining_capacity + $2, \
                 updated_at = NOW() WHERE id = $1",
            )
            .bind(player_id)
            .bind(plan.capacity_delta)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("REFRESH MATERIALIZED VIEW positions_mv").execute(&mut *tx).await?;

        tx.commit().await?;
        Transaction::try_from(row)
    }

    async fn get_position(&self, user_id: i64, player_id: i64) -> Result<Option<Position>> {
        let position = sqlx::query_as::<_, Position>(
            "SELECT user_id, player_id, quantity, average_cost FROM positions_mv \
             WHERE user_id = $1 AND player_id = $2",
        )
        .bind(user_id)
        .bind(player_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(position)
    }

    async fn list_positions(&self, filter: PositionFilter) -> Result<Vec<Position>> {
        let base = "SELECT user_id, player_id, quantity, average_cost FROM positions_mv";
        let positions = match filter {
            PositionFilter::All => {
                sqlx::query_as::<_, Position>(&format!("{base} ORDER BY user_id, player_id"))
                    .fetch_all(&self.pool)
                    .await?
            }
            PositionFilter::User(user_id) => {
                sqlx::query_as::<_, Position>(&format!(
                    "{base} WHERE user_id = $1 ORDER BY player_id"
                ))
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?
            }
            PositionFilter::Player(player_id) => {
                sqlx::query_as::<_, Position>(&format!(
                    "{base} WHERE player_id = $1 ORDER BY user_id"
                ))
                .bind(player_id)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(positions)
    }

    async fn get_transaction(&self, transaction_id: i64) -> Result<Option<Transaction>> {
        let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = $1");
        let row = sqlx::query_as::<_, TransactionRow>(&sql)
            .bind(transaction_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Transaction::try_from).transpose()
    }

    async fn list_transactions(&self, filter: TransactionFilter) -> Result<Vec<Transaction>> {
        let rows = match filter {
            TransactionFilter::All => {
                let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions ORDER BY id");
                sqlx::query_as::<_, TransactionRow>(&sql).fetch_all(&self.pool).await?
            }
            TransactionFilter::User(user_id) => {
                let sql = format!(
                    "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE user_id = $1 ORDER BY id"
                );
                sqlx::query_as::<_, TransactionRow>(&sql)
                    .bind(user_id)
                    .fetch_all(&self.pool)
                    .await?
            }
            TransactionFilter::Player(player_id) => {
                let sql = format!(
                    "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE player_id = $1 ORDER BY id"
                );
                sqlx::query_as::<_, TransactionRow>(&sql)
                    .bind(player_id)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.into_iter().map(Transaction::try_from).collect()
    }

    async fn refresh_positions(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        lock_positions(&mut tx).await?;
        sqlx::query("REFRESH MATERIALIZED VIEW positions_mv").execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }
}
