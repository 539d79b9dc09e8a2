//! Provider payloads and run summaries

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// One row of a player's game log
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameLogEntry {
    pub game_date: Option<NaiveDate>,
    pub minutes: f64,
    pub points: i64,
    pub rebounds: i64,
    pub assists: i64,
    pub steals: i64,
    pub blocks: i64,
}

/// Inclusive calendar window for game log queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    /// `days` back from `end`
    pub fn trailing(end: NaiveDate, days: i64) -> Self {
        Self { from: end - chrono::Duration::days(days), to: end }
    }
}

/// Outcome of one stats sweep
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionSummary {
    pub job: String,
    pub attempted: usize,
    pub fetched: usize,
    pub skipped_empty: usize,
    pub failed: usize,
    pub saved: usize,
    pub failed_batches: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl IngestionSummary {
    pub fn new(job: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            job: job.into(),
            attempted: 0,
            fetched: 0,
            skipped_empty: 0,
            failed: 0,
            saved: 0,
            failed_batches: 0,
            started_at: now,
            finished_at: now,
        }
    }

    pub fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        info!(
            job = %self.job,
            attempted = self.attempted,
            fetched = self.fetched,
            skipped_empty = self.skipped_empty,
            failed = self.failed,
            saved = self.saved,
            failed_batches = self.failed_batches,
            "Stats ingestion finished"
        );
        self
    }
}

/// Outcome of catalog seeding
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedSummary {
    pub candidates: usize,
    pub created: usize,
    pub already_mapped: usize,
    pub below_threshold: usize,
    pub failed: usize,
}
