//! Record checks shared by every store implementation

use crate::models::{CareerStats, StatLine};
use crate::{Result, StoreError};

pub fn validate_line(external_id: i64, line: &StatLine) -> Result<()> {
    let averages = [
        line.points_per_game,
        line.rebounds_per_game,
        line.assists_per_game,
        line.steals_per_game,
        line.blocks_per_game,
    ];
    if line.games_played < 0 || averages.iter().any(|v| !v.is_finite()) {
        return Err(StoreError::invalid_record(format!("bad stat line for external id {external_id}")));
    }
    Ok(())
}

pub fn validate_career(stats: &CareerStats) -> Result<()> {
    let values = [
        stats.minutes,
        stats.points,
        stats.rebounds,
        stats.assists,
        stats.steals,
        stats.blocks,
        stats.fg_pct,
        stats.fg3_pct,
        stats.ft_pct,
    ];
    if stats.games_played < 0 || values.iter().any(|v| !v.is_finite()) {
        return Err(StoreError::invalid_record(format!(
            "bad career line for external id {}",
            stats.external_id
        )));
    }
    Ok(())
}
