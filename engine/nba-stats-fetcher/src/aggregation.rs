//! Game log aggregation into season and window stat lines

use crate::models::{DateRange, GameLogEntry};
use market_store::{SeasonStats, StatLine, WeeklyStats};

/// Sum counting stats and derive per-game averages.
/// An empty log yields an all-zero line.
pub fn aggregate_line(games: &[GameLogEntry]) -> StatLine {
    if games.is_empty() {
        return StatLine::default();
    }

    let mut line = StatLine { games_played: games.len() as i32, ..StatLine::default() };
    for game in games {
        line.total_points += game.points;
        line.total_rebounds += game.rebounds;
        line.total_assists += game.assists;
        line.total_steals += game.steals;
        line.total_blocks += game.blocks;
    }

    let played = f64::from(line.games_played);
    line.points_per_game = line.total_points as f64 / played;
    line.rebounds_per_game = line.total_rebounds as f64 / played;
    line.assists_per_game = line.total_assists as f64 / played;
    line.steals_per_game = line.total_steals as f64 / played;
    line.blocks_per_game = line.total_blocks as f64 / played;
    line
}

pub fn aggregate_season(external_id: i64, season: &str, games: &[GameLogEntry]) -> SeasonStats {
    SeasonStats { external_id, season: season.to_string(), line: aggregate_line(games) }
}

pub fn aggregate_window(
    external_id: i64,
    season: &str,
    range: DateRange,
    games: &[GameLogEntry],
) -> WeeklyStats {
    WeeklyStats {
        external_id,
        season: season.to_string(),
        week_start: range.from,
        week_end: range.to,
        line: aggregate_line(games),
    }
}
