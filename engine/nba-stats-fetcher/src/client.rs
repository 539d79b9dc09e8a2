//! HTTP client for the stats.nba.com JSON API

use crate::config::FetcherConfig;
use crate::models::{DateRange, GameLogEntry};
use crate::provider::StatsProvider;
use crate::{FetcherError, Result};
use chrono::NaiveDate;
use governor::{
    clock::DefaultClock,
    middleware::NoOpMiddleware,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use market_store::{CareerStats, ExternalPlayer, PerMode};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ORIGIN, REFERER, USER_AGENT};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::debug;

type GovernorLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// Tabular block returned by every stats endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ResultSet {
    pub name: String,
    pub headers: Vec<String>,
    #[serde(rename = "rowSet")]
    pub row_set: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct StatsResponse {
    #[serde(rename = "resultSets")]
    result_sets: Vec<ResultSet>,
}

impl StatsResponse {
    fn result_set(&self, name: &str) -> Result<&ResultSet> {
        self.result_sets
            .iter()
            .find(|set| set.name == name)
            .ok_or_else(|| FetcherError::parse(format!("missing result set {name}")))
    }
}

impl ResultSet {
    pub fn column(&self, header: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == header)
            .ok_or_else(|| FetcherError::parse(format!("{} has no {header} column", self.name)))
    }
}

fn cell_i64(row: &[Value], idx: usize) -> i64 {
    match row.get(idx) {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)).unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn cell_f64(row: &[Value], idx: usize) -> f64 {
    match row.get(idx) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn cell_str(row: &[Value], idx: usize) -> String {
    match row.get(idx) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Game dates come back as "OCT 22, 2025"
fn parse_game_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%b %d, %Y").ok()
}

/// Split "Last, First" into (first, last)
fn split_last_comma_first(raw: &str) -> (String, String) {
    match raw.split_once(',') {
        Some((last, first)) => (first.trim().to_string(), last.trim().to_string()),
        None => (String::new(), raw.trim().to_string()),
    }
}

pub(crate) fn parse_roster(set: &ResultSet) -> Result<Vec<ExternalPlayer>> {
    let id = set.column("PERSON_ID")?;
    let full = set.column("DISPLAY_FIRST_LAST")?;
    let last_first = set.column("DISPLAY_LAST_COMMA_FIRST")?;
    let status = set.column("ROSTERSTATUS")?;

    Ok(set
        .row_set
        .iter()
        .filter(|row| cell_i64(row, status) == 1)
        .map(|row| {
            let (first_name, last_name) = split_last_comma_first(&cell_str(row, last_first));
            ExternalPlayer {
                id: cell_i64(row, id),
                full_name: cell_str(row, full),
                first_name,
                last_name,
                is_active: true,
            }
        })
        .collect())
}

pub(crate) fn parse_game_log(set: &ResultSet) -> Result<Vec<GameLogEntry>> {
    let date = set.column("GAME_DATE")?;
    let min = set.column("MIN")?;
    let pts = set.column("PTS")?;
    let reb = set.column("REB")?;
    let ast = set.column("AST")?;
    let stl = set.column("STL")?;
    let blk = set.column("BLK")?;

    Ok(set
        .row_set
        .iter()
        .map(|row| GameLogEntry {
            game_date: parse_game_date(&cell_str(row, date)),
            minutes: cell_f64(row, min),
            points: cell_i64(row, pts),
            rebounds: cell_i64(row, reb),
            assists: cell_i64(row, ast),
            steals: cell_i64(row, stl),
            blocks: cell_i64(row, blk),
        })
        .collect())
}

pub(crate) fn parse_career(
    set: &ResultSet,
    external_id: i64,
    per_mode: PerMode,
) -> Result<CareerStats> {
    let mut stats = CareerStats {
        external_id,
        per_mode,
        games_played: 0,
        minutes: 0.0,
        points: 0.0,
        rebounds: 0.0,
        assists: 0.0,
        steals: 0.0,
        blocks: 0.0,
        fg_pct: 0.0,
        fg3_pct: 0.0,
        ft_pct: 0.0,
    };

    // Players without a regular season appearance have no row
    let Some(row) = set.row_set.first() else {
        return Ok(stats);
    };

    stats.games_played = cell_i64(row, set.column("GP")?) as i32;
    stats.minutes = cell_f64(row, set.column("MIN")?);
    stats.points = cell_f64(row, set.column("PTS")?);
    stats.rebounds = cell_f64(row, set.column("REB")?);
    stats.assists = cell_f64(row, set.column("AST")?);
    stats.steals = cell_f64(row, set.column("STL")?);
    stats.blocks = cell_f64(row, set.column("BLK")?);
    stats.fg_pct = cell_f64(row, set.column("FG_PCT")?);
    stats.fg3_pct = cell_f64(row, set.column("FG3_PCT")?);
    stats.ft_pct = cell_f64(row, set.column("FT_PCT")?);
    Ok(stats)
}

/// Rate-limited client for stats.nba.com
#[derive(Clone)]
pub struct NbaStatsClient {
    client: Client,
    limiter: Arc<GovernorLimiter>,
    base_url: String,
    season: String,
}

impl NbaStatsClient {
    pub fn new(config: &FetcherConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36",
            ),
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
        headers.insert(REFERER, HeaderValue::from_static("https://www.nba.com/"));
        headers.insert(ORIGIN, HeaderValue::from_static("https://www.nba.com"));
        headers.insert("x-nba-stats-origin", HeaderValue::from_static("stats"));
        headers.insert("x-nba-stats-token", HeaderValue::from_static("true"));

        let client = Client::builder()
            .timeout(config.request_timeout())
            .default_headers(headers)
            .build()?;

        let per_minute = NonZeroU32::new(config.requests_per_minute).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            client,
            limiter: Arc::new(RateLimiter::direct(Quota::per_minute(per_minute))),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            season: config.season.clone(),
        })
    }

    async fn get(&self, endpoint: &str, query: &[(&str, String)]) -> Result<StatsResponse> {
        self.limiter.until_ready().await;

        let url = format!("{}/{}", self.base_url, endpoint);
        debug!("Requesting {} {:?}", url, query);

        let response = self.client.get(&url).query(query).send().await?;
        if !response.status().is_success() {
            return Err(FetcherError::Status {
                endpoint: endpoint.to_string(),
                status: response.status().as_u16(),
            });
        }

        Ok(response.json::<StatsResponse>().await?)
    }
}

#[async_trait::async_trait]
impl StatsProvider for NbaStatsClient {
    async fn list_active_players(&self) -> Result<Vec<ExternalPlayer>> {
        let response = self
            .get(
                "commonallplayers",
                &[
                    ("LeagueID", "00".to_string()),
                    ("Season", self.season.clone()),
                    ("IsOnlyCurrentSeason", "1".to_string()),
                ],
            )
            .await?;

        let players = parse_roster(response.result_set("CommonAllPlayers")?)?;
        if players.is_empty() {
            return Err(FetcherError::provider("no active players returned"));
        }
        Ok(players)
    }

    async fn game_log(
        &self,
        external_id: i64,
        season: &str,
        range: Option<DateRange>,
    ) -> Result<Vec<GameLogEntry>> {
        let mut query = vec![
            ("PlayerID", external_id.to_string()),
            ("Season", season.to_string()),
            ("SeasonType", "Regular Season".to_string()),
            ("LeagueID", "00".to_string()),
        ];
        if let Some(range) = range {
            query.push(("DateFrom", range.from.format("%m/%d/%Y").to_string()));
            query.push(("DateTo", range.to.format("%m/%d/%Y").to_string()));
        }

        let response = self.get("playergamelog", &query).await?;
        parse_game_log(response.result_set("PlayerGameLog")?)
    }

    async fn career_totals(&self, external_id: i64, per_mode: PerMode) -> Result<CareerStats> {
        let response = self
            .get(
                "playercareerstats",
                &[
                    ("PlayerID", external_id.to_string()),
                    ("PerMode", per_mode.as_str().to_string()),
                    ("LeagueID", "00".to_string()),
                ],
            )
            .await?;

        parse_career(response.result_set("CareerTotalsRegularSeason")?, external_id, per_mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn set(name: &str, headers: &[&str], rows: Vec<Vec<Value>>) -> ResultSet {
        ResultSet {
            name: name.to_string(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            row_set: rows,
        }
    }

    #[test]
    fn test_parse_roster_keeps_rostered_players() {
        let roster = set(
            "CommonAllPlayers",
            &["PERSON_ID", "DISPLAY_LAST_COMMA_FIRST", "DISPLAY_FIRST_LAST", "ROSTERSTATUS"],
            vec![
                vec![json!(2544), json!("James, LeBron"), json!("LeBron James"), json!(1)],
                vec![json!(1), json!("Retired, Guy"), json!("Guy Retired"), json!(0)],
            ],
        );

        let players = parse_roster(&roster).unwrap();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].id, 2544);
        assert_eq!(players[0].first_name, "LeBron");
        assert_eq!(players[0].last_name, "James");
    }

    #[test]
    fn test_parse_game_log() {
        let log = set(
            "PlayerGameLog",
            &["GAME_DATE", "MIN", "PTS", "REB", "AST", "STL", "BLK"],
            vec![vec![json!("OCT 22, 2025"), json!(36), json!(31), json!(9), json!(7), json!(2), json!(1)]],
        );

        let games = parse_game_log(&log).unwrap();
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].points, 31);
        assert_eq!(games[0].game_date, NaiveDate::from_ymd_opt(2025, 10, 22));
    }

    #[test]
    fn test_parse_game_log_missing_column() {
        let log = set("PlayerGameLog", &["GAME_DATE", "PTS"], vec![]);
        assert!(matches!(parse_game_log(&log), Err(FetcherError::Parse { .. })));
    }

    #[test]
    fn test_parse_career_without_rows_is_zeroed() {
        let career = set(
            "CareerTotalsRegularSeason",
            &["GP", "MIN", "PTS", "REB", "AST", "STL", "BLK", "FG_PCT", "FG3_PCT", "FT_PCT"],
            vec![],
        );

        let stats = parse_career(&career, 9, PerMode::Totals).unwrap();
        assert_eq!(stats.games_played, 0);
        assert_eq!(stats.points, 0.0);
    }

    #[test]
    fn test_parse_career_totals() {
        let career = set(
            "CareerTotalsRegularSeason",
            &["GP", "MIN", "PTS", "REB", "AST", "STL", "BLK", "FG_PCT", "FG3_PCT", "FT_PCT"],
            vec![vec![
                json!(1000),
                json!(35000.0),
                json!(25000),
                json!(7000),
                json!(6500),
                json!(1200),
                json!(600),
                json!(0.47),
                json!(0.35),
                json!(0.81),
            ]],
        );

        let stats = parse_career(&career, 2544, PerMode::Totals).unwrap();
        assert_eq!(stats.games_played, 1000);
        assert_eq!(stats.points, 25000.0);
        assert_eq!(stats.ft_pct, 0.81);
    }
}
