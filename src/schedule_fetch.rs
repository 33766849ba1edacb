use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use serde_json::Value;

use crate::http_cache::fetch_json_cached;
use crate::http_client::http_client;
use crate::schedule_store::{self, GameRecord};
use crate::teams;

const SCOREBOARD_URL: &str = "https://site.api.espn.com/apis/site/v2/sports/football/nfl/scoreboard";

#[derive(Debug, Clone)]
pub struct ScoreboardPage {
    pub games: Vec<GameRecord>,
    pub skipped_teams: usize,
}

#[derive(Debug, Clone)]
pub struct IngestSummary {
    pub db_path: PathBuf,
    pub seasons: Vec<u16>,
    pub seasons_total: usize,
    pub seasons_succeeded: usize,
    pub games_upserted: usize,
    pub teams_skipped: usize,
    pub errors: Vec<String>,
}

/// 17-game seasons started in 2021.
pub fn regular_season_weeks(season: u16) -> u8 {
    if season >= 2021 { 18 } else { 17 }
}

fn scoreboard_url(season: u16, week: u8) -> String {
    format!("{SCOREBOARD_URL}?seasontype=2&week={week}&dates={season}")
}

pub fn fetch_week(season: u16, week: u8) -> Result<ScoreboardPage> {
    let client = http_client()?;
    let body = fetch_json_cached(client, &scoreboard_url(season, week))
        .context("scoreboard request failed")?;
    parse_scoreboard_json(&body, season, week)
}

pub fn fetch_season(season: u16) -> Result<(Vec<GameRecord>, usize, Vec<String>)> {
    let mut games = Vec::new();
    let mut skipped = 0usize;
    let mut errors = Vec::new();
    for week in 1..=regular_season_weeks(season) {
        match fetch_week(season, week) {
            Ok(page) => {
                skipped += page.skipped_teams;
                games.extend(page.games);
            }
            Err(err) => errors.push(format!("season {season} week {week}: {err}")),
        }
    }
    Ok((games, skipped, errors))
}

/// Fetch and upsert whole seasons, recording an audit row per run. One bad
/// week or one unmappable team never aborts the batch; failures are counted
/// and reported.
pub fn ingest_seasons(
    conn: &mut Connection,
    db_path: PathBuf,
    seasons: &[u16],
) -> Result<IngestSummary> {
    if seasons.is_empty() {
        return Err(anyhow!("no seasons passed to ingest"));
    }

    let run_id = schedule_store::record_ingest_run_start(conn, seasons.len())?;

    let mut seasons_succeeded = 0usize;
    let mut games_upserted = 0usize;
    let mut teams_skipped = 0usize;
    let mut errors: Vec<String> = Vec::new();

    for season in seasons {
        match fetch_season(*season) {
            Ok((games, skipped, week_errors)) => {
                teams_skipped += skipped;
                errors.extend(week_errors);
                if games.is_empty() {
                    errors.push(format!("season {season}: no games parsed"));
                    continue;
                }
                let tx = conn.transaction().context("begin ingest transaction")?;
                for game in &games {
                    schedule_store::upsert_game(&tx, game)?;
                    games_upserted += 1;
                }
                tx.commit().context("commit ingest transaction")?;
                seasons_succeeded += 1;
            }
            Err(err) => errors.push(format!("season {season}: {err}")),
        }
    }

    schedule_store::record_ingest_run_finish(
        conn,
        run_id,
        seasons_succeeded,
        games_upserted,
        teams_skipped,
        &errors,
    )?;

    Ok(IngestSummary {
        db_path,
        seasons: seasons.to_vec(),
        seasons_total: seasons.len(),
        seasons_succeeded,
        games_upserted,
        teams_skipped,
        errors,
    })
}

/// Parse one scoreboard payload. Events missing either competitor are
/// dropped; events with an unmappable team abbreviation are dropped and
/// counted. Unplayed games keep null scores.
pub fn parse_scoreboard_json(
    raw: &str,
    fallback_season: u16,
    fallback_week: u8,
) -> Result<ScoreboardPage> {
    let v: Value = serde_json::from_str(raw.trim()).context("invalid scoreboard json")?;
    let events = v
        .get("events")
        .and_then(|e| e.as_array())
        .ok_or_else(|| crate::error::EdgeError::MissingData("events".to_string()))?;

    let mut games = Vec::with_capacity(events.len());
    let mut skipped_teams = 0usize;
    for event in events {
        match parse_event(event, fallback_season, fallback_week) {
            Some(Ok(game)) => games.push(game),
            Some(Err(_)) => skipped_teams += 1,
            None => {}
        }
    }

    Ok(ScoreboardPage {
        games,
        skipped_teams,
    })
}

/// `None` for structurally unusable events, `Some(Err)` for team-code
/// resolution failures (counted upstream).
fn parse_event(
    event: &Value,
    fallback_season: u16,
    fallback_week: u8,
) -> Option<Result<GameRecord>> {
    let season = event
        .get("season")
        .and_then(|s| s.get("year"))
        .and_then(Value::as_u64)
        .and_then(|y| u16::try_from(y).ok())
        .unwrap_or(fallback_season);
    let week = event
        .get("week")
        .and_then(|w| w.get("number"))
        .and_then(Value::as_u64)
        .and_then(|n| u8::try_from(n).ok())
        .unwrap_or(fallback_week);
    let gameday = event
        .get("date")
        .and_then(Value::as_str)
        .and_then(parse_event_date);

    let competition = event.get("competitions")?.as_array()?.first()?;
    let competitors = competition.get("competitors")?.as_array()?;

    let completed = competition
        .get("status")
        .or_else(|| event.get("status"))
        .and_then(|s| s.get("type"))
        .and_then(|t| t.get("completed"))
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let mut home: Option<(String, Option<i32>)> = None;
    let mut away: Option<(String, Option<i32>)> = None;
    for competitor in competitors {
        let side = competitor.get("homeAway").and_then(Value::as_str)?;
        let abbr = competitor
            .get("team")
            .and_then(|t| t.get("abbreviation"))
            .and_then(Value::as_str)?;
        let code = match teams::normalize_code(abbr) {
            Ok(code) => code,
            Err(err) => return Some(Err(err.into())),
        };
        let score = if completed {
            competitor
                .get("score")
                .and_then(score_value)
        } else {
            None
        };
        match side {
            "home" => home = Some((code, score)),
            "away" => away = Some((code, score)),
            _ => {}
        }
    }

    let (home_team, home_score) = home?;
    let (away_team, away_score) = away?;
    let game_id = event
        .get("id")
        .and_then(Value::as_str)
        .map(|s| s.to_string())
        .unwrap_or_else(|| {
            GameRecord::fallback_game_id(season, week, &away_team, &home_team)
        });

    Some(Ok(GameRecord {
        game_id,
        season,
        week,
        gameday,
        home_team,
        away_team,
        home_score,
        away_score,
    }))
}

fn score_value(v: &Value) -> Option<i32> {
    if let Some(n) = v.as_i64() {
        return i32::try_from(n).ok();
    }
    let s = v.as_str()?.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<i32>().ok()
}

fn parse_event_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    for fmt in ["%Y-%m-%dT%H:%MZ", "%Y-%m-%dT%H:%M:%SZ"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_dates_parse_in_espn_and_plain_forms() {
        assert_eq!(
            parse_event_date("2024-09-06T00:20Z"),
            NaiveDate::from_ymd_opt(2024, 9, 6)
        );
        assert_eq!(
            parse_event_date("2024-09-06T00:20:00Z"),
            NaiveDate::from_ymd_opt(2024, 9, 6)
        );
        assert_eq!(
            parse_event_date("2024-09-06"),
            NaiveDate::from_ymd_opt(2024, 9, 6)
        );
        assert_eq!(parse_event_date("not a date"), None);
    }

    #[test]
    fn season_length_switched_in_2021() {
        assert_eq!(regular_season_weeks(2020), 17);
        assert_eq!(regular_season_weeks(2021), 18);
    }
}
