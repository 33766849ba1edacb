use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::schedule_store::GameRecord;
use crate::teams;

/// One team's perspective of one game. Every `GameRecord` produces exactly
/// two of these (home and away).
#[derive(Debug, Clone, PartialEq)]
pub struct TeamGameRow {
    pub game_id: String,
    pub team: String,
    pub opp: String,
    pub season: u16,
    pub week: u8,
    pub gameday: Option<NaiveDate>,
    pub is_home: bool,
    pub points_for: Option<f64>,
    pub points_against: Option<f64>,
    pub margin: Option<f64>,
    pub played: bool,
    /// Play-level efficiency metrics (EPA/play, success rate, ...) joined by
    /// (game_id, team). Absent metrics stay absent rather than zero.
    pub metrics: BTreeMap<String, f64>,
}

impl TeamGameRow {
    /// Within-team chronological ordering key, ties broken by opponent code.
    pub fn chron_key(&self) -> (u16, u8, Option<NaiveDate>, &str) {
        (self.season, self.week, self.gameday, self.opp.as_str())
    }
}

/// Per-team per-game efficiency metrics from the play-level source.
#[derive(Debug, Clone, Deserialize)]
pub struct TeamGameMetrics {
    pub game_id: String,
    pub team: String,
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
}

#[derive(Debug)]
pub struct MetricsLoad {
    pub rows: Vec<TeamGameMetrics>,
    pub skipped_teams: usize,
}

/// Reshape game-level records into team-perspective rows. Records without
/// scores pass through with null points and `played = false`; upcoming games
/// legitimately look like that. Output order is unspecified.
pub fn build_team_game_log(games: &[GameRecord]) -> Vec<TeamGameRow> {
    let mut out = Vec::with_capacity(games.len() * 2);
    for g in games {
        out.push(perspective_row(g, true));
        out.push(perspective_row(g, false));
    }
    out
}

fn perspective_row(g: &GameRecord, is_home: bool) -> TeamGameRow {
    let (team, opp, pf, pa) = if is_home {
        (&g.home_team, &g.away_team, g.home_score, g.away_score)
    } else {
        (&g.away_team, &g.home_team, g.away_score, g.home_score)
    };
    let points_for = pf.map(f64::from);
    let points_against = pa.map(f64::from);
    let margin = match (points_for, points_against) {
        (Some(f), Some(a)) => Some(f - a),
        _ => None,
    };
    TeamGameRow {
        game_id: g.game_id.clone(),
        team: team.clone(),
        opp: opp.clone(),
        season: g.season,
        week: g.week,
        gameday: g.gameday,
        is_home,
        points_for,
        points_against,
        played: margin.is_some(),
        margin,
        metrics: BTreeMap::new(),
    }
}

/// Join play-level metrics onto the log by (game_id, team). Rows with no
/// matching metrics are left untouched.
pub fn attach_metrics(rows: &mut [TeamGameRow], metrics: &[TeamGameMetrics]) {
    let mut by_key: HashMap<(&str, &str), &TeamGameMetrics> = HashMap::new();
    for m in metrics {
        by_key.insert((m.game_id.as_str(), m.team.as_str()), m);
    }
    for row in rows.iter_mut() {
        if let Some(m) = by_key.get(&(row.game_id.as_str(), row.team.as_str())) {
            for (name, value) in &m.metrics {
                row.metrics.insert(name.clone(), *value);
            }
        }
    }
}

/// Load a metrics JSON file (array of {game_id, team, metrics}), folding
/// team labels to canonical codes. Unresolvable teams are dropped and
/// counted, never fatal for the batch.
pub fn load_metrics_file(path: &Path) -> Result<MetricsLoad> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read metrics file {}", path.display()))?;
    let parsed: Vec<TeamGameMetrics> =
        serde_json::from_str(&raw).context("invalid metrics json")?;

    let mut rows = Vec::with_capacity(parsed.len());
    let mut skipped_teams = 0usize;
    for mut m in parsed {
        match teams::resolve_team(&m.team) {
            Ok(code) => {
                m.team = code;
                rows.push(m);
            }
            Err(_) => skipped_teams += 1,
        }
    }
    Ok(MetricsLoad {
        rows,
        skipped_teams,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(id: &str, home_score: Option<i32>, away_score: Option<i32>) -> GameRecord {
        GameRecord {
            game_id: id.to_string(),
            season: 2023,
            week: 1,
            gameday: NaiveDate::from_ymd_opt(2023, 9, 10),
            home_team: "KC".to_string(),
            away_team: "DET".to_string(),
            home_score,
            away_score,
        }
    }

    #[test]
    fn every_game_yields_home_and_away_rows() {
        let rows = build_team_game_log(&[game("g1", Some(20), Some(21))]);
        assert_eq!(rows.len(), 2);

        let home = rows.iter().find(|r| r.is_home).unwrap();
        let away = rows.iter().find(|r| !r.is_home).unwrap();
        assert_eq!(home.team, "KC");
        assert_eq!(home.opp, "DET");
        assert_eq!(home.margin, Some(-1.0));
        assert_eq!(away.team, "DET");
        assert_eq!(away.margin, Some(1.0));
        assert!(home.played && away.played);
    }

    #[test]
    fn unscored_games_pass_through_unplayed() {
        let rows = build_team_game_log(&[game("g2", None, None)]);
        for row in &rows {
            assert!(!row.played);
            assert_eq!(row.points_for, None);
            assert_eq!(row.margin, None);
        }
    }

    #[test]
    fn metrics_join_by_game_and_team() {
        let mut rows = build_team_game_log(&[game("g3", Some(31), Some(17))]);
        let metrics = vec![TeamGameMetrics {
            game_id: "g3".to_string(),
            team: "KC".to_string(),
            metrics: BTreeMap::from([("epa_per_play".to_string(), 0.12)]),
        }];
        attach_metrics(&mut rows, &metrics);

        let home = rows.iter().find(|r| r.is_home).unwrap();
        let away = rows.iter().find(|r| !r.is_home).unwrap();
        assert_eq!(home.metrics.get("epa_per_play"), Some(&0.12));
        assert!(away.metrics.is_empty());
    }
}
