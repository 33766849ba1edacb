use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, params};

use crate::http_cache::app_cache_dir;

const DATE_FMT: &str = "%Y-%m-%d";

/// One scheduled or completed game. Scores are absent for future games;
/// that is the normal upcoming-week shape, not an error.
#[derive(Debug, Clone, PartialEq)]
pub struct GameRecord {
    pub game_id: String,
    pub season: u16,
    pub week: u8,
    pub gameday: Option<NaiveDate>,
    pub home_team: String,
    pub away_team: String,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
}

impl GameRecord {
    pub fn completed(&self) -> bool {
        self.home_score.is_some() && self.away_score.is_some()
    }

    /// Ties count as a home loss, matching the binary outcome the rating
    /// model trains on.
    pub fn home_won(&self) -> Option<bool> {
        match (self.home_score, self.away_score) {
            (Some(h), Some(a)) => Some(h > a),
            _ => None,
        }
    }

    pub fn home_margin(&self) -> Option<f64> {
        match (self.home_score, self.away_score) {
            (Some(h), Some(a)) => Some(f64::from(h) - f64::from(a)),
            _ => None,
        }
    }

    /// Deterministic chronological ordering key. Gameday only breaks ties
    /// inside a week; the team codes make the order total.
    pub fn chron_key(&self) -> (u16, u8, Option<NaiveDate>, &str, &str) {
        (
            self.season,
            self.week,
            self.gameday,
            self.away_team.as_str(),
            self.home_team.as_str(),
        )
    }

    pub fn fallback_game_id(season: u16, week: u8, away: &str, home: &str) -> String {
        format!("{season}_{week:02}_{away}_{home}")
    }
}

pub fn default_db_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join("nfl_games.sqlite"))
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS games (
            game_id TEXT PRIMARY KEY,
            season INTEGER NOT NULL,
            week INTEGER NOT NULL,
            gameday TEXT NULL,
            home_team TEXT NOT NULL,
            away_team TEXT NOT NULL,
            home_score INTEGER NULL,
            away_score INTEGER NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_games_season ON games(season);
        CREATE INDEX IF NOT EXISTS idx_games_season_week ON games(season, week);
        CREATE INDEX IF NOT EXISTS idx_games_gameday ON games(gameday);

        CREATE TABLE IF NOT EXISTS ingest_runs (
            run_id INTEGER PRIMARY KEY AUTOINCREMENT,
            started_at TEXT NOT NULL,
            finished_at TEXT NULL,
            seasons_total INTEGER NOT NULL,
            seasons_succeeded INTEGER NOT NULL,
            games_upserted INTEGER NOT NULL,
            teams_skipped INTEGER NOT NULL,
            errors_json TEXT NOT NULL
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

pub fn upsert_game(tx: &rusqlite::Transaction<'_>, g: &GameRecord) -> Result<()> {
    tx.execute(
        r#"
        INSERT INTO games (
            game_id, season, week, gameday,
            home_team, away_team, home_score, away_score, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(game_id) DO UPDATE SET
            season = excluded.season,
            week = excluded.week,
            gameday = excluded.gameday,
            home_team = excluded.home_team,
            away_team = excluded.away_team,
            home_score = excluded.home_score,
            away_score = excluded.away_score,
            updated_at = excluded.updated_at
        "#,
        params![
            g.game_id,
            i64::from(g.season),
            i64::from(g.week),
            g.gameday.map(|d| d.format(DATE_FMT).to_string()),
            g.home_team,
            g.away_team,
            g.home_score,
            g.away_score,
            Utc::now().to_rfc3339(),
        ],
    )
    .context("upsert game")?;
    Ok(())
}

/// Load every stored game, chronologically ordered with the same tiebreak
/// as `GameRecord::chron_key`.
pub fn load_games(conn: &Connection) -> Result<Vec<GameRecord>> {
    load_where(conn, "1 = 1", &[])
}

pub fn load_completed_games(conn: &Connection) -> Result<Vec<GameRecord>> {
    load_where(
        conn,
        "home_score IS NOT NULL AND away_score IS NOT NULL",
        &[],
    )
}

fn load_where(
    conn: &Connection,
    clause: &str,
    bind: &[&dyn rusqlite::ToSql],
) -> Result<Vec<GameRecord>> {
    let sql = format!(
        r#"
        SELECT game_id, season, week, gameday,
               home_team, away_team, home_score, away_score
        FROM games
        WHERE {clause}
        ORDER BY season ASC, week ASC, gameday ASC, away_team ASC, home_team ASC
        "#
    );
    let mut stmt = conn.prepare(&sql).context("prepare games query")?;
    let rows = stmt
        .query_map(bind, |row| {
            Ok(GameRecord {
                game_id: row.get(0)?,
                season: row.get::<_, i64>(1)? as u16,
                week: row.get::<_, i64>(2)? as u8,
                gameday: row
                    .get::<_, Option<String>>(3)?
                    .and_then(|s| NaiveDate::parse_from_str(&s, DATE_FMT).ok()),
                home_team: row.get(4)?,
                away_team: row.get(5)?,
                home_score: row.get(6)?,
                away_score: row.get(7)?,
            })
        })
        .context("query games")?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode game row")?);
    }
    Ok(out)
}

pub fn record_ingest_run_start(conn: &Connection, seasons_total: usize) -> Result<i64> {
    conn.execute(
        "INSERT INTO ingest_runs(started_at, finished_at, seasons_total, seasons_succeeded, games_upserted, teams_skipped, errors_json)
         VALUES (?1, NULL, ?2, 0, 0, 0, '[]')",
        params![Utc::now().to_rfc3339(), seasons_total as i64],
    )
    .context("insert ingest run")?;
    Ok(conn.last_insert_rowid())
}

pub fn record_ingest_run_finish(
    conn: &Connection,
    run_id: i64,
    seasons_succeeded: usize,
    games_upserted: usize,
    teams_skipped: usize,
    errors: &[String],
) -> Result<()> {
    let errors_json = serde_json::to_string(errors).unwrap_or_else(|_| "[]".to_string());
    conn.execute(
        "UPDATE ingest_runs
         SET finished_at = ?1, seasons_succeeded = ?2, games_upserted = ?3, teams_skipped = ?4, errors_json = ?5
         WHERE run_id = ?6",
        params![
            Utc::now().to_rfc3339(),
            seasons_succeeded as i64,
            games_upserted as i64,
            teams_skipped as i64,
            errors_json,
            run_id
        ],
    )
    .context("update ingest run")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(id: &str, season: u16, week: u8, home: &str, away: &str) -> GameRecord {
        GameRecord {
            game_id: id.to_string(),
            season,
            week,
            gameday: NaiveDate::from_ymd_opt(i32::from(season), 9, 7),
            home_team: home.to_string(),
            away_team: away.to_string(),
            home_score: Some(24),
            away_score: Some(17),
        }
    }

    #[test]
    fn upsert_then_load_round_trips_in_chronological_order() {
        let mut conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let tx = conn.transaction().unwrap();
        upsert_game(&tx, &game("b", 2023, 2, "KC", "DET")).unwrap();
        upsert_game(&tx, &game("a", 2023, 1, "BUF", "NYJ")).unwrap();
        tx.commit().unwrap();

        let rows = load_games(&conn).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].game_id, "a");
        assert_eq!(rows[1].game_id, "b");
        assert!(rows[0].completed());
        assert_eq!(rows[0].home_won(), Some(true));
    }

    #[test]
    fn upsert_replaces_scores_for_same_game_id() {
        let mut conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let mut g = game("x", 2024, 5, "PHI", "DAL");
        g.home_score = None;
        g.away_score = None;
        let tx = conn.transaction().unwrap();
        upsert_game(&tx, &g).unwrap();
        tx.commit().unwrap();
        assert!(load_completed_games(&conn).unwrap().is_empty());

        g.home_score = Some(28);
        g.away_score = Some(23);
        let tx = conn.transaction().unwrap();
        upsert_game(&tx, &g).unwrap();
        tx.commit().unwrap();

        let rows = load_games(&conn).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].home_margin(), Some(5.0));
    }

    #[test]
    fn tie_counts_as_home_loss() {
        let mut g = game("t", 2022, 1, "IND", "HOU");
        g.home_score = Some(20);
        g.away_score = Some(20);
        assert_eq!(g.home_won(), Some(false));
        assert_eq!(g.home_margin(), Some(0.0));
    }
}
