use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use chrono::{Datelike, Utc};

use nfl_edge::config::{self, PipelineConfig};
use nfl_edge::edge::{self, PickContext, PickRow};
use nfl_edge::export;
use nfl_edge::margin_model;
use nfl_edge::odds_fetch::{self, OddsFetchConfig};
use nfl_edge::rating;
use nfl_edge::rollup;
use nfl_edge::schedule_fetch;
use nfl_edge::schedule_store::{self, GameRecord};
use nfl_edge::team_log;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cfg = PipelineConfig::from_env();

    let db_path = parse_path_arg("--db")
        .or_else(schedule_store::default_db_path)
        .context("unable to resolve sqlite path")?;
    let mut conn = schedule_store::open_db(&db_path)?;

    let offline = has_flag("--offline");
    let season_arg = parse_u16_arg("--season");
    let week_arg = parse_u16_arg("--week").map(|w| w as u8);
    let xlsx_path = parse_path_arg("--xlsx");
    let metrics_path = parse_path_arg("--metrics");

    let mut games = schedule_store::load_games(&conn)?;
    if games.is_empty() {
        if offline {
            return Err(anyhow!("games db is empty; run hist_ingest first"));
        }
        let season = season_arg.unwrap_or_else(current_league_season);
        println!("[schedule] db empty, fetching season {season}");
        let summary = schedule_fetch::ingest_seasons(&mut conn, db_path.clone(), &[season])?;
        println!(
            "[schedule] upserted {} games ({} team codes skipped)",
            summary.games_upserted, summary.teams_skipped
        );
        games = schedule_store::load_games(&conn)?;
    }

    let (target_season, target_week) = match (season_arg, week_arg) {
        (Some(s), Some(w)) => (s, w),
        _ => infer_upcoming_slate(&games)
            .context("no unscored games in db; pass --season and --week")?,
    };
    println!("[picks] slate: season {target_season} week {target_week}");

    let slate: Vec<GameRecord> = games
        .iter()
        .filter(|g| g.season == target_season && g.week == target_week)
        .cloned()
        .collect();
    if slate.is_empty() {
        return Err(anyhow!(
            "no games stored for season {target_season} week {target_week}"
        ));
    }

    // Strictly earlier games only; the slate itself must never train.
    let train_games: Vec<GameRecord> = games
        .iter()
        .filter(|g| g.completed())
        .filter(|g| g.season >= cfg.train_season_from)
        .filter(|g| (g.season, g.week) < (target_season, target_week))
        .cloned()
        .collect();
    println!("[picks] training games: {}", train_games.len());

    let mut log = team_log::build_team_game_log(&games);
    if let Some(path) = metrics_path.as_ref() {
        let load = team_log::load_metrics_file(path)?;
        println!(
            "[metrics] loaded {} rows ({} team codes skipped)",
            load.rows.len(),
            load.skipped_teams
        );
        team_log::attach_metrics(&mut log, &load.rows);
    }
    let rolled = rollup::rollup(&log, cfg.window);
    let rollup_index = rollup::index_by_game(&rolled);
    let metric_names = rollup::metric_names(&log);

    let ratings = rating::train(&train_games, cfg.rating_config());
    println!("[ratings] trained {} teams", ratings.len());

    let feature_names = rollup::feature_names(&metric_names, cfg.window);
    let (x, y) = margin_model::training_rows(&train_games, &rollup_index, &metric_names);
    let model = match margin_model::fit(&feature_names, &x, &y, cfg.fit_config()) {
        Ok(model) => {
            if model.sigma_fallback {
                eprintln!(
                    "[model] degenerate fit: residual spread fell back to {:.1}",
                    model.sigma
                );
            }
            println!(
                "[model] fitted {} features on {} games, sigma {:.2}",
                model.feature_names.len(),
                model.samples,
                model.sigma
            );
            if let Err(err) = config::save_cached_model(&model) {
                eprintln!("[model] could not persist fitted model: {err}");
            }
            Some(model)
        }
        Err(err) => {
            eprintln!("[model] margin fit unavailable ({err}); trying last persisted fit");
            match config::load_cached_model() {
                Some(cached) if cached.feature_names == feature_names => {
                    println!(
                        "[model] using cached fit ({} games, sigma {:.2})",
                        cached.samples, cached.sigma
                    );
                    Some(cached)
                }
                _ => {
                    eprintln!("[model] no compatible cached fit; rating model only");
                    None
                }
            }
        }
    };

    let odds_cfg = OddsFetchConfig::from_env();
    let quotes = if offline || !odds_cfg.enabled {
        Default::default()
    } else {
        match odds_fetch::fetch_market_quotes(&slate, &odds_cfg) {
            Ok(quotes) => {
                println!("[odds] quotes matched for {} of {} games", quotes.len(), slate.len());
                quotes
            }
            Err(err) => {
                eprintln!("[odds] unavailable ({err}); pick sheet will omit market columns");
                Default::default()
            }
        }
    };

    let ctx = PickContext {
        ratings: &ratings,
        rating_cfg: cfg.rating_config(),
        model: model.as_ref(),
        rollups: &rollup_index,
        metric_names: &metric_names,
        window: cfg.window,
        quotes: &quotes,
        preferred_books: &cfg.preferred_books,
        kelly_cap: cfg.kelly_cap,
    };
    let rows = edge::build_pick_rows(&slate, &ctx)?;

    print_pick_sheet(&rows);

    if let Some(path) = xlsx_path {
        export::export_pick_sheet(&path, &rows)?;
        println!("[export] wrote {}", path.display());
    }

    Ok(())
}

fn print_pick_sheet(rows: &[PickRow]) {
    println!(
        "{:<14} {:>7} {:>7} {:>7} {:>7} {:>7} {:>7} {:>7} {:>7}",
        "matchup", "model%", "elo%", "spread", "line", "fair%", "edge", "stakeH", "stakeA"
    );
    for row in rows {
        println!(
            "{:<14} {:>7} {:>7} {:>7} {:>7} {:>7} {:>7} {:>7} {:>7}",
            format!("{}@{}", row.away_team, row.home_team),
            format!("{:.1}", row.model_home_prob * 100.0),
            format!("{:.1}", row.rating_home_prob * 100.0),
            row.model_margin
                .map(|m| format!("{m:+.1}"))
                .unwrap_or_else(|| "-".to_string()),
            row.home_line
                .map(|l| format!("{l:+.1}"))
                .unwrap_or_else(|| "-".to_string()),
            row.home_fair
                .map(|f| format!("{:.1}", f * 100.0))
                .unwrap_or_else(|| "-".to_string()),
            row.home_edge
                .map(|e| format!("{e:+.3}"))
                .unwrap_or_else(|| "-".to_string()),
            row.home_stake
                .map(|s| format!("{s:.3}"))
                .unwrap_or_else(|| "-".to_string()),
            row.away_stake
                .map(|s| format!("{s:.3}"))
                .unwrap_or_else(|| "-".to_string()),
        );
    }
}

/// Earliest (season, week) that still has an unscored game.
fn infer_upcoming_slate(games: &[GameRecord]) -> Option<(u16, u8)> {
    games
        .iter()
        .filter(|g| !g.completed())
        .map(|g| (g.season, g.week))
        .min()
}

/// The league year flips in the fall; January games belong to the prior
/// season.
fn current_league_season() -> u16 {
    let today = Utc::now().date_naive();
    let year = today.year() as u16;
    if today.month() >= 8 { year } else { year - 1 }
}

fn has_flag(flag: &str) -> bool {
    std::env::args().skip(1).any(|arg| arg == flag)
}

fn parse_path_arg(flag: &str) -> Option<PathBuf> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix(&prefix) {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == flag {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(PathBuf::from(next));
            }
        }
    }
    None
}

fn parse_u16_arg(flag: &str) -> Option<u16> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&prefix) {
            if let Ok(v) = raw.trim().parse::<u16>() {
                return Some(v);
            }
        }
        if arg == flag {
            if let Some(v) = args.get(idx + 1).and_then(|n| n.trim().parse::<u16>().ok()) {
                return Some(v);
            }
        }
    }
    None
}
