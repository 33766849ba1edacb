use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use nfl_edge::config::PipelineConfig;
use nfl_edge::eval;
use nfl_edge::margin_model;
use nfl_edge::rating;
use nfl_edge::rollup;
use nfl_edge::schedule_store::{self, GameRecord};
use nfl_edge::synthetic;
use nfl_edge::team_log;

const MIN_TRAIN_GAMES: usize = 200;
const CALIBRATION_BINS: usize = 10;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cfg = PipelineConfig::from_env();

    let completed = if has_flag("--synthetic") {
        synthetic::synthetic_schedule(42, 2019..=2023, None)
    } else {
        let db_path = parse_db_path_arg()
            .or_else(schedule_store::default_db_path)
            .context("unable to resolve sqlite path")?;
        let conn = schedule_store::open_db(&db_path)?;
        schedule_store::load_completed_games(&conn)?
    };
    if completed.len() < MIN_TRAIN_GAMES * 2 {
        return Err(anyhow!(
            "need at least {} completed games, have {}",
            MIN_TRAIN_GAMES * 2,
            completed.len()
        ));
    }

    let mut completed = completed;
    completed.sort_by(|a, b| a.chron_key().cmp(&b.chron_key()));

    // Rollups over the whole log are walk-forward safe by construction:
    // index k only ever sees rows before k.
    let log = team_log::build_team_game_log(&completed);
    let rolled = rollup::rollup(&log, cfg.window);
    let rollup_index = rollup::index_by_game(&rolled);
    let metric_names = rollup::metric_names(&log);
    let feature_names = rollup::feature_names(&metric_names, cfg.window);

    let mut elo_probs = Vec::new();
    let mut elo_outcomes = Vec::new();
    let mut margin_probs = Vec::new();
    let mut margin_outcomes = Vec::new();
    let mut slates = 0usize;

    for (start, end) in week_boundaries(&completed) {
        if start < MIN_TRAIN_GAMES {
            continue;
        }
        let train = &completed[..start];
        let slate = &completed[start..end];
        slates += 1;

        let book = rating::train(train, cfg.rating_config());
        for game in slate {
            let Some(home_won) = game.home_won() else {
                continue;
            };
            elo_probs.push(rating::expected_home_win_prob(
                book.get(&game.home_team),
                book.get(&game.away_team),
                cfg.elo_home_adv,
            ));
            elo_outcomes.push(home_won);
        }

        let (x, y) = margin_model::training_rows(train, &rollup_index, &metric_names);
        let Ok(model) = margin_model::fit(&feature_names, &x, &y, cfg.fit_config()) else {
            continue;
        };
        let mut slate_rows = Vec::new();
        let mut slate_outcomes = Vec::new();
        for game in slate {
            let Some(home_won) = game.home_won() else {
                continue;
            };
            let home = rollup_index.get(&(game.game_id.as_str(), game.home_team.as_str()));
            let away = rollup_index.get(&(game.game_id.as_str(), game.away_team.as_str()));
            let (Some(home), Some(away)) = (home, away) else {
                continue;
            };
            let Some(row) = rollup::diff_features(home, away, &metric_names) else {
                continue;
            };
            slate_rows.push(row);
            slate_outcomes.push(home_won);
        }
        let margins = margin_model::predict(&model, &feature_names, &slate_rows)?;
        for (margin, home_won) in margins.iter().zip(&slate_outcomes) {
            margin_probs.push(margin_model::margin_to_prob(*margin, model.sigma));
            margin_outcomes.push(*home_won);
        }
    }

    let elo = eval::evaluate_probs(&elo_probs, &elo_outcomes);
    let margin = eval::evaluate_probs(&margin_probs, &margin_outcomes);

    println!(
        "Walk-forward backtest: {} slates, window {}, alpha {}",
        slates, cfg.window, cfg.ridge_alpha
    );
    println!(
        "{:<10} {:>7} {:>8} {:>9} {:>7} {:>7}",
        "model", "games", "brier", "logloss", "acc", "ece"
    );
    print_model_row("elo", elo, &elo_probs, &elo_outcomes);
    print_model_row("margin", margin, &margin_probs, &margin_outcomes);

    println!();
    println!("Calibration (margin model, {CALIBRATION_BINS} bins):");
    for bin in eval::calibration_bins(&margin_probs, &margin_outcomes, CALIBRATION_BINS) {
        if bin.count == 0 {
            continue;
        }
        println!(
            "  {:.2}-{:.2}  n={:<5} pred={:.3} actual={:.3}",
            bin.bucket_start, bin.bucket_end, bin.count, bin.avg_pred, bin.actual_rate
        );
    }

    Ok(())
}

fn print_model_row(name: &str, m: eval::Metrics, probs: &[f64], outcomes: &[bool]) {
    println!(
        "{:<10} {:>7} {:>8.4} {:>9.4} {:>7.3} {:>7.3}",
        name,
        m.samples,
        m.brier,
        m.log_loss,
        m.accuracy,
        eval::expected_calibration_error(probs, outcomes, CALIBRATION_BINS)
    );
}

/// Contiguous index ranges of the chronologically sorted games, one per
/// (season, week).
fn week_boundaries(games: &[GameRecord]) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    let mut start = 0usize;
    for idx in 1..=games.len() {
        let boundary = idx == games.len()
            || (games[idx].season, games[idx].week) != (games[start].season, games[start].week);
        if boundary {
            out.push((start, idx));
            start = idx;
        }
    }
    out
}

fn has_flag(flag: &str) -> bool {
    std::env::args().skip(1).any(|arg| arg == flag)
}

fn parse_db_path_arg() -> Option<PathBuf> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix("--db=") {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == "--db" {
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
