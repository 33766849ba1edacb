use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use nfl_edge::schedule_fetch;
use nfl_edge::schedule_store;

const DEFAULT_SEASON_SPAN: u16 = 7;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let seasons = parse_seasons_arg().unwrap_or_else(default_seasons);
    if seasons.is_empty() {
        return Err(anyhow!("no seasons resolved for ingest"));
    }

    let db_path = parse_db_path_arg()
        .or_else(schedule_store::default_db_path)
        .context("unable to resolve sqlite path")?;

    let mut conn = schedule_store::open_db(&db_path)?;
    let summary = schedule_fetch::ingest_seasons(&mut conn, db_path.clone(), &seasons)?;

    println!("Historical ingest complete");
    println!("DB: {}", summary.db_path.display());
    println!("Seasons: {:?}", summary.seasons);
    println!(
        "Succeeded: {}/{}",
        summary.seasons_succeeded, summary.seasons_total
    );
    println!("Games upserted: {}", summary.games_upserted);
    println!("Team codes skipped: {}", summary.teams_skipped);
    if !summary.errors.is_empty() {
        println!("Errors: {}", summary.errors.len());
        for err in summary.errors.iter().take(8) {
            println!(" - {err}");
        }
    }

    Ok(())
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

/// Accepts `--seasons 2018-2024` or `--seasons 2022,2023,2024`.
fn parse_seasons_arg() -> Option<Vec<u16>> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix("--seasons=") {
            let seasons = parse_seasons(raw);
            if !seasons.is_empty() {
                return Some(seasons);
            }
        }
        if arg == "--seasons" {
            if let Some(next) = args.get(idx + 1) {
                let seasons = parse_seasons(next);
                if !seasons.is_empty() {
                    return Some(seasons);
                }
            }
        }
    }
    None
}

fn parse_seasons(raw: &str) -> Vec<u16> {
    let raw = raw.trim();
    if let Some((from, to)) = raw.split_once('-') {
        if let (Ok(from), Ok(to)) = (from.trim().parse::<u16>(), to.trim().parse::<u16>()) {
            if from <= to {
                return (from..=to).collect();
            }
        }
        return Vec::new();
    }
    let mut out: Vec<u16> = raw
        .split([',', ';', ' '])
        .filter_map(|part| part.trim().parse::<u16>().ok())
        .collect();
    out.sort_unstable();
    out.dedup();
    out
}

fn default_seasons() -> Vec<u16> {
    let current = {
        use chrono::Datelike;
        let today = chrono::Utc::now().date_naive();
        let year = today.year() as u16;
        if today.month() >= 8 { year } else { year - 1 }
    };
    ((current - DEFAULT_SEASON_SPAN + 1)..=current).collect()
}
