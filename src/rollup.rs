use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use rayon::prelude::*;

use crate::team_log::TeamGameRow;

pub const DEFAULT_WINDOW: usize = 5;

/// A `TeamGameRow` augmented with trailing-window and season-to-date means.
/// Invariant: every aggregate at chronological index k is a function of rows
/// strictly before k; the current game never feeds its own features.
#[derive(Debug, Clone, PartialEq)]
pub struct RollupRow {
    pub base: TeamGameRow,
    pub trailing: BTreeMap<String, f64>,
    pub season_to_date: BTreeMap<String, f64>,
    /// Prior games played by this team in this season.
    pub prior_games: u32,
}

/// Metric names present anywhere in the input, score-derived metrics first.
/// A metric with no values at all stays out of the list so callers can tell
/// a missing input from a zero one.
pub fn metric_names(rows: &[TeamGameRow]) -> Vec<String> {
    let mut names = BTreeSet::new();
    for row in rows {
        if row.points_for.is_some() {
            names.insert("points_for".to_string());
        }
        if row.points_against.is_some() {
            names.insert("points_against".to_string());
        }
        if row.margin.is_some() {
            names.insert("margin".to_string());
        }
        for key in row.metrics.keys() {
            names.insert(key.clone());
        }
    }
    names.into_iter().collect()
}

/// Compute trailing and season-to-date rollups for every row.
///
/// Rows are grouped by team and sorted by (season, week, gameday, opp), so
/// the output is bit-for-bit reproducible for identical input. Teams are
/// independent of each other, which makes the per-team pass safe to fan out.
/// Rows with no usable history fall back to that season's league-wide mean
/// (computed from every team's first available value), never to zero.
pub fn rollup(rows: &[TeamGameRow], window: usize) -> Vec<RollupRow> {
    let window = window.max(1);
    let names = metric_names(rows);

    let mut by_team: HashMap<&str, Vec<&TeamGameRow>> = HashMap::new();
    for row in rows {
        by_team.entry(row.team.as_str()).or_default().push(row);
    }
    let mut groups: Vec<(&str, Vec<&TeamGameRow>)> = by_team.into_iter().collect();
    groups.sort_by(|a, b| a.0.cmp(b.0));
    for (_, group) in groups.iter_mut() {
        group.sort_by(|a, b| a.chron_key().cmp(&b.chron_key()));
    }

    let league_means = league_first_value_means(&groups, &names);

    let rolled: Vec<Vec<RollupRow>> = groups
        .par_iter()
        .map(|(_, group)| rollup_team(group, window, &names, &league_means))
        .collect();

    rolled.into_iter().flatten().collect()
}

fn rollup_team(
    group: &[&TeamGameRow],
    window: usize,
    names: &[String],
    league_means: &HashMap<(u16, String), f64>,
) -> Vec<RollupRow> {
    let mut out = Vec::with_capacity(group.len());
    for (k, row) in group.iter().enumerate() {
        let window_start = k.saturating_sub(window);
        let mut trailing = BTreeMap::new();
        let mut season_to_date = BTreeMap::new();

        for name in names {
            let recent: Vec<f64> = group[window_start..k]
                .iter()
                .filter_map(|r| metric_value(r, name))
                .collect();
            let trail = if recent.is_empty() {
                league_means.get(&(row.season, name.clone())).copied()
            } else {
                Some(mean(&recent))
            };
            if let Some(v) = trail {
                trailing.insert(name.clone(), v);
            }

            let season_vals: Vec<f64> = group[..k]
                .iter()
                .filter(|r| r.season == row.season)
                .filter_map(|r| metric_value(r, name))
                .collect();
            let expanding = if season_vals.is_empty() {
                league_means.get(&(row.season, name.clone())).copied()
            } else {
                Some(mean(&season_vals))
            };
            if let Some(v) = expanding {
                season_to_date.insert(name.clone(), v);
            }
        }

        let prior_games = group[..k]
            .iter()
            .filter(|r| r.season == row.season && r.played)
            .count() as u32;

        out.push(RollupRow {
            base: (*row).clone(),
            trailing,
            season_to_date,
            prior_games,
        });
    }
    out
}

/// Cross-sectional fallback: per (season, metric), the mean of each team's
/// first available value that season.
fn league_first_value_means(
    groups: &[(&str, Vec<&TeamGameRow>)],
    names: &[String],
) -> HashMap<(u16, String), f64> {
    let mut firsts: HashMap<(u16, String), Vec<f64>> = HashMap::new();
    for (_, group) in groups {
        for name in names {
            let mut seen_seasons: HashSet<u16> = HashSet::new();
            for row in group {
                if seen_seasons.contains(&row.season) {
                    continue;
                }
                if let Some(v) = metric_value(row, name) {
                    firsts
                        .entry((row.season, name.clone()))
                        .or_default()
                        .push(v);
                    seen_seasons.insert(row.season);
                }
            }
        }
    }
    firsts
        .into_iter()
        .map(|(key, vals)| {
            let m = mean(&vals);
            (key, m)
        })
        .collect()
}

fn metric_value(row: &TeamGameRow, name: &str) -> Option<f64> {
    match name {
        "points_for" => row.points_for,
        "points_against" => row.points_against,
        "margin" => row.margin,
        _ => row.metrics.get(name).copied(),
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Model feature names for home-minus-away trailing differentials. The
/// window is baked into the name so a fitted model refuses features built
/// with a different one.
pub fn feature_names(metric_names: &[String], window: usize) -> Vec<String> {
    metric_names
        .iter()
        .map(|m| format!("diff_{m}_last{window}"))
        .collect()
}

/// Home-minus-away trailing differentials, `None` when either side is
/// missing any requested metric (callers skip the game rather than imputing).
pub fn diff_features(
    home: &RollupRow,
    away: &RollupRow,
    metric_names: &[String],
) -> Option<Vec<f64>> {
    let mut out = Vec::with_capacity(metric_names.len());
    for name in metric_names {
        let h = home.trailing.get(name)?;
        let a = away.trailing.get(name)?;
        out.push(h - a);
    }
    Some(out)
}

pub fn index_by_game<'a>(rows: &'a [RollupRow]) -> HashMap<(&'a str, &'a str), &'a RollupRow> {
    let mut out = HashMap::with_capacity(rows.len());
    for row in rows {
        out.insert((row.base.game_id.as_str(), row.base.team.as_str()), row);
    }
    out
}
