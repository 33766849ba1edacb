use std::collections::HashMap;

use anyhow::Result;
use chrono::NaiveDate;

use crate::margin_model::{self, FittedModel};
use crate::odds::{self, MarketQuote};
use crate::rating::{self, RatingBook, RatingConfig};
use crate::rollup::{self, RollupRow};
use crate::schedule_store::GameRecord;

pub fn edge(model_prob: f64, market_fair_prob: f64) -> f64 {
    model_prob - market_fair_prob
}

/// Fractional Kelly stake, clipped to [0, cap]. Raw Kelly assumes the
/// probability is exactly right, which it never is here; the cap is the
/// caller's hedge against estimation error. Negative edges size to zero.
pub fn kelly_fraction(prob: f64, price: f64, cap: f64) -> f64 {
    let b = if price >= 0.0 {
        price / 100.0
    } else {
        100.0 / price.abs()
    };
    if b <= 0.0 || !b.is_finite() {
        return 0.0;
    }
    let f = (prob * (b + 1.0) - 1.0) / b;
    f.clamp(0.0, cap.max(0.0))
}

/// One pick-sheet row per upcoming game. `None` market fields flag games
/// with no usable quote; they are reported, not errored.
#[derive(Debug, Clone)]
pub struct PickRow {
    pub game_id: String,
    pub season: u16,
    pub week: u8,
    pub gameday: Option<NaiveDate>,
    pub home_team: String,
    pub away_team: String,
    pub rating_home_prob: f64,
    pub model_margin: Option<f64>,
    /// Margin-model probability when features exist, else the rating prob.
    pub model_home_prob: f64,
    pub home_price: Option<f64>,
    pub away_price: Option<f64>,
    pub home_fair: Option<f64>,
    pub away_fair: Option<f64>,
    pub home_line: Option<f64>,
    pub home_edge: Option<f64>,
    pub away_edge: Option<f64>,
    pub home_stake: Option<f64>,
    pub away_stake: Option<f64>,
}

pub struct PickContext<'a> {
    pub ratings: &'a RatingBook,
    pub rating_cfg: RatingConfig,
    pub model: Option<&'a FittedModel>,
    pub rollups: &'a HashMap<(&'a str, &'a str), &'a RollupRow>,
    pub metric_names: &'a [String],
    pub window: usize,
    pub quotes: &'a HashMap<String, Vec<MarketQuote>>,
    pub preferred_books: &'a [String],
    pub kelly_cap: f64,
}

/// Assemble the pick sheet for a slate of upcoming games. Feature
/// misalignment against the fitted model is fatal; everything else degrades
/// per game (missing rollups fall back to the rating estimator, missing
/// quotes leave the market columns empty).
pub fn build_pick_rows<'a>(
    upcoming: &'a [GameRecord],
    ctx: &PickContext<'a>,
) -> Result<Vec<PickRow>> {
    let feature_names = rollup::feature_names(ctx.metric_names, ctx.window);
    let mut out = Vec::with_capacity(upcoming.len());

    for game in upcoming {
        let rating_home_prob = rating::expected_home_win_prob(
            ctx.ratings.get(&game.home_team),
            ctx.ratings.get(&game.away_team),
            ctx.rating_cfg.home_adv_pts,
        );

        let mut model_margin = None;
        if let Some(model) = ctx.model {
            let home = ctx.rollups.get(&(game.game_id.as_str(), game.home_team.as_str()));
            let away = ctx.rollups.get(&(game.game_id.as_str(), game.away_team.as_str()));
            if let (Some(home), Some(away)) = (home, away) {
                if let Some(row) = rollup::diff_features(home, away, ctx.metric_names) {
                    let margin = margin_model::predict_one(model, &feature_names, &row)?;
                    model_margin = Some(margin);
                }
            }
        }
        let model_home_prob = match (model_margin, ctx.model) {
            (Some(margin), Some(model)) => margin_model::margin_to_prob(margin, model.sigma),
            _ => rating_home_prob,
        };

        let consensus = ctx
            .quotes
            .get(&game.game_id)
            .map(|qs| odds::consensus(qs, ctx.preferred_books))
            .unwrap_or_default();
        let (home_fair, away_fair) = odds::remove_vig(
            odds::price_to_prob(consensus.home_price),
            odds::price_to_prob(consensus.away_price),
        );

        let home_edge = home_fair.map(|fair| edge(model_home_prob, fair));
        let away_edge = away_fair.map(|fair| edge(1.0 - model_home_prob, fair));
        let home_stake = consensus
            .home_price
            .filter(|_| home_fair.is_some())
            .map(|price| kelly_fraction(model_home_prob, price, ctx.kelly_cap));
        let away_stake = consensus
            .away_price
            .filter(|_| away_fair.is_some())
            .map(|price| kelly_fraction(1.0 - model_home_prob, price, ctx.kelly_cap));

        out.push(PickRow {
            game_id: game.game_id.clone(),
            season: game.season,
            week: game.week,
            gameday: game.gameday,
            home_team: game.home_team.clone(),
            away_team: game.away_team.clone(),
            rating_home_prob,
            model_margin,
            model_home_prob,
            home_price: consensus.home_price,
            away_price: consensus.away_price,
            home_fair,
            away_fair,
            home_line: consensus.home_line,
            home_edge,
            away_edge,
            home_stake,
            away_stake,
        });
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kelly_concrete_scenario_hits_the_cap() {
        // 60% on -150: f* ≈ 0.50, well past a 5% cap.
        let f = kelly_fraction(0.60, -150.0, 0.05);
        assert!((f - 0.05).abs() < 1e-12);

        let uncapped = kelly_fraction(0.60, -150.0, 1.0);
        assert!((uncapped - 0.50).abs() < 0.005);
    }

    #[test]
    fn kelly_never_stakes_a_negative_edge() {
        assert_eq!(kelly_fraction(0.30, -150.0, 0.05), 0.0);
        assert_eq!(kelly_fraction(0.40, 100.0, 0.05), 0.0);
    }

    #[test]
    fn kelly_stays_inside_bounds_over_a_grid() {
        for prob in [0.0, 0.1, 0.35, 0.5, 0.65, 0.9, 1.0] {
            for price in [-400.0, -150.0, -110.0, 100.0, 130.0, 400.0] {
                let f = kelly_fraction(prob, price, 0.05);
                assert!((0.0..=0.05).contains(&f), "prob={prob} price={price} f={f}");
            }
        }
    }

    #[test]
    fn edge_is_signed_difference() {
        assert!((edge(0.60, 0.55) - 0.05).abs() < 1e-12);
        assert!(edge(0.50, 0.58) < 0.0);
    }
}
