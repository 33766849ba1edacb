use std::collections::HashMap;

use crate::schedule_store::GameRecord;

pub const DEFAULT_RATING: f64 = 1500.0;

#[derive(Debug, Clone, Copy)]
pub struct RatingConfig {
    pub k: f64,
    /// Home-field advantage in rating points, added to the home rating
    /// before differencing.
    pub home_adv_pts: f64,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            k: 20.0,
            home_adv_pts: 55.0,
        }
    }
}

/// Per-team ratings owned by the training run. Rebuilt from scratch on each
/// call to `train`; there is no incremental update path.
#[derive(Debug, Clone, Default)]
pub struct RatingBook {
    ratings: HashMap<String, f64>,
}

impl RatingBook {
    /// A team never seen during training rates at the default. Policy, not
    /// an error.
    pub fn get(&self, team: &str) -> f64 {
        self.ratings.get(team).copied().unwrap_or(DEFAULT_RATING)
    }

    pub fn set(&mut self, team: &str, rating: f64) {
        self.ratings.insert(team.to_string(), rating);
    }

    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }
}

pub fn expected_home_win_prob(rating_home: f64, rating_away: f64, home_adv_pts: f64) -> f64 {
    let diff = (rating_home + home_adv_pts) - rating_away;
    1.0 / (1.0 + 10.0_f64.powf(-diff / 400.0))
}

/// Zero-sum rating update from one completed game.
pub fn update(
    rating_home: f64,
    rating_away: f64,
    home_won: bool,
    cfg: RatingConfig,
) -> (f64, f64) {
    let expected = expected_home_win_prob(rating_home, rating_away, cfg.home_adv_pts);
    let observed = if home_won { 1.0 } else { 0.0 };
    let delta = cfg.k * (observed - expected);
    (rating_home + delta, rating_away - delta)
}

/// Fold completed games in strict chronological order. Each update sees only
/// ratings produced by strictly earlier games, so this loop must stay
/// sequential. Unscored games are skipped.
pub fn train(games: &[GameRecord], cfg: RatingConfig) -> RatingBook {
    let mut ordered: Vec<&GameRecord> = games.iter().filter(|g| g.completed()).collect();
    ordered.sort_by(|a, b| a.chron_key().cmp(&b.chron_key()));

    let mut book = RatingBook::default();
    for g in ordered {
        let Some(home_won) = g.home_won() else {
            continue;
        };
        let eh = book.get(&g.home_team);
        let ea = book.get(&g.away_team);
        let (nh, na) = update(eh, ea, home_won, cfg);
        book.set(&g.home_team, nh);
        book.set(&g.away_team, na);
    }
    book
}
