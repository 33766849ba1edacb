use nfl_edge::rollup;
use nfl_edge::synthetic;
use nfl_edge::team_log;

#[test]
fn removing_future_weeks_leaves_earlier_rollups_untouched() {
    let games = synthetic::synthetic_schedule(3, 2022..=2022, None);
    let full_log = team_log::build_team_game_log(&games);
    let full = rollup::rollup(&full_log, 4);
    let full_index = rollup::index_by_game(&full);

    let truncated: Vec<_> = games.iter().filter(|g| g.week <= 15).cloned().collect();
    let trunc_log = team_log::build_team_game_log(&truncated);
    let trunc = rollup::rollup(&trunc_log, 4);

    for row in &trunc {
        let key = (row.base.game_id.as_str(), row.base.team.as_str());
        let other = full_index.get(&key).expect("row present in full rollup");
        assert_eq!(row.trailing, other.trailing);
        assert_eq!(row.season_to_date, other.season_to_date);
        assert_eq!(row.prior_games, other.prior_games);
    }
}

#[test]
fn mutating_a_late_score_leaves_earlier_rollups_untouched() {
    let games = synthetic::synthetic_schedule(5, 2022..=2022, None);
    let base = rollup::rollup(&team_log::build_team_game_log(&games), 4);

    let mut mutated = games.clone();
    for g in mutated.iter_mut().filter(|g| g.week == 17) {
        g.home_score = g.home_score.map(|s| s + 21);
    }
    let changed = rollup::rollup(&team_log::build_team_game_log(&mutated), 4);

    let base_index = rollup::index_by_game(&base);
    for row in changed.iter().filter(|r| r.base.week <= 16) {
        let key = (row.base.game_id.as_str(), row.base.team.as_str());
        let other = base_index.get(&key).expect("row present in base rollup");
        assert_eq!(row.trailing, other.trailing);
        assert_eq!(row.season_to_date, other.season_to_date);
    }
}

#[test]
fn season_openers_inherit_the_league_average() {
    let games = synthetic::synthetic_schedule(8, 2022..=2022, None);
    let log = team_log::build_team_game_log(&games);
    let rolled = rollup::rollup(&log, 4);

    // Every team's first available points_for is its week-1 score.
    let week1: Vec<f64> = log
        .iter()
        .filter(|r| r.week == 1)
        .filter_map(|r| r.points_for)
        .collect();
    assert_eq!(week1.len(), 32);
    let league_mean = week1.iter().sum::<f64>() / week1.len() as f64;

    for row in rolled.iter().filter(|r| r.base.week == 1) {
        assert_eq!(row.prior_games, 0);
        let trailing = row.trailing.get("points_for").expect("filled, not null");
        let expanding = row.season_to_date.get("points_for").expect("filled, not null");
        assert!((trailing - league_mean).abs() < 1e-9);
        assert!((expanding - league_mean).abs() < 1e-9);
        assert!(*trailing != 0.0, "fallback must not be a silent zero");
    }
}

#[test]
fn new_season_expanding_stats_reset_but_trailing_carries_over() {
    let games = synthetic::synthetic_schedule(13, 2022..=2023, None);
    let log = team_log::build_team_game_log(&games);
    let rolled = rollup::rollup(&log, 4);

    let opener_2023: Vec<f64> = log
        .iter()
        .filter(|r| r.season == 2023 && r.week == 1)
        .filter_map(|r| r.points_for)
        .collect();
    let league_mean_2023 = opener_2023.iter().sum::<f64>() / opener_2023.len() as f64;

    for row in rolled
        .iter()
        .filter(|r| r.base.season == 2023 && r.base.week == 1)
    {
        // No 2023 history yet: expanding falls back to the 2023 cross-team
        // mean while the trailing window still sees late-2022 games.
        assert_eq!(row.prior_games, 0);
        let expanding = row.season_to_date.get("points_for").unwrap();
        assert!((expanding - league_mean_2023).abs() < 1e-9);

        let team = &row.base.team;
        let late_2022: Vec<f64> = log
            .iter()
            .filter(|r| r.team == *team && r.season == 2022 && r.week > 14)
            .filter_map(|r| r.points_for)
            .collect();
        assert_eq!(late_2022.len(), 4);
        let expected = late_2022.iter().sum::<f64>() / late_2022.len() as f64;
        let trailing = row.trailing.get("points_for").unwrap();
        assert!((trailing - expected).abs() < 1e-9);
    }
}
