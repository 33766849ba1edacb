use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use nfl_edge::config::PipelineConfig;
use nfl_edge::margin_model;
use nfl_edge::rating::{self, RatingConfig};
use nfl_edge::rollup;
use nfl_edge::synthetic;
use nfl_edge::team_log;

fn bench_rollup_five_seasons(c: &mut Criterion) {
    let games = synthetic::synthetic_schedule(21, 2019..=2023, None);
    let metrics = synthetic::synthetic_metrics(&games, 22);
    let mut log = team_log::build_team_game_log(&games);
    team_log::attach_metrics(&mut log, &metrics);

    c.bench_function("rollup_five_seasons", |b| {
        b.iter(|| {
            let rolled = rollup::rollup(black_box(&log), 5);
            black_box(rolled.len());
        })
    });
}

fn bench_elo_train(c: &mut Criterion) {
    let games = synthetic::synthetic_schedule(21, 2019..=2023, None);

    c.bench_function("elo_train_five_seasons", |b| {
        b.iter(|| {
            let book = rating::train(black_box(&games), RatingConfig::default());
            black_box(book.len());
        })
    });
}

fn bench_ridge_fit(c: &mut Criterion) {
    let cfg = PipelineConfig::default();
    let games = synthetic::synthetic_schedule(21, 2019..=2023, None);
    let metrics = synthetic::synthetic_metrics(&games, 22);
    let mut log = team_log::build_team_game_log(&games);
    team_log::attach_metrics(&mut log, &metrics);
    let rolled = rollup::rollup(&log, cfg.window);
    let index = rollup::index_by_game(&rolled);
    let metric_names = rollup::metric_names(&log);
    let feature_names = rollup::feature_names(&metric_names, cfg.window);
    let (x, y) = margin_model::training_rows(&games, &index, &metric_names);

    c.bench_function("ridge_fit_five_seasons", |b| {
        b.iter(|| {
            let model = margin_model::fit(
                black_box(&feature_names),
                black_box(&x),
                black_box(&y),
                cfg.fit_config(),
            )
            .unwrap();
            black_box(model.sigma);
        })
    });
}

criterion_group!(perf, bench_rollup_five_seasons, bench_elo_train, bench_ridge_fit);
criterion_main!(perf);
