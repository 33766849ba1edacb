use std::collections::HashMap;

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use statrs::function::erf::erf;

use crate::error::EdgeError;
use crate::rollup::{self, RollupRow};
use crate::schedule_store::GameRecord;

#[derive(Debug, Clone, Copy)]
pub struct FitConfig {
    /// Ridge penalty; 0 gives ordinary least squares.
    pub ridge_alpha: f64,
    /// Lower bound on a finite, positive residual spread.
    pub sigma_floor: f64,
    /// Substitute spread when the fit is degenerate (non-finite or <= 0
    /// residual spread). Roughly the long-run stdev of NFL scoring margins.
    pub sigma_fallback: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            ridge_alpha: 5.0,
            sigma_floor: 1.0,
            sigma_fallback: 13.5,
        }
    }
}

/// Immutable result of a margin fit. `feature_names` pins the column order
/// so prediction-time alignment is checkable, and `sigma_fallback` records
/// a degenerate fit instead of hiding it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedModel {
    pub feature_names: Vec<String>,
    /// Bias weight first, then one weight per feature name.
    pub weights: Vec<f64>,
    pub sigma: f64,
    pub sigma_fallback: bool,
    pub samples: usize,
}

/// Solve the ridge normal equations `(XᵗX + αI) w = Xᵗy` with an explicit
/// bias column of ones prepended to X. Rows whose features are all zero are
/// excluded; they carry no signal and would only drag the intercept.
pub fn fit(
    feature_names: &[String],
    x: &[Vec<f64>],
    y: &[f64],
    cfg: FitConfig,
) -> Result<FittedModel> {
    if x.len() != y.len() {
        return Err(anyhow!(
            "feature rows ({}) and targets ({}) differ in length",
            x.len(),
            y.len()
        ));
    }
    let n_feat = feature_names.len();
    for (idx, row) in x.iter().enumerate() {
        if row.len() != n_feat {
            return Err(anyhow!(
                "feature row {idx} has {} values, expected {n_feat}",
                row.len()
            ));
        }
    }

    let kept: Vec<usize> = (0..x.len())
        .filter(|&i| x[i].iter().any(|v| *v != 0.0))
        .collect();
    if kept.is_empty() {
        return Err(
            EdgeError::MissingData("no trainable rows after dropping all-zero features".into())
                .into(),
        );
    }

    // Normal equations over the bias-augmented design matrix.
    let dim = n_feat + 1;
    let mut a = vec![vec![0.0_f64; dim]; dim];
    let mut b = vec![0.0_f64; dim];
    for &i in &kept {
        let row = &x[i];
        let target = y[i];
        for p in 0..dim {
            let xp = if p == 0 { 1.0 } else { row[p - 1] };
            b[p] += xp * target;
            for q in 0..dim {
                let xq = if q == 0 { 1.0 } else { row[q - 1] };
                a[p][q] += xp * xq;
            }
        }
    }
    let alpha = cfg.ridge_alpha.max(0.0);
    for (p, row) in a.iter_mut().enumerate() {
        row[p] += alpha;
    }

    let weights =
        solve_linear(a, b).ok_or_else(|| anyhow!("singular normal equations; cannot fit"))?;

    let ddof = n_feat.max(1);
    let mut sigma_fallback = false;
    let sigma = if kept.len() > ddof {
        let residuals: Vec<f64> = kept
            .iter()
            .map(|&i| y[i] - predict_row(&weights, &x[i]))
            .collect();
        let rbar = residuals.iter().sum::<f64>() / residuals.len() as f64;
        let ss: f64 = residuals.iter().map(|r| (r - rbar).powi(2)).sum();
        (ss / (kept.len() - ddof) as f64).sqrt()
    } else {
        f64::NAN
    };
    let sigma = if sigma.is_finite() && sigma > 0.0 {
        sigma.max(cfg.sigma_floor)
    } else {
        sigma_fallback = true;
        cfg.sigma_fallback
    };

    Ok(FittedModel {
        feature_names: feature_names.to_vec(),
        weights,
        sigma,
        sigma_fallback,
        samples: kept.len(),
    })
}

/// Predicted margins for rows aligned to the model's recorded feature order.
/// A differing feature set is a hard error; silent zero-filling is exactly
/// the inconsistency this check exists to stop.
pub fn predict(
    model: &FittedModel,
    feature_names: &[String],
    x: &[Vec<f64>],
) -> Result<Vec<f64>, EdgeError> {
    check_alignment(model, feature_names)?;
    Ok(x.iter().map(|row| predict_row(&model.weights, row)).collect())
}

pub fn predict_one(
    model: &FittedModel,
    feature_names: &[String],
    row: &[f64],
) -> Result<f64, EdgeError> {
    check_alignment(model, feature_names)?;
    Ok(predict_row(&model.weights, row))
}

fn check_alignment(model: &FittedModel, feature_names: &[String]) -> Result<(), EdgeError> {
    if model.feature_names.as_slice() != feature_names {
        return Err(EdgeError::FeatureAlignment {
            expected: model.feature_names.clone(),
            got: feature_names.to_vec(),
        });
    }
    Ok(())
}

fn predict_row(weights: &[f64], row: &[f64]) -> f64 {
    let mut acc = weights[0];
    for (w, v) in weights[1..].iter().zip(row) {
        acc += w * v;
    }
    acc
}

/// Assemble the training table: home-minus-away trailing differentials
/// against observed home margins, for every completed game whose rollup
/// features exist on both sides. Games with partial features are skipped
/// here rather than imputed.
pub fn training_rows<'a>(
    games: &'a [GameRecord],
    rollups: &HashMap<(&'a str, &'a str), &RollupRow>,
    metric_names: &[String],
) -> (Vec<Vec<f64>>, Vec<f64>) {
    let mut x = Vec::new();
    let mut y = Vec::new();
    for game in games {
        let Some(margin) = game.home_margin() else {
            continue;
        };
        let home = rollups.get(&(game.game_id.as_str(), game.home_team.as_str()));
        let away = rollups.get(&(game.game_id.as_str(), game.away_team.as_str()));
        let (Some(home), Some(away)) = (home, away) else {
            continue;
        };
        let Some(row) = rollup::diff_features(home, away, metric_names) else {
            continue;
        };
        x.push(row);
        y.push(margin);
    }
    (x, y)
}

/// Probability the margin's side wins: standard-normal CDF of margin/sigma.
pub fn margin_to_prob(margin: f64, sigma: f64) -> f64 {
    let z = margin / sigma.max(1e-6);
    0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))
}

/// Gaussian elimination with partial pivoting; enough for the handful of
/// features this model carries.
fn solve_linear(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let mut pivot = col;
        for row in (col + 1)..n {
            if a[row][col].abs() > a[pivot][col].abs() {
                pivot = row;
            }
        }
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0_f64; n];
    for col in (0..n).rev() {
        let mut acc = b[col];
        for k in (col + 1)..n {
            acc -= a[col][k] * x[k];
        }
        x[col] = acc / a[col][col];
    }
    Some(x)
}
