//! Walk-forward evaluation metrics for binary home-win probabilities.

#[derive(Debug, Clone, Copy)]
pub struct Metrics {
    pub samples: usize,
    pub brier: f64,
    pub log_loss: f64,
    pub accuracy: f64,
}

impl Metrics {
    fn empty() -> Self {
        Self {
            samples: 0,
            brier: 0.0,
            log_loss: 0.0,
            accuracy: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CalibrationBin {
    pub bucket_start: f64,
    pub bucket_end: f64,
    pub count: usize,
    pub avg_pred: f64,
    pub actual_rate: f64,
}

pub fn evaluate_probs(probs: &[f64], outcomes: &[bool]) -> Metrics {
    if probs.is_empty() || probs.len() != outcomes.len() {
        return Metrics::empty();
    }

    let mut brier_sum = 0.0_f64;
    let mut log_loss_sum = 0.0_f64;
    let mut correct = 0usize;

    for (p, won) in probs.iter().zip(outcomes) {
        let y = if *won { 1.0 } else { 0.0 };
        brier_sum += (p - y).powi(2);

        let picked = if *won { *p } else { 1.0 - p };
        log_loss_sum += -picked.clamp(1e-12, 1.0).ln();

        if (*p >= 0.5) == *won {
            correct += 1;
        }
    }

    let n = probs.len() as f64;
    Metrics {
        samples: probs.len(),
        brier: brier_sum / n,
        log_loss: log_loss_sum / n,
        accuracy: correct as f64 / n,
    }
}

/// Bucket predictions by predicted home probability and compare the average
/// prediction against the realized home-win rate per bucket.
pub fn calibration_bins(probs: &[f64], outcomes: &[bool], bins: usize) -> Vec<CalibrationBin> {
    let bins = bins.max(2);
    let mut counts = vec![0usize; bins];
    let mut pred_sum = vec![0.0_f64; bins];
    let mut actual_sum = vec![0.0_f64; bins];

    for (p, won) in probs.iter().zip(outcomes) {
        let clamped = p.clamp(0.0, 1.0);
        let idx = ((clamped * bins as f64).floor() as usize).min(bins - 1);
        counts[idx] += 1;
        pred_sum[idx] += clamped;
        if *won {
            actual_sum[idx] += 1.0;
        }
    }

    let mut out = Vec::with_capacity(bins);
    for i in 0..bins {
        let count = counts[i];
        let (avg_pred, actual_rate) = if count > 0 {
            (pred_sum[i] / count as f64, actual_sum[i] / count as f64)
        } else {
            (0.0, 0.0)
        };
        out.push(CalibrationBin {
            bucket_start: i as f64 / bins as f64,
            bucket_end: (i + 1) as f64 / bins as f64,
            count,
            avg_pred,
            actual_rate,
        });
    }
    out
}

/// Expected calibration error: count-weighted |avg_pred - actual_rate|.
pub fn expected_calibration_error(probs: &[f64], outcomes: &[bool], bins: usize) -> f64 {
    let rows = calibration_bins(probs, outcomes, bins);
    let total: usize = rows.iter().map(|b| b.count).sum();
    if total == 0 {
        return 0.0;
    }
    rows.iter()
        .map(|b| (b.count as f64 / total as f64) * (b.avg_pred - b.actual_rate).abs())
        .sum()
}
