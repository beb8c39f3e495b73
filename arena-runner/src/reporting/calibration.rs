//! Calibration of probability forecasts.
//!
//! Works on `(prediction, outcome)` pairs from scored rounds:
//! - **Expected calibration error**: gap between predicted and realized rates,
//!   averaged over equal-width bins weighted by bin population
//! - **Quintile buckets**: equal-count buckets ordered by prediction, to check
//!   that realized rates rise with predicted probability

use serde::Serialize;

use arena_core::brier_score;

/// One equal-width calibration bin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationBin {
    /// Bin center (0.05, 0.15, ... for ten bins).
    pub center: f64,
    pub mean_prediction: f64,
    pub realized_rate: f64,
    pub count: usize,
}

/// Populated equal-width bins; empty bins are omitted.
pub fn calibration_curve(pairs: &[(f64, bool)], num_bins: usize) -> Vec<CalibrationBin> {
    let num_bins = num_bins.max(1);
    let width = 1.0 / num_bins as f64;
    // (prediction sum, positives, total)
    let mut bins = vec![(0.0_f64, 0_usize, 0_usize); num_bins];

    for (p, outcome) in pairs {
        let idx = ((p / width) as usize).min(num_bins - 1);
        bins[idx].0 += p;
        bins[idx].2 += 1;
        if *outcome {
            bins[idx].1 += 1;
        }
    }

    bins.iter()
        .enumerate()
        .filter(|(_, (_, _, total))| *total > 0)
        .map(|(i, (sum, positives, total))| CalibrationBin {
            center: (i as f64 + 0.5) * width,
            mean_prediction: sum / *total as f64,
            realized_rate: *positives as f64 / *total as f64,
            count: *total,
        })
        .collect()
}

/// Expected calibration error over `num_bins` equal-width bins.
///
/// NaN below `min_samples`: "not computable", distinct from a computed
/// value of zero.
pub fn expected_calibration_error(pairs: &[(f64, bool)], num_bins: usize, min_samples: usize) -> f64 {
    if pairs.is_empty() || pairs.len() < min_samples {
        return f64::NAN;
    }
    let n = pairs.len() as f64;
    calibration_curve(pairs, num_bins)
        .iter()
        .map(|b| b.count as f64 / n * (b.mean_prediction - b.realized_rate).abs())
        .sum()
}

/// Mean Brier score; `None` for no samples.
pub fn mean_brier_score(pairs: &[(f64, bool)]) -> Option<f64> {
    if pairs.is_empty() {
        return None;
    }
    Some(pairs.iter().map(|(p, o)| brier_score(*p, *o)).sum::<f64>() / pairs.len() as f64)
}

/// Share of rounds where `prediction ≥ 0.5` matched the outcome.
pub fn directional_accuracy(pairs: &[(f64, bool)]) -> Option<f64> {
    if pairs.is_empty() {
        return None;
    }
    let hits = pairs.iter().filter(|(p, o)| (*p >= 0.5) == *o).count();
    Some(hits as f64 / pairs.len() as f64)
}

// ─── Quintiles ───────────────────────────────────────────────────────

pub const QUINTILES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuintileBucket {
    pub mean_prediction: f64,
    pub realized_rate: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuintileReport {
    /// Lowest predictions first.
    pub buckets: Vec<QuintileBucket>,
    /// Realized rates never decrease from one bucket to the next.
    pub monotonic: bool,
}

/// Sort by prediction and split into five equal-count buckets.
///
/// Bucket sizes differ by at most one. `None` below `min_samples` or for
/// fewer than five pairs.
pub fn quintile_buckets(pairs: &[(f64, bool)], min_samples: usize) -> Option<QuintileReport> {
    if pairs.len() < min_samples.max(QUINTILES) {
        return None;
    }
    let mut sorted = pairs.to_vec();
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

    let n = sorted.len();
    let buckets: Vec<QuintileBucket> = (0..QUINTILES)
        .map(|i| {
            let chunk = &sorted[i * n / QUINTILES..(i + 1) * n / QUINTILES];
            let count = chunk.len();
            QuintileBucket {
                mean_prediction: chunk.iter().map(|(p, _)| p).sum::<f64>() / count as f64,
                realized_rate: chunk.iter().filter(|(_, o)| *o).count() as f64 / count as f64,
                count,
            }
        })
        .collect();

    let monotonic = buckets
        .windows(2)
        .all(|w| w[1].realized_rate >= w[0].realized_rate);
    Some(QuintileReport { buckets, monotonic })
}
