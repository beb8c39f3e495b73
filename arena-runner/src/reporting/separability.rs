//! Separability: can this horizon tell the cohort apart at all?
//!
//! Compares the spread of mean log loss across models with the typical
//! standard error of a single model's mean. A spread that does not clear
//! twice the noise means the ranking on that horizon is mostly luck.

use serde::Serialize;

use arena_core::Horizon;

use crate::stats::{mean, standard_error};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeparabilityReport {
    pub horizon: Horizon,
    /// Models with at least one scored round on the horizon.
    pub cohort_size: usize,
    /// Max minus min mean log loss; NaN for an empty cohort.
    pub spread: f64,
    /// Mean standard error of per-round log loss; NaN for an empty cohort.
    pub noise: f64,
    /// `None` below the minimum cohort: undefined, not "no".
    pub separates: Option<bool>,
}

/// Separability of `horizon` given each model's scored log-loss series.
pub fn compute_separability(
    horizon: Horizon,
    series: &[&[f64]],
    min_cohort: usize,
) -> SeparabilityReport {
    let populated: Vec<&[f64]> = series.iter().copied().filter(|s| !s.is_empty()).collect();
    let means: Vec<f64> = populated.iter().filter_map(|s| mean(s)).collect();
    let errors: Vec<f64> = populated.iter().filter_map(|s| standard_error(s)).collect();

    let cohort_size = populated.len();
    let (spread, noise) = if cohort_size == 0 {
        (f64::NAN, f64::NAN)
    } else {
        let max = means.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = means.iter().copied().fold(f64::INFINITY, f64::min);
        (max - min, mean(&errors).unwrap_or(f64::NAN))
    };

    let separates = if cohort_size < min_cohort.max(1) {
        None
    } else {
        Some(spread > 2.0 * noise)
    };

    SeparabilityReport {
        horizon,
        cohort_size,
        spread,
        noise,
        separates,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undefined_for_two_models_defined_for_three() {
        let a = [0.30, 0.32, 0.31];
        let b = [0.60, 0.62, 0.61];
        let c = [0.90, 0.92, 0.91];

        let two = compute_separability(Horizon::H1, &[&a[..], &b[..]], 3);
        assert_eq!(two.separates, None);
        assert_eq!(two.cohort_size, 2);

        let three = compute_separability(Horizon::H1, &[&a[..], &b[..], &c[..]], 3);
        assert_eq!(three.separates, Some(true));
    }

    #[test]
    fn overlapping_noisy_models_do_not_separate() {
        let a = [0.1, 0.9, 0.1, 0.9];
        let b = [0.9, 0.1, 0.9, 0.2];
        let c = [0.2, 0.8, 0.2, 0.8];
        let report = compute_separability(Horizon::H4, &[&a[..], &b[..], &c[..]], 3);
        assert_eq!(report.separates, Some(false));
        assert!(report.spread < report.noise);
    }

    #[test]
    fn empty_series_do_not_count_toward_cohort() {
        let a = [0.3];
        let empty: [f64; 0] = [];
        let report = compute_separability(Horizon::D7, &[&a[..], &empty[..], &empty[..]], 3);
        assert_eq!(report.cohort_size, 1);
        assert_eq!(report.separates, None);
        assert_eq!(report.spread, 0.0);

        let none = compute_separability(Horizon::D7, &[], 3);
        assert!(none.spread.is_nan());
        assert_eq!(none.separates, None);
    }
}
