//! Cross-horizon model profiles.
//!
//! A profile only describes horizons in the model's qualified set. Raw data
//! on other horizons exists in the state manager but is never shown here.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use arena_core::Horizon;

use super::calibration::{
    directional_accuracy, expected_calibration_error, mean_brier_score, quintile_buckets,
    QuintileReport,
};
use crate::config::ReportingConfig;
use crate::qualification::Qualification;
use crate::state::{ModelState, ModelStateManager};
use crate::stats::mean;

/// Where a model ended up in the tournament.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ModelStatus {
    Active,
    Eliminated { phase: u8, reason: String },
}

/// Descriptive statistics for one model on one horizon.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HorizonStats {
    /// Scored rounds.
    pub rounds: usize,
    pub mean_log_loss: f64,
    pub brier_score: f64,
    pub accuracy: f64,
    /// NaN below the reporting sample minimum.
    pub calibration_error: f64,
    pub quintiles: Option<QuintileReport>,
    pub mean_pivot_ratio: Option<f64>,
}

impl HorizonStats {
    /// `None` when the model has no scored rounds on `horizon`.
    pub fn compute(state: &ModelState, horizon: Horizon, config: &ReportingConfig) -> Option<Self> {
        let pairs = state.scored_pairs(horizon);
        let mean_log_loss = state.mean_log_loss(horizon)?;
        Some(Self {
            rounds: pairs.len(),
            mean_log_loss,
            brier_score: mean_brier_score(&pairs)?,
            accuracy: directional_accuracy(&pairs)?,
            calibration_error: expected_calibration_error(
                &pairs,
                config.calibration_bins,
                config.min_calibration_samples,
            ),
            quintiles: quintile_buckets(&pairs, config.min_quintile_samples),
            mean_pivot_ratio: mean(state.pivot_ratios(horizon)),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelProfile {
    pub model_id: String,
    pub status: ModelStatus,
    pub qualified_horizons: BTreeSet<Horizon>,
    /// Keys are exactly the qualified horizons the model has data for.
    pub horizons: BTreeMap<Horizon, HorizonStats>,
    /// Lowest mean log loss among qualified horizons.
    pub strongest_horizon: Option<Horizon>,
    pub weakest_horizon: Option<Horizon>,
    pub failed_rounds: usize,
}

impl ModelProfile {
    pub fn build(state: &ModelState, qualification: &Qualification, config: &ReportingConfig) -> Self {
        let status = match (state.eliminated_in_phase, &state.elimination_reason) {
            (Some(phase), Some(reason)) => ModelStatus::Eliminated {
                phase,
                reason: reason.clone(),
            },
            _ => ModelStatus::Active,
        };
        let qualified_horizons = qualification.qualified_horizons(&state.model_id);
        let horizons: BTreeMap<Horizon, HorizonStats> = qualified_horizons
            .iter()
            .filter_map(|h| HorizonStats::compute(state, *h, config).map(|s| (*h, s)))
            .collect();

        let by_loss = |a: &(&Horizon, &HorizonStats), b: &(&Horizon, &HorizonStats)| {
            a.1.mean_log_loss.total_cmp(&b.1.mean_log_loss)
        };
        let strongest_horizon = horizons.iter().min_by(by_loss).map(|(h, _)| *h);
        let weakest_horizon = horizons.iter().max_by(by_loss).map(|(h, _)| *h);

        Self {
            model_id: state.model_id.clone(),
            status,
            qualified_horizons,
            horizons,
            strongest_horizon,
            weakest_horizon,
            failed_rounds: state.failed_rounds.len(),
        }
    }

    /// Whether `horizon` may be shown for this model.
    pub fn is_qualified(&self, horizon: Horizon) -> bool {
        self.qualified_horizons.contains(&horizon)
    }
}

/// Profiles for every registered model, in registration order.
pub fn build_profiles(
    manager: &ModelStateManager,
    qualification: &Qualification,
    config: &ReportingConfig,
) -> Vec<ModelProfile> {
    manager
        .iter()
        .map(|state| ModelProfile::build(state, qualification, config))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QualificationMode;
    use crate::qualification::qualify;
    use arena_core::{HorizonMap, HorizonSet, RoundScore};

    fn manager() -> ModelStateManager {
        let set = HorizonSet::new(vec![Horizon::H1, Horizon::H24]).unwrap();
        let mut m = ModelStateManager::new(["good", "split", "gone"], set.clone()).unwrap();
        for r in 0..30u32 {
            let label = r % 2 == 0;
            let rows = [
                ("good", 0.8, 0.7),
                ("split", 0.75, 0.3),
                ("gone", 0.5, 0.5),
            ];
            for (id, p_h1, p_h24) in rows {
                let preds = HorizonMap::from_fn(&set, |h| {
                    let p = if h == Horizon::H1 { p_h1 } else { p_h24 };
                    if label {
                        p
                    } else {
                        1.0 - p
                    }
                });
                let score =
                    RoundScore::scored(&set, r, preds, HorizonMap::from_fn(&set, |_| label))
                        .unwrap();
                m.add_round_score(id, score).unwrap();
            }
        }
        m.eliminate_model("gone", 1, "No horizon strength").unwrap();
        m
    }

    #[test]
    fn profile_shows_only_qualified_horizons() {
        let m = manager();
        let q = qualify(&m, &QualificationMode::TopPercent { top_percent: 0.5 });
        let profiles = build_profiles(&m, &q, &ReportingConfig::default());

        let good = &profiles[0];
        assert_eq!(good.status, ModelStatus::Active);
        assert_eq!(good.qualified_horizons.len(), 2);
        assert_eq!(good.strongest_horizon, Some(Horizon::H1));
        assert_eq!(good.weakest_horizon, Some(Horizon::H24));
        assert!(good.horizons[&Horizon::H1].calibration_error.is_finite());
        assert!(good.horizons[&Horizon::H1].quintiles.is_some());

        // split ranks second on both horizons and the cut keeps one.
        let split = &profiles[1];
        assert!(split.qualified_horizons.is_empty());
        assert!(split.horizons.is_empty());
        assert_eq!(split.strongest_horizon, None);
    }

    #[test]
    fn eliminated_model_profile_is_empty_with_status() {
        let m = manager();
        let q = qualify(&m, &QualificationMode::default());
        let profiles = build_profiles(&m, &q, &ReportingConfig::default());

        let gone = &profiles[2];
        assert_eq!(
            gone.status,
            ModelStatus::Eliminated {
                phase: 1,
                reason: "No horizon strength".into()
            }
        );
        assert!(gone.horizons.is_empty());
    }

    #[test]
    fn horizon_stats_accuracy_and_sample_guard() {
        let m = manager();
        let good = m.get_model("good").unwrap();
        let stats = HorizonStats::compute(good, Horizon::H1, &ReportingConfig::default()).unwrap();
        assert_eq!(stats.rounds, 30);
        assert_eq!(stats.accuracy, 1.0);
        assert_eq!(stats.mean_pivot_ratio, None);

        let strict = ReportingConfig {
            min_calibration_samples: 31,
            ..ReportingConfig::default()
        };
        let guarded = HorizonStats::compute(good, Horizon::H1, &strict).unwrap();
        assert!(guarded.calibration_error.is_nan());
    }
}
