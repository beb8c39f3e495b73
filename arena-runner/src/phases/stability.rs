//! Phase 2: stability and regret filter.
//!
//! Looks at each model's full log-loss sequence per horizon: how much it
//! varies, and how bad its worst stretch is compared with the cohort's median
//! worst stretch.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use arena_core::{join_horizons, Horizon, HorizonSet};

use super::{EliminationPhase, PhaseVerdict};
use crate::config::StabilityConfig;
use crate::state::{ModelState, ModelStateManager};
use crate::stats::{median, population_variance, window_extremes};

/// Sequence statistics for one model on one horizon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HorizonStability {
    /// Population variance of per-round log loss. Lower is more stable.
    pub variance: f64,
    pub best_window: f64,
    pub worst_window: f64,
}

impl HorizonStability {
    /// `None` when the horizon has no scored rounds.
    pub fn compute(losses: &[f64], window: usize) -> Option<Self> {
        let variance = population_variance(losses)?;
        let (best_window, worst_window) = window_extremes(losses, window)?;
        Some(Self {
            variance,
            best_window,
            worst_window,
        })
    }
}

/// Stability statistics for every scored horizon of a model.
pub fn model_stability(
    state: &ModelState,
    horizons: &HorizonSet,
    window: usize,
) -> BTreeMap<Horizon, HorizonStability> {
    horizons
        .iter()
        .filter_map(|h| HorizonStability::compute(state.log_losses(h), window).map(|s| (h, s)))
        .collect()
}

/// Worst-window ratio to the cohort median.
///
/// Equal values give 1.0, including two zeros or two infinities; a positive
/// worst window against a zero median is unbounded.
pub fn regret_ratio(worst_window: f64, median_worst_window: f64) -> f64 {
    if worst_window == median_worst_window {
        1.0
    } else if median_worst_window == 0.0 {
        f64::INFINITY
    } else {
        worst_window / median_worst_window
    }
}

/// Phase-2 aggregates for one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilityAggregate {
    pub model_id: String,
    pub horizons: BTreeMap<Horizon, HorizonStability>,
    pub regret: BTreeMap<Horizon, f64>,
    /// Ratio of the model's variance to the cohort median variance.
    pub variance_ratio: BTreeMap<Horizon, f64>,
}

/// Compute stability for every active model and relate it to cohort medians.
pub fn compute_stability_aggregates(
    manager: &ModelStateManager,
    window: usize,
) -> Vec<StabilityAggregate> {
    let per_model: Vec<(String, BTreeMap<Horizon, HorizonStability>)> = manager
        .active()
        .map(|state| {
            (
                state.model_id.clone(),
                model_stability(state, manager.horizons(), window),
            )
        })
        .collect();

    let mut median_worst = BTreeMap::new();
    let mut median_variance = BTreeMap::new();
    for h in manager.horizons().iter() {
        let column: Vec<HorizonStability> = per_model
            .iter()
            .filter_map(|(_, stats)| stats.get(&h).copied())
            .collect();
        let worst: Vec<f64> = column.iter().map(|s| s.worst_window).collect();
        let variances: Vec<f64> = column.iter().map(|s| s.variance).collect();
        if let (Some(w), Some(v)) = (median(&worst), median(&variances)) {
            median_worst.insert(h, w);
            median_variance.insert(h, v);
        }
    }

    per_model
        .into_iter()
        .map(|(model_id, horizons)| {
            let mut regret = BTreeMap::new();
            let mut variance_ratio = BTreeMap::new();
            for (h, s) in &horizons {
                if let Some(mw) = median_worst.get(h) {
                    regret.insert(*h, regret_ratio(s.worst_window, *mw));
                }
                if let Some(mv) = median_variance.get(h) {
                    variance_ratio.insert(*h, regret_ratio(s.variance, *mv));
                }
            }
            StabilityAggregate {
                model_id,
                horizons,
                regret,
                variance_ratio,
            }
        })
        .collect()
}

/// Phase 2 of the tournament.
#[derive(Debug, Clone, Default)]
pub struct StabilityFilter {
    config: StabilityConfig,
}

impl StabilityFilter {
    pub fn new(config: StabilityConfig) -> Self {
        Self { config }
    }

    fn elimination_reason(&self, agg: &StabilityAggregate) -> Option<String> {
        let high_regret: Vec<Horizon> = agg
            .regret
            .iter()
            .filter(|(_, r)| **r > self.config.regret_threshold)
            .map(|(h, _)| *h)
            .collect();
        if high_regret.len() >= self.config.regret_horizons {
            return Some(format!("High regret on {}", join_horizons(&high_regret)));
        }

        let unstable: Vec<Horizon> = agg
            .variance_ratio
            .iter()
            .filter(|(_, r)| **r > self.config.variance_multiplier)
            .map(|(h, _)| *h)
            .collect();
        if unstable.len() >= self.config.variance_horizons {
            return Some(format!("Unstable on {}", join_horizons(&unstable)));
        }
        None
    }
}

impl EliminationPhase for StabilityFilter {
    fn name(&self) -> &str {
        "Stability"
    }

    fn phase_number(&self) -> u8 {
        2
    }

    fn evaluate(&self, manager: &ModelStateManager) -> Vec<PhaseVerdict> {
        compute_stability_aggregates(manager, self.config.window)
            .iter()
            .map(|agg| match self.elimination_reason(agg) {
                Some(reason) => PhaseVerdict::eliminate(agg.model_id.clone(), reason),
                None => PhaseVerdict::survive(agg.model_id.clone()),
            })
            .collect()
    }
}
