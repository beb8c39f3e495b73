//! Composite ranking: weighted blend of percentile, best window, stability
//! and pivot timing, used only to order qualified models within a horizon.
//!
//! Each lower-is-better metric `m` is mapped to `max(0, 1 − m / constant)`
//! with a fixed constant per metric (an assumed typical maximum, not fitted to
//! the cohort). Percentile rank is divided by 100. Nothing is eliminated here.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use arena_core::{Horizon, HorizonSet};

use crate::config::CompositeConfig;
use crate::phases::competence::{compute_percentile_ranks, mean_log_loss_table, DEFAULT_PERCENTILE};
use crate::phases::stability::model_stability;
use crate::qualification::Qualification;
use crate::state::ModelStateManager;
use crate::stats::mean;

/// Per-horizon inputs to the composite score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HorizonMetrics {
    pub mean_log_loss: f64,
    /// Percentile within the surviving cohort, 0–100.
    pub percentile: f64,
    pub best_window: f64,
    /// Population variance of per-round log loss.
    pub stability: f64,
    /// `None` when the scorer never recorded pivot timing.
    pub mean_pivot_ratio: Option<f64>,
}

/// Everything the ranking needs to know about one surviving model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingProfile {
    pub model_id: String,
    pub qualified_horizons: BTreeSet<Horizon>,
    /// Metrics for every horizon with data, qualified or not.
    pub horizons: BTreeMap<Horizon, HorizonMetrics>,
}

/// One row of a horizon's final ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedModel {
    pub rank: usize,
    pub model_id: String,
    pub score: f64,
    pub log_loss: f64,
    pub best_window: f64,
    pub stability: f64,
}

/// Map a lower-is-better metric onto `[0, 1]`.
fn inverse_score(value: f64, constant: f64) -> f64 {
    (1.0 - value / constant).max(0.0)
}

/// Weighted composite for one model on one horizon. Higher is better.
pub fn composite_score(metrics: &HorizonMetrics, config: &CompositeConfig) -> f64 {
    let pivot_credit = metrics
        .mean_pivot_ratio
        .map(|r| inverse_score(r, config.pivot_max))
        .unwrap_or(0.0);

    config.percentile_weight * metrics.percentile / 100.0
        + config.best_window_weight * inverse_score(metrics.best_window, config.best_window_max)
        + config.stability_weight * inverse_score(metrics.stability, config.stability_max)
        + config.pivot_weight * pivot_credit
}

/// Build ranking profiles for the active models of `manager`.
pub fn build_ranking_profiles(
    manager: &ModelStateManager,
    qualification: &Qualification,
    window: usize,
) -> Vec<RankingProfile> {
    let percentiles = compute_percentile_ranks(&mean_log_loss_table(manager), manager.horizons());

    manager
        .active()
        .map(|state| {
            let stability = model_stability(state, manager.horizons(), window);
            let horizons = stability
                .iter()
                .filter_map(|(h, s)| {
                    let mean_log_loss = state.mean_log_loss(*h)?;
                    let percentile = percentiles
                        .get(&state.model_id)
                        .and_then(|row| row.get(h))
                        .copied()
                        .unwrap_or(DEFAULT_PERCENTILE);
                    Some((
                        *h,
                        HorizonMetrics {
                            mean_log_loss,
                            percentile,
                            best_window: s.best_window,
                            stability: s.variance,
                            mean_pivot_ratio: mean(state.pivot_ratios(*h)),
                        },
                    ))
                })
                .collect();
            RankingProfile {
                model_id: state.model_id.clone(),
                qualified_horizons: qualification.qualified_horizons(&state.model_id),
                horizons,
            }
        })
        .collect()
}

/// Rank the models qualified for `horizon`, best composite first.
///
/// A profile appears iff `horizon` is in its qualified set. Ties in composite
/// score break by model id.
pub fn rank_models_for_horizon(
    profiles: &[RankingProfile],
    horizon: Horizon,
    config: &CompositeConfig,
) -> Vec<RankedModel> {
    let mut ranked: Vec<RankedModel> = profiles
        .iter()
        .filter(|p| p.qualified_horizons.contains(&horizon))
        .filter_map(|p| {
            let metrics = p.horizons.get(&horizon)?;
            Some(RankedModel {
                rank: 0,
                model_id: p.model_id.clone(),
                score: composite_score(metrics, config),
                log_loss: metrics.mean_log_loss,
                best_window: metrics.best_window,
                stability: metrics.stability,
            })
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.model_id.cmp(&b.model_id))
    });
    for (i, entry) in ranked.iter_mut().enumerate() {
        entry.rank = i + 1;
    }
    ranked
}

/// Rankings for every horizon of the set.
pub fn rank_all_horizons(
    profiles: &[RankingProfile],
    horizons: &HorizonSet,
    config: &CompositeConfig,
) -> BTreeMap<Horizon, Vec<RankedModel>> {
    horizons
        .iter()
        .map(|h| (h, rank_models_for_horizon(profiles, h, config)))
        .collect()
}

// ─── Tests ───────────────────────────────────────────────────────────
