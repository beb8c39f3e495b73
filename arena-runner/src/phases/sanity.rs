//! Phase 0: sanity filter.
//!
//! Removes models that are obviously broken: stuck on extreme predictions,
//! worse than a coin flip on several horizons, or confidently wrong too often.
//! Models with fewer than `min_rounds` completed rounds are not judged.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use arena_core::{join_horizons, Horizon, HorizonSet, RANDOM_BASELINE};

use super::{EliminationPhase, PhaseVerdict};
use crate::config::SanityConfig;
use crate::state::{ModelState, ModelStateManager};

pub const DEGENERATE_REASON: &str = "Degenerate pattern";

/// Round-level aggregates for one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SanityAggregate {
    pub model_id: String,
    pub rounds: usize,
    /// Horizons without scored rounds are absent.
    pub mean_log_loss: BTreeMap<Horizon, f64>,
    /// Share of scored rounds that were confident and wrong.
    pub extreme_error_rate: BTreeMap<Horizon, f64>,
    pub degenerate_pattern: bool,
}

impl SanityAggregate {
    /// Aggregate a model's history; `None` below `min_rounds`.
    pub fn compute(
        state: &ModelState,
        horizons: &HorizonSet,
        config: &SanityConfig,
    ) -> Option<Self> {
        let rounds = state.round_count();
        if rounds < config.min_rounds {
            return None;
        }

        let mut mean_log_loss = BTreeMap::new();
        let mut extreme_error_rate = BTreeMap::new();
        for h in horizons.iter() {
            if let Some(mean) = state.mean_log_loss(h) {
                mean_log_loss.insert(h, mean);
            }
            let pairs = state.scored_pairs(h);
            if !pairs.is_empty() {
                let misses = pairs
                    .iter()
                    .filter(|(p, label)| *p > config.extreme_confidence && !label)
                    .count();
                extreme_error_rate.insert(h, misses as f64 / pairs.len() as f64);
            }
        }

        Some(Self {
            model_id: state.model_id.clone(),
            rounds,
            mean_log_loss,
            extreme_error_rate,
            degenerate_pattern: is_degenerate(state, horizons, config),
        })
    }

    /// First matching elimination reason, in priority order.
    pub fn elimination_reason(&self, config: &SanityConfig) -> Option<String> {
        if self.degenerate_pattern {
            return Some(DEGENERATE_REASON.to_string());
        }

        let ceiling = RANDOM_BASELINE * config.baseline_multiplier;
        let worse_than_random: Vec<Horizon> = self
            .mean_log_loss
            .iter()
            .filter(|(_, loss)| **loss > ceiling)
            .map(|(h, _)| *h)
            .collect();
        if worse_than_random.len() >= config.min_bad_horizons {
            return Some(format!(
                "Worse than random on {}",
                join_horizons(&worse_than_random)
            ));
        }

        let confidently_wrong: Vec<Horizon> = self
            .extreme_error_rate
            .iter()
            .filter(|(_, rate)| **rate > config.max_extreme_error_rate)
            .map(|(h, _)| *h)
            .collect();
        if !confidently_wrong.is_empty() {
            return Some(format!(
                "Confidently wrong on {}",
                join_horizons(&confidently_wrong)
            ));
        }
        None
    }
}

/// Trailing `degenerate_window` rounds all predict at or above the threshold
/// on every horizon.
fn is_degenerate(state: &ModelState, horizons: &HorizonSet, config: &SanityConfig) -> bool {
    let window = config.degenerate_window;
    if state.round_scores.len() < window {
        return false;
    }
    state.round_scores[state.round_scores.len() - window..]
        .iter()
        .all(|score| {
            horizons
                .iter()
                .all(|h| score.prediction(h) >= config.degenerate_threshold)
        })
}

/// Phase 0 of the tournament.
#[derive(Debug, Clone, Default)]
pub struct SanityFilter {
    config: SanityConfig,
}

impl SanityFilter {
    pub fn new(config: SanityConfig) -> Self {
        Self { config }
    }

    /// Aggregates for every active model with enough rounds.
    pub fn aggregates(&self, manager: &ModelStateManager) -> Vec<SanityAggregate> {
        manager
            .active()
            .filter_map(|state| {
                let agg = SanityAggregate::compute(state, manager.horizons(), &self.config);
                if agg.is_none() {
                    debug!(
                        model = %state.model_id,
                        rounds = state.round_count(),
                        min_rounds = self.config.min_rounds,
                        "sanity check skipped: not enough rounds"
                    );
                }
                agg
            })
            .collect()
    }
}

impl EliminationPhase for SanityFilter {
    fn name(&self) -> &str {
        "Sanity"
    }

    fn phase_number(&self) -> u8 {
        0
    }

    fn evaluate(&self, manager: &ModelStateManager) -> Vec<PhaseVerdict> {
        self.aggregates(manager)
            .into_iter()
            .map(|agg| match agg.elimination_reason(&self.config) {
                Some(reason) => PhaseVerdict::eliminate(agg.model_id, reason),
                None => PhaseVerdict::survive(agg.model_id),
            })
            .collect()
    }
}
