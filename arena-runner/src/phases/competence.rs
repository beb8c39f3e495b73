//! Phase 1: competence filter.
//!
//! Ranks the active cohort per horizon and removes broad underperformers and
//! models with no standout horizon. A specialist that is strong on exactly one
//! horizon and mediocre elsewhere survives.

use std::collections::BTreeMap;

use tracing::debug;

use arena_core::{join_horizons, Horizon, HorizonSet};

use super::{EliminationPhase, PhaseVerdict};
use crate::config::CompetenceConfig;
use crate::state::ModelStateManager;

/// Percentile assigned when the cohort is too small to rank.
pub const DEFAULT_PERCENTILE: f64 = 50.0;

/// Smallest cohort for which a percentile means anything.
pub const MIN_RANKABLE_COHORT: usize = 3;

/// `model_id → horizon → value`.
pub type HorizonTable = BTreeMap<String, BTreeMap<Horizon, f64>>;

/// Mean scored log loss per horizon for every active model.
///
/// Horizons without scored rounds are absent from a model's row.
pub fn mean_log_loss_table(manager: &ModelStateManager) -> HorizonTable {
    manager
        .active()
        .map(|state| {
            let row = manager
                .horizons()
                .iter()
                .filter_map(|h| state.mean_log_loss(h).map(|m| (h, m)))
                .collect();
            (state.model_id.clone(), row)
        })
        .collect()
}

/// Cohort-relative percentile ranks of a lower-is-better metric.
///
/// `percentile = 100 × (1 − strictly_better / n)` where `n` is the number of
/// models with a value on that horizon. A cohort of fewer than three models
/// gets [`DEFAULT_PERCENTILE`] on every horizon; so does a horizon with fewer
/// than three values. A model with no value on a horizon gets no percentile
/// there. The result is never NaN.
pub fn compute_percentile_ranks(cohort: &HorizonTable, horizons: &HorizonSet) -> HorizonTable {
    if cohort.len() < MIN_RANKABLE_COHORT {
        return cohort
            .keys()
            .map(|id| {
                let row = horizons.iter().map(|h| (h, DEFAULT_PERCENTILE)).collect();
                (id.clone(), row)
            })
            .collect();
    }

    let mut ranks: HorizonTable = cohort.keys().map(|id| (id.clone(), BTreeMap::new())).collect();
    for h in horizons.iter() {
        let values: Vec<(&String, f64)> = cohort
            .iter()
            .filter_map(|(id, row)| row.get(&h).map(|v| (id, *v)))
            .collect();
        let n = values.len();
        for (id, value) in &values {
            let percentile = if n < MIN_RANKABLE_COHORT {
                DEFAULT_PERCENTILE
            } else {
                let better = values.iter().filter(|(_, other)| *other < *value).count();
                100.0 * (1.0 - better as f64 / n as f64)
            };
            if let Some(row) = ranks.get_mut(*id) {
                row.insert(h, percentile);
            }
        }
    }
    ranks
}

/// Phase 1 of the tournament.
#[derive(Debug, Clone, Default)]
pub struct CompetenceFilter {
    config: CompetenceConfig,
}

impl CompetenceFilter {
    pub fn new(config: CompetenceConfig) -> Self {
        Self { config }
    }

    fn elimination_reason(&self, percentiles: &BTreeMap<Horizon, f64>) -> Option<String> {
        let bottom: Vec<Horizon> = percentiles
            .iter()
            .filter(|(_, p)| **p < self.config.bottom_percentile)
            .map(|(h, _)| *h)
            .collect();
        if bottom.len() >= self.config.max_bottom_horizons {
            return Some(format!("Bottom quartile on {}", join_horizons(&bottom)));
        }
        if !percentiles
            .values()
            .any(|p| *p >= self.config.strength_percentile)
        {
            return Some("No horizon strength".to_string());
        }
        None
    }
}

impl EliminationPhase for CompetenceFilter {
    fn name(&self) -> &str {
        "Competence"
    }

    fn phase_number(&self) -> u8 {
        1
    }

    fn evaluate(&self, manager: &ModelStateManager) -> Vec<PhaseVerdict> {
        let active = manager.get_active_models();
        if active.len() < self.config.min_cohort {
            debug!(
                cohort = active.len(),
                min_cohort = self.config.min_cohort,
                "competence filter skipped: cohort too small"
            );
            return active.into_iter().map(PhaseVerdict::survive).collect();
        }

        let table = mean_log_loss_table(manager);
        let ranks = compute_percentile_ranks(&table, manager.horizons());
        let empty = BTreeMap::new();
        active
            .into_iter()
            .map(|id| {
                let row = ranks.get(id).unwrap_or(&empty);
                match self.elimination_reason(row) {
                    Some(reason) => PhaseVerdict::eliminate(id, reason),
                    None => PhaseVerdict::survive(id),
                }
            })
            .collect()
    }
}
