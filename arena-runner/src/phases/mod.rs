//! Eliminating phases of the tournament.
//!
//! Phases 0 through 2 each inspect the active cohort and return a verdict per
//! model they judged. Evaluation is read-only; `apply_phase` is the single
//! place where verdicts become eliminations, so a phase can never act on a
//! cohort that an earlier phase has not already pruned.
//!
//! ```text
//! all models → Phase 0 (sanity)     → obvious failures removed
//! survivors  → Phase 1 (competence) → broad underperformers removed
//! survivors  → Phase 2 (stability)  → erratic models removed
//! survivors  → Phase 3 (qualification + ranking, non-eliminating)
//! ```

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::state::{ModelStateManager, StateError};

pub mod competence;
pub mod sanity;
pub mod stability;

pub use competence::{compute_percentile_ranks, CompetenceFilter, DEFAULT_PERCENTILE};
pub use sanity::{SanityAggregate, SanityFilter};
pub use stability::{StabilityAggregate, StabilityFilter};

/// Outcome of one phase for one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseVerdict {
    pub model_id: String,
    /// `Some` when the model should be eliminated.
    pub elimination_reason: Option<String>,
}

impl PhaseVerdict {
    pub fn survive(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            elimination_reason: None,
        }
    }

    pub fn eliminate(model_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            elimination_reason: Some(reason.into()),
        }
    }

    pub fn is_elimination(&self) -> bool {
        self.elimination_reason.is_some()
    }
}

/// A filtering stage over the active cohort.
pub trait EliminationPhase: Send + Sync {
    /// Phase name (for logging/reporting).
    fn name(&self) -> &str;

    /// Number recorded on eliminations made by this phase.
    fn phase_number(&self) -> u8;

    /// Judge the active models. Models the phase cannot judge yet (too little
    /// data) get no verdict.
    fn evaluate(&self, manager: &ModelStateManager) -> Vec<PhaseVerdict>;
}

/// Cohort counts for one executed phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseReport {
    pub phase: u8,
    pub name: String,
    /// Active models when the phase started.
    pub entered: usize,
    /// Models that received a verdict.
    pub evaluated: usize,
    pub eliminated: usize,
}

impl PhaseReport {
    pub fn survived(&self) -> usize {
        self.entered - self.eliminated
    }

    /// Percentage of entrants eliminated; 0 for an empty phase.
    pub fn elimination_rate(&self) -> f64 {
        if self.entered == 0 {
            0.0
        } else {
            self.eliminated as f64 / self.entered as f64 * 100.0
        }
    }
}

/// Evaluate `phase` against the manager and apply its eliminations.
pub fn apply_phase(
    phase: &dyn EliminationPhase,
    manager: &mut ModelStateManager,
) -> Result<PhaseReport, StateError> {
    let entered = manager.get_active_models().len();
    info!(phase = phase.phase_number(), name = phase.name(), entered, "phase started");

    let verdicts = phase.evaluate(manager);
    let mut eliminated = 0;
    for verdict in &verdicts {
        if let Some(reason) = &verdict.elimination_reason {
            if manager.eliminate_model(&verdict.model_id, phase.phase_number(), reason.as_str())? {
                eliminated += 1;
            }
        }
    }

    let report = PhaseReport {
        phase: phase.phase_number(),
        name: phase.name().to_string(),
        entered,
        evaluated: verdicts.len(),
        eliminated,
    };
    info!(
        phase = report.phase,
        name = %report.name,
        evaluated = report.evaluated,
        eliminated = report.eliminated,
        survived = report.survived(),
        "phase finished"
    );
    Ok(report)
}
