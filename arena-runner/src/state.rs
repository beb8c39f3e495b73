//! Model state manager, the only mutable store in the engine.
//!
//! Every candidate model is registered at construction and is never removed.
//! Round history is append-only; elimination is a one-way transition whose
//! first phase and reason are kept for the audit trail. The phase counter only
//! moves forward.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use arena_core::{Horizon, HorizonSet, RoundScore, ScoreError};

/// Errors from the state manager. All of them are caller contract violations.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("unknown model id: {0}")]
    UnknownModel(String),
    #[error("model id registered twice: {0}")]
    DuplicateModel(String),
    #[error("round {round} for {model} does not follow round {last}")]
    NonChronologicalRound { model: String, round: u32, last: u32 },
    #[error("invalid round score for {model}: {source}")]
    Score {
        model: String,
        #[source]
        source: ScoreError,
    },
}

/// Audit record of one elimination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EliminationEvent {
    pub model_id: String,
    pub phase: u8,
    pub reason: String,
}

/// History and status of a single model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelState {
    pub model_id: String,
    pub is_active: bool,
    pub eliminated_in_phase: Option<u8>,
    pub elimination_reason: Option<String>,
    /// Chronological, append-only.
    pub round_scores: Vec<RoundScore>,
    /// Scored (non-NaN) log losses per horizon, in round order.
    pub log_loss_by_horizon: BTreeMap<Horizon, Vec<f64>>,
    /// Recorded pivot ratios per horizon, in round order.
    pub time_to_pivot_ratios: BTreeMap<Horizon, Vec<f64>>,
    /// Rounds in which the model produced no usable prediction.
    pub failed_rounds: Vec<u32>,
}

impl ModelState {
    fn new(model_id: String, horizons: &HorizonSet) -> Self {
        Self {
            model_id,
            is_active: true,
            eliminated_in_phase: None,
            elimination_reason: None,
            round_scores: Vec::new(),
            log_loss_by_horizon: horizons.iter().map(|h| (h, Vec::new())).collect(),
            time_to_pivot_ratios: horizons.iter().map(|h| (h, Vec::new())).collect(),
            failed_rounds: Vec::new(),
        }
    }

    fn push(&mut self, score: RoundScore) {
        for (horizon, losses) in self.log_loss_by_horizon.iter_mut() {
            if let Some(loss) = score.scored_log_loss(*horizon) {
                losses.push(loss);
            }
        }
        for (horizon, ratios) in self.time_to_pivot_ratios.iter_mut() {
            if let Some(ratio) = score.pivot_ratio(*horizon) {
                ratios.push(ratio);
            }
        }
        self.round_scores.push(score);
    }

    pub fn round_count(&self) -> usize {
        self.round_scores.len()
    }

    pub fn is_eliminated(&self) -> bool {
        !self.is_active
    }

    /// Scored log losses for `horizon` in round order.
    pub fn log_losses(&self, horizon: Horizon) -> &[f64] {
        self.log_loss_by_horizon
            .get(&horizon)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn pivot_ratios(&self, horizon: Horizon) -> &[f64] {
        self.time_to_pivot_ratios
            .get(&horizon)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Mean scored log loss, or `None` when the horizon has no scored rounds.
    pub fn mean_log_loss(&self, horizon: Horizon) -> Option<f64> {
        crate::stats::mean(self.log_losses(horizon))
    }

    /// Horizons with at least one scored round.
    pub fn valid_horizons(&self) -> BTreeSet<Horizon> {
        self.log_loss_by_horizon
            .iter()
            .filter(|(_, losses)| !losses.is_empty())
            .map(|(h, _)| *h)
            .collect()
    }

    /// `(prediction, outcome)` pairs for the scored rounds of `horizon`.
    pub fn scored_pairs(&self, horizon: Horizon) -> Vec<(f64, bool)> {
        self.round_scores
            .iter()
            .filter(|s| s.scored_log_loss(horizon).is_some())
            .map(|s| (s.prediction(horizon), s.label(horizon)))
            .collect()
    }

    /// `(positive, negative)` outcome counts over the scored rounds of `horizon`.
    pub fn label_counts(&self, horizon: Horizon) -> (usize, usize) {
        self.scored_pairs(horizon)
            .iter()
            .fold((0, 0), |(t, f), (_, label)| {
                if *label {
                    (t + 1, f)
                } else {
                    (t, f + 1)
                }
            })
    }
}

/// Owns every model's state for one tournament run.
#[derive(Debug, Clone)]
pub struct ModelStateManager {
    horizons: HorizonSet,
    /// Registration order.
    order: Vec<String>,
    models: HashMap<String, ModelState>,
    current_phase: u8,
    eliminations: Vec<EliminationEvent>,
}

impl ModelStateManager {
    /// Register every candidate. Duplicate ids are rejected.
    pub fn new<I, S>(model_ids: I, horizons: HorizonSet) -> Result<Self, StateError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut order = Vec::new();
        let mut models = HashMap::new();
        for id in model_ids {
            let id = id.into();
            if models.contains_key(&id) {
                return Err(StateError::DuplicateModel(id));
            }
            models.insert(id.clone(), ModelState::new(id.clone(), &horizons));
            order.push(id);
        }
        Ok(Self {
            horizons,
            order,
            models,
            current_phase: 0,
            eliminations: Vec::new(),
        })
    }

    pub fn horizons(&self) -> &HorizonSet {
        &self.horizons
    }

    /// Validate and append a round score. Round numbers must strictly
    /// increase per model.
    pub fn add_round_score(&mut self, model_id: &str, score: RoundScore) -> Result<(), StateError> {
        score
            .validate(&self.horizons)
            .map_err(|source| StateError::Score {
                model: model_id.to_string(),
                source,
            })?;
        let state = self.model_mut(model_id)?;
        if let Some(last) = state.round_scores.last().map(|s| s.round_number) {
            if score.round_number <= last {
                return Err(StateError::NonChronologicalRound {
                    model: model_id.to_string(),
                    round: score.round_number,
                    last,
                });
            }
        }
        debug!(
            model = model_id,
            round = score.round_number,
            "round score recorded"
        );
        state.push(score);
        Ok(())
    }

    /// Record a round in which the model failed to produce a prediction.
    pub fn record_failed_round(&mut self, model_id: &str, round: u32) -> Result<(), StateError> {
        self.model_mut(model_id)?.failed_rounds.push(round);
        Ok(())
    }

    /// Eliminate an active model.
    ///
    /// Returns `Ok(true)` on the transition and `Ok(false)` when the model was
    /// already eliminated; the first phase and reason are kept.
    pub fn eliminate_model(
        &mut self,
        model_id: &str,
        phase: u8,
        reason: impl Into<String>,
    ) -> Result<bool, StateError> {
        let state = self.model_mut(model_id)?;
        if !state.is_active {
            return Ok(false);
        }
        let reason = reason.into();
        state.is_active = false;
        state.eliminated_in_phase = Some(phase);
        state.elimination_reason = Some(reason.clone());

        info!(model = model_id, phase, reason = %reason, "model eliminated");
        self.eliminations.push(EliminationEvent {
            model_id: model_id.to_string(),
            phase,
            reason,
        });
        Ok(true)
    }

    /// Active model ids in registration order.
    pub fn get_active_models(&self) -> Vec<&str> {
        self.order
            .iter()
            .filter(|id| self.models.get(*id).is_some_and(|m| m.is_active))
            .map(String::as_str)
            .collect()
    }

    /// Eliminated models in registration order.
    pub fn get_eliminated_models(&self) -> Vec<&ModelState> {
        self.iter().filter(|m| !m.is_active).collect()
    }

    pub fn is_eliminated(&self, model_id: &str) -> Result<bool, StateError> {
        Ok(self.get_model(model_id)?.is_eliminated())
    }

    pub fn get_model(&self, model_id: &str) -> Result<&ModelState, StateError> {
        self.models
            .get(model_id)
            .ok_or_else(|| StateError::UnknownModel(model_id.to_string()))
    }

    /// All models in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ModelState> {
        self.order.iter().filter_map(|id| self.models.get(id))
    }

    /// Active models in registration order.
    pub fn active(&self) -> impl Iterator<Item = &ModelState> {
        self.iter().filter(|m| m.is_active)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn advance_phase(&mut self) -> u8 {
        self.current_phase = self.current_phase.saturating_add(1);
        self.current_phase
    }

    pub fn get_current_phase(&self) -> u8 {
        self.current_phase
    }

    /// Eliminations in the order they happened.
    pub fn elimination_log(&self) -> &[EliminationEvent] {
        &self.eliminations
    }

    fn model_mut(&mut self, model_id: &str) -> Result<&mut ModelState, StateError> {
        self.models
            .get_mut(model_id)
            .ok_or_else(|| StateError::UnknownModel(model_id.to_string()))
    }
}
