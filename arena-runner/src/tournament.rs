//! Tournament orchestrator.
//!
//! Progressive narrowing: cheap sanity checks → cohort-relative competence →
//! stability over time → qualification and ranking. Each phase sees only the
//! survivors of the one before it.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use arena_core::{Horizon, RoundScore};

use crate::composite::{build_ranking_profiles, rank_all_horizons, RankedModel};
use crate::config::{ConfigError, ConfigHash, TournamentConfig};
use crate::phases::{
    apply_phase, CompetenceFilter, EliminationPhase, PhaseReport, SanityFilter, StabilityFilter,
};
use crate::qualification::{qualify, Qualification};
use crate::reporting::{
    build_leaderboards, build_profiles, separability_by_horizon, HorizonLeaderboard,
    ModelProfile, SeparabilityReport,
};
use crate::state::{EliminationEvent, ModelStateManager, StateError};

#[derive(Debug, Error)]
pub enum TournamentError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Cohort sizes across a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TournamentSummary {
    pub total_models: usize,
    pub phases: Vec<PhaseReport>,
    /// Active after the last eliminating phase.
    pub survivors: usize,
    /// Survivors qualified on at least one horizon.
    pub qualified_anywhere: usize,
}

impl fmt::Display for TournamentSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Tournament Summary ===")?;
        writeln!(f, "Total models: {}", self.total_models)?;
        for p in &self.phases {
            writeln!(
                f,
                "Phase {} ({}): entered {}, eliminated {} ({:.1}%), survived {}",
                p.phase,
                p.name,
                p.entered,
                p.eliminated,
                p.elimination_rate(),
                p.survived()
            )?;
        }
        writeln!(f, "Survivors: {}", self.survivors)?;
        write!(f, "Qualified on any horizon: {}", self.qualified_anywhere)
    }
}

/// Everything a run produces.
#[derive(Debug, Clone, Serialize)]
pub struct TournamentOutcome {
    pub config_hash: ConfigHash,
    pub generated_at: DateTime<Utc>,
    pub summary: TournamentSummary,
    /// In the order they happened.
    pub eliminations: Vec<EliminationEvent>,
    pub qualification: Qualification,
    pub rankings: BTreeMap<Horizon, Vec<RankedModel>>,
    pub leaderboards: BTreeMap<Horizon, HorizonLeaderboard>,
    pub profiles: Vec<ModelProfile>,
    pub separability: BTreeMap<Horizon, SeparabilityReport>,
}

/// Owns the configuration and model state of one benchmark session.
#[derive(Debug, Clone)]
pub struct Tournament {
    config: TournamentConfig,
    manager: ModelStateManager,
}

impl Tournament {
    /// Validate `config` and register every candidate model.
    pub fn new<I, S>(config: TournamentConfig, model_ids: I) -> Result<Self, TournamentError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        config.validate()?;
        let manager = ModelStateManager::new(model_ids, config.horizons.clone())?;
        info!(
            models = manager.len(),
            horizons = config.horizons.len(),
            "tournament created"
        );
        Ok(Self { config, manager })
    }

    pub fn config(&self) -> &TournamentConfig {
        &self.config
    }

    pub fn manager(&self) -> &ModelStateManager {
        &self.manager
    }

    pub fn add_round_score(&mut self, model_id: &str, score: RoundScore) -> Result<(), TournamentError> {
        Ok(self.manager.add_round_score(model_id, score)?)
    }

    pub fn record_failed_round(&mut self, model_id: &str, round: u32) -> Result<(), TournamentError> {
        Ok(self.manager.record_failed_round(model_id, round)?)
    }

    /// The eliminating phases, in execution order.
    pub fn phases(&self) -> Vec<Box<dyn EliminationPhase>> {
        vec![
            Box::new(SanityFilter::new(self.config.sanity.clone())),
            Box::new(CompetenceFilter::new(self.config.competence.clone())),
            Box::new(StabilityFilter::new(self.config.stability.clone())),
        ]
    }

    /// Run phases 0–2 in order, advancing the phase counter after each.
    pub fn run_eliminations(&mut self) -> Result<Vec<PhaseReport>, TournamentError> {
        let mut reports = Vec::new();
        for phase in self.phases() {
            reports.push(apply_phase(phase.as_ref(), &mut self.manager)?);
            self.manager.advance_phase();
        }
        Ok(reports)
    }

    /// Phase-3 qualification over the current survivors.
    pub fn qualify(&self) -> Qualification {
        qualify(&self.manager, &self.config.qualification)
    }

    /// Execute the full tournament and build every report.
    pub fn run(&mut self) -> Result<TournamentOutcome, TournamentError> {
        let phase_reports = self.run_eliminations()?;

        let qualification = self.qualify();
        let ranking_profiles =
            build_ranking_profiles(&self.manager, &qualification, self.config.stability.window);
        let rankings = rank_all_horizons(
            &ranking_profiles,
            self.manager.horizons(),
            &self.config.composite,
        );

        let profiles = build_profiles(&self.manager, &qualification, &self.config.reporting);
        let leaderboards = build_leaderboards(&rankings, &profiles);
        let separability = separability_by_horizon(
            &self.manager,
            &qualification,
            self.config.reporting.min_separability_cohort,
        );

        let summary = TournamentSummary {
            total_models: self.manager.len(),
            phases: phase_reports,
            survivors: self.manager.get_active_models().len(),
            qualified_anywhere: qualification
                .qualified_by_model
                .values()
                .filter(|set| !set.is_empty())
                .count(),
        };
        info!(
            survivors = summary.survivors,
            qualified = summary.qualified_anywhere,
            "tournament finished"
        );

        Ok(TournamentOutcome {
            config_hash: self.config.config_hash(),
            generated_at: Utc::now(),
            summary,
            eliminations: self.manager.elimination_log().to_vec(),
            qualification,
            rankings,
            leaderboards,
            profiles,
            separability,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_core::{HorizonMap, HorizonSet};

    fn score(set: &HorizonSet, round: u32, p: f64, label: bool) -> RoundScore {
        RoundScore::scored(
            set,
            round,
            HorizonMap::from_fn(set, |_| p),
            HorizonMap::from_fn(set, |_| label),
        )
        .unwrap()
    }

    #[test]
    fn new_rejects_invalid_config() {
        let mut config = TournamentConfig::default();
        config.stability.window = 0;
        let err = Tournament::new(config, ["a"]).unwrap_err();
        assert!(matches!(err, TournamentError::Config(_)));
    }

    #[test]
    fn unknown_model_is_fatal() {
        let mut t = Tournament::new(TournamentConfig::default(), ["a"]).unwrap();
        let set = t.config().horizons.clone();
        let err = t.add_round_score("b", score(&set, 1, 0.5, true)).unwrap_err();
        assert!(matches!(err, TournamentError::State(StateError::UnknownModel(_))));
    }

    #[test]
    fn run_advances_through_all_phases() {
        let mut t = Tournament::new(TournamentConfig::default(), ["a", "b"]).unwrap();
        let set = t.config().horizons.clone();
        for r in 1..=6 {
            let label = r % 2 == 0;
            t.add_round_score("a", score(&set, r, if label { 0.7 } else { 0.3 }, label))
                .unwrap();
            t.add_round_score("b", score(&set, r, 0.5, label)).unwrap();
        }

        let outcome = t.run().unwrap();
        assert_eq!(t.manager().get_current_phase(), 3);
        assert_eq!(outcome.summary.phases.len(), 3);
        assert_eq!(outcome.summary.total_models, 2);
        assert!(outcome.eliminations.is_empty());
        assert_eq!(outcome.config_hash, t.config().config_hash());
        assert!(outcome.summary.to_string().contains("Phase 0 (Sanity)"));
    }

    #[test]
    fn outcome_serializes_to_json() {
        let mut t = Tournament::new(TournamentConfig::default(), ["a"]).unwrap();
        let set = t.config().horizons.clone();
        t.add_round_score("a", score(&set, 1, 0.6, true)).unwrap();

        let outcome = t.run().unwrap();
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"qualified_by_model\""));
        assert!(json.contains("\"15m\""));
    }
}
