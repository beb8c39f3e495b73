//! Arena Runner — the forecaster tournament engine.
//!
//! This crate builds on `arena-core` to provide:
//! - Model state management (append-only history, permanent eliminations)
//! - Phase 0 sanity, Phase 1 competence and Phase 2 stability filters
//! - Phase 3 qualification (prevalence margin or top percent) and composite ranking
//! - Leaderboards, model profiles, separability and calibration reports
//! - TOML configuration with content hashing

pub mod composite;
pub mod config;
pub mod phases;
pub mod qualification;
pub mod reporting;
pub mod state;
pub mod stats;
pub mod tournament;

pub use composite::{
    build_ranking_profiles, composite_score, rank_all_horizons, rank_models_for_horizon,
    HorizonMetrics, RankedModel, RankingProfile,
};
pub use config::{
    CompetenceConfig, CompositeConfig, ConfigError, ConfigHash, QualificationMode,
    ReportingConfig, SanityConfig, StabilityConfig, TournamentConfig,
};
pub use phases::{
    apply_phase, compute_percentile_ranks, CompetenceFilter, EliminationPhase, PhaseReport,
    PhaseVerdict, SanityAggregate, SanityFilter, StabilityAggregate, StabilityFilter,
    DEFAULT_PERCENTILE,
};
pub use qualification::{
    compute_prevalence_log_loss, qualify, Qualification, QualificationResult,
};
pub use reporting::{
    HorizonLeaderboard, HorizonStats, LeaderboardEntry, ModelProfile, ModelStatus,
    QuintileReport, SeparabilityReport,
};
pub use state::{EliminationEvent, ModelState, ModelStateManager, StateError};
pub use tournament::{Tournament, TournamentError, TournamentOutcome, TournamentSummary};
