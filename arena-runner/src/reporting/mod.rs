//! Read-only reports over a finished tournament.
//!
//! Every view here filters by the qualification mask the same way:
//! - `leaderboard`: per-horizon tables in composite-rank order
//! - `profile`: per-model cross-horizon summaries
//! - `separability`: whether a horizon distinguishes its qualified cohort
//! - `calibration`: calibration error and quintile buckets

pub mod calibration;
pub mod leaderboard;
pub mod profile;
pub mod separability;

use std::collections::BTreeMap;

use arena_core::Horizon;

use crate::qualification::Qualification;
use crate::state::ModelStateManager;

pub use calibration::{
    calibration_curve, expected_calibration_error, quintile_buckets, CalibrationBin,
    QuintileBucket, QuintileReport,
};
pub use leaderboard::{build_leaderboards, HorizonLeaderboard, LeaderboardEntry};
pub use profile::{build_profiles, HorizonStats, ModelProfile, ModelStatus};
pub use separability::{compute_separability, SeparabilityReport};

/// Separability of every horizon over its qualified cohort.
pub fn separability_by_horizon(
    manager: &ModelStateManager,
    qualification: &Qualification,
    min_cohort: usize,
) -> BTreeMap<Horizon, SeparabilityReport> {
    manager
        .horizons()
        .iter()
        .map(|h| {
            let series: Vec<&[f64]> = manager
                .active()
                .filter(|m| qualification.is_qualified(&m.model_id, h))
                .map(|m| m.log_losses(h))
                .collect();
            (h, compute_separability(h, &series, min_cohort))
        })
        .collect()
}
