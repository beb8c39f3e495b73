//! Per-horizon leaderboards built from the Phase-3 ranking.
//!
//! Rows come from the composite ranking, in its order, and are joined with the
//! model profiles for descriptive columns. A model whose profile does not list
//! the horizon as qualified is never rendered, even if the ranking had it.

use std::collections::BTreeMap;

use serde::Serialize;

use arena_core::Horizon;

use super::profile::ModelProfile;
use crate::composite::RankedModel;

/// A single row of a horizon leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub model_id: String,
    pub composite_score: f64,
    pub mean_log_loss: f64,
    pub brier_score: f64,
    pub accuracy: f64,
    /// NaN when the model has too few scored predictions.
    pub calibration_error: f64,
    pub rounds: usize,
}

/// Ranked, mask-filtered leaderboard for one horizon.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HorizonLeaderboard {
    pub horizon: Horizon,
    pub entries: Vec<LeaderboardEntry>,
}

impl HorizonLeaderboard {
    pub fn build(horizon: Horizon, ranking: &[RankedModel], profiles: &[ModelProfile]) -> Self {
        let by_id: BTreeMap<&str, &ModelProfile> =
            profiles.iter().map(|p| (p.model_id.as_str(), p)).collect();

        let entries = ranking
            .iter()
            .filter_map(|ranked| {
                let profile = by_id.get(ranked.model_id.as_str())?;
                if !profile.is_qualified(horizon) {
                    return None;
                }
                let stats = profile.horizons.get(&horizon)?;
                Some((ranked, stats))
            })
            .enumerate()
            .map(|(i, (ranked, stats))| LeaderboardEntry {
                rank: i + 1,
                model_id: ranked.model_id.clone(),
                composite_score: ranked.score,
                mean_log_loss: stats.mean_log_loss,
                brier_score: stats.brier_score,
                accuracy: stats.accuracy,
                calibration_error: stats.calibration_error,
                rounds: stats.rounds,
            })
            .collect();

        Self { horizon, entries }
    }

    pub fn entries(&self) -> &[LeaderboardEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, model_id: &str) -> bool {
        self.entries.iter().any(|e| e.model_id == model_id)
    }
}

/// Leaderboards for every ranked horizon.
pub fn build_leaderboards(
    rankings: &BTreeMap<Horizon, Vec<RankedModel>>,
    profiles: &[ModelProfile],
) -> BTreeMap<Horizon, HorizonLeaderboard> {
    rankings
        .iter()
        .map(|(h, ranking)| (*h, HorizonLeaderboard::build(*h, ranking, profiles)))
        .collect()
}
