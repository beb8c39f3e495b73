//! Round scores — one model's scored predictions for one completed round.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ScoreError;
use crate::horizon::{Horizon, HorizonMap, HorizonSet};
use crate::math::log_loss;

/// Scored predictions of a single model for a single round.
///
/// A `NaN` log loss marks a horizon the scorer could not grade (for example
/// an outcome that has not resolved yet). Aggregates treat it as absent data,
/// never as zero. `+∞` is a graded round: an unclamped scorer produces it for
/// a certain forecast that turned out wrong.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundScore {
    pub round_number: u32,
    /// Predicted probability of a positive outcome, per horizon.
    pub predictions: HorizonMap<f64>,
    /// Observed outcome, per horizon.
    pub labels: HorizonMap<bool>,
    /// Per-horizon log loss derived from `predictions` and `labels`.
    /// Serialized NaN becomes `null` and reads back as NaN.
    #[serde(rename = "log_loss_by_horizon", deserialize_with = "deserialize_losses")]
    pub log_loss: HorizonMap<f64>,
    /// Fraction of the horizon elapsed before the forecast first pivoted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_to_pivot_ratio: Option<HorizonMap<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_pivot_at: Option<HorizonMap<DateTime<Utc>>>,
}

impl RoundScore {
    /// Score a round: derive log loss from predictions and labels.
    pub fn scored(
        set: &HorizonSet,
        round_number: u32,
        predictions: HorizonMap<f64>,
        labels: HorizonMap<bool>,
    ) -> Result<Self, ScoreError> {
        predictions.ensure_covers(set, &format!("round {round_number} predictions"))?;
        labels.ensure_covers(set, &format!("round {round_number} labels"))?;
        let losses = predictions.map(|h, p| log_loss(*p, labels[h]));
        let score = Self {
            round_number,
            predictions,
            labels,
            log_loss: losses,
            time_to_pivot_ratio: None,
            first_pivot_at: None,
        };
        score.validate(set)?;
        Ok(score)
    }

    /// Attach pivot timing collected by the scorer.
    pub fn with_pivots(
        mut self,
        time_to_pivot_ratio: HorizonMap<f64>,
        first_pivot_at: Option<HorizonMap<DateTime<Utc>>>,
    ) -> Self {
        self.time_to_pivot_ratio = Some(time_to_pivot_ratio);
        self.first_pivot_at = first_pivot_at;
        self
    }

    /// Check every per-horizon map against `set` and every value against its range.
    pub fn validate(&self, set: &HorizonSet) -> Result<(), ScoreError> {
        let round = self.round_number;
        self.predictions
            .ensure_covers(set, &format!("round {round} predictions"))?;
        self.labels
            .ensure_covers(set, &format!("round {round} labels"))?;
        self.log_loss
            .ensure_covers(set, &format!("round {round} log loss"))?;
        if let Some(ratios) = &self.time_to_pivot_ratio {
            ratios.ensure_covers(set, &format!("round {round} pivot ratios"))?;
        }
        if let Some(pivots) = &self.first_pivot_at {
            pivots.ensure_covers(set, &format!("round {round} pivot timestamps"))?;
        }

        for (horizon, &value) in self.predictions.iter() {
            if !(0.0..=1.0).contains(&value) {
                return Err(ScoreError::InvalidProbability {
                    round,
                    horizon,
                    value,
                });
            }
        }
        for (horizon, &value) in self.log_loss.iter() {
            if value < 0.0 {
                return Err(ScoreError::NegativeLogLoss {
                    round,
                    horizon,
                    value,
                });
            }
        }
        Ok(())
    }

    pub fn prediction(&self, horizon: Horizon) -> f64 {
        self.predictions[horizon]
    }

    pub fn label(&self, horizon: Horizon) -> bool {
        self.labels[horizon]
    }

    /// Log loss for `horizon`, or `None` when the scorer left it ungraded.
    /// May be `+∞`.
    pub fn scored_log_loss(&self, horizon: Horizon) -> Option<f64> {
        self.log_loss.get(horizon).copied().filter(|v| !v.is_nan())
    }

    /// Pivot ratio for `horizon`, when the scorer recorded one.
    pub fn pivot_ratio(&self, horizon: Horizon) -> Option<f64> {
        self.time_to_pivot_ratio
            .as_ref()
            .and_then(|m| m.get(horizon).copied())
            .filter(|v| v.is_finite())
    }
}

fn deserialize_losses<'de, D: Deserializer<'de>>(d: D) -> Result<HorizonMap<f64>, D::Error> {
    let raw = HorizonMap::<Option<f64>>::deserialize(d)?;
    Ok(raw.map(|_, v| v.unwrap_or(f64::NAN)))
}
