use thiserror::Error;

use crate::horizon::Horizon;

/// Malformed horizon sets, horizon maps, or round scores.
///
/// These indicate a broken caller contract (the scorer handed over a record
/// that does not match the tournament's horizon set), not bad market data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoreError {
    #[error("horizon set must contain at least one horizon")]
    EmptyHorizonSet,
    #[error("horizon {0} listed more than once")]
    DuplicateHorizon(Horizon),
    #[error("unknown horizon label: {0:?}")]
    UnknownHorizon(String),
    #[error("{context}: missing horizon {horizon}")]
    MissingHorizon { context: String, horizon: Horizon },
    #[error("{context}: horizon {horizon} is not part of the horizon set")]
    UnexpectedHorizon { context: String, horizon: Horizon },
    #[error("round {round}: prediction {value} for {horizon} is outside [0, 1]")]
    InvalidProbability {
        round: u32,
        horizon: Horizon,
        value: f64,
    },
    #[error("round {round}: log loss {value} for {horizon} is negative")]
    NegativeLogLoss {
        round: u32,
        horizon: Horizon,
        value: f64,
    },
}
