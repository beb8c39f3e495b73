//! Arena Core — domain types for the forecaster tournament.
//!
//! This crate contains the vocabulary every other crate speaks:
//! - Horizons and horizon sets (which forward windows a tournament scores)
//! - `HorizonMap<T>`, a mapping that is total over a horizon set
//! - `RoundScore`, one model's scored predictions for one completed round
//! - Log-loss math and the random-forecast baseline
//!
//! No I/O lives here. Round scores arrive from an external scorer and are
//! validated against the tournament's horizon set before they are stored.

pub mod error;
pub mod horizon;
pub mod math;
pub mod score;

pub use error::ScoreError;
pub use horizon::{join_horizons, Horizon, HorizonMap, HorizonSet};
pub use math::{brier_score, log_loss, LOG_LOSS_EPSILON, RANDOM_BASELINE};
pub use score::RoundScore;
