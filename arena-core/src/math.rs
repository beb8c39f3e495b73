//! Scoring rules for binary forecasts.

/// Log loss of a 0.5 forecast against either outcome: ln(2).
///
/// The reference point for "no better than chance".
pub const RANDOM_BASELINE: f64 = std::f64::consts::LN_2;

/// Predictions are clamped to `[ε, 1 − ε]` before taking logs so a confident
/// miss costs a large finite loss instead of infinity.
pub const LOG_LOSS_EPSILON: f64 = 1e-15;

/// Binary log loss: `−[y·ln(p) + (1−y)·ln(1−p)]`. Lower is better.
pub fn log_loss(prediction: f64, outcome: bool) -> f64 {
    let p = prediction.clamp(LOG_LOSS_EPSILON, 1.0 - LOG_LOSS_EPSILON);
    if outcome {
        -p.ln()
    } else {
        -(1.0 - p).ln()
    }
}

/// Squared error of a probability forecast against the realized outcome.
pub fn brier_score(prediction: f64, outcome: bool) -> f64 {
    let y = if outcome { 1.0 } else { 0.0 };
    (prediction - y).powi(2)
}
