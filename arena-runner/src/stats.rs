//! Descriptive statistics shared by the phases and the reports.
//!
//! All functions take plain slices and return `None` for empty input instead
//! of inventing a value; callers decide what "not computable" means for them.

/// Arithmetic mean.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population variance (divides by n, not n − 1).
///
/// A series containing `+∞` has infinite variance.
pub fn population_variance(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    if m.is_infinite() {
        return Some(f64::INFINITY);
    }
    Some(values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64)
}

/// Median; even-length input averages the two middle values.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Standard error of the mean: `sqrt(variance / n)`.
pub fn standard_error(values: &[f64]) -> Option<f64> {
    let var = population_variance(values)?;
    Some((var / values.len() as f64).sqrt())
}

/// Lowest and highest mean over contiguous windows of `window` values.
///
/// Returns `(best, worst)` for a lower-is-better series. A series shorter than
/// the window has a single "window": the whole series.
pub fn window_extremes(values: &[f64], window: usize) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    if window == 0 || values.len() <= window {
        let m = mean(values)?;
        return Some((m, m));
    }

    let mut best = f64::INFINITY;
    let mut worst = f64::NEG_INFINITY;
    for w in values.windows(window) {
        let m = w.iter().sum::<f64>() / window as f64;
        best = best.min(m);
        worst = worst.max(m);
    }
    Some((best, worst))
}
