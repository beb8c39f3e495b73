//! Phase 3 qualification: which surviving models may be ranked on which
//! horizon.
//!
//! The resulting mask (`qualified_by_model`) is the single source of truth
//! for every downstream view. Having data on a horizon does not make a model
//! eligible there.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, info};

use arena_core::Horizon;

use crate::config::QualificationMode;
use crate::state::ModelStateManager;

/// Slack for floating-point products such as `10 × 0.7`.
const COUNT_EPSILON: f64 = 1e-9;

/// Log loss of always predicting the empirical base rate.
///
/// Binary entropy of `p = true / (true + false)`. Infinite when the outcome
/// never varies or there are no samples: no model can be judged against such
/// a baseline.
pub fn compute_prevalence_log_loss(true_count: usize, false_count: usize) -> f64 {
    let total = true_count + false_count;
    if total == 0 || true_count == 0 || false_count == 0 {
        return f64::INFINITY;
    }
    let p = true_count as f64 / total as f64;
    -(p * p.ln() + (1.0 - p) * (1.0 - p).ln())
}

/// Number of models kept by `top_percent`: at least one, at most `n`.
pub fn top_percent_count(n: usize, top_percent: f64) -> usize {
    if n == 0 {
        return 0;
    }
    let raw = (n as f64 * top_percent - COUNT_EPSILON).ceil();
    (raw.max(1.0) as usize).min(n)
}

/// Qualification outcome for one horizon.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualificationResult {
    pub horizon: Horizon,
    /// Ascending by mean log loss, ties by model id.
    pub qualified_models: Vec<String>,
    pub disqualified_models: Vec<String>,
    /// Log-loss cut-off; NaN when no model had data on the horizon.
    pub threshold: f64,
}

/// Qualification across every horizon of the tournament.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Qualification {
    pub by_horizon: BTreeMap<Horizon, QualificationResult>,
    /// Every surviving model has an entry, possibly empty.
    pub qualified_by_model: BTreeMap<String, BTreeSet<Horizon>>,
}

impl Qualification {
    /// Whether `model_id` may appear in `horizon`'s views.
    pub fn is_qualified(&self, model_id: &str, horizon: Horizon) -> bool {
        self.qualified_by_model
            .get(model_id)
            .is_some_and(|set| set.contains(&horizon))
    }

    pub fn qualified_horizons(&self, model_id: &str) -> BTreeSet<Horizon> {
        self.qualified_by_model
            .get(model_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn result(&self, horizon: Horizon) -> Option<&QualificationResult> {
        self.by_horizon.get(&horizon)
    }
}

/// Qualify the active models of `manager` on every horizon.
pub fn qualify(manager: &ModelStateManager, mode: &QualificationMode) -> Qualification {
    let mut qualified_by_model: BTreeMap<String, BTreeSet<Horizon>> = manager
        .active()
        .map(|m| (m.model_id.clone(), BTreeSet::new()))
        .collect();
    let mut by_horizon = BTreeMap::new();

    for h in manager.horizons().iter() {
        // Only models with scored rounds on this horizon take part.
        let mut candidates: Vec<(&str, f64)> = manager
            .active()
            .filter_map(|m| m.mean_log_loss(h).map(|loss| (m.model_id.as_str(), loss)))
            .collect();
        candidates.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0)));

        let result = if candidates.is_empty() {
            debug!(horizon = %h, "no candidates for qualification");
            QualificationResult {
                horizon: h,
                qualified_models: Vec::new(),
                disqualified_models: Vec::new(),
                threshold: f64::NAN,
            }
        } else {
            match mode {
                QualificationMode::PrevalenceMargin { margin } => {
                    let (trues, falses) = candidates
                        .iter()
                        .filter_map(|(id, _)| manager.get_model(id).ok())
                        .map(|m| m.label_counts(h))
                        .fold((0, 0), |(t, f), (mt, mf)| (t + mt, f + mf));
                    let threshold = compute_prevalence_log_loss(trues, falses) + margin;
                    let (qualified, disqualified): (Vec<_>, Vec<_>) =
                        candidates.iter().partition(|(_, loss)| *loss <= threshold);
                    QualificationResult {
                        horizon: h,
                        qualified_models: ids(&qualified),
                        disqualified_models: ids(&disqualified),
                        threshold,
                    }
                }
                QualificationMode::TopPercent { top_percent } => {
                    let keep = top_percent_count(candidates.len(), *top_percent);
                    let (qualified, disqualified) = candidates.split_at(keep);
                    QualificationResult {
                        horizon: h,
                        qualified_models: qualified.iter().map(|(id, _)| id.to_string()).collect(),
                        disqualified_models: disqualified
                            .iter()
                            .map(|(id, _)| id.to_string())
                            .collect(),
                        threshold: qualified[keep - 1].1,
                    }
                }
            }
        };

        for id in &result.qualified_models {
            if let Some(set) = qualified_by_model.get_mut(id) {
                set.insert(h);
            }
        }
        info!(
            horizon = %h,
            qualified = result.qualified_models.len(),
            disqualified = result.disqualified_models.len(),
            threshold = result.threshold,
            "horizon qualification"
        );
        by_horizon.insert(h, result);
    }

    Qualification {
        by_horizon,
        qualified_by_model,
    }
}

fn ids(entries: &[&(&str, f64)]) -> Vec<String> {
    entries.iter().map(|(id, _)| id.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_core::{HorizonMap, HorizonSet, RoundScore};

    #[test]
    fn prevalence_is_infinite_for_degenerate_counts() {
        assert_eq!(compute_prevalence_log_loss(0, 0), f64::INFINITY);
        assert_eq!(compute_prevalence_log_loss(100, 0), f64::INFINITY);
        assert_eq!(compute_prevalence_log_loss(0, 100), f64::INFINITY);
    }

    #[test]
    fn prevalence_balanced_is_ln2_and_symmetric() {
        assert!((compute_prevalence_log_loss(50, 50) - 0.693).abs() < 0.01);
        let a = compute_prevalence_log_loss(70, 30);
        let b = compute_prevalence_log_loss(30, 70);
        assert!((a - b).abs() < 1e-12);
        assert!(a < compute_prevalence_log_loss(50, 50));
    }

    #[test]
    fn top_percent_count_rounds_up_and_clamps() {
        assert_eq!(top_percent_count(5, 0.6), 3);
        assert_eq!(top_percent_count(10, 0.7), 7);
        assert_eq!(top_percent_count(3, 0.01), 1);
        assert_eq!(top_percent_count(4, 1.0), 4);
        assert_eq!(top_percent_count(0, 0.5), 0);
    }

    fn manager(rows: &[(&str, f64, bool)]) -> ModelStateManager {
        let set = HorizonSet::new(vec![Horizon::H1]).unwrap();
        let mut m = ModelStateManager::new(rows.iter().map(|r| r.0), set.clone()).unwrap();
        for (id, p, label) in rows {
            let score = RoundScore::scored(
                &set,
                1,
                HorizonMap::from_fn(&set, |_| *p),
                HorizonMap::from_fn(&set, |_| *label),
            )
            .unwrap();
            m.add_round_score(id, score).unwrap();
        }
        m
    }

    #[test]
    fn top_percent_keeps_lowest_losses() {
        let m = manager(&[
            ("e", 0.1, true),
            ("a", 0.9, true),
            ("c", 0.6, true),
            ("b", 0.8, true),
            ("d", 0.3, true),
        ]);
        let q = qualify(&m, &QualificationMode::TopPercent { top_percent: 0.6 });
        let r = q.result(Horizon::H1).unwrap();

        assert_eq!(r.qualified_models, vec!["a", "b", "c"]);
        assert_eq!(r.disqualified_models, vec!["d", "e"]);
        let third = m.get_model("c").unwrap().mean_log_loss(Horizon::H1).unwrap();
        assert_eq!(r.threshold, third);
        assert!(q.is_qualified("a", Horizon::H1));
        assert!(!q.is_qualified("e", Horizon::H1));
    }

    #[test]
    fn prevalence_margin_against_pooled_base_rate() {
        // Labels pooled: 1 true, 3 false → baseline ≈ 0.562.
        let m = manager(&[
            ("sharp", 0.9, true),
            ("coin", 0.5, false),
            ("wrong", 0.9, false),
            ("ok", 0.4, false),
        ]);
        let q = qualify(&m, &QualificationMode::PrevalenceMargin { margin: 0.1 });
        let r = q.result(Horizon::H1).unwrap();

        let expected = compute_prevalence_log_loss(1, 3) + 0.1;
        assert!((r.threshold - expected).abs() < 1e-12);
        assert_eq!(r.qualified_models, vec!["sharp", "ok"]);
        assert_eq!(r.disqualified_models, vec!["coin", "wrong"]);
        assert!(q.qualified_horizons("wrong").is_empty());
    }

    #[test]
    fn one_sided_labels_give_infinite_threshold_and_qualify_everyone() {
        let always_up = manager(&[("low", 0.9, true), ("high", 0.2, true), ("mid", 0.6, true)]);
        let q = qualify(&always_up, &QualificationMode::PrevalenceMargin { margin: 0.1 });
        let r = q.result(Horizon::H1).unwrap();
        assert_eq!(r.threshold, f64::INFINITY);
        assert_eq!(r.qualified_models, vec!["low", "mid", "high"]);
        assert!(r.disqualified_models.is_empty());

        let always_down = manager(&[("x", 0.1, false), ("y", 0.95, false)]);
        let q = qualify(&always_down, &QualificationMode::PrevalenceMargin { margin: -0.5 });
        let r = q.result(Horizon::H1).unwrap();
        assert_eq!(r.threshold, f64::INFINITY);
        assert_eq!(r.qualified_models, vec!["x", "y"]);
    }

    #[test]
    fn horizon_without_data_has_nan_threshold() {
        let set = HorizonSet::new(vec![Horizon::H1, Horizon::D7]).unwrap();
        let mut m = ModelStateManager::new(["a"], set.clone()).unwrap();
        let mut score = RoundScore::scored(
            &set,
            1,
            HorizonMap::from_fn(&set, |_| 0.7),
            HorizonMap::from_fn(&set, |_| true),
        )
        .unwrap();
        score.log_loss = score
            .log_loss
            .map(|h, v| if h == Horizon::D7 { f64::NAN } else { *v });
        m.add_round_score("a", score).unwrap();

        let q = qualify(&m, &QualificationMode::TopPercent { top_percent: 0.5 });
        let d7 = q.result(Horizon::D7).unwrap();
        assert!(d7.qualified_models.is_empty());
        assert!(d7.threshold.is_nan());
        assert_eq!(
            q.qualified_horizons("a").into_iter().collect::<Vec<_>>(),
            vec![Horizon::H1]
        );
    }

    #[test]
    fn eliminated_models_get_no_mask_entry() {
        let mut m = manager(&[("a", 0.8, true), ("b", 0.6, true)]);
        m.eliminate_model("b", 1, "No horizon strength").unwrap();
        let q = qualify(&m, &QualificationMode::default());
        assert!(q.qualified_by_model.contains_key("a"));
        assert!(!q.qualified_by_model.contains_key("b"));
    }
}
