//! Property-based tests for the tournament engine.
//!
//! Uses proptest to verify:
//! - Percentile ranks default to 50 for tiny cohorts and order larger ones
//! - Prevalence log loss is symmetric and bounded by ln 2
//! - Eliminations are permanent and keep their first reason
//! - Rankings only ever contain qualified models

use std::collections::BTreeMap;

use arena_core::{Horizon, HorizonMap, HorizonSet, RoundScore};
use arena_runner::phases::competence::HorizonTable;
use arena_runner::{
    compute_percentile_ranks, compute_prevalence_log_loss, qualify, rank_models_for_horizon,
    build_ranking_profiles, CompositeConfig, ModelStateManager, QualificationMode,
    DEFAULT_PERCENTILE,
};
use proptest::prelude::*;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_loss() -> impl Strategy<Value = f64> {
    0.0..3.0_f64
}

fn arb_table(min: usize, max: usize) -> impl Strategy<Value = HorizonTable> {
    prop::collection::vec(prop::collection::vec(arb_loss(), 4), min..=max).prop_map(|rows| {
        let set = HorizonSet::intraday();
        rows.into_iter()
            .enumerate()
            .map(|(i, row)| {
                let values: BTreeMap<Horizon, f64> = set.iter().zip(row).collect();
                (format!("model_{i}"), values)
            })
            .collect()
    })
}

fn manager_from(predictions: &[Vec<(f64, bool)>]) -> ModelStateManager {
    let set = HorizonSet::intraday();
    let ids: Vec<String> = (0..predictions.len()).map(|i| format!("m{i}")).collect();
    let mut m = ModelStateManager::new(ids.clone(), set.clone()).unwrap();
    for (id, rounds) in ids.iter().zip(predictions) {
        for (r, (p, label)) in rounds.iter().enumerate() {
            let score = RoundScore::scored(
                &set,
                r as u32,
                HorizonMap::from_fn(&set, |_| *p),
                HorizonMap::from_fn(&set, |_| *label),
            )
            .unwrap();
            m.add_round_score(id, score).unwrap();
        }
    }
    m
}

// ── Percentile ranks ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn tiny_cohorts_get_default_percentile(table in arb_table(0, 2)) {
        let ranks = compute_percentile_ranks(&table, &HorizonSet::intraday());
        for row in ranks.values() {
            prop_assert_eq!(row.len(), 4);
            for p in row.values() {
                prop_assert_eq!(*p, DEFAULT_PERCENTILE);
            }
        }
    }

    #[test]
    fn best_model_outranks_worst(table in arb_table(3, 12)) {
        let set = HorizonSet::intraday();
        let ranks = compute_percentile_ranks(&table, &set);
        for h in set.iter() {
            let best = table.iter().min_by(|a, b| a.1[&h].total_cmp(&b.1[&h])).unwrap();
            let worst = table.iter().max_by(|a, b| a.1[&h].total_cmp(&b.1[&h])).unwrap();
            prop_assert_eq!(ranks[best.0][&h], 100.0);
            if best.1[&h] < worst.1[&h] {
                prop_assert!(ranks[best.0][&h] > ranks[worst.0][&h]);
            }
            for row in ranks.values() {
                prop_assert!(!row[&h].is_nan());
                prop_assert!(row[&h] > 0.0 && row[&h] <= 100.0);
            }
        }
    }
}

// ── Prevalence ───────────────────────────────────────────────────────

proptest! {
    #[test]
    fn prevalence_is_symmetric(t in 0usize..500, f in 0usize..500) {
        let a = compute_prevalence_log_loss(t, f);
        let b = compute_prevalence_log_loss(f, t);
        if a.is_finite() {
            prop_assert!((a - b).abs() < 1e-12);
            prop_assert!(a > 0.0 && a <= std::f64::consts::LN_2 + 1e-12);
        } else {
            prop_assert_eq!(b, f64::INFINITY);
        }
    }
}

// ── Elimination permanence ───────────────────────────────────────────

proptest! {
    #[test]
    fn first_elimination_wins(
        victim in 0usize..5,
        attempts in prop::collection::vec((0u8..3, "[a-z]{3,8}"), 1..6),
    ) {
        let ids: Vec<String> = (0..5).map(|i| format!("m{i}")).collect();
        let mut m = ModelStateManager::new(ids.clone(), HorizonSet::intraday()).unwrap();
        let id = &ids[victim];

        let (first_phase, first_reason) = attempts[0].clone();
        for (phase, reason) in &attempts {
            m.eliminate_model(id, *phase, reason.as_str()).unwrap();
            prop_assert!(m.is_eliminated(id).unwrap());
        }

        let state = m.get_model(id).unwrap();
        prop_assert_eq!(state.eliminated_in_phase, Some(first_phase));
        prop_assert_eq!(state.elimination_reason.as_deref(), Some(first_reason.as_str()));
        prop_assert_eq!(m.elimination_log().len(), 1);
        prop_assert_eq!(m.get_active_models().len(), 4);
    }
}

// ── Mask consistency ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn rankings_only_contain_qualified_models(
        predictions in prop::collection::vec(
            prop::collection::vec((0.01..0.99_f64, any::<bool>()), 1..8),
            1..6,
        ),
        top_percent in 0.1..1.0_f64,
    ) {
        let m = manager_from(&predictions);
        let q = qualify(&m, &QualificationMode::TopPercent { top_percent });
        let profiles = build_ranking_profiles(&m, &q, 3);

        for h in m.horizons().iter() {
            let ranked = rank_models_for_horizon(&profiles, h, &CompositeConfig::default());
            let qualified = q.result(h).unwrap().qualified_models.len();
            prop_assert_eq!(ranked.len(), qualified);
            for r in &ranked {
                prop_assert!(q.is_qualified(&r.model_id, h));
            }
        }
    }
}
