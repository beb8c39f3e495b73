//! Property-based tests for the domain types.
//!
//! Uses proptest to verify:
//! - Log loss is finite, non-negative, and ordered by confidence
//! - Maps built with `from_fn` always cover their set
//! - Scored rounds validate against the set they were built for

use arena_core::{log_loss, Horizon, HorizonMap, HorizonSet, RoundScore, RANDOM_BASELINE};
use proptest::prelude::*;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_probability() -> impl Strategy<Value = f64> {
    0.0..=1.0_f64
}

fn arb_horizon_set() -> impl Strategy<Value = HorizonSet> {
    prop::sample::subsequence(Horizon::ALL.to_vec(), 1..=Horizon::ALL.len())
        .prop_map(|hs| HorizonSet::new(hs).unwrap())
}

proptest! {
    #[test]
    fn log_loss_is_finite_and_non_negative(p in arb_probability(), outcome in any::<bool>()) {
        let loss = log_loss(p, outcome);
        prop_assert!(loss.is_finite());
        prop_assert!(loss >= 0.0);
    }

    #[test]
    fn more_confidence_in_the_outcome_costs_less(a in 0.01..0.99_f64, b in 0.01..0.99_f64) {
        prop_assume!(b - a > 1e-6);
        prop_assert!(log_loss(b, true) < log_loss(a, true));
        prop_assert!(log_loss(a, false) < log_loss(b, false));
    }

    #[test]
    fn beating_coin_flip_means_leaning_the_right_way(p in 0.51..1.0_f64) {
        prop_assert!(log_loss(p, true) < RANDOM_BASELINE);
        prop_assert!(log_loss(p, false) > RANDOM_BASELINE);
    }
}

proptest! {
    #[test]
    fn from_fn_covers_any_set(set in arb_horizon_set()) {
        let map = HorizonMap::from_fn(&set, |h| h.label().to_string());
        prop_assert!(map.ensure_covers(&set, "prop").is_ok());
        prop_assert_eq!(map.len(), set.len());
    }

    #[test]
    fn scored_round_validates_against_its_set(
        set in arb_horizon_set(),
        p in arb_probability(),
        outcome in any::<bool>(),
        round in 0u32..1000,
    ) {
        let score = RoundScore::scored(
            &set,
            round,
            HorizonMap::from_fn(&set, |_| p),
            HorizonMap::from_fn(&set, |_| outcome),
        )
        .unwrap();
        prop_assert!(score.validate(&set).is_ok());
        for h in set.iter() {
            prop_assert!(score.scored_log_loss(h).is_some());
        }
    }
}
