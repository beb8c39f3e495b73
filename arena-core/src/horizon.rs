//! Horizons, horizon sets, and maps that are total over a horizon set.
//!
//! A horizon is a key, not a quantity: nothing in the engine does arithmetic
//! on "1h". Every per-horizon record is a `HorizonMap<T>` whose key set equals
//! the tournament's `HorizonSet`. Construction either fills every key
//! (`from_fn`) or validates the keys (`try_from_pairs`, `ensure_covers`), so
//! reads never have to handle a missing horizon.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Index;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ScoreError;

/// Forward-looking window over which a binary outcome is predicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Horizon {
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "24h")]
    H24,
    #[serde(rename = "7d")]
    D7,
}

impl Horizon {
    pub const ALL: [Horizon; 5] = [
        Horizon::M15,
        Horizon::H1,
        Horizon::H4,
        Horizon::H24,
        Horizon::D7,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::M15 => "15m",
            Self::H1 => "1h",
            Self::H4 => "4h",
            Self::H24 => "24h",
            Self::D7 => "7d",
        }
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Horizon {
    type Err = ScoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Horizon::ALL
            .iter()
            .copied()
            .find(|h| h.label() == s)
            .ok_or_else(|| ScoreError::UnknownHorizon(s.to_string()))
    }
}

/// Comma-separated horizon labels, used in elimination reasons.
pub fn join_horizons(horizons: &[Horizon]) -> String {
    horizons
        .iter()
        .map(|h| h.label())
        .collect::<Vec<_>>()
        .join(", ")
}

// ─── HorizonSet ──────────────────────────────────────────────────────

/// Ordered, duplicate-free, non-empty set of horizons scored by one tournament.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Horizon>", into = "Vec<Horizon>")]
pub struct HorizonSet(Vec<Horizon>);

impl HorizonSet {
    pub fn new(horizons: Vec<Horizon>) -> Result<Self, ScoreError> {
        if horizons.is_empty() {
            return Err(ScoreError::EmptyHorizonSet);
        }
        for (i, h) in horizons.iter().enumerate() {
            if horizons[..i].contains(h) {
                return Err(ScoreError::DuplicateHorizon(*h));
            }
        }
        Ok(Self(horizons))
    }

    /// 15m / 1h / 4h / 24h.
    pub fn intraday() -> Self {
        Self(vec![Horizon::M15, Horizon::H1, Horizon::H4, Horizon::H24])
    }

    /// 15m / 1h / 24h / 7d.
    pub fn swing() -> Self {
        Self(vec![Horizon::M15, Horizon::H1, Horizon::H24, Horizon::D7])
    }

    pub fn iter(&self) -> impl Iterator<Item = Horizon> + '_ {
        self.0.iter().copied()
    }

    pub fn as_slice(&self) -> &[Horizon] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`: every constructor rejects an empty set. Present to pair
    /// with [`HorizonSet::len`].
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, horizon: Horizon) -> bool {
        self.0.contains(&horizon)
    }
}

impl Default for HorizonSet {
    fn default() -> Self {
        Self::intraday()
    }
}

impl TryFrom<Vec<Horizon>> for HorizonSet {
    type Error = ScoreError;

    fn try_from(horizons: Vec<Horizon>) -> Result<Self, Self::Error> {
        Self::new(horizons)
    }
}

impl From<HorizonSet> for Vec<Horizon> {
    fn from(set: HorizonSet) -> Self {
        set.0
    }
}

// ─── HorizonMap ──────────────────────────────────────────────────────

/// Per-horizon values keyed by `Horizon`.
///
/// Invariant once validated: the key set equals the owning tournament's
/// `HorizonSet`. Deserialization does not know the set, so records coming off
/// the wire go through `ensure_covers` before the engine stores them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HorizonMap<T>(BTreeMap<Horizon, T>);

impl<T> HorizonMap<T> {
    /// Build a map with one value per horizon in `set`.
    pub fn from_fn(set: &HorizonSet, mut f: impl FnMut(Horizon) -> T) -> Self {
        Self(set.iter().map(|h| (h, f(h))).collect())
    }

    /// Build a map from explicit pairs, rejecting missing or foreign keys.
    pub fn try_from_pairs(
        set: &HorizonSet,
        pairs: impl IntoIterator<Item = (Horizon, T)>,
    ) -> Result<Self, ScoreError> {
        let map = Self(pairs.into_iter().collect());
        map.ensure_covers(set, "horizon map")?;
        Ok(map)
    }

    /// Check that the key set is exactly `set`.
    pub fn ensure_covers(&self, set: &HorizonSet, context: &str) -> Result<(), ScoreError> {
        if let Some(horizon) = set.iter().find(|h| !self.0.contains_key(h)) {
            return Err(ScoreError::MissingHorizon {
                context: context.to_string(),
                horizon,
            });
        }
        if let Some(horizon) = self.0.keys().copied().find(|h| !set.contains(*h)) {
            return Err(ScoreError::UnexpectedHorizon {
                context: context.to_string(),
                horizon,
            });
        }
        Ok(())
    }

    pub fn get(&self, horizon: Horizon) -> Option<&T> {
        self.0.get(&horizon)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Horizon, &T)> {
        self.0.iter().map(|(h, v)| (*h, v))
    }

    pub fn horizons(&self) -> impl Iterator<Item = Horizon> + '_ {
        self.0.keys().copied()
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.0.values()
    }

    pub fn map<U>(&self, mut f: impl FnMut(Horizon, &T) -> U) -> HorizonMap<U> {
        HorizonMap(self.0.iter().map(|(h, v)| (*h, f(*h, v))).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T> Index<Horizon> for HorizonMap<T> {
    type Output = T;

    /// Panics if `horizon` is not a key. Validated maps cover their set, so
    /// this only fires when indexing with a horizon from a different set.
    fn index(&self, horizon: Horizon) -> &T {
        match self.0.get(&horizon) {
            Some(v) => v,
            None => panic!("horizon {horizon} not present in horizon map"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horizon_labels_round_trip() {
        for h in Horizon::ALL {
            assert_eq!(h.label().parse::<Horizon>().unwrap(), h);
        }
        assert!(matches!(
            "2h".parse::<Horizon>(),
            Err(ScoreError::UnknownHorizon(_))
        ));
    }

    #[test]
    fn horizon_serializes_as_label() {
        let json = serde_json::to_string(&Horizon::H24).unwrap();
        assert_eq!(json, "\"24h\"");
    }

    #[test]
    fn horizon_set_rejects_empty_and_duplicates() {
        assert_eq!(HorizonSet::new(vec![]), Err(ScoreError::EmptyHorizonSet));
        assert!(!HorizonSet::new(vec![Horizon::D7]).unwrap().is_empty());
        assert!(!HorizonSet::intraday().is_empty());
        assert_eq!(
            HorizonSet::new(vec![Horizon::H1, Horizon::H4, Horizon::H1]),
            Err(ScoreError::DuplicateHorizon(Horizon::H1))
        );
    }

    #[test]
    fn horizon_set_deserialization_validates() {
        let ok: HorizonSet = serde_json::from_str(r#"["15m","1h","24h","7d"]"#).unwrap();
        assert_eq!(ok, HorizonSet::swing());

        let dup: Result<HorizonSet, _> = serde_json::from_str(r#"["1h","1h"]"#);
        assert!(dup.is_err());

        let empty: Result<HorizonSet, _> = serde_json::from_str("[]");
        assert!(empty.is_err());
    }

    #[test]
    fn from_fn_fills_every_horizon() {
        let set = HorizonSet::intraday();
        let map = HorizonMap::from_fn(&set, |h| h.label().len());
        assert_eq!(map.len(), 4);
        assert!(map.ensure_covers(&set, "test").is_ok());
        assert_eq!(map[Horizon::H24], 3);
    }

    #[test]
    fn try_from_pairs_rejects_missing_key() {
        let set = HorizonSet::intraday();
        let err = HorizonMap::try_from_pairs(
            &set,
            vec![(Horizon::M15, 0.5), (Horizon::H1, 0.5), (Horizon::H4, 0.5)],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ScoreError::MissingHorizon {
                horizon: Horizon::H24,
                ..
            }
        ));
    }

    #[test]
    fn try_from_pairs_rejects_foreign_key() {
        let set = HorizonSet::new(vec![Horizon::H1]).unwrap();
        let err =
            HorizonMap::try_from_pairs(&set, vec![(Horizon::H1, 1), (Horizon::D7, 2)]).unwrap_err();
        assert!(matches!(
            err,
            ScoreError::UnexpectedHorizon {
                horizon: Horizon::D7,
                ..
            }
        ));
    }

    #[test]
    #[should_panic(expected = "not present")]
    fn index_outside_set_panics() {
        let map = HorizonMap::from_fn(&HorizonSet::intraday(), |_| 0.0);
        let _ = map[Horizon::D7];
    }

    #[test]
    fn join_horizons_is_comma_separated() {
        assert_eq!(join_horizons(&[Horizon::M15, Horizon::D7]), "15m, 7d");
        assert_eq!(join_horizons(&[]), "");
    }
}
