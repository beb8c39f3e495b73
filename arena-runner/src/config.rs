//! Serializable tournament configuration.
//!
//! One `TournamentConfig` parameterizes the whole engine: the horizon set, the
//! thresholds of each elimination phase, the qualification mode, composite
//! weights, and the sample-size guards of the reports. Every section has a
//! default, so a TOML file only needs to list what it overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use arena_core::HorizonSet;

use crate::phases::competence::MIN_RANKABLE_COHORT;

/// Content hash of a configuration (hex BLAKE3 of its canonical JSON).
pub type ConfigHash = String;

/// Errors from loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Complete configuration for one benchmark session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TournamentConfig {
    pub horizons: HorizonSet,
    pub sanity: SanityConfig,
    pub competence: CompetenceConfig,
    pub stability: StabilityConfig,
    pub qualification: QualificationMode,
    pub composite: CompositeConfig,
    pub reporting: ReportingConfig,
}

/// Phase 0: round-level sanity thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SanityConfig {
    /// Models with fewer completed rounds are not judged.
    pub min_rounds: usize,
    /// Mean log loss above `RANDOM_BASELINE × baseline_multiplier` counts as worse than chance.
    pub baseline_multiplier: f64,
    /// Eliminate when this many horizons are worse than chance.
    pub min_bad_horizons: usize,
    /// A prediction above this on a negative outcome is a confident miss.
    pub extreme_confidence: f64,
    /// Eliminate when the confident-miss rate exceeds this on any horizon.
    pub max_extreme_error_rate: f64,
    /// Trailing rounds inspected for a degenerate pattern.
    pub degenerate_window: usize,
    /// Every prediction in the trailing window at or above this is degenerate.
    pub degenerate_threshold: f64,
}

impl Default for SanityConfig {
    fn default() -> Self {
        Self {
            min_rounds: 6,
            baseline_multiplier: 1.1,
            min_bad_horizons: 2,
            extreme_confidence: 0.8,
            max_extreme_error_rate: 0.2,
            degenerate_window: 6,
            degenerate_threshold: 0.9,
        }
    }
}

/// Phase 1: cohort-relative competence thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompetenceConfig {
    /// Below this cohort size nobody is eliminated. Never less than
    /// [`MIN_RANKABLE_COHORT`], under which every percentile is 50.
    pub min_cohort: usize,
    /// Percentile under which a horizon counts as bottom quartile.
    pub bottom_percentile: f64,
    /// Eliminate when this many horizons are bottom quartile.
    pub max_bottom_horizons: usize,
    /// At least one horizon must reach this percentile.
    pub strength_percentile: f64,
}

impl Default for CompetenceConfig {
    fn default() -> Self {
        Self {
            min_cohort: 3,
            bottom_percentile: 25.0,
            max_bottom_horizons: 2,
            strength_percentile: 75.0,
        }
    }
}

/// Phase 2: stability and regret thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilityConfig {
    /// Rolling window (rounds) for best/worst window means.
    pub window: usize,
    /// Worst-window ratio to the cohort median above which a horizon is high regret.
    pub regret_threshold: f64,
    /// Eliminate when this many horizons are high regret.
    pub regret_horizons: usize,
    /// Variance above `variance_multiplier × median variance` is unstable.
    pub variance_multiplier: f64,
    /// Eliminate when this many horizons are unstable.
    pub variance_horizons: usize,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            window: 3,
            regret_threshold: 1.5,
            regret_horizons: 2,
            variance_multiplier: 2.0,
            variance_horizons: 3,
        }
    }
}

/// Phase 3: how models qualify for a horizon's ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum QualificationMode {
    /// Beat the base-rate forecaster's log loss plus a margin.
    PrevalenceMargin {
        #[serde(default = "default_prevalence_margin")]
        margin: f64,
    },
    /// Keep the best `top_percent` fraction by mean log loss.
    TopPercent {
        #[serde(default = "default_top_percent")]
        top_percent: f64,
    },
}

fn default_prevalence_margin() -> f64 {
    0.1
}

fn default_top_percent() -> f64 {
    0.7
}

impl Default for QualificationMode {
    fn default() -> Self {
        Self::PrevalenceMargin {
            margin: default_prevalence_margin(),
        }
    }
}

/// Phase 3: composite score weights and normalization constants.
///
/// Each lower-is-better metric `m` maps to `max(0, 1 − m / constant)`. The
/// constants are assumed typical maxima, not fitted to the cohort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeConfig {
    pub percentile_weight: f64,
    pub best_window_weight: f64,
    pub stability_weight: f64,
    pub pivot_weight: f64,
    pub best_window_max: f64,
    pub stability_max: f64,
    pub pivot_max: f64,
}

impl Default for CompositeConfig {
    fn default() -> Self {
        Self {
            percentile_weight: 0.4,
            best_window_weight: 0.3,
            stability_weight: 0.2,
            pivot_weight: 0.1,
            best_window_max: 2.0,
            stability_max: 1.0,
            pivot_max: 1.0,
        }
    }
}

/// Sample-size guards for the read-only reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportingConfig {
    /// Calibration error is NaN below this many scored predictions.
    pub min_calibration_samples: usize,
    pub calibration_bins: usize,
    /// Separability is undefined below this cohort size.
    pub min_separability_cohort: usize,
    /// Quintile buckets are not built below this many scored predictions.
    pub min_quintile_samples: usize,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            min_calibration_samples: 20,
            calibration_bins: 10,
            min_separability_cohort: 3,
            min_quintile_samples: 20,
        }
    }
}

impl TournamentConfig {
    /// Load and validate a configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make a phase meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.sanity;
        if s.min_rounds == 0 {
            return Err(invalid("sanity.min_rounds must be at least 1"));
        }
        if s.degenerate_window == 0 {
            return Err(invalid("sanity.degenerate_window must be at least 1"));
        }
        check_unit("sanity.extreme_confidence", s.extreme_confidence)?;
        check_unit("sanity.max_extreme_error_rate", s.max_extreme_error_rate)?;
        check_unit("sanity.degenerate_threshold", s.degenerate_threshold)?;
        check_positive("sanity.baseline_multiplier", s.baseline_multiplier)?;
        check_count("sanity.min_bad_horizons", s.min_bad_horizons)?;

        let c = &self.competence;
        if c.min_cohort < MIN_RANKABLE_COHORT {
            return Err(ConfigError::Invalid(format!(
                "competence.min_cohort must be at least {MIN_RANKABLE_COHORT}, got {}",
                c.min_cohort
            )));
        }
        check_count("competence.max_bottom_horizons", c.max_bottom_horizons)?;
        if !(0.0..=100.0).contains(&c.bottom_percentile)
            || !(0.0..=100.0).contains(&c.strength_percentile)
        {
            return Err(invalid("competence percentiles must be within [0, 100]"));
        }
        if c.bottom_percentile > c.strength_percentile {
            return Err(invalid(
                "competence.bottom_percentile must not exceed strength_percentile",
            ));
        }

        let st = &self.stability;
        if st.window == 0 {
            return Err(invalid("stability.window must be at least 1"));
        }
        check_positive("stability.regret_threshold", st.regret_threshold)?;
        check_positive("stability.variance_multiplier", st.variance_multiplier)?;
        check_count("stability.regret_horizons", st.regret_horizons)?;
        check_count("stability.variance_horizons", st.variance_horizons)?;

        match self.qualification {
            QualificationMode::PrevalenceMargin { margin } if !margin.is_finite() => {
                return Err(invalid("qualification.margin must be finite"));
            }
            QualificationMode::TopPercent { top_percent }
                if !(top_percent > 0.0 && top_percent <= 1.0) =>
            {
                return Err(invalid("qualification.top_percent must be within (0, 1]"));
            }
            _ => {}
        }

        let cm = &self.composite;
        let weights = [
            cm.percentile_weight,
            cm.best_window_weight,
            cm.stability_weight,
            cm.pivot_weight,
        ];
        if weights.iter().any(|w| *w < 0.0 || !w.is_finite()) {
            return Err(invalid("composite weights must be finite and non-negative"));
        }
        if [cm.best_window_max, cm.stability_max, cm.pivot_max]
            .iter()
            .any(|m| !(m.is_finite() && *m > 0.0))
        {
            return Err(invalid(
                "composite normalization constants must be finite and positive",
            ));
        }

        if self.reporting.calibration_bins == 0 {
            return Err(invalid("reporting.calibration_bins must be at least 1"));
        }
        Ok(())
    }

    /// Deterministic content hash, recorded in every outcome for audit.
    ///
    /// Two sessions with identical configs share a hash.
    pub fn config_hash(&self) -> ConfigHash {
        // Derived serialization of plain data does not fail.
        let canonical = serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"));
        blake3::hash(canonical.as_bytes()).to_hex().to_string()
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Invalid(message.to_string())
}

fn check_positive(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{name} must be finite and positive, got {value}"
        )))
    }
}

/// Horizon-count triggers; 0 would fire on every evaluated model.
fn check_count(name: &str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        Err(ConfigError::Invalid(format!("{name} must be at least 1")))
    } else {
        Ok(())
    }
}

fn check_unit(name: &str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{name} must be within [0, 1], got {value}"
        )))
    }
}
