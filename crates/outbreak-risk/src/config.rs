//! Engine Configuration
//!
//! Every threshold, window and band boundary the engine uses lives here so
//! alternate configurations can be exercised in tests or loaded from JSON.

use crate::model::RiskTier;
use crate::{RiskError, RiskResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Longest accepted window, in days (about a century)
pub const MAX_WINDOW_DAYS: u32 = 36_500;

/// Probability band boundaries.
///
/// Bands are closed-open except the top one:
/// Low `[0, medium)`, Medium `[medium, high)`, High `[high, critical)`,
/// Critical `[critical, 100]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BandBoundaries {
    pub medium: f64,
    pub high: f64,
    pub critical: f64,
}

impl Default for BandBoundaries {
    fn default() -> Self {
        BandBoundaries {
            medium: 40.0,
            high: 60.0,
            critical: 80.0,
        }
    }
}

impl BandBoundaries {
    /// Classify a probability already clamped to [0, 100]
    pub fn classify(&self, probability: f64) -> RiskTier {
        if probability >= self.critical {
            RiskTier::Critical
        } else if probability >= self.high {
            RiskTier::High
        } else if probability >= self.medium {
            RiskTier::Medium
        } else {
            RiskTier::Low
        }
    }
}

/// Configuration for the risk engine
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Length of the recent trend window in days
    pub recent_window_days: u32,
    /// Length of the prior trend window, immediately before the recent one
    pub prior_window_days: u32,
    /// AQI above which respiratory risk rises
    pub respiratory_aqi_threshold: f64,
    /// WQI below which waterborne risk rises
    pub waterborne_wqi_threshold: f64,
    /// Temperature (°C) above which vectors breed
    pub vector_temp_threshold: f64,
    /// Relative humidity (%) above which vectors breed
    pub vector_humidity_threshold: f64,
    /// Half-width of the jitter band as a fraction of the adjusted probability
    pub jitter_fraction: f64,
    pub band_boundaries: BandBoundaries,
    /// Environmental samples older than this are ignored
    pub environment_recency_days: u32,
    /// A (city, disease) pair is ranked if it has a case within this many days
    pub active_lookback_days: u32,
    /// Case rate (cases/day) considered typical for a city and disease
    pub reference_daily_cases: f64,
    /// Probability assigned to the typical case rate under a flat trend
    pub baseline_probability: f64,
    /// Multipliers within this distance of 1.0 count as neutral
    pub neutral_epsilon: f64,
    pub environment_multiplier_min: f64,
    pub environment_multiplier_max: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            recent_window_days: 30,
            prior_window_days: 30,
            respiratory_aqi_threshold: 150.0,
            waterborne_wqi_threshold: 70.0,
            vector_temp_threshold: 25.0,
            vector_humidity_threshold: 60.0,
            jitter_fraction: 0.2,
            band_boundaries: BandBoundaries::default(),
            environment_recency_days: 30,
            active_lookback_days: 365,
            reference_daily_cases: 1.0,
            baseline_probability: 25.0,
            neutral_epsilon: 0.05,
            environment_multiplier_min: 0.7,
            environment_multiplier_max: 1.5,
        }
    }
}

impl EngineConfig {
    /// Set the recent and prior window lengths
    pub fn with_windows(mut self, recent_days: u32, prior_days: u32) -> Self {
        self.recent_window_days = recent_days;
        self.prior_window_days = prior_days;
        self
    }

    /// Set the jitter fraction (0.0 disables jitter)
    pub fn with_jitter_fraction(mut self, fraction: f64) -> Self {
        self.jitter_fraction = fraction;
        self
    }

    /// Set the probability band boundaries
    pub fn with_band_boundaries(mut self, bands: BandBoundaries) -> Self {
        self.band_boundaries = bands;
        self
    }

    /// Set the normalisation baseline
    pub fn with_baseline(mut self, reference_daily_cases: f64, baseline_probability: f64) -> Self {
        self.reference_daily_cases = reference_daily_cases;
        self.baseline_probability = baseline_probability;
        self
    }

    /// Set the respiratory and waterborne thresholds
    pub fn with_quality_thresholds(mut self, aqi: f64, wqi: f64) -> Self {
        self.respiratory_aqi_threshold = aqi;
        self.waterborne_wqi_threshold = wqi;
        self
    }

    /// Set the vector breeding thresholds
    pub fn with_vector_thresholds(mut self, temperature: f64, humidity: f64) -> Self {
        self.vector_temp_threshold = temperature;
        self.vector_humidity_threshold = humidity;
        self
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> RiskResult<Self> {
        let config: EngineConfig =
            serde_json::from_str(json).map_err(|e| RiskError::InvalidConfig {
                reason: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> RiskResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| RiskError::InvalidConfig {
            reason: format!("{}: {}", path.display(), e),
        })?;
        Self::from_json_str(&json)
    }

    /// Check internal consistency
    pub fn validate(&self) -> RiskResult<()> {
        let invalid = |reason: &str| {
            Err(RiskError::InvalidConfig {
                reason: reason.to_string(),
            })
        };

        if self.recent_window_days == 0 || self.prior_window_days == 0 {
            return invalid("trend windows must be at least one day");
        }
        if self.environment_recency_days == 0 || self.active_lookback_days == 0 {
            return invalid("recency and lookback windows must be at least one day");
        }
        let windows = [
            self.recent_window_days,
            self.prior_window_days,
            self.environment_recency_days,
            self.active_lookback_days,
        ];
        if windows.iter().any(|&days| days > MAX_WINDOW_DAYS) {
            return invalid("windows must not exceed 36500 days");
        }
        if !(0.0..=1.0).contains(&self.jitter_fraction) {
            return invalid("jitter_fraction must be within [0, 1]");
        }
        let bands = &self.band_boundaries;
        if !(0.0 < bands.medium && bands.medium < bands.high && bands.high < bands.critical && bands.critical <= 100.0) {
            return invalid("band boundaries must be strictly increasing within (0, 100]");
        }
        if !(self.reference_daily_cases > 0.0) {
            return invalid("reference_daily_cases must be positive");
        }
        if !(self.baseline_probability > 0.0 && self.baseline_probability <= 100.0) {
            return invalid("baseline_probability must be within (0, 100]");
        }
        if !(self.respiratory_aqi_threshold > 0.0 && self.waterborne_wqi_threshold > 0.0) {
            return invalid("quality thresholds must be positive");
        }
        if !(0.0..=100.0).contains(&self.vector_humidity_threshold) {
            return invalid("vector_humidity_threshold must be a percentage");
        }
        if !(self.environment_multiplier_min > 0.0
            && self.environment_multiplier_min <= 1.0
            && self.environment_multiplier_max >= 1.0)
        {
            return invalid("environment multiplier range must contain 1.0");
        }
        if !(self.neutral_epsilon >= 0.0) {
            return invalid("neutral_epsilon must be non-negative");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_band_edges() {
        let bands = BandBoundaries::default();
        assert_eq!(bands.classify(0.0), RiskTier::Low);
        assert_eq!(bands.classify(39.999), RiskTier::Low);
        assert_eq!(bands.classify(40.0), RiskTier::Medium);
        assert_eq!(bands.classify(59.999), RiskTier::Medium);
        assert_eq!(bands.classify(60.0), RiskTier::High);
        assert_eq!(bands.classify(79.999), RiskTier::High);
        assert_eq!(bands.classify(80.0), RiskTier::Critical);
        assert_eq!(bands.classify(100.0), RiskTier::Critical);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EngineConfig::from_json_str(r#"{"recent_window_days": 14, "jitter_fraction": 0.0}"#)
            .unwrap();
        assert_eq!(config.recent_window_days, 14);
        assert_eq!(config.jitter_fraction, 0.0);
        assert_eq!(config.prior_window_days, 30);
        assert_eq!(config.band_boundaries, BandBoundaries::default());
    }

    #[test]
    fn test_rejects_unordered_bands() {
        let config = EngineConfig::default().with_band_boundaries(BandBoundaries {
            medium: 60.0,
            high: 40.0,
            critical: 80.0,
        });
        assert!(matches!(config.validate(), Err(RiskError::InvalidConfig { .. })));
    }

    #[test]
    fn test_rejects_bad_jitter_and_windows() {
        assert!(EngineConfig::default().with_jitter_fraction(1.5).validate().is_err());
        assert!(EngineConfig::default().with_windows(0, 30).validate().is_err());
        assert!(EngineConfig::default().with_baseline(0.0, 25.0).validate().is_err());
    }

    #[test]
    fn test_rejects_oversized_windows() {
        let err = EngineConfig::from_json_str(r#"{"recent_window_days": 4294967295}"#).unwrap_err();
        assert!(matches!(err, RiskError::InvalidConfig { .. }));
        assert!(EngineConfig::default().with_windows(30, MAX_WINDOW_DAYS + 1).validate().is_err());
        assert!(EngineConfig::default().with_windows(MAX_WINDOW_DAYS, MAX_WINDOW_DAYS).validate().is_ok());

        let mut config = EngineConfig::default();
        config.active_lookback_days = u32::MAX;
        assert!(config.validate().is_err());
        config.active_lookback_days = 365;
        config.environment_recency_days = MAX_WINDOW_DAYS + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_json_is_config_error() {
        let err = EngineConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, RiskError::InvalidConfig { .. }));
    }
}
