//! Outbreak Risk - City-Level Disease Outbreak Scoring
//!
//! Estimates, for each (city, disease) pair, the probability of an outbreak
//! on a given date. Evidence comes from three signals:
//!
//! - Historical case trend (recent window against the window before it)
//! - Seasonal activity of the disease for the calendar month
//! - Environmental conditions (air quality, water quality, breeding weather)
//!
//! The combined probability is perturbed by a bounded, injectable jitter,
//! classified into a risk tier, and explained in plain-language reasoning.
//!
//! # Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use outbreak_risk::{
//!     CaseRecord, City, CityId, Dataset, Disease, DiseaseId, EngineConfig, RiskEngine, Seed,
//!     SeededJitter,
//! };
//!
//! let city = City {
//!     city_id: CityId(1),
//!     name: "Pune".into(),
//!     state: "Maharashtra".into(),
//!     region: "West".into(),
//!     population: 3_100_000,
//! };
//! let disease = Disease {
//!     disease_id: DiseaseId(1),
//!     name: "Dengue".into(),
//!     disease_type: "Vector-borne".into(),
//!     severity: None,
//! };
//! let mut data = Dataset::new(vec![city], vec![disease]).unwrap();
//! data.add_reference_profiles();
//!
//! let as_of = NaiveDate::from_ymd_opt(2024, 7, 15).unwrap();
//! data.add_case(CaseRecord {
//!     city_id: CityId(1),
//!     disease_id: DiseaseId(1),
//!     report_date: as_of,
//! })
//! .unwrap();
//!
//! let jitter = SeededJitter::new(Seed::from_string("weekly-report"));
//! let engine = RiskEngine::new(data, jitter, EngineConfig::default()).unwrap();
//! let assessment = engine.score(CityId(1), DiseaseId(1), as_of).unwrap();
//!
//! assert!((0.0..=100.0).contains(&assessment.probability));
//! println!("{}: {:.1}%", assessment.risk_tier, assessment.probability);
//! ```

pub mod config;
pub mod data;
pub mod engine;
pub mod environment;
pub mod history;
pub mod jitter;
pub mod model;
pub mod ranking;
pub mod scorer;
pub mod seasonal;

// Re-export commonly used types for convenience
pub use config::{BandBoundaries, EngineConfig};
pub use data::{Dataset, DatasetDocument, DatasetError, DateWindow, HealthDataSource};
pub use engine::{CityOverview, RiskEngine};
pub use environment::{CityEnvironmentalRisk, EnvironmentalCorrelator, EnvironmentalSignal};
pub use history::{CaseCluster, HistoricalAggregator};
pub use jitter::{EntropyJitter, FixedJitter, JitterSource, NoJitter, ScoreKey, Seed, SeededJitter};
pub use model::{
    CaseRecord, City, CityId, DataWarning, Disease, DiseaseCategory, DiseaseId,
    EnvironmentalSample, RiskAssessment, RiskTier, SeasonalProfile, TrendSignal,
};
pub use ranking::CitySummary;
pub use scorer::RiskScorer;

/// Errors returned by the risk engine
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RiskError {
    /// The city is not in the catalogue
    #[error("unknown city {0}")]
    CityNotFound(CityId),

    /// The disease is not in the catalogue
    #[error("unknown disease {0}")]
    DiseaseNotFound(DiseaseId),

    /// Configuration failed validation or could not be read
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

pub type RiskResult<T> = Result<T, RiskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(RiskError::CityNotFound(CityId(7)).to_string(), "unknown city 7");
        assert_eq!(
            RiskError::InvalidConfig {
                reason: "bad".into()
            }
            .to_string(),
            "invalid configuration: bad"
        );
    }
}
