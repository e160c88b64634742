//! Surveillance Data Model
//!
//! Typed records for the catalogue (cities, diseases), the raw evidence the
//! engine consumes (case reports, environmental samples, seasonal profiles)
//! and the assessment it produces.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// City identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CityId(pub u32);

/// Disease identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiseaseId(pub u32);

impl fmt::Display for CityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for DiseaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A monitored city
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub city_id: CityId,
    pub name: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub population: u64,
}

/// A tracked disease
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Disease {
    pub disease_id: DiseaseId,
    pub name: String,
    /// Free-text transmission type, e.g. "Vector-borne"
    pub disease_type: String,
    #[serde(default)]
    pub severity: Option<String>,
}

impl Disease {
    /// Category derived from the disease metadata
    pub fn category(&self) -> DiseaseCategory {
        DiseaseCategory::from_disease_type(&self.disease_type)
    }
}

/// Transmission category, selects which environmental indices matter
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiseaseCategory {
    Respiratory,
    Waterborne,
    VectorBorne,
    Other,
}

impl DiseaseCategory {
    /// Parse a free-text disease type.
    ///
    /// Matching ignores case, spaces, hyphens and underscores, so
    /// "Vector-borne", "vector borne" and "VectorBorne" are equivalent.
    /// Anything unrecognised is `Other`.
    pub fn from_disease_type(disease_type: &str) -> Self {
        let normalized: String = disease_type
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match normalized.as_str() {
            "respiratory" | "airborne" => DiseaseCategory::Respiratory,
            "waterborne" | "foodborne" | "foodandwaterborne" => DiseaseCategory::Waterborne,
            "vectorborne" | "mosquitoborne" => DiseaseCategory::VectorBorne,
            _ => DiseaseCategory::Other,
        }
    }

    /// Lowercase label used in reasoning text
    pub fn label(&self) -> &'static str {
        match self {
            DiseaseCategory::Respiratory => "respiratory",
            DiseaseCategory::Waterborne => "waterborne",
            DiseaseCategory::VectorBorne => "vector-borne",
            DiseaseCategory::Other => "other",
        }
    }
}

/// One reported case. Each record counts as a single case.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub city_id: CityId,
    pub disease_id: DiseaseId,
    pub report_date: NaiveDate,
}

/// Environmental readings for one city on one date
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentalSample {
    pub city_id: CityId,
    pub sample_date: NaiveDate,
    pub air_quality_index: f64,
    pub water_quality_index: f64,
    /// Degrees Celsius
    pub temperature: f64,
    /// Relative humidity, percent
    pub humidity: f64,
    pub pm2_5: f64,
    pub pm10: f64,
}

/// Months in which a disease is historically active
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeasonalProfile {
    pub disease_id: DiseaseId,
    /// Calendar months, 1-12
    pub active_months: BTreeSet<u32>,
    /// Applied inside the active months (> 1.0)
    pub peak_multiplier: f64,
    /// Applied outside the active months (< 1.0)
    pub off_season_multiplier: f64,
}

impl SeasonalProfile {
    pub fn new(
        disease_id: DiseaseId,
        active_months: impl IntoIterator<Item = u32>,
        peak_multiplier: f64,
        off_season_multiplier: f64,
    ) -> Self {
        SeasonalProfile {
            disease_id,
            active_months: active_months.into_iter().collect(),
            peak_multiplier,
            off_season_multiplier,
        }
    }

    pub fn is_active(&self, month: u32) -> bool {
        self.active_months.contains(&month)
    }
}

/// Historical trend evidence for one (city, disease) pair
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrendSignal {
    /// Cases per day over the recent window
    pub recent_avg_cases: f64,
    /// Cases per day over the prior window
    pub prior_avg_cases: f64,
    /// recent / prior, 1.0 when there is no evidence either way
    pub trend_ratio: f64,
}

impl TrendSignal {
    /// Neutral signal used when no records exist
    pub fn neutral() -> Self {
        TrendSignal {
            recent_avg_cases: 0.0,
            prior_avg_cases: 0.0,
            trend_ratio: 1.0,
        }
    }
}

/// Discrete risk classification
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskTier {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Low => "Low",
            RiskTier::Medium => "Medium",
            RiskTier::High => "High",
            RiskTier::Critical => "Critical",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-fatal data gaps. Each one degrades to a neutral input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataWarning {
    /// No case records in either trend window
    NoRecentCases,
    /// No environmental sample on or before the assessment date
    NoEnvironmentalSample,
    /// Latest environmental sample is older than the recency window
    StaleEnvironmentalSample,
    /// Disease has no seasonal profile
    NoSeasonalProfile,
}

/// The engine's output for one (city, disease) pair
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub city_id: CityId,
    pub disease_id: DiseaseId,
    pub as_of: NaiveDate,
    /// Outbreak probability in [0, 100]
    pub probability: f64,
    pub risk_tier: RiskTier,
    pub predicted_cases: u64,
    pub reasoning: Vec<String>,
    pub trend: TrendSignal,
    pub seasonal_multiplier: f64,
    pub environmental_multiplier: f64,
    pub warnings: Vec<DataWarning>,
}
