//! Data Access Boundary
//!
//! The engine performs no I/O of its own. It reads everything through a
//! [`HealthDataSource`], which a caller backs with whatever store it uses.
//! [`Dataset`] is the in-memory implementation; it validates every record
//! as it is inserted so the engine can trust what it reads.

use crate::model::{
    CaseRecord, City, CityId, Disease, DiseaseCategory, DiseaseId, EnvironmentalSample,
    SeasonalProfile,
};
use crate::seasonal::reference_profiles;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Errors raised while building a dataset
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to read dataset {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed dataset JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("record references unknown city {0}")]
    UnknownCity(CityId),

    #[error("record references unknown disease {0}")]
    UnknownDisease(DiseaseId),

    #[error("duplicate city {0}")]
    DuplicateCity(CityId),

    #[error("duplicate disease {0}")]
    DuplicateDisease(DiseaseId),

    #[error("invalid record: {reason}")]
    InvalidRecord { reason: String },
}

fn invalid(reason: String) -> DatasetError {
    DatasetError::InvalidRecord { reason }
}

/// Inclusive date range
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// The `days` days ending on `end`, inclusive. Starts no earlier than
    /// the first representable date.
    pub fn ending(end: NaiveDate, days: u32) -> Self {
        let span = i64::from(days.max(1)) - 1;
        DateWindow {
            start: end
                .checked_sub_signed(Duration::days(span))
                .unwrap_or(NaiveDate::MIN),
            end,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Read access to surveillance data
pub trait HealthDataSource: Sync {
    fn city(&self, city_id: CityId) -> Option<City>;

    fn disease(&self, disease_id: DiseaseId) -> Option<Disease>;

    /// All cities, ordered by id
    fn cities(&self) -> Vec<City>;

    /// Case reports for one pair inside `window`
    fn recent_cases(&self, city_id: CityId, disease_id: DiseaseId, window: DateWindow) -> Vec<CaseRecord>;

    /// Case reports for every pair inside `window`
    fn cases_in_window(&self, window: DateWindow) -> Vec<CaseRecord>;

    /// Latest sample for a city dated on or before `as_of`
    fn environmental_sample(&self, city_id: CityId, as_of: NaiveDate) -> Option<EnvironmentalSample>;

    /// Samples for every city inside `window`
    fn environmental_samples(&self, window: DateWindow) -> Vec<EnvironmentalSample>;

    fn seasonal_profile(&self, disease_id: DiseaseId) -> Option<SeasonalProfile>;

    fn disease_category(&self, disease_id: DiseaseId) -> DiseaseCategory;

    /// Pairs with at least one case in the `lookback_days` days ending on `as_of`
    fn active_city_disease_pairs(&self, as_of: NaiveDate, lookback_days: u32) -> Vec<(CityId, DiseaseId)>;
}

/// Serialised form of a dataset
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DatasetDocument {
    pub cities: Vec<City>,
    pub diseases: Vec<Disease>,
    #[serde(default)]
    pub case_records: Vec<CaseRecord>,
    #[serde(default)]
    pub environmental_samples: Vec<EnvironmentalSample>,
    /// When absent, the reference seasonal table is used
    #[serde(default)]
    pub seasonal_profiles: Option<Vec<SeasonalProfile>>,
}

/// Validated in-memory surveillance data
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    cities: BTreeMap<CityId, City>,
    diseases: BTreeMap<DiseaseId, Disease>,
    /// Report dates per pair, kept sorted
    cases: BTreeMap<(CityId, DiseaseId), Vec<NaiveDate>>,
    environment: BTreeMap<CityId, BTreeMap<NaiveDate, EnvironmentalSample>>,
    profiles: HashMap<DiseaseId, SeasonalProfile>,
}

impl Dataset {
    /// Create a dataset from its catalogue
    pub fn new(cities: Vec<City>, diseases: Vec<Disease>) -> Result<Self, DatasetError> {
        let mut dataset = Dataset::default();
        for city in cities {
            if dataset.cities.contains_key(&city.city_id) {
                return Err(DatasetError::DuplicateCity(city.city_id));
            }
            dataset.cities.insert(city.city_id, city);
        }
        for disease in diseases {
            if dataset.diseases.contains_key(&disease.disease_id) {
                return Err(DatasetError::DuplicateDisease(disease.disease_id));
            }
            dataset.diseases.insert(disease.disease_id, disease);
        }
        Ok(dataset)
    }

    /// Build and validate a dataset from its serialised form
    pub fn from_document(doc: DatasetDocument) -> Result<Self, DatasetError> {
        let mut dataset = Dataset::new(doc.cities, doc.diseases)?;
        for record in doc.case_records {
            dataset.add_case(record)?;
        }
        for sample in doc.environmental_samples {
            dataset.add_environmental_sample(sample)?;
        }
        match doc.seasonal_profiles {
            Some(profiles) => {
                for profile in profiles {
                    dataset.add_seasonal_profile(profile)?;
                }
            }
            None => dataset.add_reference_profiles(),
        }
        Ok(dataset)
    }

    pub fn from_json_str(json: &str) -> Result<Self, DatasetError> {
        let doc: DatasetDocument = serde_json::from_str(json)?;
        Self::from_document(doc)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn add_case(&mut self, record: CaseRecord) -> Result<(), DatasetError> {
        self.check_city(record.city_id)?;
        self.check_disease(record.disease_id)?;

        let dates = self
            .cases
            .entry((record.city_id, record.disease_id))
            .or_default();
        let idx = dates.partition_point(|d| *d <= record.report_date);
        dates.insert(idx, record.report_date);
        Ok(())
    }

    pub fn add_environmental_sample(&mut self, sample: EnvironmentalSample) -> Result<(), DatasetError> {
        self.check_city(sample.city_id)?;

        let readings = [
            ("air_quality_index", sample.air_quality_index),
            ("water_quality_index", sample.water_quality_index),
            ("pm2_5", sample.pm2_5),
            ("pm10", sample.pm10),
        ];
        for (name, value) in readings {
            if !(value.is_finite() && value >= 0.0) {
                return Err(invalid(format!(
                    "city {} on {}: {} must be a non-negative number, got {}",
                    sample.city_id, sample.sample_date, name, value
                )));
            }
        }
        if !sample.temperature.is_finite() {
            return Err(invalid(format!(
                "city {} on {}: temperature must be finite",
                sample.city_id, sample.sample_date
            )));
        }
        if !(0.0..=100.0).contains(&sample.humidity) {
            return Err(invalid(format!(
                "city {} on {}: humidity must be within 0-100, got {}",
                sample.city_id, sample.sample_date, sample.humidity
            )));
        }

        let by_date = self.environment.entry(sample.city_id).or_default();
        if by_date.contains_key(&sample.sample_date) {
            return Err(invalid(format!(
                "city {} has more than one environmental sample on {}",
                sample.city_id, sample.sample_date
            )));
        }
        by_date.insert(sample.sample_date, sample);
        Ok(())
    }

    pub fn add_seasonal_profile(&mut self, profile: SeasonalProfile) -> Result<(), DatasetError> {
        self.check_disease(profile.disease_id)?;

        if let Some(month) = profile.active_months.iter().find(|m| !(1..=12).contains(*m)) {
            return Err(invalid(format!(
                "disease {}: month {} is outside 1-12",
                profile.disease_id, month
            )));
        }
        if !(profile.peak_multiplier >= 1.0 && profile.peak_multiplier.is_finite()) {
            return Err(invalid(format!(
                "disease {}: peak multiplier must be at least 1.0",
                profile.disease_id
            )));
        }
        if !(profile.off_season_multiplier > 0.0 && profile.off_season_multiplier <= 1.0) {
            return Err(invalid(format!(
                "disease {}: off-season multiplier must be within (0, 1]",
                profile.disease_id
            )));
        }
        if self.profiles.contains_key(&profile.disease_id) {
            return Err(invalid(format!(
                "disease {} has more than one seasonal profile",
                profile.disease_id
            )));
        }
        self.profiles.insert(profile.disease_id, profile);
        Ok(())
    }

    /// Install the reference seasonal table for catalogued diseases
    pub fn add_reference_profiles(&mut self) {
        for profile in reference_profiles() {
            if self.diseases.contains_key(&profile.disease_id) {
                self.profiles.entry(profile.disease_id).or_insert(profile);
            }
        }
    }

    pub fn case_count(&self) -> usize {
        self.cases.values().map(Vec::len).sum()
    }

    fn check_city(&self, city_id: CityId) -> Result<(), DatasetError> {
        if self.cities.contains_key(&city_id) {
            Ok(())
        } else {
            Err(DatasetError::UnknownCity(city_id))
        }
    }

    fn check_disease(&self, disease_id: DiseaseId) -> Result<(), DatasetError> {
        if self.diseases.contains_key(&disease_id) {
            Ok(())
        } else {
            Err(DatasetError::UnknownDisease(disease_id))
        }
    }
}

fn dates_in<'a>(dates: &'a [NaiveDate], window: DateWindow) -> &'a [NaiveDate] {
    let lo = dates.partition_point(|d| *d < window.start);
    let hi = dates.partition_point(|d| *d <= window.end);
    &dates[lo..hi.max(lo)]
}

impl HealthDataSource for Dataset {
    fn city(&self, city_id: CityId) -> Option<City> {
        self.cities.get(&city_id).cloned()
    }

    fn disease(&self, disease_id: DiseaseId) -> Option<Disease> {
        self.diseases.get(&disease_id).cloned()
    }

    fn cities(&self) -> Vec<City> {
        self.cities.values().cloned().collect()
    }

    fn recent_cases(&self, city_id: CityId, disease_id: DiseaseId, window: DateWindow) -> Vec<CaseRecord> {
        self.cases
            .get(&(city_id, disease_id))
            .map(|dates| {
                dates_in(dates, window)
                    .iter()
                    .map(|&report_date| CaseRecord {
                        city_id,
                        disease_id,
                        report_date,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn cases_in_window(&self, window: DateWindow) -> Vec<CaseRecord> {
        self.cases
            .iter()
            .flat_map(|(&(city_id, disease_id), dates)| {
                dates_in(dates, window).iter().map(move |&report_date| CaseRecord {
                    city_id,
                    disease_id,
                    report_date,
                })
            })
            .collect()
    }

    fn environmental_sample(&self, city_id: CityId, as_of: NaiveDate) -> Option<EnvironmentalSample> {
        self.environment
            .get(&city_id)?
            .range(..=as_of)
            .next_back()
            .map(|(_, sample)| sample.clone())
    }

    fn environmental_samples(&self, window: DateWindow) -> Vec<EnvironmentalSample> {
        self.environment
            .values()
            .flat_map(|by_date| by_date.range(window.start..=window.end).map(|(_, s)| s.clone()))
            .collect()
    }

    fn seasonal_profile(&self, disease_id: DiseaseId) -> Option<SeasonalProfile> {
        self.profiles.get(&disease_id).cloned()
    }

    fn disease_category(&self, disease_id: DiseaseId) -> DiseaseCategory {
        self.diseases
            .get(&disease_id)
            .map(Disease::category)
            .unwrap_or(DiseaseCategory::Other)
    }

    fn active_city_disease_pairs(&self, as_of: NaiveDate, lookback_days: u32) -> Vec<(CityId, DiseaseId)> {
        let window = DateWindow::ending(as_of, lookback_days);
        self.cases
            .iter()
            .filter(|(_, dates)| !dates_in(dates, window).is_empty())
            .map(|(&pair, _)| pair)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn catalogue() -> Dataset {
        Dataset::new(
            vec![City {
                city_id: CityId(1),
                name: "Delhi".into(),
                state: "Delhi".into(),
                region: "North".into(),
                population: 32_000_000,
            }],
            vec![Disease {
                disease_id: DiseaseId(1),
                name: "Dengue".into(),
                disease_type: "Vector-borne".into(),
                severity: Some("High".into()),
            }],
        )
        .unwrap()
    }

    fn sample_on(day: &str) -> EnvironmentalSample {
        EnvironmentalSample {
            city_id: CityId(1),
            sample_date: date(day),
            air_quality_index: 180.0,
            water_quality_index: 65.0,
            temperature: 31.0,
            humidity: 78.0,
            pm2_5: 90.0,
            pm10: 150.0,
        }
    }

    #[test]
    fn test_window_ending() {
        let w = DateWindow::ending(date("2024-07-30"), 30);
        assert_eq!(w.start, date("2024-07-01"));
        assert!(w.contains(date("2024-07-01")));
        assert!(w.contains(date("2024-07-30")));
        assert!(!w.contains(date("2024-06-30")));

        let near_min = NaiveDate::MIN + Duration::days(10);
        assert_eq!(DateWindow::ending(near_min, u32::MAX).start, NaiveDate::MIN);
    }

    #[test]
    fn test_rejects_unknown_references() {
        let mut ds = catalogue();
        let err = ds
            .add_case(CaseRecord {
                city_id: CityId(9),
                disease_id: DiseaseId(1),
                report_date: date("2024-07-01"),
            })
            .unwrap_err();
        assert!(matches!(err, DatasetError::UnknownCity(CityId(9))));

        let err = ds
            .add_seasonal_profile(SeasonalProfile::new(DiseaseId(4), [6], 1.2, 0.8))
            .unwrap_err();
        assert!(matches!(err, DatasetError::UnknownDisease(DiseaseId(4))));
    }

    #[test]
    fn test_rejects_invalid_samples_and_profiles() {
        let mut ds = catalogue();
        let mut humid = sample_on("2024-07-01");
        humid.humidity = 140.0;
        assert!(ds.add_environmental_sample(humid).is_err());

        ds.add_environmental_sample(sample_on("2024-07-01")).unwrap();
        assert!(ds.add_environmental_sample(sample_on("2024-07-01")).is_err());

        assert!(ds
            .add_seasonal_profile(SeasonalProfile::new(DiseaseId(1), [13], 1.5, 0.6))
            .is_err());
        assert!(ds
            .add_seasonal_profile(SeasonalProfile::new(DiseaseId(1), [6], 0.9, 0.6))
            .is_err());
    }

    #[test]
    fn test_latest_sample_on_or_before() {
        let mut ds = catalogue();
        ds.add_environmental_sample(sample_on("2024-07-01")).unwrap();
        ds.add_environmental_sample(sample_on("2024-07-10")).unwrap();
        ds.add_environmental_sample(sample_on("2024-07-20")).unwrap();

        let s = ds.environmental_sample(CityId(1), date("2024-07-15")).unwrap();
        assert_eq!(s.sample_date, date("2024-07-10"));
        assert!(ds.environmental_sample(CityId(1), date("2024-06-15")).is_none());
        assert!(ds.environmental_sample(CityId(2), date("2024-07-15")).is_none());
    }

    #[test]
    fn test_active_pairs_respect_lookback() {
        let mut ds = catalogue();
        ds.add_case(CaseRecord {
            city_id: CityId(1),
            disease_id: DiseaseId(1),
            report_date: date("2023-01-01"),
        })
        .unwrap();

        assert!(ds.active_city_disease_pairs(date("2024-07-15"), 365).is_empty());
        assert_eq!(
            ds.active_city_disease_pairs(date("2023-06-01"), 365),
            vec![(CityId(1), DiseaseId(1))]
        );
    }

    #[test]
    fn test_recent_cases_window() {
        let mut ds = catalogue();
        for day in ["2024-07-03", "2024-06-01", "2024-07-14", "2024-07-20"] {
            ds.add_case(CaseRecord {
                city_id: CityId(1),
                disease_id: DiseaseId(1),
                report_date: date(day),
            })
            .unwrap();
        }
        let window = DateWindow::ending(date("2024-07-15"), 30);
        let cases = ds.recent_cases(CityId(1), DiseaseId(1), window);
        let dates: Vec<_> = cases.iter().map(|c| c.report_date).collect();
        assert_eq!(dates, vec![date("2024-07-03"), date("2024-07-14")]);
        assert_eq!(ds.cases_in_window(window).len(), 2);
        assert_eq!(ds.case_count(), 4);
    }

    #[test]
    fn test_document_defaults_to_reference_profiles() {
        let json = r#"{
            "cities": [{"city_id": 1, "name": "Delhi"}],
            "diseases": [
                {"disease_id": 1, "name": "Dengue", "disease_type": "Vector-borne"},
                {"disease_id": 99, "name": "Other", "disease_type": "Genetic"}
            ],
            "case_records": [{"city_id": 1, "disease_id": 1, "report_date": "2024-07-01"}]
        }"#;
        let ds = Dataset::from_json_str(json).unwrap();
        assert!(ds.seasonal_profile(DiseaseId(1)).is_some());
        assert!(ds.seasonal_profile(DiseaseId(99)).is_none());
        assert_eq!(ds.disease_category(DiseaseId(1)), DiseaseCategory::VectorBorne);

        let explicit_empty = json.replace(
            r#""case_records""#,
            r#""seasonal_profiles": [], "case_records""#,
        );
        let ds = Dataset::from_json_str(&explicit_empty).unwrap();
        assert!(ds.seasonal_profile(DiseaseId(1)).is_none());
    }

    #[test]
    fn test_duplicate_catalogue_entries() {
        let city = City {
            city_id: CityId(1),
            name: "A".into(),
            state: String::new(),
            region: String::new(),
            population: 0,
        };
        let err = Dataset::new(vec![city.clone(), city], vec![]).unwrap_err();
        assert!(matches!(err, DatasetError::DuplicateCity(CityId(1))));
    }
}
