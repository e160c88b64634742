//! Environmental Correlator
//!
//! Turns a city's latest environmental sample into a risk multiplier for a
//! disease category. Each policy rises linearly from 1.0 at its threshold to
//! the configured maximum at a saturation point:
//!
//! - Respiratory: AQI above the threshold, saturating at twice the threshold
//! - Waterborne: WQI below the threshold, saturating at a WQI of zero
//! - Vector-borne: temperature and humidity both above their thresholds;
//!   temperature saturates 10°C above its threshold, humidity at 100%, each
//!   contributing half of the excess
//! - Other: always neutral
//!
//! The result is clamped to the configured multiplier range.

use crate::config::EngineConfig;
use crate::history::days_before;
use crate::model::{CityId, DiseaseCategory, EnvironmentalSample};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// AQI above which a day counts as high pollution
pub const HIGH_POLLUTION_AQI: f64 = 200.0;

const VECTOR_TEMPERATURE_SPAN: f64 = 10.0;

/// Whether a usable sample was available
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleStatus {
    Current,
    Missing,
    Stale,
}

/// The reading that moved the multiplier
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum EnvironmentalFactor {
    PoorAirQuality { aqi: f64 },
    PoorWaterQuality { wqi: f64 },
    BreedingConditions { temperature: f64, humidity: f64 },
}

/// Correlator output
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentalSignal {
    pub multiplier: f64,
    pub status: SampleStatus,
    pub factor: Option<EnvironmentalFactor>,
}

impl EnvironmentalSignal {
    fn neutral(status: SampleStatus) -> Self {
        EnvironmentalSignal {
            multiplier: 1.0,
            status,
            factor: None,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct EnvironmentalCorrelator {
    aqi_threshold: f64,
    wqi_threshold: f64,
    temp_threshold: f64,
    humidity_threshold: f64,
    min_multiplier: f64,
    max_multiplier: f64,
    recency_days: u32,
}

impl EnvironmentalCorrelator {
    pub fn from_config(config: &EngineConfig) -> Self {
        EnvironmentalCorrelator {
            aqi_threshold: config.respiratory_aqi_threshold,
            wqi_threshold: config.waterborne_wqi_threshold,
            temp_threshold: config.vector_temp_threshold,
            humidity_threshold: config.vector_humidity_threshold,
            min_multiplier: config.environment_multiplier_min,
            max_multiplier: config.environment_multiplier_max,
            recency_days: config.environment_recency_days,
        }
    }

    /// Correlate a category with the latest sample on or before `as_of`.
    ///
    /// Missing samples and samples older than the recency window are neutral.
    pub fn correlate(
        &self,
        category: DiseaseCategory,
        sample: Option<&EnvironmentalSample>,
        as_of: NaiveDate,
    ) -> EnvironmentalSignal {
        let Some(sample) = sample else {
            return EnvironmentalSignal::neutral(SampleStatus::Missing);
        };
        match days_before(as_of, sample.sample_date) {
            Some(age) if age < i64::from(self.recency_days) => {}
            Some(_) => return EnvironmentalSignal::neutral(SampleStatus::Stale),
            None => return EnvironmentalSignal::neutral(SampleStatus::Missing),
        }

        let excess = self.max_multiplier - 1.0;
        let (raw, factor) = match category {
            DiseaseCategory::Respiratory if sample.air_quality_index > self.aqi_threshold => {
                let fraction = (sample.air_quality_index - self.aqi_threshold) / self.aqi_threshold;
                (
                    1.0 + excess * fraction.min(1.0),
                    Some(EnvironmentalFactor::PoorAirQuality {
                        aqi: sample.air_quality_index,
                    }),
                )
            }
            DiseaseCategory::Waterborne if sample.water_quality_index < self.wqi_threshold => {
                let fraction =
                    (self.wqi_threshold - sample.water_quality_index) / self.wqi_threshold;
                (
                    1.0 + excess * fraction.min(1.0),
                    Some(EnvironmentalFactor::PoorWaterQuality {
                        wqi: sample.water_quality_index,
                    }),
                )
            }
            DiseaseCategory::VectorBorne
                if sample.temperature > self.temp_threshold
                    && sample.humidity > self.humidity_threshold =>
            {
                let temp_fraction =
                    ((sample.temperature - self.temp_threshold) / VECTOR_TEMPERATURE_SPAN).min(1.0);
                let humidity_span = (100.0 - self.humidity_threshold).max(1.0);
                let humidity_fraction =
                    ((sample.humidity - self.humidity_threshold) / humidity_span).min(1.0);
                (
                    1.0 + excess * 0.5 * (temp_fraction + humidity_fraction),
                    Some(EnvironmentalFactor::BreedingConditions {
                        temperature: sample.temperature,
                        humidity: sample.humidity,
                    }),
                )
            }
            _ => (1.0, None),
        };

        EnvironmentalSignal {
            multiplier: raw.clamp(self.min_multiplier, self.max_multiplier),
            status: SampleStatus::Current,
            factor,
        }
    }
}

/// Averaged environmental readings for one city
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CityEnvironmentalRisk {
    pub city_id: CityId,
    pub avg_aqi: f64,
    pub avg_wqi: f64,
    pub high_pollution_days: usize,
    pub sample_count: usize,
}

/// Cities whose averaged readings over the recency window breach the
/// respiratory or waterborne threshold, worst air quality first.
pub fn environmental_risk_cities(
    samples: &[EnvironmentalSample],
    as_of: NaiveDate,
    config: &EngineConfig,
) -> Vec<CityEnvironmentalRisk> {
    let window = i64::from(config.environment_recency_days);
    let mut by_city: BTreeMap<CityId, Vec<&EnvironmentalSample>> = BTreeMap::new();
    for sample in samples {
        if matches!(days_before(as_of, sample.sample_date), Some(d) if d < window) {
            by_city.entry(sample.city_id).or_default().push(sample);
        }
    }

    let mut risky: Vec<CityEnvironmentalRisk> = by_city
        .into_iter()
        .map(|(city_id, samples)| {
            let n = samples.len() as f64;
            CityEnvironmentalRisk {
                city_id,
                avg_aqi: samples.iter().map(|s| s.air_quality_index).sum::<f64>() / n,
                avg_wqi: samples.iter().map(|s| s.water_quality_index).sum::<f64>() / n,
                high_pollution_days: samples
                    .iter()
                    .filter(|s| s.air_quality_index > HIGH_POLLUTION_AQI)
                    .count(),
                sample_count: samples.len(),
            }
        })
        .filter(|r| {
            r.avg_aqi > config.respiratory_aqi_threshold
                || r.avg_wqi < config.waterborne_wqi_threshold
        })
        .collect();

    risky.sort_by(|a, b| b.avg_aqi.total_cmp(&a.avg_aqi).then(a.city_id.cmp(&b.city_id)));
    risky
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn sample(aqi: f64, wqi: f64, temperature: f64, humidity: f64) -> EnvironmentalSample {
        EnvironmentalSample {
            city_id: CityId(1),
            sample_date: date("2024-07-10"),
            air_quality_index: aqi,
            water_quality_index: wqi,
            temperature,
            humidity,
            pm2_5: 40.0,
            pm10: 80.0,
        }
    }

    fn correlator() -> EnvironmentalCorrelator {
        EnvironmentalCorrelator::from_config(&EngineConfig::default())
    }

    #[test]
    fn test_respiratory_rises_above_threshold() {
        let as_of = date("2024-07-15");
        let c = correlator();

        let clean = c.correlate(DiseaseCategory::Respiratory, Some(&sample(120.0, 80.0, 20.0, 40.0)), as_of);
        assert_eq!(clean.multiplier, 1.0);
        assert!(clean.factor.is_none());

        let at_threshold = c.correlate(DiseaseCategory::Respiratory, Some(&sample(150.0, 80.0, 20.0, 40.0)), as_of);
        assert_eq!(at_threshold.multiplier, 1.0);

        let poor = c.correlate(DiseaseCategory::Respiratory, Some(&sample(220.0, 80.0, 20.0, 40.0)), as_of);
        let worse = c.correlate(DiseaseCategory::Respiratory, Some(&sample(280.0, 80.0, 20.0, 40.0)), as_of);
        assert!(poor.multiplier > 1.0);
        assert!(worse.multiplier > poor.multiplier);
        assert!(matches!(poor.factor, Some(EnvironmentalFactor::PoorAirQuality { .. })));

        let extreme = c.correlate(DiseaseCategory::Respiratory, Some(&sample(900.0, 80.0, 20.0, 40.0)), as_of);
        assert_eq!(extreme.multiplier, 1.5);
    }

    #[test]
    fn test_waterborne_rises_as_quality_falls() {
        let as_of = date("2024-07-15");
        let c = correlator();

        let good = c.correlate(DiseaseCategory::Waterborne, Some(&sample(100.0, 85.0, 20.0, 40.0)), as_of);
        let fair = c.correlate(DiseaseCategory::Waterborne, Some(&sample(100.0, 60.0, 20.0, 40.0)), as_of);
        let poor = c.correlate(DiseaseCategory::Waterborne, Some(&sample(100.0, 30.0, 20.0, 40.0)), as_of);

        assert_eq!(good.multiplier, 1.0);
        assert!(fair.multiplier > 1.0);
        assert!(poor.multiplier > fair.multiplier);
        assert!(poor.multiplier <= 1.5);
    }

    #[test]
    fn test_vector_needs_heat_and_humidity() {
        let as_of = date("2024-07-15");
        let c = correlator();

        let hot_dry = c.correlate(DiseaseCategory::VectorBorne, Some(&sample(100.0, 80.0, 32.0, 40.0)), as_of);
        let cool_wet = c.correlate(DiseaseCategory::VectorBorne, Some(&sample(100.0, 80.0, 20.0, 85.0)), as_of);
        let breeding = c.correlate(DiseaseCategory::VectorBorne, Some(&sample(100.0, 80.0, 30.0, 80.0)), as_of);

        assert_eq!(hot_dry.multiplier, 1.0);
        assert_eq!(cool_wet.multiplier, 1.0);
        assert!(breeding.multiplier > 1.0);
        assert!(matches!(breeding.factor, Some(EnvironmentalFactor::BreedingConditions { .. })));
    }

    #[test]
    fn test_other_category_is_neutral() {
        let as_of = date("2024-07-15");
        let signal = correlator().correlate(DiseaseCategory::Other, Some(&sample(400.0, 10.0, 35.0, 95.0)), as_of);
        assert_eq!(signal.multiplier, 1.0);
        assert_eq!(signal.status, SampleStatus::Current);
    }

    #[test]
    fn test_missing_and_stale_samples_are_neutral() {
        let c = correlator();
        let missing = c.correlate(DiseaseCategory::Respiratory, None, date("2024-07-15"));
        assert_eq!(missing.multiplier, 1.0);
        assert_eq!(missing.status, SampleStatus::Missing);

        // sample dated 2024-07-10 is 35 days old by 2024-08-14
        let stale = c.correlate(DiseaseCategory::Respiratory, Some(&sample(300.0, 80.0, 20.0, 40.0)), date("2024-08-14"));
        assert_eq!(stale.multiplier, 1.0);
        assert_eq!(stale.status, SampleStatus::Stale);
    }

    #[test]
    fn test_environmental_risk_cities() {
        let as_of = date("2024-07-15");
        let mut samples = Vec::new();
        for (city, aqi, wqi) in [(1, 210.0, 80.0), (1, 230.0, 80.0), (2, 90.0, 50.0), (3, 100.0, 90.0)] {
            let mut s = sample(aqi, wqi, 25.0, 50.0);
            s.city_id = CityId(city);
            samples.push(s);
        }
        // outside the window
        let mut old = sample(500.0, 10.0, 25.0, 50.0);
        old.city_id = CityId(3);
        old.sample_date = date("2024-05-01");
        samples.push(old);

        let risky = environmental_risk_cities(&samples, as_of, &EngineConfig::default());
        assert_eq!(risky.len(), 2);
        assert_eq!(risky[0].city_id, CityId(1));
        assert_eq!(risky[0].high_pollution_days, 2);
        assert!((risky[0].avg_aqi - 220.0).abs() < 1e-9);
        assert_eq!(risky[1].city_id, CityId(2));
    }
}
