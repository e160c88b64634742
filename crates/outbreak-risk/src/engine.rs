//! Risk Engine
//!
//! Public entry point. Pulls evidence from a [`HealthDataSource`], runs the
//! aggregator, profiler and correlator, and hands the signals to the scorer.
//!
//! # Example
//!
//! ```ignore
//! use outbreak_risk::{Dataset, EngineConfig, RiskEngine, Seed, SeededJitter};
//!
//! let dataset = Dataset::from_path("surveillance.json")?;
//! let jitter = SeededJitter::new(Seed::from_string("weekly-report"));
//! let engine = RiskEngine::new(dataset, jitter, EngineConfig::default())?;
//!
//! for assessment in engine.rank_all(as_of).iter().take(10) {
//!     println!("{} {} {:.1}%", assessment.city_id, assessment.disease_id, assessment.probability);
//! }
//! ```

use crate::config::EngineConfig;
use crate::data::{DateWindow, HealthDataSource};
use crate::environment::{self, CityEnvironmentalRisk, EnvironmentalCorrelator};
use crate::history::{self, CaseCluster, HistoricalAggregator};
use crate::jitter::{JitterSource, ScoreKey};
use crate::model::{CityId, DiseaseId, RiskAssessment, RiskTier};
use crate::ranking::{self, CitySummary};
use crate::scorer::{RiskScorer, ScoringSignals};
use crate::seasonal::seasonal_multiplier;
use crate::{RiskError, RiskResult};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// One row of the all-cities overview
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CityOverview {
    pub city_id: CityId,
    pub city_name: String,
    pub overall_tier: RiskTier,
    pub max_probability: f64,
    pub top_disease: DiseaseId,
    pub top_disease_name: String,
    pub predicted_cases: u64,
}

/// Outbreak risk engine over a data source and a jitter source
pub struct RiskEngine<D, J> {
    data: D,
    jitter: J,
    config: EngineConfig,
    aggregator: HistoricalAggregator,
    correlator: EnvironmentalCorrelator,
    scorer: RiskScorer,
    parallel: bool,
}

impl<D: HealthDataSource, J: JitterSource> RiskEngine<D, J> {
    /// Create an engine. Fails if the configuration is inconsistent.
    pub fn new(data: D, jitter: J, config: EngineConfig) -> RiskResult<Self> {
        config.validate()?;
        Ok(RiskEngine {
            aggregator: HistoricalAggregator::from_config(&config),
            correlator: EnvironmentalCorrelator::from_config(&config),
            scorer: RiskScorer::from_config(&config),
            data,
            jitter,
            config,
            parallel: cfg!(feature = "parallel"),
        })
    }

    /// Enable or disable parallel fan-out in batch operations
    pub fn with_parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn data(&self) -> &D {
        &self.data
    }

    /// Assess one (city, disease) pair as of `as_of`.
    ///
    /// Only an unknown city or disease is an error; missing cases, samples or
    /// profiles degrade to neutral inputs and are noted in the reasoning.
    pub fn score(&self, city_id: CityId, disease_id: DiseaseId, as_of: NaiveDate) -> RiskResult<RiskAssessment> {
        if self.data.city(city_id).is_none() {
            return Err(RiskError::CityNotFound(city_id));
        }
        if self.data.disease(disease_id).is_none() {
            return Err(RiskError::DiseaseNotFound(disease_id));
        }

        let window = DateWindow::ending(as_of, self.aggregator.lookback_days());
        let cases = self.data.recent_cases(city_id, disease_id, window);
        let trend = self.aggregator.trend(&cases, city_id, disease_id, as_of);

        let profile = self.data.seasonal_profile(disease_id);
        let seasonal = seasonal_multiplier(profile.as_ref(), as_of.month());

        let category = self.data.disease_category(disease_id);
        let sample = self.data.environmental_sample(city_id, as_of);
        let environment = self.correlator.correlate(category, sample.as_ref(), as_of);

        let key = ScoreKey {
            city_id,
            disease_id,
            as_of,
        };
        let signals = ScoringSignals {
            trend,
            seasonal_multiplier: seasonal,
            has_seasonal_profile: profile.is_some(),
            environment,
        };
        let assessment = self.scorer.score(key, &signals, self.jitter.draw(&key));

        tracing::debug!(
            city_id = %city_id,
            disease_id = %disease_id,
            %as_of,
            category = category.label(),
            trend_ratio = trend.trend_ratio,
            seasonal,
            environmental = environment.multiplier,
            probability = assessment.probability,
            tier = %assessment.risk_tier,
            "scored pair"
        );
        if !assessment.warnings.is_empty() {
            tracing::debug!(
                city_id = %city_id,
                disease_id = %disease_id,
                warnings = ?assessment.warnings,
                "scored with incomplete data"
            );
        }

        Ok(assessment)
    }

    /// Score every pair with a case in the active lookback window, in report
    /// order (probability descending, then city and disease ascending).
    pub fn rank_all(&self, as_of: NaiveDate) -> Vec<RiskAssessment> {
        let pairs = self
            .data
            .active_city_disease_pairs(as_of, self.config.active_lookback_days);
        self.score_pairs(&pairs, as_of)
    }

    /// Worst-case disease and overall tier for one city
    pub fn city_summary(&self, city_id: CityId, as_of: NaiveDate) -> RiskResult<CitySummary> {
        let assessments = self.city_assessments(city_id, as_of)?;
        Ok(ranking::summarize_city(city_id, &assessments))
    }

    /// The `top_n` highest-risk diseases for one city
    pub fn city_predictions(&self, city_id: CityId, as_of: NaiveDate, top_n: usize) -> RiskResult<Vec<RiskAssessment>> {
        let assessments = self.city_assessments(city_id, as_of)?;
        Ok(ranking::top_for_city(city_id, &assessments, top_n))
    }

    /// One row per city with active diseases, highest risk first
    pub fn cities_overview(&self, as_of: NaiveDate) -> Vec<CityOverview> {
        let assessments = self.rank_all(as_of);
        ranking::city_summaries(&assessments)
            .into_iter()
            .filter_map(|summary| {
                let top_disease = summary.top_disease?;
                let city_name = self.data.city(summary.city_id).map(|c| c.name).unwrap_or_default();
                let top_disease_name = self.data.disease(top_disease).map(|d| d.name).unwrap_or_default();
                Some(CityOverview {
                    city_id: summary.city_id,
                    city_name,
                    overall_tier: summary.overall_tier,
                    max_probability: summary.top_probability,
                    top_disease,
                    top_disease_name,
                    predicted_cases: summary.top_predicted_cases,
                })
            })
            .collect()
    }

    /// Case clusters larger than `min_cases` in the last `days` days
    pub fn outbreak_summary(&self, as_of: NaiveDate, days: u32, min_cases: usize) -> Vec<CaseCluster> {
        let records = self.data.cases_in_window(DateWindow::ending(as_of, days));
        history::case_clusters(&records, as_of, days, min_cases)
    }

    /// Cities whose recent air or water quality breaches its threshold
    pub fn environmental_risk_cities(&self, as_of: NaiveDate) -> Vec<CityEnvironmentalRisk> {
        let window = DateWindow::ending(as_of, self.config.environment_recency_days);
        let samples = self.data.environmental_samples(window);
        environment::environmental_risk_cities(&samples, as_of, &self.config)
    }

    fn city_assessments(&self, city_id: CityId, as_of: NaiveDate) -> RiskResult<Vec<RiskAssessment>> {
        if self.data.city(city_id).is_none() {
            return Err(RiskError::CityNotFound(city_id));
        }
        let pairs: Vec<_> = self
            .data
            .active_city_disease_pairs(as_of, self.config.active_lookback_days)
            .into_iter()
            .filter(|(city, _)| *city == city_id)
            .collect();
        Ok(self.score_pairs(&pairs, as_of))
    }

    fn score_pairs(&self, pairs: &[(CityId, DiseaseId)], as_of: NaiveDate) -> Vec<RiskAssessment> {
        let start = Instant::now();
        let mut assessments = ranking::fan_out(pairs, self.parallel, |city_id, disease_id| {
            self.score(city_id, disease_id, as_of).map_err(|e| {
                tracing::warn!(city_id = %city_id, disease_id = %disease_id, error = %e, "skipping pair");
                e
            })
        });
        ranking::sort_assessments(&mut assessments);

        tracing::info!(
            pairs = pairs.len(),
            scored = assessments.len(),
            parallel = self.parallel,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "ranked city/disease pairs"
        );
        assessments
    }
}
