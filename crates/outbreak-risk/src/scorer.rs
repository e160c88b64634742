//! Risk Scorer
//!
//! Fuses trend, seasonal and environmental signals into a bounded outbreak
//! probability, a risk tier, a predicted case count and a reasoning trace.
//!
//! ```text
//! base      = clamp(recent_avg / reference_daily_cases × baseline_probability × trend_ratio, 0, 100)
//! adjusted  = clamp(base × seasonal × environmental, 0, 100)
//! final     = clamp(adjusted × (1 + jitter_fraction × draw), 0, 100)     draw ∈ [-1, 1]
//! predicted = round(recent_avg × adjusted / baseline_probability)
//! ```
//!
//! A recent case rate equal to `reference_daily_cases` with a flat trend and
//! neutral multipliers therefore scores exactly `baseline_probability`.

use crate::config::{BandBoundaries, EngineConfig};
use crate::environment::{EnvironmentalFactor, EnvironmentalSignal, SampleStatus};
use crate::jitter::{apply_jitter, ScoreKey};
use crate::model::{DataWarning, RiskAssessment, TrendSignal};

/// Everything the scorer needs for one (city, disease) pair
#[derive(Clone, Copy, Debug)]
pub struct ScoringSignals {
    pub trend: TrendSignal,
    pub seasonal_multiplier: f64,
    pub has_seasonal_profile: bool,
    pub environment: EnvironmentalSignal,
}

/// Combines signals into a [`RiskAssessment`]
#[derive(Clone, Copy, Debug)]
pub struct RiskScorer {
    bands: BandBoundaries,
    jitter_fraction: f64,
    reference_daily_cases: f64,
    baseline_probability: f64,
    neutral_epsilon: f64,
}

impl RiskScorer {
    pub fn from_config(config: &EngineConfig) -> Self {
        RiskScorer {
            bands: config.band_boundaries,
            jitter_fraction: config.jitter_fraction,
            reference_daily_cases: config.reference_daily_cases,
            baseline_probability: config.baseline_probability,
            neutral_epsilon: config.neutral_epsilon,
        }
    }

    /// Recent case rate normalised to the probability scale, scaled by trend
    pub fn base_probability(&self, trend: &TrendSignal) -> f64 {
        let raw = trend.recent_avg_cases / self.reference_daily_cases
            * self.baseline_probability
            * trend.trend_ratio;
        clamp_probability(raw)
    }

    pub fn adjusted_probability(&self, base: f64, seasonal: f64, environmental: f64) -> f64 {
        clamp_probability(base * seasonal * environmental)
    }

    /// Expected case count, derived from the pre-jitter probability
    pub fn predicted_cases(&self, recent_avg_cases: f64, adjusted_probability: f64) -> u64 {
        let predicted = (recent_avg_cases * adjusted_probability / self.baseline_probability).round();
        if predicted.is_finite() && predicted > 0.0 {
            predicted as u64
        } else {
            0
        }
    }

    /// Score one pair. `draw` is the jitter source's value for `key`.
    pub fn score(&self, key: ScoreKey, signals: &ScoringSignals, draw: f64) -> RiskAssessment {
        let base = self.base_probability(&signals.trend);
        let adjusted = self.adjusted_probability(
            base,
            signals.seasonal_multiplier,
            signals.environment.multiplier,
        );
        let probability = round_hundredths(apply_jitter(adjusted, self.jitter_fraction, draw));
        let risk_tier = self.bands.classify(probability);
        let predicted_cases = self.predicted_cases(signals.trend.recent_avg_cases, adjusted);

        let (reasoning, warnings) = self.explain(signals);

        RiskAssessment {
            city_id: key.city_id,
            disease_id: key.disease_id,
            as_of: key.as_of,
            probability,
            risk_tier,
            predicted_cases,
            reasoning,
            trend: signals.trend,
            seasonal_multiplier: signals.seasonal_multiplier,
            environmental_multiplier: signals.environment.multiplier,
            warnings,
        }
    }

    fn raises(&self, multiplier: f64) -> bool {
        multiplier > 1.0 + self.neutral_epsilon
    }

    fn lowers(&self, multiplier: f64) -> bool {
        multiplier < 1.0 - self.neutral_epsilon
    }

    /// One entry per factor that moved the score, plus data-gap notes
    fn explain(&self, signals: &ScoringSignals) -> (Vec<String>, Vec<DataWarning>) {
        let mut reasoning = Vec::new();
        let mut warnings = Vec::new();
        let mut elevated = false;

        let trend = &signals.trend;
        if trend.recent_avg_cases == 0.0 && trend.prior_avg_cases == 0.0 {
            warnings.push(DataWarning::NoRecentCases);
            reasoning.push("No cases reported in the trend windows; insufficient historical data".to_string());
        } else {
            // Case rate is context only; baseline status follows the multipliers
            let rate = trend.recent_avg_cases / self.reference_daily_cases;
            if self.raises(rate) {
                reasoning.push(format!(
                    "Recent case rate of {:.2}/day is above the typical {:.2}/day",
                    trend.recent_avg_cases, self.reference_daily_cases
                ));
            } else if self.lowers(rate) {
                reasoning.push(format!(
                    "Recent case rate of {:.2}/day is below the typical {:.2}/day",
                    trend.recent_avg_cases, self.reference_daily_cases
                ));
            }

            if self.raises(trend.trend_ratio) {
                elevated = true;
                reasoning.push(format!(
                    "Recent increasing trend detected ({:.2}x the prior period)",
                    trend.trend_ratio
                ));
            } else if self.lowers(trend.trend_ratio) {
                reasoning.push(format!(
                    "Recent decreasing trend detected ({:.2}x the prior period)",
                    trend.trend_ratio
                ));
            }
        }

        if !signals.has_seasonal_profile {
            warnings.push(DataWarning::NoSeasonalProfile);
            reasoning.push("No seasonal profile for this disease; seasonal factor treated as neutral".to_string());
        } else if self.raises(signals.seasonal_multiplier) {
            elevated = true;
            reasoning.push(format!(
                "In peak season for this disease (x{:.2})",
                signals.seasonal_multiplier
            ));
        } else if self.lowers(signals.seasonal_multiplier) {
            reasoning.push(format!(
                "Off-season for this disease (x{:.2})",
                signals.seasonal_multiplier
            ));
        }

        let env = &signals.environment;
        match env.status {
            SampleStatus::Missing => {
                warnings.push(DataWarning::NoEnvironmentalSample);
                reasoning.push(
                    "No environmental data for this city; environmental factor treated as neutral".to_string(),
                );
            }
            SampleStatus::Stale => {
                warnings.push(DataWarning::StaleEnvironmentalSample);
                reasoning.push(
                    "Environmental data is out of date; environmental factor treated as neutral".to_string(),
                );
            }
            SampleStatus::Current if self.raises(env.multiplier) => {
                elevated = true;
                reasoning.push(match env.factor {
                    Some(EnvironmentalFactor::PoorAirQuality { aqi }) => format!(
                        "Elevated environment risk: poor air quality (AQI {:.0}, x{:.2})",
                        aqi, env.multiplier
                    ),
                    Some(EnvironmentalFactor::PoorWaterQuality { wqi }) => format!(
                        "Elevated environment risk: poor water quality (WQI {:.0}, x{:.2})",
                        wqi, env.multiplier
                    ),
                    Some(EnvironmentalFactor::BreedingConditions { temperature, humidity }) => format!(
                        "Elevated environment risk: vector breeding conditions ({:.1}°C, {:.0}% humidity, x{:.2})",
                        temperature, humidity, env.multiplier
                    ),
                    None => format!(
                        "Elevated environment risk: conditions favour disease spread (x{:.2})",
                        env.multiplier
                    ),
                });
            }
            SampleStatus::Current if self.lowers(env.multiplier) => {
                reasoning.push(format!(
                    "Environment unfavourable for spread (x{:.2})",
                    env.multiplier
                ));
            }
            SampleStatus::Current => {}
        }

        if !elevated {
            reasoning.push("No elevating factors; prediction reflects baseline conditions".to_string());
        }

        (reasoning, warnings)
    }
}

fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() {
        0.0
    } else {
        p.clamp(0.0, 100.0)
    }
}

fn round_hundredths(p: f64) -> f64 {
    ((p * 100.0).round() / 100.0).clamp(0.0, 100.0)
}
