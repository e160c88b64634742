//! Ranking and City Summaries
//!
//! Pure ordering and grouping over scored assessments, plus the fan-out used
//! to score many (city, disease) pairs. Parallel scoring is available with the
//! `parallel` feature; the output order is identical either way.

use crate::model::{CityId, DiseaseId, RiskAssessment, RiskTier};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Report order: probability descending, then city and disease ascending
pub fn report_order(a: &RiskAssessment, b: &RiskAssessment) -> Ordering {
    b.probability
        .total_cmp(&a.probability)
        .then(a.city_id.cmp(&b.city_id))
        .then(a.disease_id.cmp(&b.disease_id))
}

/// Sort assessments into report order
pub fn sort_assessments(assessments: &mut [RiskAssessment]) {
    assessments.sort_by(report_order);
}

/// Worst-case view of one city
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CitySummary {
    pub city_id: CityId,
    /// Highest-probability disease, `None` when nothing is active
    pub top_disease: Option<DiseaseId>,
    pub top_probability: f64,
    pub top_predicted_cases: u64,
    /// Maximum tier across the city's diseases
    pub overall_tier: RiskTier,
    pub assessed_diseases: usize,
}

/// Summarise one city's assessments. Assessments for other cities are ignored.
pub fn summarize_city(city_id: CityId, assessments: &[RiskAssessment]) -> CitySummary {
    let own = assessments.iter().filter(|a| a.city_id == city_id);

    let top = own.clone().min_by(|a, b| report_order(a, b));
    let overall_tier = own
        .clone()
        .map(|a| a.risk_tier)
        .max()
        .unwrap_or(RiskTier::Low);

    CitySummary {
        city_id,
        top_disease: top.map(|a| a.disease_id),
        top_probability: top.map(|a| a.probability).unwrap_or(0.0),
        top_predicted_cases: top.map(|a| a.predicted_cases).unwrap_or(0),
        overall_tier,
        assessed_diseases: own.count(),
    }
}

/// One summary per city present in `assessments`, ordered by top probability
/// descending then city ascending.
pub fn city_summaries(assessments: &[RiskAssessment]) -> Vec<CitySummary> {
    let mut by_city: BTreeMap<CityId, Vec<RiskAssessment>> = BTreeMap::new();
    for a in assessments {
        by_city.entry(a.city_id).or_default().push(a.clone());
    }

    let mut summaries: Vec<CitySummary> = by_city
        .iter()
        .map(|(&city_id, own)| summarize_city(city_id, own))
        .collect();
    summaries.sort_by(|a, b| {
        b.top_probability
            .total_cmp(&a.top_probability)
            .then(a.city_id.cmp(&b.city_id))
    });
    summaries
}

/// The first `n` assessments for a city, in report order
pub fn top_for_city(city_id: CityId, assessments: &[RiskAssessment], n: usize) -> Vec<RiskAssessment> {
    let mut own: Vec<RiskAssessment> = assessments
        .iter()
        .filter(|a| a.city_id == city_id)
        .cloned()
        .collect();
    sort_assessments(&mut own);
    own.truncate(n);
    own
}

/// Apply `score_fn` to every pair, in parallel when enabled.
///
/// Pairs whose scoring fails are dropped. Results come back in input order.
pub(crate) fn fan_out<T, E, F>(pairs: &[(CityId, DiseaseId)], parallel: bool, score_fn: F) -> Vec<T>
where
    T: Send,
    E: Send,
    F: Fn(CityId, DiseaseId) -> Result<T, E> + Sync,
{
    if parallel {
        fan_out_parallel(pairs, score_fn)
    } else {
        fan_out_sequential(pairs, score_fn)
    }
}

#[cfg(feature = "parallel")]
fn fan_out_parallel<T, E, F>(pairs: &[(CityId, DiseaseId)], score_fn: F) -> Vec<T>
where
    T: Send,
    E: Send,
    F: Fn(CityId, DiseaseId) -> Result<T, E> + Sync,
{
    use rayon::prelude::*;

    pairs
        .par_iter()
        .filter_map(|&(city, disease)| score_fn(city, disease).ok())
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn fan_out_parallel<T, E, F>(pairs: &[(CityId, DiseaseId)], score_fn: F) -> Vec<T>
where
    T: Send,
    E: Send,
    F: Fn(CityId, DiseaseId) -> Result<T, E> + Sync,
{
    fan_out_sequential(pairs, score_fn)
}

fn fan_out_sequential<T, E, F>(pairs: &[(CityId, DiseaseId)], score_fn: F) -> Vec<T>
where
    F: Fn(CityId, DiseaseId) -> Result<T, E>,
{
    pairs
        .iter()
        .filter_map(|&(city, disease)| score_fn(city, disease).ok())
        .collect()
}
