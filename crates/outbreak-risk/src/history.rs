//! Historical Aggregator
//!
//! Reduces raw case reports into trend evidence. The recent window covers
//! the `recent_window_days` days ending on the assessment date (inclusive);
//! the prior window covers the `prior_window_days` days immediately before
//! it. Reports dated after the assessment date are ignored.

use crate::config::EngineConfig;
use crate::model::{CaseRecord, CityId, DiseaseId, TrendSignal};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Days between `date` and `as_of`, or `None` if `date` is in the future
pub(crate) fn days_before(as_of: NaiveDate, date: NaiveDate) -> Option<i64> {
    let days = (as_of - date).num_days();
    (days >= 0).then_some(days)
}

/// Splits case history into recent and prior windows
#[derive(Clone, Copy, Debug)]
pub struct HistoricalAggregator {
    recent_days: u32,
    prior_days: u32,
}

impl HistoricalAggregator {
    pub fn new(recent_days: u32, prior_days: u32) -> Self {
        HistoricalAggregator {
            recent_days: recent_days.max(1),
            prior_days: prior_days.max(1),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.recent_window_days, config.prior_window_days)
    }

    /// Total days of history the aggregator looks at
    pub fn lookback_days(&self) -> u32 {
        self.recent_days.saturating_add(self.prior_days)
    }

    /// Summarise the case history of one (city, disease) pair.
    ///
    /// Records for other pairs are skipped, so callers may pass a broader set.
    /// An empty prior window is floored at one case per window so a first
    /// cluster produces a large but finite ratio.
    pub fn trend(
        &self,
        records: &[CaseRecord],
        city_id: CityId,
        disease_id: DiseaseId,
        as_of: NaiveDate,
    ) -> TrendSignal {
        let recent_days = i64::from(self.recent_days);
        let prior_end = recent_days + i64::from(self.prior_days);

        let mut recent_count = 0u64;
        let mut prior_count = 0u64;

        for record in records
            .iter()
            .filter(|r| r.city_id == city_id && r.disease_id == disease_id)
        {
            match days_before(as_of, record.report_date) {
                Some(d) if d < recent_days => recent_count += 1,
                Some(d) if d < prior_end => prior_count += 1,
                _ => {}
            }
        }

        let recent_avg_cases = recent_count as f64 / self.recent_days as f64;
        let prior_avg_cases = prior_count as f64 / self.prior_days as f64;

        let trend_ratio = if recent_count == 0 && prior_count == 0 {
            1.0
        } else {
            let floor = 1.0 / self.prior_days as f64;
            recent_avg_cases / prior_avg_cases.max(floor)
        };

        TrendSignal {
            recent_avg_cases,
            prior_avg_cases,
            trend_ratio,
        }
    }
}

/// Cases for one (city, disease) pair within a reporting window
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CaseCluster {
    pub city_id: CityId,
    pub disease_id: DiseaseId,
    pub case_count: usize,
    pub first_case: NaiveDate,
    pub latest_case: NaiveDate,
}

/// Group the last `days` days of reports by (city, disease) and keep the
/// groups with more than `min_cases` cases.
///
/// Sorted by case count descending, then city and disease ascending.
pub fn case_clusters(
    records: &[CaseRecord],
    as_of: NaiveDate,
    days: u32,
    min_cases: usize,
) -> Vec<CaseCluster> {
    let mut groups: BTreeMap<(CityId, DiseaseId), CaseCluster> = BTreeMap::new();

    for record in records {
        if !matches!(days_before(as_of, record.report_date), Some(d) if d < i64::from(days)) {
            continue;
        }
        groups
            .entry((record.city_id, record.disease_id))
            .and_modify(|c| {
                c.case_count += 1;
                c.first_case = c.first_case.min(record.report_date);
                c.latest_case = c.latest_case.max(record.report_date);
            })
            .or_insert(CaseCluster {
                city_id: record.city_id,
                disease_id: record.disease_id,
                case_count: 1,
                first_case: record.report_date,
                latest_case: record.report_date,
            });
    }

    let mut clusters: Vec<CaseCluster> = groups
        .into_values()
        .filter(|c| c.case_count > min_cases)
        .collect();
    // BTreeMap order already gives (city, disease) ascending; stable sort keeps it for ties
    clusters.sort_by(|a, b| b.case_count.cmp(&a.case_count));
    clusters
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn cases(city: u32, disease: u32, as_of: NaiveDate, days_ago: &[i64]) -> Vec<CaseRecord> {
        days_ago
            .iter()
            .map(|d| CaseRecord {
                city_id: CityId(city),
                disease_id: DiseaseId(disease),
                report_date: as_of - chrono::Duration::days(*d),
            })
            .collect()
    }

    #[test]
    fn test_no_records_is_neutral() {
        let agg = HistoricalAggregator::new(30, 30);
        let trend = agg.trend(&[], CityId(1), DiseaseId(1), date("2024-07-15"));
        assert_eq!(trend, TrendSignal::neutral());
    }

    #[test]
    fn test_window_partition() {
        let as_of = date("2024-07-15");
        // day 0 and 29 are recent, 30 and 59 prior, 60 outside
        let records = cases(1, 1, as_of, &[0, 29, 30, 59, 60]);
        let trend = HistoricalAggregator::new(30, 30).trend(&records, CityId(1), DiseaseId(1), as_of);

        assert!((trend.recent_avg_cases - 2.0 / 30.0).abs() < 1e-12);
        assert!((trend.prior_avg_cases - 2.0 / 30.0).abs() < 1e-12);
        assert!((trend.trend_ratio - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_future_and_foreign_records_ignored() {
        let as_of = date("2024-07-15");
        let mut records = cases(1, 1, as_of, &[-1, -10]);
        records.extend(cases(2, 1, as_of, &[1, 2, 3]));
        records.extend(cases(1, 2, as_of, &[1, 2, 3]));

        let trend = HistoricalAggregator::new(30, 30).trend(&records, CityId(1), DiseaseId(1), as_of);
        assert_eq!(trend, TrendSignal::neutral());
    }

    #[test]
    fn test_rising_trend() {
        let as_of = date("2024-07-15");
        let recent: Vec<i64> = (0..45).map(|i| i % 30).collect();
        let mut days = recent;
        days.extend((30..45).collect::<Vec<_>>());
        let records = cases(1, 1, as_of, &days);

        let trend = HistoricalAggregator::new(30, 30).trend(&records, CityId(1), DiseaseId(1), as_of);
        assert!((trend.recent_avg_cases - 1.5).abs() < 1e-12);
        assert!((trend.prior_avg_cases - 0.5).abs() < 1e-12);
        assert!((trend.trend_ratio - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_prior_window_is_finite() {
        let as_of = date("2024-07-15");
        let records = cases(1, 1, as_of, &[1, 2, 3]);
        let trend = HistoricalAggregator::new(30, 30).trend(&records, CityId(1), DiseaseId(1), as_of);

        assert_eq!(trend.prior_avg_cases, 0.0);
        assert!(trend.trend_ratio.is_finite());
        assert!((trend.trend_ratio - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_declining_trend_with_no_recent_cases() {
        let as_of = date("2024-07-15");
        let records = cases(1, 1, as_of, &[35, 40, 45]);
        let trend = HistoricalAggregator::new(30, 30).trend(&records, CityId(1), DiseaseId(1), as_of);

        assert_eq!(trend.recent_avg_cases, 0.0);
        assert_eq!(trend.trend_ratio, 0.0);
    }

    #[test]
    fn test_lookback_saturates() {
        assert_eq!(HistoricalAggregator::new(30, 30).lookback_days(), 60);
        assert_eq!(HistoricalAggregator::new(u32::MAX, 30).lookback_days(), u32::MAX);
    }

    #[test]
    fn test_case_clusters() {
        let as_of = date("2024-07-15");
        let mut records = cases(1, 1, as_of, &[0, 1, 2, 3, 4]);
        records.extend(cases(2, 3, as_of, &[5, 6, 7, 8, 9, 10]));
        records.extend(cases(3, 1, as_of, &[1, 2]));
        records.extend(cases(1, 2, as_of, &[40, 41, 42, 43, 44]));

        let clusters = case_clusters(&records, as_of, 30, 3);
        assert_eq!(clusters.len(), 2);
        assert_eq!((clusters[0].city_id, clusters[0].case_count), (CityId(2), 6));
        assert_eq!(clusters[0].first_case, as_of - chrono::Duration::days(10));
        assert_eq!(clusters[0].latest_case, as_of - chrono::Duration::days(5));
        assert_eq!((clusters[1].city_id, clusters[1].case_count), (CityId(1), 5));
    }
}
