//! Seasonal Profiler
//!
//! Maps a disease and calendar month to a seasonality multiplier.

use crate::model::{DiseaseId, SeasonalProfile};

/// Multiplier for diseases without a profile
pub const NEUTRAL_SEASONAL_MULTIPLIER: f64 = 1.0;

const MONSOON: [u32; 4] = [6, 7, 8, 9];
const WINTER: [u32; 4] = [11, 12, 1, 2];
const SUMMER: [u32; 3] = [3, 4, 5];

/// Seasonal multiplier for `month` (1-12).
///
/// Peak multiplier inside the active months, off-season multiplier outside
/// them, neutral when the disease has no profile.
pub fn seasonal_multiplier(profile: Option<&SeasonalProfile>, month: u32) -> f64 {
    match profile {
        Some(p) if p.is_active(month) => p.peak_multiplier,
        Some(p) => p.off_season_multiplier,
        None => NEUTRAL_SEASONAL_MULTIPLIER,
    }
}

/// Reference seasonal table for the standard disease catalogue.
///
/// - Monsoon (June-September): Dengue, Malaria, Typhoid, Cholera
/// - Winter (November-February): H1N1, Tuberculosis, Pneumonia
/// - Summer (March-May): Measles, Chickenpox
pub fn reference_profiles() -> Vec<SeasonalProfile> {
    let monsoon = [1, 2, 3, 13]
        .into_iter()
        .map(|id| SeasonalProfile::new(DiseaseId(id), MONSOON, 1.5, 0.6));
    let winter = [7, 8, 10]
        .into_iter()
        .map(|id| SeasonalProfile::new(DiseaseId(id), WINTER, 1.4, 0.7));
    let summer = [11, 12]
        .into_iter()
        .map(|id| SeasonalProfile::new(DiseaseId(id), SUMMER, 1.3, 0.85));

    let mut profiles: Vec<_> = monsoon.chain(winter).chain(summer).collect();
    profiles.sort_by_key(|p| p.disease_id);
    profiles
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile_for(id: u32) -> SeasonalProfile {
        reference_profiles()
            .into_iter()
            .find(|p| p.disease_id == DiseaseId(id))
            .unwrap()
    }

    #[test]
    fn test_peak_and_off_season() {
        let dengue = profile_for(1);
        assert_eq!(seasonal_multiplier(Some(&dengue), 7), 1.5);
        assert_eq!(seasonal_multiplier(Some(&dengue), 12), 0.6);
    }

    #[test]
    fn test_winter_wraps_year_end() {
        let pneumonia = profile_for(10);
        for month in [11, 12, 1, 2] {
            assert_eq!(seasonal_multiplier(Some(&pneumonia), month), 1.4);
        }
        assert_eq!(seasonal_multiplier(Some(&pneumonia), 7), 0.7);
    }

    #[test]
    fn test_missing_profile_is_neutral() {
        for month in 1..=12 {
            assert_eq!(seasonal_multiplier(None, month), NEUTRAL_SEASONAL_MULTIPLIER);
        }
    }

    #[test]
    fn test_reference_table_shape() {
        let profiles = reference_profiles();
        assert_eq!(profiles.len(), 9);
        for p in &profiles {
            assert!(p.peak_multiplier > 1.0);
            assert!(p.off_season_multiplier < 1.0);
            assert!(p.active_months.iter().all(|m| (1..=12).contains(m)));
        }
    }
}
