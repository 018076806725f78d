//! Proximity-based risk classification.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::{FishermanState, RiskZone};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Normal,
    High,
    Critical,
}

impl RiskLevel {
    pub fn label(self) -> &'static str {
        match self {
            RiskLevel::Normal => "Normal",
            RiskLevel::High => "High",
            RiskLevel::Critical => "Critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn default_critical_km() -> f64 {
    25.0
}

fn default_high_km() -> f64 {
    75.0
}

/// Distance cut-offs in kilometres; `critical_km` must be below `high_km`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    #[serde(default = "default_critical_km")]
    pub critical_km: f64,
    #[serde(default = "default_high_km")]
    pub high_km: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            critical_km: default_critical_km(),
            high_km: default_high_km(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("risk thresholds must satisfy 0 <= critical ({critical_km} km) < high ({high_km} km)")]
pub struct ThresholdError {
    pub critical_km: f64,
    pub high_km: f64,
}

impl RiskThresholds {
    pub fn new(critical_km: f64, high_km: f64) -> Result<Self, ThresholdError> {
        let thresholds = Self {
            critical_km,
            high_km,
        };
        thresholds.validate()?;
        Ok(thresholds)
    }

    pub fn validate(&self) -> Result<(), ThresholdError> {
        if self.critical_km >= 0.0 && self.critical_km < self.high_km {
            Ok(())
        } else {
            Err(ThresholdError {
                critical_km: self.critical_km,
                high_km: self.high_km,
            })
        }
    }
}

/// Index and distance (km) of the closest zone.
pub fn nearest_zone(loc: &FishermanState, zones: &[RiskZone]) -> Option<(usize, f64)> {
    let here = loc.position();
    zones
        .iter()
        .map(|zone| here.distance_km(&zone.position()))
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

pub fn classify(
    loc: &FishermanState,
    zones: &[RiskZone],
    thresholds: &RiskThresholds,
) -> RiskLevel {
    match nearest_zone(loc, zones) {
        None => RiskLevel::Normal,
        Some((_, d)) if d <= thresholds.critical_km => RiskLevel::Critical,
        Some((_, d)) if d <= thresholds.high_km => RiskLevel::High,
        Some(_) => RiskLevel::Normal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn at(latitude: f64, longitude: f64) -> FishermanState {
        FishermanState {
            latitude,
            longitude,
            hour: 9,
            month: 3,
        }
    }

    fn zones() -> Vec<RiskZone> {
        vec![RiskZone::new(35.8, -165.5), RiskZone::new(35.2, -164.5)]
    }

    #[test]
    fn empty_zone_set_is_normal() {
        let level = classify(&at(35.5, -165.0), &[], &RiskThresholds::default());
        assert_eq!(level, RiskLevel::Normal);
    }

    #[test]
    fn default_scenario_reads_high() {
        let loc = at(35.5, -165.0);
        let (_, d) = nearest_zone(&loc, &zones()).unwrap();
        assert!(d > 50.0 && d < 60.0, "nearest zone at {d} km");
        assert_eq!(
            classify(&loc, &zones(), &RiskThresholds::default()),
            RiskLevel::High
        );
    }

    #[test]
    fn thresholds_are_inclusive() {
        let loc = at(0.0, 0.0);
        let zone = [RiskZone::new(1.0, 0.0)];
        let d = loc.position().distance_km(&zone[0].position());
        let on_critical = RiskThresholds::new(d, d + 1.0).unwrap();
        assert_eq!(classify(&loc, &zone, &on_critical), RiskLevel::Critical);
        let on_high = RiskThresholds::new(d - 1.0, d).unwrap();
        assert_eq!(classify(&loc, &zone, &on_high), RiskLevel::High);
        let far = RiskThresholds::new(1.0, 2.0).unwrap();
        assert_eq!(classify(&loc, &zone, &far), RiskLevel::Normal);
    }

    #[test]
    fn on_top_of_zone_is_critical() {
        let level = classify(&at(35.8, -165.5), &zones(), &RiskThresholds::default());
        assert_eq!(level, RiskLevel::Critical);
    }

    #[test]
    fn inverted_thresholds_rejected() {
        assert!(RiskThresholds::new(50.0, 10.0).is_err());
        assert!(RiskThresholds::new(-1.0, 10.0).is_err());
        assert!(RiskThresholds::new(10.0, 10.0).is_err());
    }

    #[test]
    fn levels_order_by_severity() {
        assert!(RiskLevel::Critical > RiskLevel::High);
        assert!(RiskLevel::High > RiskLevel::Normal);
        assert_eq!(RiskLevel::High.to_string(), "High");
    }

    proptest! {
        #[test]
        fn classify_is_deterministic(
            lat in -90.0f64..=90.0,
            lng in -180.0f64..=180.0,
            zlat in -90.0f64..=90.0,
            zlng in -180.0f64..=180.0,
        ) {
            let loc = at(lat, lng);
            let zones = [RiskZone::new(zlat, zlng)];
            let thresholds = RiskThresholds::default();
            prop_assert_eq!(
                classify(&loc, &zones, &thresholds),
                classify(&loc, &zones, &thresholds)
            );
        }
    }
}
