//! Geographic primitives shared by the store, the classifier and the map.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mean Earth radius in kilometres (IUGG).
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    /// Great-circle distance using the haversine formula.
    pub fn distance_km(&self, other: &LatLng) -> f64 {
        let phi1 = self.lat.to_radians();
        let phi2 = other.lat.to_radians();
        let d_phi = (other.lat - self.lat).to_radians();
        let d_lambda = (other.lng - self.lng).to_radians();
        let a = (d_phi / 2.0).sin().powi(2)
            + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_KM * c
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FishermanState {
    pub latitude: f64,
    pub longitude: f64,
    pub hour: u8,
    pub month: u8,
}

impl FishermanState {
    pub fn position(&self) -> LatLng {
        LatLng::new(self.latitude, self.longitude)
    }

    pub fn validate(&self) -> Result<(), GeoError> {
        check_coordinate(self.latitude, self.longitude)?;
        check_time(self.hour, self.month)
    }
}

/// Partial fisherman state; `None` keeps the prior value on merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FishermanUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hour: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u8>,
}

impl FishermanUpdate {
    pub fn position(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: Some(latitude),
            longitude: Some(longitude),
            ..Self::default()
        }
    }

    pub fn with_hour(mut self, hour: u8) -> Self {
        self.hour = Some(hour);
        self
    }

    pub fn with_month(mut self, month: u8) -> Self {
        self.month = Some(month);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.latitude.is_none()
            && self.longitude.is_none()
            && self.hour.is_none()
            && self.month.is_none()
    }

    /// Shallow merge onto `base`. Does not validate.
    pub fn merged_onto(&self, base: &FishermanState) -> FishermanState {
        FishermanState {
            latitude: self.latitude.unwrap_or(base.latitude),
            longitude: self.longitude.unwrap_or(base.longitude),
            hour: self.hour.unwrap_or(base.hour),
            month: self.month.unwrap_or(base.month),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskZone {
    pub latitude: f64,
    pub longitude: f64,
}

impl RiskZone {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn position(&self) -> LatLng {
        LatLng::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    #[error("invalid coordinate: latitude {latitude}, longitude {longitude}")]
    InvalidCoordinate { latitude: f64, longitude: f64 },
    #[error("invalid time context: {field} = {value}")]
    InvalidTime { field: &'static str, value: u8 },
}

/// Latitude must lie in [-90, 90] and longitude in [-180, 180]; NaN fails both.
pub fn check_coordinate(latitude: f64, longitude: f64) -> Result<(), GeoError> {
    if (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude) {
        Ok(())
    } else {
        Err(GeoError::InvalidCoordinate {
            latitude,
            longitude,
        })
    }
}

pub fn check_time(hour: u8, month: u8) -> Result<(), GeoError> {
    if hour > 23 {
        return Err(GeoError::InvalidTime {
            field: "hour",
            value: hour,
        });
    }
    if !(1..=12).contains(&month) {
        return Err(GeoError::InvalidTime {
            field: "month",
            value: month,
        });
    }
    Ok(())
}
