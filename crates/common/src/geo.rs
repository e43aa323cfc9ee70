//! Geodesy helpers for attendance verification.
//!
//! Distances use the haversine great-circle formula on a spherical earth.
//! The error against the ellipsoid is well under one percent, which is far
//! below the accuracy of a consumer GPS fix.
//!
//! # Examples
//!
//! ```
//! use logbook_common::geo::{Coordinates, SiteClassification, classify, distance_meters};
//!
//! let office = Coordinates::new(40.7128, -74.0060).unwrap();
//! let distance = distance_meters(office, office);
//! assert_eq!(distance, 0.0);
//! assert_eq!(classify(distance, 100.0), SiteClassification::OnSite);
//! ```

use serde::{Deserialize, Serialize};

use crate::{AppError, AppResult};

/// Mean earth radius in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A validated latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    /// Latitude, -90..=90.
    pub latitude: f64,
    /// Longitude, -180..=180.
    pub longitude: f64,
}

impl Coordinates {
    /// Build a coordinate pair, rejecting values outside the valid ranges.
    pub fn new(latitude: f64, longitude: f64) -> AppResult<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(AppError::Validation(format!(
                "latitude out of range: {latitude}"
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(AppError::Validation(format!(
                "longitude out of range: {longitude}"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// Whether a position lies inside the geofence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteClassification {
    /// Within the radius.
    OnSite,
    /// Outside the radius.
    OffSite,
}

/// Great-circle distance between two points in meters.
#[must_use]
pub fn distance_meters(a: Coordinates, b: Coordinates) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    // Rounding can push h marginally past 1 for antipodal points.
    let c = 2.0 * h.clamp(0.0, 1.0).sqrt().asin();

    (EARTH_RADIUS_METERS * c).max(0.0)
}

/// Classify a distance against a geofence radius. The boundary is on-site.
#[must_use]
pub fn classify(distance_meters: f64, threshold_meters: f64) -> SiteClassification {
    if distance_meters <= threshold_meters {
        SiteClassification::OnSite
    } else {
        SiteClassification::OffSite
    }
}

/// Human readable distance: whole meters below 1 km, one decimal km above.
#[must_use]
pub fn format_distance(distance_meters: f64) -> String {
    if distance_meters < 1000.0 {
        format!("{}m", distance_meters.round() as i64)
    } else {
        format!("{:.1}km", distance_meters / 1000.0)
    }
}

/// Coordinates rendered with six decimals, used when no address is known.
#[must_use]
pub fn format_coordinates(coordinates: Coordinates) -> String {
    format!("{:.6}, {:.6}", coordinates.latitude, coordinates.longitude)
}
