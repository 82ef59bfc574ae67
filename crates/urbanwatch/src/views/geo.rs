//! Great-circle distance between reports and the current position.

use crate::model::{Report, ReportLocation};
use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the haversine formula, in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A bare latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl From<&ReportLocation> for Coordinates {
    fn from(location: &ReportLocation) -> Self {
        Self::new(location.latitude, location.longitude)
    }
}

/// Unrounded haversine distance in kilometres.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let rlat1 = lat1.to_radians();
    let rlat2 = lat2.to_radians();
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2) + rlat1.cos() * rlat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Distance between two points, rounded to one decimal place.
///
/// Every distance shown or compared anywhere goes through this function, so the
/// radius filter and the nearest sort agree with what is displayed.
pub fn distance_km(from: Coordinates, to: Coordinates) -> f64 {
    let raw = haversine_km(from.latitude, from.longitude, to.latitude, to.longitude);
    (raw * 10.0).round() / 10.0
}

/// Distance from `origin` to a report, or `None` when the report has no location.
pub fn report_distance(report: &Report, origin: Coordinates) -> Option<f64> {
    report
        .location
        .as_ref()
        .map(|location| distance_km(origin, Coordinates::from(location)))
}
