// src/geo.rs

//! Nearest-ward resolution.
//!
//! A submission's coordinates are matched against every ward centroid and
//! the closest one wins. There is no distance cutoff: a point far outside
//! the service area still resolves to *some* ward, so intake never fails on
//! location. Only an empty ward table yields the "Unknown" sentinel.

use crate::models::{ResolvedLocation, WardLocation};

pub const UNKNOWN_DISTRICT: &str = "Unknown District";
pub const UNKNOWN_WARD: &str = "Unknown Ward";

const EARTH_RADIUS_KM: f64 = 6371.0088;

impl ResolvedLocation {
    pub fn unknown() -> Self {
        Self {
            district_name: UNKNOWN_DISTRICT.to_string(),
            ward_no: UNKNOWN_WARD.to_string(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.district_name == UNKNOWN_DISTRICT && self.ward_no == UNKNOWN_WARD
    }
}

/// Great-circle distance in kilometres.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Returns the ward closest to the point. Ties go to the lowest ward id so the
/// answer does not depend on the order the wards were loaded in.
pub fn nearest_ward(wards: &[WardLocation], latitude: f64, longitude: f64) -> Option<&WardLocation> {
    wards
        .iter()
        .map(|w| (haversine_km(latitude, longitude, w.latitude, w.longitude), w))
        .min_by(|(da, a), (db, b)| da.total_cmp(db).then(a.ward_id.cmp(&b.ward_id)))
        .map(|(_, w)| w)
}

pub fn resolve(wards: &[WardLocation], latitude: f64, longitude: f64) -> ResolvedLocation {
    match nearest_ward(wards, latitude, longitude) {
        Some(w) => ResolvedLocation {
            district_name: w.district_name.clone(),
            ward_no: w.ward_no.to_string(),
        },
        None => ResolvedLocation::unknown(),
    }
}
