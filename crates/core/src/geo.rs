//! Great-circle helpers and the local projection used for horizontal states.

use serde::{Deserialize, Serialize};

use crate::constants::EARTH_RADIUS_M;

/// Geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }
}

/// Great-circle distance between two points (m).
pub fn haversine_m(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.longitude - a.longitude).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Initial bearing from `a` to `b`, radians clockwise from north in `(-π, π]`.
pub fn bearing_rad(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();
    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    y.atan2(x)
}

/// Midpoint along the great circle joining two points.
pub fn midpoint(a: GeoPoint, b: GeoPoint) -> GeoPoint {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let lon1 = a.longitude.to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();
    let bx = lat2.cos() * dlon.cos();
    let by = lat2.cos() * dlon.sin();
    let lat = (lat1.sin() + lat2.sin()).atan2(((lat1.cos() + bx).powi(2) + by * by).sqrt());
    let lon = lon1 + by.atan2(lat1.cos() + bx);
    GeoPoint::new(lon.to_degrees(), lat.to_degrees())
}

/// Equirectangular projection centred on a reference point.
///
/// `x` grows eastward and `y` northward, both in metres. Distortion stays
/// small for regional routes when the reference is the route midpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalProjection {
    reference: GeoPoint,
    cos_reference_lat: f64,
}

impl LocalProjection {
    pub fn new(reference: GeoPoint) -> Self {
        Self {
            reference,
            cos_reference_lat: reference.latitude.to_radians().cos(),
        }
    }

    /// Projection centred on the great-circle midpoint of a route.
    pub fn for_route(origin: GeoPoint, destination: GeoPoint) -> Self {
        Self::new(midpoint(origin, destination))
    }

    pub fn reference(&self) -> GeoPoint {
        self.reference
    }

    /// Geographic point to projected `(x, y)` metres.
    pub fn project(&self, point: GeoPoint) -> (f64, f64) {
        let x = EARTH_RADIUS_M
            * (point.longitude - self.reference.longitude).to_radians()
            * self.cos_reference_lat;
        let y = EARTH_RADIUS_M * (point.latitude - self.reference.latitude).to_radians();
        (x, y)
    }

    /// Projected `(x, y)` metres back to a geographic point.
    pub fn unproject(&self, x_m: f64, y_m: f64) -> GeoPoint {
        let longitude =
            self.reference.longitude + (x_m / (EARTH_RADIUS_M * self.cos_reference_lat)).to_degrees();
        let latitude = self.reference.latitude + (y_m / EARTH_RADIUS_M).to_degrees();
        GeoPoint::new(longitude, latitude)
    }
}
