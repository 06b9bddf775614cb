use crate::models::driver::{DriverProfile, RankedDriver};
use crate::models::geo::GeoPoint;

const EARTH_RADIUS_KM: f64 = 6_371.0;

pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lng = (delta_lng / 2.0).sin();

    let haversine = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lng * sin_lng;
    // Rounding can push `haversine` a hair above 1 for antipodal points.
    let central_angle = 2.0 * haversine.clamp(0.0, 1.0).sqrt().asin();

    EARTH_RADIUS_KM * central_angle
}

/// Distance of each leg of `origin -> stops[0] -> stops[1] -> ...`.
pub fn route_segments_km(origin: &GeoPoint, stops: &[GeoPoint]) -> Vec<f64> {
    let mut current = origin;
    stops
        .iter()
        .map(|stop| {
            let leg = haversine_km(current, stop);
            current = stop;
            leg
        })
        .collect()
}

pub fn route_distance_km(origin: &GeoPoint, stops: &[GeoPoint]) -> f64 {
    route_segments_km(origin, stops).iter().sum()
}

/// Rounds to one decimal place, half away from zero.
pub fn round_to_tenth(km: f64) -> f64 {
    (km * 10.0).round() / 10.0
}

/// Computes the distance from `pickup` to every driver with a known location
/// and sorts ascending. The sort is stable, so drivers at equal distance keep
/// the order they were given in.
pub fn rank_by_distance(pickup: &GeoPoint, drivers: Vec<DriverProfile>) -> Vec<RankedDriver> {
    let mut ranked: Vec<RankedDriver> = drivers
        .into_iter()
        .filter_map(|driver| {
            let location = driver.location?;
            Some(RankedDriver {
                distance_km: haversine_km(pickup, &location),
                driver,
            })
        })
        .collect();

    ranked.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    ranked
}
