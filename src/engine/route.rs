use crate::error::AppError;
use crate::geo::{haversine_km, round_to_tenth, route_segments_km};
use crate::models::delivery::{Delivery, DeliveryStop};
use crate::models::geo::GeoPoint;

#[derive(Debug, Clone, PartialEq)]
pub struct RoutePlan {
    /// Leg lengths, `segments_km[i]` ends at dropoff `i`.
    pub segments_km: Vec<f64>,
    pub total_km: f64,
}

impl RoutePlan {
    pub fn through(pickup: &GeoPoint, dropoffs: &[GeoPoint]) -> Self {
        let segments_km = route_segments_km(pickup, dropoffs);
        let total_km = segments_km.iter().sum();
        Self {
            segments_km,
            total_km,
        }
    }

    pub fn rounded_total_km(&self) -> f64 {
        round_to_tenth(self.total_km)
    }
}

/// Route length of a delivery at offer time, rounded to 0.1 km.
///
/// Multi-stop deliveries reuse the per-stop distances cached at booking when
/// every stop has one, and otherwise walk pickup -> stop 1 -> ... -> stop N.
pub fn delivery_distance_km(delivery: &Delivery, stops: &[DeliveryStop]) -> Result<f64, AppError> {
    if !delivery.is_multi_stop {
        return Ok(round_to_tenth(haversine_km(&delivery.pickup, &delivery.dropoff)));
    }

    if stops.len() != delivery.total_stops as usize {
        return Err(AppError::Internal(format!(
            "delivery {} expects {} stops but {} are stored",
            delivery.id,
            delivery.total_stops,
            stops.len()
        )));
    }

    let cached: Option<f64> = stops
        .iter()
        .map(|stop| stop.distance_from_previous_km)
        .sum();

    let total_km = match cached {
        Some(total_km) => total_km,
        None => {
            let locations: Vec<GeoPoint> = stops.iter().map(|stop| stop.location).collect();
            RoutePlan::through(&delivery.pickup, &locations).total_km
        }
    };

    Ok(round_to_tenth(total_km))
}
