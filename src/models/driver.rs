use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::geo::GeoPoint;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverProfile {
    pub id: Uuid,
    pub name: String,
    pub is_online: bool,
    pub is_available: bool,
    pub is_verified: bool,
    pub location: Option<GeoPoint>,
    pub location_updated_at: Option<DateTime<Utc>>,
}

impl DriverProfile {
    pub fn is_matchable(&self) -> bool {
        self.is_online && self.is_available && self.is_verified && self.location.is_some()
    }
}

/// A matching candidate together with its great-circle distance to the pickup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedDriver {
    pub driver: DriverProfile,
    pub distance_km: f64,
}
