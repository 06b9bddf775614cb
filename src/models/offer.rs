use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    pub delivery_id: Uuid,
    pub driver_id: Uuid,
    pub drivers_found: usize,
    pub closest_driver_distance: f64,
    pub distance_km: f64,
    pub total_price: f64,
    pub offered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OfferEventKind {
    Offered,
    Accepted,
    Declined,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferEvent {
    pub kind: OfferEventKind,
    pub delivery_id: Uuid,
    pub driver_id: Uuid,
    pub total_price: Option<f64>,
    pub at: DateTime<Utc>,
}
