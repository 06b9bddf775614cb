use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::geo::GeoPoint;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Searching,
    DriverOffered,
    DriverAssigned,
    Delivered,
    Cancelled,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Searching => "searching",
            DeliveryStatus::DriverOffered => "driver_offered",
            DeliveryStatus::DriverAssigned => "driver_assigned",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub address: String,
    pub name: String,
    pub phone: String,
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageDetails {
    pub description: Option<String>,
    pub weight_kg: Option<f64>,
    pub value: Option<f64>,
}

/// Payment references recorded at booking time. The gateway itself is an
/// external collaborator; the pairing core never reads these back.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentReference {
    pub payment_by: Option<String>,
    pub payment_method: Option<String>,
    pub payment_status: String,
    pub checkout_id: Option<String>,
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delivery {
    pub id: Uuid,
    pub status: DeliveryStatus,
    pub vehicle_type_id: Uuid,
    pub pickup: GeoPoint,
    pub pickup_contact: Contact,
    /// First dropoff. Multi-stop deliveries keep the full route in `DeliveryStop` rows.
    pub dropoff: GeoPoint,
    pub dropoff_contact: Contact,
    pub package: PackageDetails,
    pub driver_id: Option<Uuid>,
    pub distance_km: f64,
    pub total_price: f64,
    pub is_multi_stop: bool,
    pub total_stops: u32,
    pub is_scheduled: bool,
    pub scheduled_pickup_time: Option<DateTime<Utc>>,
    pub payment: PaymentReference,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StopType {
    Pickup,
    Dropoff,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryStop {
    pub id: Uuid,
    pub delivery_id: Uuid,
    /// 1-based, contiguous per delivery.
    pub stop_number: u32,
    pub stop_type: StopType,
    pub location: GeoPoint,
    pub contact: Contact,
    pub package_description: Option<String>,
    pub package_weight: Option<f64>,
    pub distance_from_previous_km: Option<f64>,
}

/// Predicate a guarded update must satisfy before it is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryGuard {
    pub status: DeliveryStatus,
    pub driver_id: Option<Uuid>,
}

impl DeliveryGuard {
    pub fn matches(&self, delivery: &Delivery) -> bool {
        delivery.status == self.status && delivery.driver_id == self.driver_id
    }
}

#[derive(Debug, Clone)]
pub struct DeliveryUpdate {
    pub status: DeliveryStatus,
    pub driver_id: Option<Uuid>,
    pub distance_km: Option<f64>,
    pub total_price: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

impl DeliveryUpdate {
    pub fn apply(&self, delivery: &mut Delivery) {
        delivery.status = self.status;
        delivery.driver_id = self.driver_id;
        if let Some(distance_km) = self.distance_km {
            delivery.distance_km = distance_km;
        }
        if let Some(total_price) = self.total_price {
            delivery.total_price = total_price;
        }
        delivery.updated_at = self.updated_at;
    }
}
