use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Pricing configuration as stored. Fields are optional because the record is
/// maintained outside this service; see `engine::pricing::PricingConfig`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleType {
    pub id: Uuid,
    pub name: String,
    pub base_price: Option<f64>,
    pub price_per_km: Option<f64>,
    pub additional_stop_charge: Option<f64>,
    pub is_active: bool,
}
