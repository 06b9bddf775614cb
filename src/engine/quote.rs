use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::pricing::{
    compute_price, round_currency, PriceRequest, PricingConfig, PricingPolicy,
};
use crate::error::AppError;
use crate::geo::{haversine_km, round_to_tenth};
use crate::models::geo::GeoPoint;
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub pickup: GeoPoint,
    pub dropoff: GeoPoint,
    pub vehicle_type_id: Uuid,
    pub weight_kg: Option<f64>,
    pub surge: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub distance_km: f64,
    pub base: f64,
    pub per_km: f64,
    pub subtotal: f64,
    pub vat: f64,
    pub vat_rate: f64,
    pub surge_multiplier: f64,
    pub total: f64,
    pub currency: String,
    pub quote_id: Uuid,
    pub vehicle_type_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Prices a prospective single-dropoff trip without storing anything.
pub async fn quote(
    state: &AppState,
    request: QuoteRequest,
    now: DateTime<Utc>,
) -> Result<Quote, AppError> {
    if !request.pickup.is_valid() || !request.dropoff.is_valid() {
        return Err(AppError::Validation("coordinates are out of range".to_string()));
    }

    let vehicle = state
        .store
        .vehicle_type(request.vehicle_type_id)
        .await?
        .ok_or_else(|| AppError::Configuration("Vehicle type unavailable".to_string()))?;
    let config = PricingConfig::from_vehicle(&vehicle)?;

    let distance_km = round_to_tenth(haversine_km(&request.pickup, &request.dropoff));
    let policy = PricingPolicy::new(state.settings.apply_vat).with_surge(request.surge);
    let price = compute_price(
        &config,
        PriceRequest {
            distance_km,
            total_stops: 1,
            is_multi_stop: false,
        },
        policy,
    )?;

    tracing::debug!(
        vehicle_type_id = %vehicle.id,
        distance_km,
        total = price.total,
        "quote computed"
    );

    Ok(Quote {
        distance_km,
        base: config.base_price,
        per_km: config.price_per_km,
        subtotal: round_currency(price.subtotal),
        vat: round_currency(price.vat),
        vat_rate: price.vat_rate,
        surge_multiplier: price.surge_multiplier,
        total: price.total,
        currency: state.settings.currency.clone(),
        quote_id: Uuid::new_v4(),
        vehicle_type_id: vehicle.id,
        expires_at: now + Duration::seconds(state.settings.quote_ttl_secs),
    })
}
