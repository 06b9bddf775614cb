use serde::Serialize;

use crate::error::AppError;
use crate::models::vehicle::VehicleType;

/// Value-added tax applied on top of the surged subtotal.
pub const VAT_RATE: f64 = 0.12;

/// Smallest amount ever charged.
pub const MINIMUM_TOTAL: f64 = 1.0;

/// Pricing figures read from a vehicle type at the moment of pricing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingConfig {
    pub base_price: f64,
    pub price_per_km: f64,
    pub additional_stop_charge: Option<f64>,
}

impl PricingConfig {
    pub fn from_vehicle(vehicle: &VehicleType) -> Result<Self, AppError> {
        if !vehicle.is_active {
            return Err(AppError::Configuration(format!(
                "vehicle type {} is not active",
                vehicle.id
            )));
        }

        let base_price = vehicle.base_price.ok_or_else(|| {
            AppError::Configuration(format!("vehicle type {} has no base price", vehicle.id))
        })?;
        let price_per_km = vehicle.price_per_km.ok_or_else(|| {
            AppError::Configuration(format!("vehicle type {} has no per-km price", vehicle.id))
        })?;

        Ok(Self {
            base_price,
            price_per_km,
            additional_stop_charge: vehicle.additional_stop_charge,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingPolicy {
    pub apply_vat: bool,
    pub surge_multiplier: f64,
}

impl PricingPolicy {
    pub fn new(apply_vat: bool) -> Self {
        Self {
            apply_vat,
            surge_multiplier: 1.0,
        }
    }

    /// Non-positive or missing multipliers mean no surge.
    pub fn with_surge(mut self, surge: Option<f64>) -> Self {
        self.surge_multiplier = match surge {
            Some(multiplier) if multiplier > 0.0 => multiplier,
            _ => 1.0,
        };
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceBreakdown {
    pub distance_km: f64,
    pub base_price: f64,
    pub distance_cost: f64,
    pub additional_stops: u32,
    pub multi_stop_fee: f64,
    pub subtotal: f64,
    pub surge_multiplier: f64,
    pub vat_rate: f64,
    pub vat: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct PriceRequest {
    pub distance_km: f64,
    pub total_stops: u32,
    pub is_multi_stop: bool,
}

pub fn compute_price(
    config: &PricingConfig,
    request: PriceRequest,
    policy: PricingPolicy,
) -> Result<PriceBreakdown, AppError> {
    let additional_stops = if request.is_multi_stop {
        request.total_stops.saturating_sub(1)
    } else {
        0
    };

    let multi_stop_fee = if additional_stops == 0 {
        0.0
    } else {
        let charge = config.additional_stop_charge.ok_or_else(|| {
            AppError::Configuration("vehicle type has no additional stop charge".to_string())
        })?;
        f64::from(additional_stops) * charge
    };

    let distance_cost = config.price_per_km * request.distance_km;
    let subtotal = config.base_price + distance_cost + multi_stop_fee;
    let surged = subtotal * policy.surge_multiplier;

    let vat_rate = if policy.apply_vat { VAT_RATE } else { 0.0 };
    let vat = surged * vat_rate;
    let total = round_currency(surged + vat).max(MINIMUM_TOTAL);

    Ok(PriceBreakdown {
        distance_km: request.distance_km,
        base_price: config.base_price,
        distance_cost,
        additional_stops,
        multi_stop_fee,
        subtotal,
        surge_multiplier: policy.surge_multiplier,
        vat_rate,
        vat,
        total,
    })
}

/// Rounds to two decimal places, half away from zero.
pub fn round_currency(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
