use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{patch, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::{success, JsonBody, PathId, Success};
use crate::error::AppError;
use crate::models::driver::DriverProfile;
use crate::models::geo::GeoPoint;
use crate::models::vehicle::VehicleType;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/drivers", post(create_driver).get(list_drivers))
        .route("/drivers/:id/status", patch(update_driver_status))
        .route("/drivers/:id/location", patch(update_driver_location))
        .route("/vehicle_types", post(create_vehicle_type).get(list_vehicle_types))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDriverRequest {
    pub name: String,
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub is_online: bool,
    #[serde(default)]
    pub is_available: bool,
    #[serde(default)]
    pub is_verified: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub is_online: Option<bool>,
    pub is_available: Option<bool>,
    pub is_verified: Option<bool>,
}

#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub location: GeoPoint,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVehicleTypeRequest {
    pub id: Option<Uuid>,
    pub name: String,
    pub base_price: Option<f64>,
    pub price_per_km: Option<f64>,
    pub additional_stop_charge: Option<f64>,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
}

fn active_by_default() -> bool {
    true
}

#[derive(Serialize)]
pub struct DriverList {
    drivers: Vec<DriverProfile>,
}

#[derive(Serialize)]
pub struct VehicleTypeList {
    vehicle_types: Vec<VehicleType>,
}

fn check_location(location: &GeoPoint) -> Result<(), AppError> {
    if location.is_valid() {
        Ok(())
    } else {
        Err(AppError::Validation("location coordinates are out of range".to_string()))
    }
}

async fn create_driver(
    State(state): State<Arc<AppState>>,
    payload: JsonBody<CreateDriverRequest>,
) -> Result<Json<Success<DriverProfile>>, AppError> {
    let Json(payload) = payload?;
    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }
    if let Some(location) = &payload.location {
        check_location(location)?;
    }

    let driver = DriverProfile {
        id: Uuid::new_v4(),
        name: payload.name,
        is_online: payload.is_online,
        is_available: payload.is_available,
        is_verified: payload.is_verified,
        location_updated_at: payload.location.map(|_| Utc::now()),
        location: payload.location,
    };

    let driver = state.store.upsert_driver(driver).await?;
    info!(driver_id = %driver.id, "driver registered");
    Ok(success(driver))
}

async fn list_drivers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Success<DriverList>>, AppError> {
    let drivers = state.store.list_drivers().await?;
    Ok(success(DriverList { drivers }))
}

async fn load_driver(state: &AppState, id: Uuid) -> Result<DriverProfile, AppError> {
    state
        .store
        .driver(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("driver {id} not found")))
}

async fn update_driver_status(
    State(state): State<Arc<AppState>>,
    id: PathId,
    payload: JsonBody<UpdateStatusRequest>,
) -> Result<Json<Success<DriverProfile>>, AppError> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let mut driver = load_driver(&state, id).await?;

    if let Some(is_online) = payload.is_online {
        driver.is_online = is_online;
    }
    if let Some(is_available) = payload.is_available {
        driver.is_available = is_available;
    }
    if let Some(is_verified) = payload.is_verified {
        driver.is_verified = is_verified;
    }

    let driver = state.store.upsert_driver(driver).await?;
    Ok(success(driver))
}

async fn update_driver_location(
    State(state): State<Arc<AppState>>,
    id: PathId,
    payload: JsonBody<UpdateLocationRequest>,
) -> Result<Json<Success<DriverProfile>>, AppError> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    check_location(&payload.location)?;
    let mut driver = load_driver(&state, id).await?;

    driver.location = Some(payload.location);
    driver.location_updated_at = Some(Utc::now());

    let driver = state.store.upsert_driver(driver).await?;
    Ok(success(driver))
}

async fn create_vehicle_type(
    State(state): State<Arc<AppState>>,
    payload: JsonBody<CreateVehicleTypeRequest>,
) -> Result<Json<Success<VehicleType>>, AppError> {
    let Json(payload) = payload?;
    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }
    let negative = [payload.base_price, payload.price_per_km, payload.additional_stop_charge]
        .into_iter()
        .flatten()
        .any(|price| !price.is_finite() || price < 0.0);
    if negative {
        return Err(AppError::Validation("prices must be non-negative".to_string()));
    }

    let vehicle = VehicleType {
        id: payload.id.unwrap_or_else(Uuid::new_v4),
        name: payload.name,
        base_price: payload.base_price,
        price_per_km: payload.price_per_km,
        additional_stop_charge: payload.additional_stop_charge,
        is_active: payload.is_active,
    };

    let vehicle = state.store.upsert_vehicle_type(vehicle).await?;
    Ok(success(vehicle))
}

async fn list_vehicle_types(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Success<VehicleTypeList>>, AppError> {
    let vehicle_types = state.store.list_vehicle_types().await?;
    Ok(success(VehicleTypeList { vehicle_types }))
}
