use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{success, JsonBody, PathId, Success};
use crate::engine::booking::{
    book_delivery, BookingKind, BookingReceipt, BookingRequest, LocationInput, PackageInput,
    PaymentInput,
};
use crate::engine::quote::{quote, Quote, QuoteRequest};
use crate::error::AppError;
use crate::models::delivery::{Delivery, DeliveryStop};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/book_delivery", post(book_single))
        .route("/book_multi_stop_delivery", post(book_multi_stop))
        .route("/quote", post(create_quote))
        .route("/deliveries/:id", get(get_delivery))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDeliveryBody {
    pub vehicle_type_id: Option<Uuid>,
    pub pickup: LocationInput,
    pub dropoff: LocationInput,
    pub package: Option<PackageInput>,
    #[serde(default)]
    pub is_scheduled: bool,
    pub scheduled_pickup_time: Option<DateTime<Utc>>,
    pub payment: Option<PaymentInput>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookMultiStopBody {
    pub vehicle_type_id: Option<Uuid>,
    pub pickup: LocationInput,
    #[serde(default)]
    pub dropoff_stops: Vec<LocationInput>,
    pub package: Option<PackageInput>,
    #[serde(default)]
    pub is_scheduled: bool,
    pub scheduled_pickup_time: Option<DateTime<Utc>>,
    pub payment: Option<PaymentInput>,
}

#[derive(Serialize)]
pub struct DeliveryDetails {
    delivery: Delivery,
    stops: Vec<DeliveryStop>,
}

fn require_vehicle_type(id: Option<Uuid>) -> Result<Uuid, AppError> {
    id.ok_or_else(|| AppError::Validation("vehicleTypeId is required".to_string()))
}

async fn book_single(
    State(state): State<Arc<AppState>>,
    payload: JsonBody<BookDeliveryBody>,
) -> Result<Json<Success<BookingReceipt>>, AppError> {
    let Json(payload) = payload?;
    let request = BookingRequest {
        vehicle_type_id: require_vehicle_type(payload.vehicle_type_id)?,
        pickup: payload.pickup,
        dropoffs: vec![payload.dropoff],
        package: payload.package,
        is_scheduled: payload.is_scheduled,
        scheduled_pickup_time: payload.scheduled_pickup_time,
        payment: payload.payment,
    };

    let receipt = book_delivery(&state, request, BookingKind::Single, Utc::now()).await?;
    Ok(success(receipt))
}

async fn book_multi_stop(
    State(state): State<Arc<AppState>>,
    payload: JsonBody<BookMultiStopBody>,
) -> Result<Json<Success<BookingReceipt>>, AppError> {
    let Json(payload) = payload?;
    let request = BookingRequest {
        vehicle_type_id: require_vehicle_type(payload.vehicle_type_id)?,
        pickup: payload.pickup,
        dropoffs: payload.dropoff_stops,
        package: payload.package,
        is_scheduled: payload.is_scheduled,
        scheduled_pickup_time: payload.scheduled_pickup_time,
        payment: payload.payment,
    };

    let receipt = book_delivery(&state, request, BookingKind::MultiStop, Utc::now()).await?;
    Ok(success(receipt))
}

async fn create_quote(
    State(state): State<Arc<AppState>>,
    payload: JsonBody<QuoteRequest>,
) -> Result<Json<Success<Quote>>, AppError> {
    let Json(payload) = payload?;
    let quote = quote(&state, payload, Utc::now()).await?;
    Ok(success(quote))
}

async fn get_delivery(
    State(state): State<Arc<AppState>>,
    id: PathId,
) -> Result<Json<Success<DeliveryDetails>>, AppError> {
    let Path(id) = id?;
    let delivery = state
        .store
        .delivery(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("delivery {id} not found")))?;
    let stops = state.store.stops(id).await?;

    Ok(success(DeliveryDetails { delivery, stops }))
}
