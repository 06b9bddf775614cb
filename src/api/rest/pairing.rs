use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::JsonBody;
use crate::engine::offers::{respond_to_offer, OfferDecision};
use crate::engine::pairing::{pair_delivery, PairingOutcome};
use crate::engine::scheduler::run_scheduled_sweep;
use crate::error::AppError;
use crate::models::delivery::DeliveryStatus;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/pair_driver", post(pair_driver))
        .route("/accept_delivery", post(accept_delivery))
        .route("/assign_scheduled_drivers", post(assign_scheduled_drivers))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairDriverRequest {
    pub delivery_id: Option<Uuid>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptDeliveryRequest {
    pub delivery_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
    pub accept: Option<bool>,
}

#[derive(Serialize)]
struct OfferedResponse {
    ok: bool,
    delivery_id: Uuid,
    offered_driver_id: Uuid,
    drivers_found: usize,
    closest_driver_distance: f64,
    status: DeliveryStatus,
    distance_km: f64,
    total_price: f64,
}

#[derive(Serialize)]
struct ScheduledHoldResponse {
    ok: bool,
    scheduled: bool,
    message: String,
    minutes_until_assignment: i64,
    scheduled_pickup_time: DateTime<Utc>,
    assignment_time: DateTime<Utc>,
}

#[derive(Serialize)]
struct OfferAnswerResponse {
    ok: bool,
    message: &'static str,
    delivery_id: Uuid,
    status: DeliveryStatus,
}

async fn pair_driver(
    State(state): State<Arc<AppState>>,
    payload: JsonBody<PairDriverRequest>,
) -> Result<Response, AppError> {
    let Json(payload) = payload?;
    let delivery_id = payload
        .delivery_id
        .ok_or_else(|| AppError::Validation("Missing deliveryId".to_string()))?;

    let response = match pair_delivery(&state, delivery_id, Utc::now()).await? {
        PairingOutcome::Offered(offer) => Json(OfferedResponse {
            ok: true,
            delivery_id: offer.delivery_id,
            offered_driver_id: offer.driver_id,
            drivers_found: offer.drivers_found,
            closest_driver_distance: offer.closest_driver_distance,
            status: DeliveryStatus::DriverOffered,
            distance_km: offer.distance_km,
            total_price: offer.total_price,
        })
        .into_response(),
        PairingOutcome::TooEarly(hold) => Json(ScheduledHoldResponse {
            ok: false,
            scheduled: true,
            message: format!(
                "Too early to assign driver. Assignment will happen {} minutes before pickup.",
                state.settings.schedule_lead_minutes
            ),
            minutes_until_assignment: hold.minutes_until_assignment,
            scheduled_pickup_time: hold.scheduled_pickup_time,
            assignment_time: hold.assignment_time,
        })
        .into_response(),
    };

    Ok(response)
}

async fn accept_delivery(
    State(state): State<Arc<AppState>>,
    payload: JsonBody<AcceptDeliveryRequest>,
) -> Result<Json<OfferAnswerResponse>, AppError> {
    let Json(payload) = payload?;
    let (Some(delivery_id), Some(driver_id), Some(accept)) =
        (payload.delivery_id, payload.driver_id, payload.accept)
    else {
        return Err(AppError::Validation(
            "deliveryId, driverId and accept are required".to_string(),
        ));
    };

    let response = respond_to_offer(&state, delivery_id, driver_id, accept, Utc::now()).await?;

    let message = match response.decision {
        OfferDecision::Accepted => "Delivery accepted",
        OfferDecision::Declined => "Delivery declined",
    };

    Ok(Json(OfferAnswerResponse {
        ok: true,
        message,
        delivery_id: response.delivery_id,
        status: response.status,
    }))
}

async fn assign_scheduled_drivers(
    State(state): State<Arc<AppState>>,
) -> Result<Response, AppError> {
    let summary =
        run_scheduled_sweep(&state, state.scheduler.window_minutes, Utc::now()).await?;

    if summary.processed == 0 {
        return Ok(Json(json!({
            "ok": true,
            "message": "No deliveries to assign",
            "found": 0,
            "checked_at": summary.checked_at,
        }))
        .into_response());
    }

    Ok(super::success(summary).into_response())
}
