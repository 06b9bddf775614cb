use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::delivery::{DeliveryGuard, DeliveryStatus, DeliveryUpdate};
use crate::models::driver::RankedDriver;
use crate::models::offer::{Offer, OfferEvent, OfferEventKind};
use crate::state::AppState;
use crate::store::DeliveryStore;

/// What the pairing core wants written for an offer.
#[derive(Debug, Clone, Copy)]
pub struct OfferDraft<'a> {
    pub candidate: &'a RankedDriver,
    pub drivers_found: usize,
    pub distance_km: f64,
    pub total_price: f64,
}

/// Moves a delivery from `pending` to `driver_offered` with a guarded update.
/// Loses cleanly to any concurrent writer: if the row is no longer pending and
/// driverless, nothing is written and a state conflict is returned.
pub async fn write_offer(
    store: &dyn DeliveryStore,
    delivery_id: Uuid,
    draft: OfferDraft<'_>,
    now: DateTime<Utc>,
) -> Result<Offer, AppError> {
    let driver_id = draft.candidate.driver.id;
    let guard = DeliveryGuard {
        status: DeliveryStatus::Pending,
        driver_id: None,
    };
    let update = DeliveryUpdate {
        status: DeliveryStatus::DriverOffered,
        driver_id: Some(driver_id),
        distance_km: Some(draft.distance_km),
        total_price: Some(draft.total_price),
        updated_at: now,
    };

    let Some(updated) = store
        .update_delivery_where(delivery_id, guard, update)
        .await?
    else {
        warn!(delivery_id = %delivery_id, "offer lost to a concurrent update");
        return Err(AppError::StateConflict(
            "Delivery was already handled by another request".to_string(),
        ));
    };

    info!(
        delivery_id = %updated.id,
        driver_id = %driver_id,
        distance_km = draft.distance_km,
        total_price = draft.total_price,
        "driver offered"
    );

    Ok(Offer {
        delivery_id: updated.id,
        driver_id,
        drivers_found: draft.drivers_found,
        closest_driver_distance: draft.candidate.distance_km,
        distance_km: draft.distance_km,
        total_price: draft.total_price,
        offered_at: now,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferDecision {
    Accepted,
    Declined,
}

#[derive(Debug, Clone, Serialize)]
pub struct OfferResponse {
    pub delivery_id: Uuid,
    pub driver_id: Uuid,
    pub decision: OfferDecision,
    pub status: DeliveryStatus,
}

/// Applies a driver's answer to an outstanding offer.
pub async fn respond_to_offer(
    state: &AppState,
    delivery_id: Uuid,
    driver_id: Uuid,
    accept: bool,
    now: DateTime<Utc>,
) -> Result<OfferResponse, AppError> {
    let store = state.store.as_ref();

    let delivery = store
        .delivery(delivery_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("delivery {delivery_id} not found")))?;

    let guard = DeliveryGuard {
        status: DeliveryStatus::DriverOffered,
        driver_id: Some(driver_id),
    };
    if !guard.matches(&delivery) {
        return Err(not_offered_to(driver_id));
    }

    let (update, decision) = if accept {
        (
            DeliveryUpdate {
                status: DeliveryStatus::DriverAssigned,
                driver_id: Some(driver_id),
                distance_km: None,
                total_price: None,
                updated_at: now,
            },
            OfferDecision::Accepted,
        )
    } else {
        (
            DeliveryUpdate {
                status: DeliveryStatus::Pending,
                driver_id: None,
                distance_km: None,
                total_price: None,
                updated_at: now,
            },
            OfferDecision::Declined,
        )
    };

    let updated = store
        .update_delivery_where(delivery_id, guard, update)
        .await?
        .ok_or_else(|| not_offered_to(driver_id))?;

    if decision == OfferDecision::Accepted {
        // The assignment stands even if the availability flag cannot be cleared.
        match store.set_driver_availability(driver_id, false).await {
            Ok(Some(_)) => {}
            Ok(None) => warn!(driver_id = %driver_id, "accepting driver has no profile"),
            Err(err) => error!(
                driver_id = %driver_id,
                delivery_id = %delivery_id,
                error = %err,
                "failed to mark driver unavailable"
            ),
        }
    }

    info!(
        delivery_id = %delivery_id,
        driver_id = %driver_id,
        decision = ?decision,
        "offer answered"
    );

    let (label, kind) = match decision {
        OfferDecision::Accepted => ("accepted", OfferEventKind::Accepted),
        OfferDecision::Declined => ("declined", OfferEventKind::Declined),
    };
    state
        .metrics
        .offer_responses_total
        .with_label_values(&[label])
        .inc();
    state.publish(OfferEvent {
        kind,
        delivery_id,
        driver_id,
        total_price: Some(updated.total_price),
        at: now,
    });

    Ok(OfferResponse {
        delivery_id,
        driver_id,
        decision,
        status: updated.status,
    })
}

fn not_offered_to(driver_id: Uuid) -> AppError {
    warn!(driver_id = %driver_id, "offer response for a delivery not offered to this driver");
    AppError::StateConflict(
        "Delivery is no longer available or not offered to this driver".to_string(),
    )
}
