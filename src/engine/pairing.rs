//! Driver-delivery pairing.
//!
//! One pass runs the scheduling gate, locates and ranks drivers around the
//! pickup, enforces the matching radius, measures the route, prices it with
//! the vehicle type current at this moment, and writes the offer with a
//! guarded update. Nothing is retained between calls; retries belong to the
//! caller (the scheduled sweep or the booking client).

use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::config::PairingSettings;
use crate::engine::locator::{closest_within_radius, locate_drivers};
use crate::engine::offers::{write_offer, OfferDraft};
use crate::engine::pricing::{compute_price, PriceRequest, PricingConfig, PricingPolicy};
use crate::engine::route::delivery_distance_km;
use crate::engine::scheduling::{check_schedule, GateDecision, ScheduleHold};
use crate::error::AppError;
use crate::models::delivery::DeliveryStatus;
use crate::models::offer::{Offer, OfferEvent, OfferEventKind};
use crate::state::AppState;
use crate::store::DeliveryStore;

#[derive(Debug, Clone)]
pub enum PairingOutcome {
    Offered(Offer),
    TooEarly(ScheduleHold),
}

impl PairingOutcome {
    fn label(&self) -> &'static str {
        match self {
            PairingOutcome::Offered(_) => "offered",
            PairingOutcome::TooEarly(_) => "too_early",
        }
    }
}

pub async fn pair_delivery(
    state: &AppState,
    delivery_id: Uuid,
    now: DateTime<Utc>,
) -> Result<PairingOutcome, AppError> {
    let start = Instant::now();
    let result = pair(state.store.as_ref(), &state.settings, delivery_id, now).await;

    let outcome = match &result {
        Ok(outcome) => outcome.label(),
        Err(err) => err.outcome_label(),
    };
    state
        .metrics
        .record_pairing(outcome, start.elapsed().as_secs_f64());

    if let Ok(PairingOutcome::Offered(offer)) = &result {
        state.publish(OfferEvent {
            kind: OfferEventKind::Offered,
            delivery_id: offer.delivery_id,
            driver_id: offer.driver_id,
            total_price: Some(offer.total_price),
            at: offer.offered_at,
        });
    }

    result
}

async fn pair(
    store: &dyn DeliveryStore,
    settings: &PairingSettings,
    delivery_id: Uuid,
    now: DateTime<Utc>,
) -> Result<PairingOutcome, AppError> {
    let delivery = store
        .delivery(delivery_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("delivery {delivery_id} not found")))?;

    if delivery.status != DeliveryStatus::Pending || delivery.driver_id.is_some() {
        info!(
            delivery_id = %delivery_id,
            status = delivery.status.as_str(),
            "delivery already handled; skipping pairing"
        );
        return Err(AppError::StateConflict(format!(
            "Delivery is already {} and cannot be paired",
            delivery.status.as_str()
        )));
    }

    if let GateDecision::TooEarly(hold) =
        check_schedule(&delivery, now, settings.schedule_lead_minutes)
    {
        info!(
            delivery_id = %delivery_id,
            minutes_until_assignment = hold.minutes_until_assignment,
            "scheduled delivery not yet due for pairing"
        );
        return Ok(PairingOutcome::TooEarly(hold));
    }

    let ranked = locate_drivers(store, &delivery.pickup, settings.candidate_limit).await?;
    let closest = closest_within_radius(&ranked, settings.max_radius_km)?;

    let stops = if delivery.is_multi_stop {
        store.stops(delivery_id).await?
    } else {
        Vec::new()
    };
    let distance_km = delivery_distance_km(&delivery, &stops)?;

    let vehicle = store
        .vehicle_type(delivery.vehicle_type_id)
        .await?
        .ok_or_else(|| {
            AppError::Configuration(format!(
                "vehicle type {} not found",
                delivery.vehicle_type_id
            ))
        })?;
    let pricing = PricingConfig::from_vehicle(&vehicle)?;
    let price = compute_price(
        &pricing,
        PriceRequest {
            distance_km,
            total_stops: delivery.total_stops,
            is_multi_stop: delivery.is_multi_stop,
        },
        PricingPolicy::new(settings.apply_vat),
    )?;

    let offer = write_offer(
        store,
        delivery_id,
        OfferDraft {
            candidate: closest,
            drivers_found: ranked.len(),
            distance_km,
            total_price: price.total,
        },
        now,
    )
    .await?;

    Ok(PairingOutcome::Offered(offer))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;
    use uuid::Uuid;

    use super::{pair_delivery, PairingOutcome};
    use crate::error::AppError;
    use crate::models::delivery::{Delivery, DeliveryStatus};
    use crate::models::geo::GeoPoint;
    use crate::store::{DeliveryStore, InMemoryStore};
    use crate::test_support::{
        base_time, delivery_at, driver_at, memory_state, state_with, stops_for, vehicle,
    };

    const PICKUP: GeoPoint = GeoPoint {
        lat: 14.55,
        lng: 121.0,
    };

    async fn seeded_delivery(store: &InMemoryStore, dropoff: GeoPoint) -> Delivery {
        let vt = store.upsert_vehicle_type(vehicle(100.0, 10.0, 20.0)).await.unwrap();
        let mut delivery = delivery_at(PICKUP, dropoff);
        delivery.vehicle_type_id = vt.id;
        store.insert_delivery(delivery).await.unwrap()
    }

    #[tokio::test]
    async fn offers_the_closest_driver_with_a_priced_route() {
        let (state, store) = memory_state();
        let delivery = seeded_delivery(&store, GeoPoint::new(14.595, 121.0)).await;
        store
            .upsert_driver(driver_at(1, Some(GeoPoint::new(14.56, 121.0)), 0))
            .await
            .unwrap();
        store
            .upsert_driver(driver_at(2, Some(GeoPoint::new(14.551, 121.0)), 0))
            .await
            .unwrap();

        let outcome = pair_delivery(&state, delivery.id, base_time()).await.unwrap();
        let PairingOutcome::Offered(offer) = outcome else {
            panic!("expected an offer");
        };

        assert_eq!(offer.driver_id, Uuid::from_u128(2));
        assert_eq!(offer.drivers_found, 2);
        // 0.045 degrees of latitude is ~5.0 km
        assert_eq!(offer.distance_km, 5.0);
        assert_eq!(offer.total_price, 168.0);

        let stored = store.delivery(delivery.id).await.unwrap().unwrap();
        assert_eq!(stored.status, DeliveryStatus::DriverOffered);
        assert_eq!(stored.driver_id, Some(Uuid::from_u128(2)));
        assert_eq!(stored.total_price, 168.0);
        assert!(store.driver(Uuid::from_u128(2)).await.unwrap().unwrap().is_available);
    }

    #[tokio::test]
    async fn second_invocation_is_a_no_op_rejection() {
        let (state, store) = memory_state();
        let delivery = seeded_delivery(&store, GeoPoint::new(14.595, 121.0)).await;
        store
            .upsert_driver(driver_at(1, Some(GeoPoint::new(14.551, 121.0)), 0))
            .await
            .unwrap();
        store
            .upsert_driver(driver_at(2, Some(GeoPoint::new(14.552, 121.0)), 0))
            .await
            .unwrap();

        let first = pair_delivery(&state, delivery.id, base_time()).await.unwrap();
        assert!(matches!(first, PairingOutcome::Offered(_)));

        let second = pair_delivery(&state, delivery.id, base_time()).await;
        assert!(matches!(second, Err(AppError::StateConflict(_))));

        let stored = store.delivery(delivery.id).await.unwrap().unwrap();
        assert_eq!(stored.driver_id, Some(Uuid::from_u128(1)));
    }

    #[tokio::test]
    async fn scheduled_delivery_waits_for_its_window() {
        let (state, store) = memory_state();
        let vt = store.upsert_vehicle_type(vehicle(100.0, 10.0, 20.0)).await.unwrap();
        store
            .upsert_driver(driver_at(1, Some(GeoPoint::new(14.551, 121.0)), 0))
            .await
            .unwrap();

        let mut later = delivery_at(PICKUP, GeoPoint::new(14.595, 121.0));
        later.vehicle_type_id = vt.id;
        later.is_scheduled = true;
        later.scheduled_pickup_time = Some(base_time() + Duration::minutes(20));
        let later = store.insert_delivery(later).await.unwrap();

        let mut soon = delivery_at(PICKUP, GeoPoint::new(14.595, 121.0));
        soon.vehicle_type_id = vt.id;
        soon.is_scheduled = true;
        soon.scheduled_pickup_time = Some(base_time() + Duration::minutes(10));
        let soon = store.insert_delivery(soon).await.unwrap();

        match pair_delivery(&state, later.id, base_time()).await.unwrap() {
            PairingOutcome::TooEarly(hold) => assert_eq!(hold.minutes_until_assignment, 5),
            PairingOutcome::Offered(_) => panic!("scheduled delivery paired too early"),
        }
        let untouched = store.delivery(later.id).await.unwrap().unwrap();
        assert_eq!(untouched.status, DeliveryStatus::Pending);

        let outcome = pair_delivery(&state, soon.id, base_time()).await.unwrap();
        assert!(matches!(outcome, PairingOutcome::Offered(_)));
    }

    #[tokio::test]
    async fn no_eligible_drivers_is_reported() {
        let (state, store) = memory_state();
        let delivery = seeded_delivery(&store, GeoPoint::new(14.595, 121.0)).await;
        let mut offline = driver_at(1, Some(GeoPoint::new(14.551, 121.0)), 0);
        offline.is_online = false;
        store.upsert_driver(offline).await.unwrap();

        let result = pair_delivery(&state, delivery.id, base_time()).await;
        assert!(matches!(result, Err(AppError::NoDriversAvailable)));
    }

    #[tokio::test]
    async fn drivers_outside_the_radius_are_not_offered() {
        let (state, store) = memory_state();
        let delivery = seeded_delivery(&store, GeoPoint::new(14.595, 121.0)).await;
        // ~11 km north of the pickup
        store
            .upsert_driver(driver_at(1, Some(GeoPoint::new(14.65, 121.0)), 0))
            .await
            .unwrap();

        match pair_delivery(&state, delivery.id, base_time()).await {
            Err(AppError::DriversTooFar {
                closest_km,
                max_radius_km,
            }) => {
                assert!(closest_km > 11.0 && closest_km < 11.3);
                assert_eq!(max_radius_km, 6.0);
            }
            other => panic!("expected DriversTooFar, got {other:?}"),
        }

        let stored = store.delivery(delivery.id).await.unwrap().unwrap();
        assert_eq!(stored.status, DeliveryStatus::Pending);
        assert!(stored.driver_id.is_none());
    }

    #[tokio::test]
    async fn inactive_vehicle_type_fails_without_an_offer() {
        let (state, store) = memory_state();
        let mut vt = vehicle(100.0, 10.0, 20.0);
        vt.is_active = false;
        let vt = store.upsert_vehicle_type(vt).await.unwrap();
        let mut delivery = delivery_at(PICKUP, GeoPoint::new(14.595, 121.0));
        delivery.vehicle_type_id = vt.id;
        let delivery = store.insert_delivery(delivery).await.unwrap();
        store
            .upsert_driver(driver_at(1, Some(GeoPoint::new(14.551, 121.0)), 0))
            .await
            .unwrap();

        let result = pair_delivery(&state, delivery.id, base_time()).await;
        assert!(matches!(result, Err(AppError::Configuration(_))));
        let stored = store.delivery(delivery.id).await.unwrap().unwrap();
        assert_eq!(stored.status, DeliveryStatus::Pending);
    }

    #[tokio::test]
    async fn multi_stop_delivery_is_priced_per_extra_stop() {
        let (state, store) = memory_state();
        let vt = store.upsert_vehicle_type(vehicle(100.0, 10.0, 15.0)).await.unwrap();
        let mut delivery = delivery_at(PICKUP, GeoPoint::new(14.6, 121.0));
        delivery.vehicle_type_id = vt.id;
        delivery.is_multi_stop = true;
        delivery.total_stops = 3;
        let delivery = store.insert_delivery(delivery).await.unwrap();

        let mut stops = stops_for(
            delivery.id,
            &[
                GeoPoint::new(14.6, 121.0),
                GeoPoint::new(14.65, 121.0),
                GeoPoint::new(14.7, 121.0),
            ],
        );
        for (stop, cached) in stops.iter_mut().zip([5.0, 7.0, 8.0]) {
            stop.distance_from_previous_km = Some(cached);
        }
        store.insert_stops(stops).await.unwrap();
        store
            .upsert_driver(driver_at(1, Some(GeoPoint::new(14.551, 121.0)), 0))
            .await
            .unwrap();

        let PairingOutcome::Offered(offer) =
            pair_delivery(&state, delivery.id, base_time()).await.unwrap()
        else {
            panic!("expected an offer");
        };
        assert_eq!(offer.distance_km, 20.0);
        assert_eq!(offer.total_price, 369.6);
    }

    #[tokio::test]
    async fn geo_indexed_store_pairs_the_same_way() {
        let store = Arc::new(InMemoryStore::with_geo_index());
        let state = state_with(store.clone());
        let delivery = seeded_delivery(&store, GeoPoint::new(14.595, 121.0)).await;
        store
            .upsert_driver(driver_at(1, Some(GeoPoint::new(14.56, 121.0)), 0))
            .await
            .unwrap();
        store
            .upsert_driver(driver_at(2, Some(GeoPoint::new(14.551, 121.0)), 0))
            .await
            .unwrap();

        let PairingOutcome::Offered(offer) =
            pair_delivery(&state, delivery.id, base_time()).await.unwrap()
        else {
            panic!("expected an offer");
        };
        assert_eq!(offer.driver_id, Uuid::from_u128(2));
    }

    #[tokio::test]
    async fn unknown_delivery_is_not_found() {
        let (state, _store) = memory_state();
        let result = pair_delivery(&state, Uuid::new_v4(), base_time()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
