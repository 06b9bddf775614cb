use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::engine::pricing::{compute_price, PriceBreakdown, PriceRequest, PricingConfig, PricingPolicy};
use crate::engine::route::RoutePlan;
use crate::error::AppError;
use crate::models::delivery::{
    Contact, Delivery, DeliveryStatus, DeliveryStop, PackageDetails, PaymentReference, StopType,
};
use crate::models::geo::GeoPoint;
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationInput {
    pub address: String,
    pub location: GeoPoint,
    pub contact_name: String,
    pub contact_phone: String,
    pub instructions: Option<String>,
    pub package_description: Option<String>,
    pub package_weight: Option<f64>,
}

impl LocationInput {
    fn contact(&self) -> Contact {
        Contact {
            address: self.address.clone(),
            name: self.contact_name.clone(),
            phone: self.contact_phone.clone(),
            instructions: self.instructions.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageInput {
    pub description: Option<String>,
    pub weight_kg: Option<f64>,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInput {
    pub payment_by: Option<String>,
    pub payment_method: Option<String>,
    pub payment_status: Option<String>,
    pub checkout_id: Option<String>,
    pub payment_reference: Option<String>,
}

/// A booking with one or more dropoffs, in route order.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub vehicle_type_id: Uuid,
    pub pickup: LocationInput,
    pub dropoffs: Vec<LocationInput>,
    pub package: Option<PackageInput>,
    pub is_scheduled: bool,
    pub scheduled_pickup_time: Option<DateTime<Utc>>,
    pub payment: Option<PaymentInput>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingKind {
    Single,
    MultiStop,
}

impl BookingKind {
    fn label(&self) -> &'static str {
        match self {
            BookingKind::Single => "single",
            BookingKind::MultiStop => "multi_stop",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingReceipt {
    #[serde(flatten)]
    pub delivery: Delivery,
    pub stops: Vec<DeliveryStop>,
    pub pricing: PriceBreakdown,
}

impl BookingRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.dropoffs.is_empty() {
            return Err(AppError::Validation(
                "At least one dropoff stop is required".to_string(),
            ));
        }

        for (label, input) in std::iter::once(("pickup", &self.pickup))
            .chain(self.dropoffs.iter().map(|stop| ("dropoff", stop)))
        {
            if !input.location.is_valid() {
                return Err(AppError::Validation(format!(
                    "{label} coordinates are out of range"
                )));
            }
            if input.address.trim().is_empty() {
                return Err(AppError::Validation(format!("{label} address is required")));
            }
        }

        if self.is_scheduled && self.scheduled_pickup_time.is_none() {
            return Err(AppError::Validation(
                "scheduledPickupTime is required for scheduled deliveries".to_string(),
            ));
        }

        Ok(())
    }
}

/// Prices and stores a new delivery. Multi-stop bookings also write one stop
/// row per dropoff; if that fails the delivery row is deleted again.
pub async fn book_delivery(
    state: &AppState,
    request: BookingRequest,
    kind: BookingKind,
    now: DateTime<Utc>,
) -> Result<BookingReceipt, AppError> {
    request.validate()?;

    let store = state.store.as_ref();
    let vehicle = store
        .vehicle_type(request.vehicle_type_id)
        .await?
        .ok_or_else(|| AppError::Configuration("Vehicle type unavailable".to_string()))?;
    let pricing_config = PricingConfig::from_vehicle(&vehicle)?;

    let dropoff_points: Vec<GeoPoint> = request.dropoffs.iter().map(|d| d.location).collect();
    let route = RoutePlan::through(&request.pickup.location, &dropoff_points);
    let distance_km = route.rounded_total_km();

    let total_stops = u32::try_from(request.dropoffs.len())
        .map_err(|_| AppError::Validation("too many dropoff stops".to_string()))?;
    let is_multi_stop = total_stops > 1;

    let pricing = compute_price(
        &pricing_config,
        PriceRequest {
            distance_km,
            total_stops,
            is_multi_stop,
        },
        PricingPolicy::new(state.settings.apply_vat),
    )?;

    let first_dropoff = &request.dropoffs[0];
    let package = request.package.clone().unwrap_or_default();
    let payment = request.payment.clone().unwrap_or_default();

    let delivery = Delivery {
        id: Uuid::new_v4(),
        status: DeliveryStatus::Pending,
        vehicle_type_id: vehicle.id,
        pickup: request.pickup.location,
        pickup_contact: request.pickup.contact(),
        dropoff: first_dropoff.location,
        dropoff_contact: first_dropoff.contact(),
        package: PackageDetails {
            description: package.description.or_else(|| {
                (kind == BookingKind::MultiStop).then(|| "Multi-stop delivery".to_string())
            }),
            weight_kg: package.weight_kg,
            value: package.value,
        },
        driver_id: None,
        distance_km,
        total_price: pricing.total,
        is_multi_stop,
        total_stops,
        is_scheduled: request.is_scheduled,
        scheduled_pickup_time: request.scheduled_pickup_time.filter(|_| request.is_scheduled),
        payment: PaymentReference {
            payment_by: payment.payment_by,
            payment_method: payment.payment_method,
            payment_status: payment.payment_status.unwrap_or_else(|| "pending".to_string()),
            checkout_id: payment.checkout_id,
            reference: payment.payment_reference,
        },
        created_at: now,
        updated_at: now,
    };

    let delivery = store.insert_delivery(delivery).await?;

    let stops: Vec<DeliveryStop> = if kind == BookingKind::MultiStop || is_multi_stop {
        request
            .dropoffs
            .iter()
            .zip(route.segments_km.iter())
            .zip(1u32..)
            .map(|((input, leg_km), stop_number)| DeliveryStop {
                id: Uuid::new_v4(),
                delivery_id: delivery.id,
                stop_number,
                stop_type: StopType::Dropoff,
                location: input.location,
                contact: input.contact(),
                package_description: input.package_description.clone(),
                package_weight: input.package_weight,
                distance_from_previous_km: Some(*leg_km),
            })
            .collect()
    } else {
        Vec::new()
    };

    if !stops.is_empty() {
        if let Err(err) = store.insert_stops(stops.clone()).await {
            error!(delivery_id = %delivery.id, error = %err, "failed to create stops; rolling back delivery");
            if let Err(rollback_err) = store.delete_delivery(delivery.id).await {
                error!(
                    delivery_id = %delivery.id,
                    error = %rollback_err,
                    "rollback failed; delivery row is orphaned"
                );
            }
            return Err(AppError::Upstream(format!(
                "Failed to create delivery stops: {err}"
            )));
        }
    }

    state
        .metrics
        .bookings_total
        .with_label_values(&[kind.label()])
        .inc();

    info!(
        delivery_id = %delivery.id,
        stops = total_stops,
        distance_km,
        total_price = pricing.total,
        scheduled = delivery.is_scheduled,
        "delivery booked"
    );

    Ok(BookingReceipt {
        delivery,
        stops,
        pricing,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{DateTime, Duration, Utc};
    use uuid::Uuid;

    use super::{book_delivery, BookingKind, BookingRequest, LocationInput};
    use crate::error::AppError;
    use crate::models::delivery::{Delivery, DeliveryGuard, DeliveryStop, DeliveryUpdate};
    use crate::models::driver::DriverProfile;
    use crate::models::geo::GeoPoint;
    use crate::models::vehicle::VehicleType;
    use crate::store::{DeliveryStore, InMemoryStore, StoreError};
    use crate::test_support::{base_time, memory_state, state_with, vehicle};

    fn location(lat: f64, lng: f64) -> LocationInput {
        LocationInput {
            address: "1 Ayala Ave".to_string(),
            location: GeoPoint::new(lat, lng),
            contact_name: "Juan".to_string(),
            contact_phone: "+639170000000".to_string(),
            instructions: None,
            package_description: None,
            package_weight: None,
        }
    }

    fn request(vehicle_type_id: Uuid, dropoffs: Vec<LocationInput>) -> BookingRequest {
        BookingRequest {
            vehicle_type_id,
            pickup: location(14.55, 121.0),
            dropoffs,
            package: None,
            is_scheduled: false,
            scheduled_pickup_time: None,
            payment: None,
        }
    }

    /// Delegates to an in-memory store but refuses to write stops.
    struct StopsUnavailable(InMemoryStore);

    #[async_trait]
    impl DeliveryStore for StopsUnavailable {
        async fn delivery(&self, id: Uuid) -> Result<Option<Delivery>, StoreError> {
            self.0.delivery(id).await
        }
        async fn insert_delivery(&self, delivery: Delivery) -> Result<Delivery, StoreError> {
            self.0.insert_delivery(delivery).await
        }
        async fn delete_delivery(&self, id: Uuid) -> Result<(), StoreError> {
            self.0.delete_delivery(id).await
        }
        async fn update_delivery_where(
            &self,
            id: Uuid,
            guard: DeliveryGuard,
            update: DeliveryUpdate,
        ) -> Result<Option<Delivery>, StoreError> {
            self.0.update_delivery_where(id, guard, update).await
        }
        async fn scheduled_deliveries(
            &self,
            from: DateTime<Utc>,
            to: DateTime<Utc>,
        ) -> Result<Vec<Delivery>, StoreError> {
            self.0.scheduled_deliveries(from, to).await
        }
        async fn stops(&self, delivery_id: Uuid) -> Result<Vec<DeliveryStop>, StoreError> {
            self.0.stops(delivery_id).await
        }
        async fn insert_stops(&self, _stops: Vec<DeliveryStop>) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("delivery_stops table offline".to_string()))
        }
        async fn driver(&self, id: Uuid) -> Result<Option<DriverProfile>, StoreError> {
            self.0.driver(id).await
        }
        async fn list_drivers(&self) -> Result<Vec<DriverProfile>, StoreError> {
            self.0.list_drivers().await
        }
        async fn upsert_driver(&self, driver: DriverProfile) -> Result<DriverProfile, StoreError> {
            self.0.upsert_driver(driver).await
        }
        async fn set_driver_availability(
            &self,
            id: Uuid,
            available: bool,
        ) -> Result<Option<DriverProfile>, StoreError> {
            self.0.set_driver_availability(id, available).await
        }
        async fn candidate_drivers(&self, limit: usize) -> Result<Vec<DriverProfile>, StoreError> {
            self.0.candidate_drivers(limit).await
        }
        async fn vehicle_type(&self, id: Uuid) -> Result<Option<VehicleType>, StoreError> {
            self.0.vehicle_type(id).await
        }
        async fn list_vehicle_types(&self) -> Result<Vec<VehicleType>, StoreError> {
            self.0.list_vehicle_types().await
        }
        async fn upsert_vehicle_type(
            &self,
            vehicle: VehicleType,
        ) -> Result<VehicleType, StoreError> {
            self.0.upsert_vehicle_type(vehicle).await
        }
    }

    #[tokio::test]
    async fn zero_dropoffs_is_a_validation_error() {
        let (state, store) = memory_state();
        let vt = store.upsert_vehicle_type(vehicle(100.0, 10.0, 20.0)).await.unwrap();

        let result = book_delivery(
            &state,
            request(vt.id, Vec::new()),
            BookingKind::MultiStop,
            base_time(),
        )
        .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(store.delivery_count(), 0);
    }

    #[tokio::test]
    async fn single_booking_prices_pickup_to_dropoff() {
        let (state, store) = memory_state();
        let vt = store.upsert_vehicle_type(vehicle(100.0, 10.0, 20.0)).await.unwrap();

        let receipt = book_delivery(
            &state,
            request(vt.id, vec![location(14.595, 121.0)]),
            BookingKind::Single,
            base_time(),
        )
        .await
        .unwrap();

        assert_eq!(receipt.delivery.distance_km, 5.0);
        assert_eq!(receipt.delivery.total_price, 168.0);
        assert!(!receipt.delivery.is_multi_stop);
        assert_eq!(receipt.delivery.total_stops, 1);
        assert!(receipt.stops.is_empty());
        assert_eq!(store.delivery_count(), 1);
    }

    #[tokio::test]
    async fn multi_stop_booking_caches_leg_distances() {
        let (state, store) = memory_state();
        let vt = store.upsert_vehicle_type(vehicle(100.0, 10.0, 15.0)).await.unwrap();

        let receipt = book_delivery(
            &state,
            request(
                vt.id,
                vec![
                    location(14.595, 121.0),
                    location(14.64, 121.0),
                    location(14.685, 121.0),
                ],
            ),
            BookingKind::MultiStop,
            base_time(),
        )
        .await
        .unwrap();

        assert!(receipt.delivery.is_multi_stop);
        assert_eq!(receipt.delivery.total_stops, 3);
        assert_eq!(receipt.pricing.additional_stops, 2);
        assert_eq!(receipt.stops.len(), 3);
        let numbers: Vec<u32> = receipt.stops.iter().map(|s| s.stop_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!(receipt.stops.iter().all(|s| s.distance_from_previous_km.is_some()));

        let stored = store.stops(receipt.delivery.id).await.unwrap();
        assert_eq!(stored.len(), 3);
    }

    #[tokio::test]
    async fn failed_stop_insert_removes_the_delivery() {
        let failing = Arc::new(StopsUnavailable(InMemoryStore::new()));
        let state = state_with(failing.clone());
        let vt = failing
            .upsert_vehicle_type(vehicle(100.0, 10.0, 15.0))
            .await
            .unwrap();

        let result = book_delivery(
            &state,
            request(vt.id, vec![location(14.595, 121.0), location(14.64, 121.0)]),
            BookingKind::MultiStop,
            base_time(),
        )
        .await;

        assert!(matches!(result, Err(AppError::Upstream(_))));
        assert_eq!(failing.0.delivery_count(), 0);
    }

    #[tokio::test]
    async fn scheduled_booking_needs_a_pickup_time() {
        let (state, store) = memory_state();
        let vt = store.upsert_vehicle_type(vehicle(100.0, 10.0, 20.0)).await.unwrap();

        let mut missing_time = request(vt.id, vec![location(14.595, 121.0)]);
        missing_time.is_scheduled = true;
        let result = book_delivery(&state, missing_time, BookingKind::Single, base_time()).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let mut scheduled = request(vt.id, vec![location(14.595, 121.0)]);
        scheduled.is_scheduled = true;
        scheduled.scheduled_pickup_time = Some(base_time() + Duration::hours(2));
        let receipt = book_delivery(&state, scheduled, BookingKind::Single, base_time())
            .await
            .unwrap();
        assert!(receipt.delivery.is_scheduled);
    }

    #[tokio::test]
    async fn invalid_coordinates_are_rejected() {
        let (state, store) = memory_state();
        let vt = store.upsert_vehicle_type(vehicle(100.0, 10.0, 20.0)).await.unwrap();

        let result = book_delivery(
            &state,
            request(vt.id, vec![location(95.0, 121.0)]),
            BookingKind::Single,
            base_time(),
        )
        .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn unknown_vehicle_type_is_a_configuration_error() {
        let (state, _store) = memory_state();
        let result = book_delivery(
            &state,
            request(Uuid::new_v4(), vec![location(14.595, 121.0)]),
            BookingKind::Single,
            base_time(),
        )
        .await;
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }
}
