//! Fixtures shared by the unit tests.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use crate::config::PairingSettings;
use crate::models::delivery::{
    Contact, Delivery, DeliveryStatus, DeliveryStop, PackageDetails, PaymentReference, StopType,
};
use crate::models::driver::DriverProfile;
use crate::models::geo::GeoPoint;
use crate::models::vehicle::VehicleType;
use crate::state::AppState;
use crate::store::{DeliveryStore, InMemoryStore};

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 14, 8, 0, 0).unwrap()
}

pub fn contact(label: &str) -> Contact {
    Contact {
        address: format!("{label} street"),
        name: label.to_string(),
        phone: "+639170000000".to_string(),
        instructions: None,
    }
}

/// An online, available, verified driver whose location was last reported
/// `minutes_ago` minutes before [`base_time`].
pub fn driver_at(seed: u128, location: Option<GeoPoint>, minutes_ago: i64) -> DriverProfile {
    DriverProfile {
        id: Uuid::from_u128(seed),
        name: format!("driver-{seed}"),
        is_online: true,
        is_available: true,
        is_verified: true,
        location,
        location_updated_at: Some(base_time() - Duration::minutes(minutes_ago)),
    }
}

pub fn vehicle(base: f64, per_km: f64, per_stop: f64) -> VehicleType {
    VehicleType {
        id: Uuid::new_v4(),
        name: "motorcycle".to_string(),
        base_price: Some(base),
        price_per_km: Some(per_km),
        additional_stop_charge: Some(per_stop),
        is_active: true,
    }
}

pub fn delivery_at(pickup: GeoPoint, dropoff: GeoPoint) -> Delivery {
    Delivery {
        id: Uuid::new_v4(),
        status: DeliveryStatus::Pending,
        vehicle_type_id: Uuid::nil(),
        pickup,
        pickup_contact: contact("sender"),
        dropoff,
        dropoff_contact: contact("recipient"),
        package: PackageDetails::default(),
        driver_id: None,
        distance_km: 0.0,
        total_price: 0.0,
        is_multi_stop: false,
        total_stops: 1,
        is_scheduled: false,
        scheduled_pickup_time: None,
        payment: PaymentReference::default(),
        created_at: base_time(),
        updated_at: base_time(),
    }
}

pub fn stops_for(delivery_id: Uuid, locations: &[GeoPoint]) -> Vec<DeliveryStop> {
    locations
        .iter()
        .enumerate()
        .map(|(index, location)| DeliveryStop {
            id: Uuid::new_v4(),
            delivery_id,
            stop_number: index as u32 + 1,
            stop_type: StopType::Dropoff,
            location: *location,
            contact: contact(&format!("stop-{}", index + 1)),
            package_description: None,
            package_weight: None,
            distance_from_previous_km: None,
        })
        .collect()
}

pub fn state_with(store: Arc<dyn DeliveryStore>) -> AppState {
    AppState::new(store, PairingSettings::default(), 64)
}

pub fn memory_state() -> (AppState, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    (state_with(store.clone()), store)
}
