use std::cmp::Reverse;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::geo::rank_by_distance;
use crate::models::delivery::{
    Delivery, DeliveryGuard, DeliveryStatus, DeliveryStop, DeliveryUpdate,
};
use crate::models::driver::{DriverProfile, RankedDriver};
use crate::models::geo::GeoPoint;
use crate::models::vehicle::VehicleType;
use crate::store::{DeliveryStore, StoreError};

/// `DashMap`-backed store. Guarded updates hold the shard write lock for the
/// whole check-and-apply, so they are atomic with respect to each other.
#[derive(Default)]
pub struct InMemoryStore {
    deliveries: DashMap<Uuid, Delivery>,
    stops: DashMap<Uuid, Vec<DeliveryStop>>,
    drivers: DashMap<Uuid, DriverProfile>,
    vehicle_types: DashMap<Uuid, VehicleType>,
    geo_index: bool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that answers [`DeliveryStore::nearest_drivers`] itself.
    pub fn with_geo_index() -> Self {
        Self {
            geo_index: true,
            ..Self::default()
        }
    }

    pub fn delivery_count(&self) -> usize {
        self.deliveries.len()
    }

    fn eligible_by_freshness(&self) -> Vec<DriverProfile> {
        let mut drivers: Vec<DriverProfile> = self
            .drivers
            .iter()
            .filter(|entry| entry.value().is_matchable())
            .map(|entry| entry.value().clone())
            .collect();

        drivers.sort_by_key(|driver| (Reverse(driver.location_updated_at), driver.id));
        drivers
    }
}

#[async_trait]
impl DeliveryStore for InMemoryStore {
    async fn delivery(&self, id: Uuid) -> Result<Option<Delivery>, StoreError> {
        Ok(self.deliveries.get(&id).map(|entry| entry.value().clone()))
    }

    async fn insert_delivery(&self, delivery: Delivery) -> Result<Delivery, StoreError> {
        if self.deliveries.contains_key(&delivery.id) {
            return Err(StoreError::Conflict(format!(
                "delivery {} already exists",
                delivery.id
            )));
        }
        self.deliveries.insert(delivery.id, delivery.clone());
        Ok(delivery)
    }

    async fn delete_delivery(&self, id: Uuid) -> Result<(), StoreError> {
        self.deliveries.remove(&id);
        self.stops.remove(&id);
        Ok(())
    }

    async fn update_delivery_where(
        &self,
        id: Uuid,
        guard: DeliveryGuard,
        update: DeliveryUpdate,
    ) -> Result<Option<Delivery>, StoreError> {
        let Some(mut delivery) = self.deliveries.get_mut(&id) else {
            return Ok(None);
        };

        if !guard.matches(&delivery) {
            return Ok(None);
        }

        update.apply(&mut delivery);
        Ok(Some(delivery.clone()))
    }

    async fn scheduled_deliveries(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Delivery>, StoreError> {
        let mut due: Vec<Delivery> = self
            .deliveries
            .iter()
            .filter(|entry| {
                let delivery = entry.value();
                delivery.is_scheduled
                    && delivery.status == DeliveryStatus::Pending
                    && delivery.driver_id.is_none()
                    && delivery
                        .scheduled_pickup_time
                        .is_some_and(|at| at >= from && at <= to)
            })
            .map(|entry| entry.value().clone())
            .collect();

        due.sort_by_key(|delivery| delivery.scheduled_pickup_time);
        Ok(due)
    }

    async fn stops(&self, delivery_id: Uuid) -> Result<Vec<DeliveryStop>, StoreError> {
        let mut stops = self
            .stops
            .get(&delivery_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();
        stops.sort_by_key(|stop| stop.stop_number);
        Ok(stops)
    }

    async fn insert_stops(&self, stops: Vec<DeliveryStop>) -> Result<(), StoreError> {
        for stop in &stops {
            if !self.deliveries.contains_key(&stop.delivery_id) {
                return Err(StoreError::Conflict(format!(
                    "stop {} references unknown delivery {}",
                    stop.stop_number, stop.delivery_id
                )));
            }
        }

        for stop in stops {
            self.stops.entry(stop.delivery_id).or_default().push(stop);
        }
        Ok(())
    }

    async fn driver(&self, id: Uuid) -> Result<Option<DriverProfile>, StoreError> {
        Ok(self.drivers.get(&id).map(|entry| entry.value().clone()))
    }

    async fn list_drivers(&self) -> Result<Vec<DriverProfile>, StoreError> {
        Ok(self
            .drivers
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn upsert_driver(&self, driver: DriverProfile) -> Result<DriverProfile, StoreError> {
        self.drivers.insert(driver.id, driver.clone());
        Ok(driver)
    }

    async fn set_driver_availability(
        &self,
        id: Uuid,
        available: bool,
    ) -> Result<Option<DriverProfile>, StoreError> {
        Ok(self.drivers.get_mut(&id).map(|mut driver| {
            driver.is_available = available;
            driver.clone()
        }))
    }

    async fn candidate_drivers(&self, limit: usize) -> Result<Vec<DriverProfile>, StoreError> {
        let mut drivers = self.eligible_by_freshness();
        drivers.truncate(limit);
        Ok(drivers)
    }

    fn supports_geo_index(&self) -> bool {
        self.geo_index
    }

    async fn nearest_drivers(
        &self,
        pickup: &GeoPoint,
        limit: usize,
    ) -> Result<Vec<RankedDriver>, StoreError> {
        if !self.geo_index {
            return Err(StoreError::Unsupported("nearest_drivers"));
        }

        let mut ranked = rank_by_distance(pickup, self.eligible_by_freshness());
        ranked.truncate(limit);
        Ok(ranked)
    }

    async fn vehicle_type(&self, id: Uuid) -> Result<Option<VehicleType>, StoreError> {
        Ok(self.vehicle_types.get(&id).map(|entry| entry.value().clone()))
    }

    async fn list_vehicle_types(&self) -> Result<Vec<VehicleType>, StoreError> {
        Ok(self
            .vehicle_types
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn upsert_vehicle_type(&self, vehicle: VehicleType) -> Result<VehicleType, StoreError> {
        self.vehicle_types.insert(vehicle.id, vehicle.clone());
        Ok(vehicle)
    }
}
