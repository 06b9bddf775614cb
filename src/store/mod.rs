//! Storage collaborator.
//!
//! The pairing core only ever talks to storage through [`DeliveryStore`]:
//! filtered selects, inserts, and single-row updates guarded by a predicate.
//! The guarded update is the compare-and-swap that keeps two concurrent
//! pairing calls from offering the same delivery twice.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::delivery::{Delivery, DeliveryGuard, DeliveryStop, DeliveryUpdate};
use crate::models::driver::{DriverProfile, RankedDriver};
use crate::models::geo::GeoPoint;
use crate::models::vehicle::VehicleType;

pub use memory::InMemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("operation not supported: {0}")]
    Unsupported(&'static str),

    #[error("conflict: {0}")]
    Conflict(String),
}

#[async_trait]
pub trait DeliveryStore: Send + Sync {
    async fn delivery(&self, id: Uuid) -> Result<Option<Delivery>, StoreError>;

    async fn insert_delivery(&self, delivery: Delivery) -> Result<Delivery, StoreError>;

    async fn delete_delivery(&self, id: Uuid) -> Result<(), StoreError>;

    /// Applies `update` only if the current row satisfies `guard`. Returns the
    /// updated row, or `None` when the row is missing or the guard failed.
    async fn update_delivery_where(
        &self,
        id: Uuid,
        guard: DeliveryGuard,
        update: DeliveryUpdate,
    ) -> Result<Option<Delivery>, StoreError>;

    /// Scheduled, pending, driverless deliveries with a pickup time in `[from, to]`.
    async fn scheduled_deliveries(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Delivery>, StoreError>;

    /// Stops ordered by `stop_number`.
    async fn stops(&self, delivery_id: Uuid) -> Result<Vec<DeliveryStop>, StoreError>;

    async fn insert_stops(&self, stops: Vec<DeliveryStop>) -> Result<(), StoreError>;

    async fn driver(&self, id: Uuid) -> Result<Option<DriverProfile>, StoreError>;

    async fn list_drivers(&self) -> Result<Vec<DriverProfile>, StoreError>;

    async fn upsert_driver(&self, driver: DriverProfile) -> Result<DriverProfile, StoreError>;

    async fn set_driver_availability(
        &self,
        id: Uuid,
        available: bool,
    ) -> Result<Option<DriverProfile>, StoreError>;

    /// Up to `limit` online, available, verified drivers with a known
    /// location, most recently updated location first.
    async fn candidate_drivers(&self, limit: usize) -> Result<Vec<DriverProfile>, StoreError>;

    fn supports_geo_index(&self) -> bool {
        false
    }

    /// Nearest eligible drivers to `pickup`, answered by the store's own
    /// spatial index.
    async fn nearest_drivers(
        &self,
        _pickup: &GeoPoint,
        _limit: usize,
    ) -> Result<Vec<RankedDriver>, StoreError> {
        Err(StoreError::Unsupported("nearest_drivers"))
    }

    async fn vehicle_type(&self, id: Uuid) -> Result<Option<VehicleType>, StoreError>;

    async fn list_vehicle_types(&self) -> Result<Vec<VehicleType>, StoreError>;

    async fn upsert_vehicle_type(&self, vehicle: VehicleType) -> Result<VehicleType, StoreError>;
}
