use tracing::{debug, warn};

use crate::error::AppError;
use crate::geo::rank_by_distance;
use crate::models::driver::RankedDriver;
use crate::models::geo::GeoPoint;
use crate::store::{DeliveryStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatorStrategy {
    /// The store ranks drivers with its own spatial index.
    GeoIndex,
    /// Fetch the freshest candidates and rank them in process.
    Haversine,
}

impl LocatorStrategy {
    pub fn for_store(store: &dyn DeliveryStore) -> Self {
        if store.supports_geo_index() {
            LocatorStrategy::GeoIndex
        } else {
            LocatorStrategy::Haversine
        }
    }
}

/// Eligible drivers ranked by distance to `pickup`, closest first. Fails with
/// [`AppError::NoDriversAvailable`] when nobody qualifies.
pub async fn locate_drivers(
    store: &dyn DeliveryStore,
    pickup: &GeoPoint,
    limit: usize,
) -> Result<Vec<RankedDriver>, AppError> {
    let strategy = LocatorStrategy::for_store(store);

    let mut ranked = match strategy {
        LocatorStrategy::GeoIndex => match store.nearest_drivers(pickup, limit).await {
            Ok(ranked) => ranked,
            Err(err @ (StoreError::Unsupported(_) | StoreError::Unavailable(_))) => {
                warn!(error = %err, "geo index query failed; ranking in process");
                rank_in_process(store, pickup, limit).await?
            }
            Err(err) => return Err(err.into()),
        },
        LocatorStrategy::Haversine => rank_in_process(store, pickup, limit).await?,
    };

    ranked.retain(|candidate| candidate.driver.is_matchable());

    debug!(
        strategy = ?strategy,
        candidates = ranked.len(),
        "drivers located"
    );

    if ranked.is_empty() {
        return Err(AppError::NoDriversAvailable);
    }

    Ok(ranked)
}

async fn rank_in_process(
    store: &dyn DeliveryStore,
    pickup: &GeoPoint,
    limit: usize,
) -> Result<Vec<RankedDriver>, AppError> {
    let candidates = store.candidate_drivers(limit).await?;
    Ok(rank_by_distance(pickup, candidates))
}

/// Returns the closest candidate if it lies within `max_radius_km`. A farther
/// driver is never offered in its place.
pub fn closest_within_radius(
    ranked: &[RankedDriver],
    max_radius_km: f64,
) -> Result<&RankedDriver, AppError> {
    let closest = ranked.first().ok_or(AppError::NoDriversAvailable)?;

    if closest.distance_km > max_radius_km {
        return Err(AppError::DriversTooFar {
            closest_km: closest.distance_km,
            max_radius_km,
        });
    }

    Ok(closest)
}
