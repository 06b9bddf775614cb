use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::time::{interval, Duration as TickInterval, MissedTickBehavior};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::engine::pairing::{pair_delivery, PairingOutcome};
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct SweepResult {
    pub delivery_id: Uuid,
    pub scheduled_time: Option<DateTime<Utc>>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepSummary {
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<SweepResult>,
    pub checked_at: DateTime<Utc>,
}

/// Pairs every scheduled delivery whose pickup falls within the next
/// `window_minutes`, one after another.
pub async fn run_scheduled_sweep(
    state: &AppState,
    window_minutes: i64,
    now: DateTime<Utc>,
) -> Result<SweepSummary, AppError> {
    let window_end = now + Duration::minutes(window_minutes);
    let due = state.store.scheduled_deliveries(now, window_end).await?;

    info!(
        found = due.len(),
        window_start = %now,
        window_end = %window_end,
        "scheduled sweep"
    );

    let mut results = Vec::with_capacity(due.len());
    for delivery in &due {
        let result = match pair_delivery(state, delivery.id, now).await {
            Ok(PairingOutcome::Offered(offer)) => SweepResult {
                delivery_id: delivery.id,
                scheduled_time: delivery.scheduled_pickup_time,
                success: true,
                message: None,
                driver_id: Some(offer.driver_id),
            },
            Ok(PairingOutcome::TooEarly(hold)) => SweepResult {
                delivery_id: delivery.id,
                scheduled_time: delivery.scheduled_pickup_time,
                success: false,
                message: Some(format!(
                    "assignment opens in {} minutes",
                    hold.minutes_until_assignment
                )),
                driver_id: None,
            },
            Err(err) => {
                warn!(delivery_id = %delivery.id, error = %err, "scheduled pairing failed");
                SweepResult {
                    delivery_id: delivery.id,
                    scheduled_time: delivery.scheduled_pickup_time,
                    success: false,
                    message: Some(err.to_string()),
                    driver_id: None,
                }
            }
        };
        results.push(result);
    }

    let successful = results.iter().filter(|result| result.success).count();
    let summary = SweepSummary {
        processed: results.len(),
        successful,
        failed: results.len() - successful,
        results,
        checked_at: now,
    };

    info!(
        processed = summary.processed,
        successful = summary.successful,
        failed = summary.failed,
        "scheduled sweep complete"
    );

    Ok(summary)
}

/// Runs the sweep on a fixed interval until the process exits.
pub async fn run_scheduler(state: Arc<AppState>, interval_secs: u64, window_minutes: i64) {
    info!(interval_secs, window_minutes, "scheduler started");

    let mut ticker = interval(TickInterval::from_secs(interval_secs.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if let Err(err) = run_scheduled_sweep(&state, window_minutes, Utc::now()).await {
            error!(error = %err, "scheduled sweep failed");
        }
    }
}
