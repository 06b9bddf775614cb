use std::sync::Arc;

use tokio::sync::broadcast;

use crate::config::{PairingSettings, SchedulerSettings};
use crate::models::offer::OfferEvent;
use crate::observability::metrics::Metrics;
use crate::store::DeliveryStore;

pub struct AppState {
    pub store: Arc<dyn DeliveryStore>,
    pub settings: PairingSettings,
    pub scheduler: SchedulerSettings,
    pub api_token: Option<String>,
    pub offer_events_tx: broadcast::Sender<OfferEvent>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(
        store: Arc<dyn DeliveryStore>,
        settings: PairingSettings,
        event_buffer_size: usize,
    ) -> Self {
        let (offer_events_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        Self {
            store,
            settings,
            scheduler: SchedulerSettings::default(),
            api_token: None,
            offer_events_tx,
            metrics: Metrics::new(),
        }
    }

    pub fn with_scheduler(mut self, scheduler: SchedulerSettings) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn with_api_token(mut self, token: Option<String>) -> Self {
        self.api_token = token;
        self
    }

    /// Publishes to `/ws` subscribers. Having no subscribers is normal.
    pub fn publish(&self, event: OfferEvent) {
        if let Err(err) = self.offer_events_tx.send(event) {
            tracing::debug!(
                delivery_id = %err.0.delivery_id,
                "no offer event subscribers"
            );
        }
    }
}
