use prometheus::{Encoder, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub pairing_attempts_total: IntCounterVec,
    pub pairing_latency_seconds: HistogramVec,
    pub offer_responses_total: IntCounterVec,
    pub bookings_total: IntCounterVec,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let pairing_attempts_total = IntCounterVec::new(
            Opts::new("pairing_attempts_total", "Pairing attempts by outcome"),
            &["outcome"],
        )
        .expect("valid pairing_attempts_total metric");

        let pairing_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "pairing_latency_seconds",
                "Latency of a pairing attempt in seconds",
            ),
            &["outcome"],
        )
        .expect("valid pairing_latency_seconds metric");

        let offer_responses_total = IntCounterVec::new(
            Opts::new("offer_responses_total", "Driver responses to offers"),
            &["decision"],
        )
        .expect("valid offer_responses_total metric");

        let bookings_total = IntCounterVec::new(
            Opts::new("bookings_total", "Deliveries booked by kind"),
            &["kind"],
        )
        .expect("valid bookings_total metric");

        registry
            .register(Box::new(pairing_attempts_total.clone()))
            .expect("register pairing_attempts_total");
        registry
            .register(Box::new(pairing_latency_seconds.clone()))
            .expect("register pairing_latency_seconds");
        registry
            .register(Box::new(offer_responses_total.clone()))
            .expect("register offer_responses_total");
        registry
            .register(Box::new(bookings_total.clone()))
            .expect("register bookings_total");

        Self {
            registry,
            pairing_attempts_total,
            pairing_latency_seconds,
            offer_responses_total,
            bookings_total,
        }
    }

    pub fn record_pairing(&self, outcome: &str, elapsed_secs: f64) {
        self.pairing_attempts_total
            .with_label_values(&[outcome])
            .inc();
        self.pairing_latency_seconds
            .with_label_values(&[outcome])
            .observe(elapsed_secs);
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
