use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub transitions_total: IntCounterVec,
    pub assignments_total: IntCounterVec,
    pub promotions_total: IntCounterVec,
    pub messages_total: IntCounter,
    pub drivers_available: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let transitions_total = IntCounterVec::new(
            Opts::new("transitions_total", "Order stage transitions by outcome"),
            &["outcome"],
        )
        .expect("valid transitions_total metric");

        let assignments_total = IntCounterVec::new(
            Opts::new("assignments_total", "Driver assignments by outcome"),
            &["outcome"],
        )
        .expect("valid assignments_total metric");

        let promotions_total = IntCounterVec::new(
            Opts::new("promotions_total", "Scheduled order promotions by outcome"),
            &["outcome"],
        )
        .expect("valid promotions_total metric");

        let messages_total =
            IntCounter::new("messages_total", "Chat messages appended across all threads")
                .expect("valid messages_total metric");

        let drivers_available =
            IntGauge::new("drivers_available", "Drivers currently dispatchable")
                .expect("valid drivers_available metric");

        registry
            .register(Box::new(transitions_total.clone()))
            .expect("register transitions_total");
        registry
            .register(Box::new(assignments_total.clone()))
            .expect("register assignments_total");
        registry
            .register(Box::new(promotions_total.clone()))
            .expect("register promotions_total");
        registry
            .register(Box::new(messages_total.clone()))
            .expect("register messages_total");
        registry
            .register(Box::new(drivers_available.clone()))
            .expect("register drivers_available");

        Self {
            registry,
            transitions_total,
            assignments_total,
            promotions_total,
            messages_total,
            drivers_available,
        }
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

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
