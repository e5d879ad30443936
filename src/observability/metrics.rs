use prometheus::{
    Encoder, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub grabs_total: IntCounterVec,
    pub transitions_total: IntCounterVec,
    pub pool_entries: IntGauge,
    pub grab_latency_seconds: HistogramVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let grabs_total = IntCounterVec::new(
            Opts::new("grabs_total", "Grab attempts by outcome"),
            &["outcome"],
        )
        .expect("valid grabs_total metric");

        let transitions_total = IntCounterVec::new(
            Opts::new("transitions_total", "Delivery transitions by target and outcome"),
            &["target", "outcome"],
        )
        .expect("valid transitions_total metric");

        let pool_entries = IntGauge::new("pool_entries", "Current number of unclaimed pool entries")
            .expect("valid pool_entries metric");

        let grab_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "grab_latency_seconds",
                "Latency of grab resolution in seconds",
            ),
            &["outcome"],
        )
        .expect("valid grab_latency_seconds metric");

        registry
            .register(Box::new(grabs_total.clone()))
            .expect("register grabs_total");
        registry
            .register(Box::new(transitions_total.clone()))
            .expect("register transitions_total");
        registry
            .register(Box::new(pool_entries.clone()))
            .expect("register pool_entries");
        registry
            .register(Box::new(grab_latency_seconds.clone()))
            .expect("register grab_latency_seconds");

        Self {
            registry,
            grabs_total,
            transitions_total,
            pool_entries,
            grab_latency_seconds,
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
