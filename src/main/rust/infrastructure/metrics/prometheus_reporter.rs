use lazy_static::lazy_static;
use prometheus::{Encoder, GaugeVec, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};

use crate::domain::ports::MetricsReporter;
use crate::domain::value_objects::OutputState;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Output state (0=Unused, 1=Offline, 2=Connecting, 3=Online, 4=Error)
    pub static ref OUTPUT_STATE: IntGaugeVec = IntGaugeVec::new(
        Opts::new("output_state", "Current output state"),
        &["service"]
    ).expect("metric can be created");

    // Start commands issued by the user
    pub static ref START_ATTEMPTS: IntCounterVec = IntCounterVec::new(
        Opts::new("output_start_attempts_total", "Total number of start attempts"),
        &["service"]
    ).expect("metric can be created");

    // Starts rejected or failed before the handle was running
    pub static ref START_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new("output_start_failures_total", "Total number of failed starts"),
        &["service"]
    ).expect("metric can be created");

    // Reconnecting signals raised by the transport
    pub static ref RECONNECTS: IntCounterVec = IntCounterVec::new(
        Opts::new("output_reconnects_total", "Total number of transport reconnects"),
        &["service"]
    ).expect("metric can be created");

    // Time since the output went online
    pub static ref ONLINE_SECONDS: GaugeVec = GaugeVec::new(
        Opts::new("output_online_seconds", "Time since the output went online"),
        &["service"]
    ).expect("metric can be created");
}

pub struct PrometheusReporter;

impl PrometheusReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn init_metrics() -> Result<(), prometheus::Error> {
        REGISTRY.register(Box::new(OUTPUT_STATE.clone()))?;
        REGISTRY.register(Box::new(START_ATTEMPTS.clone()))?;
        REGISTRY.register(Box::new(START_FAILURES.clone()))?;
        REGISTRY.register(Box::new(RECONNECTS.clone()))?;
        REGISTRY.register(Box::new(ONLINE_SECONDS.clone()))?;
        Ok(())
    }

    pub fn gather_metrics() -> Vec<u8> {
        let encoder = TextEncoder::new();
        let metric_families = REGISTRY.gather();
        let mut buffer = vec![];
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::error!("Failed to encode metrics: {}", e);
            return b"# Error encoding metrics\n".to_vec();
        }
        buffer
    }
}

impl Default for PrometheusReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsReporter for PrometheusReporter {
    fn report_state_change(&self, service: &str, state: &OutputState) {
        OUTPUT_STATE.with_label_values(&[service]).set(state.as_metric());
    }

    fn report_start_attempt(&self, service: &str) {
        START_ATTEMPTS.with_label_values(&[service]).inc();
    }

    fn report_start_failure(&self, service: &str) {
        START_FAILURES.with_label_values(&[service]).inc();
    }

    fn report_reconnect(&self, service: &str) {
        RECONNECTS.with_label_values(&[service]).inc();
    }

    fn report_uptime(&self, service: &str, uptime_secs: f64) {
        ONLINE_SECONDS.with_label_values(&[service]).set(uptime_secs);
    }
}
