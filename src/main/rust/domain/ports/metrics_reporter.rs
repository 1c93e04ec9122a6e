use crate::domain::value_objects::OutputState;

/// Port for metrics reporting
pub trait MetricsReporter: Send + Sync {
    fn report_state_change(&self, service: &str, state: &OutputState);
    fn report_start_attempt(&self, service: &str);
    fn report_start_failure(&self, service: &str);
    fn report_reconnect(&self, service: &str);
    fn report_uptime(&self, service: &str, uptime_secs: f64);
}
