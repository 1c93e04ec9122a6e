use std::time::Duration;

use serde_json::Value;

use super::Settings;
use crate::domain::errors::{DomainError, Result};

/// Longest accepted spacing between reconnection attempts
pub const MAX_RECONNECT_DELAY: Duration = Duration::from_millis(30_000);

/// Upper bound on reconnection attempts
pub const MAX_RETRIES: u32 = 100;

/// Reconnection policy handed to the transport.
///
/// Attempts are spaced evenly by `delay`; the transport gives up after
/// `max_retries` failed attempts and reports a terminal stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    delay: Duration,
    max_retries: u32,
}

impl ReconnectPolicy {
    pub fn new(delay: Duration, max_retries: u32) -> Result<Self> {
        if delay > MAX_RECONNECT_DELAY {
            return Err(DomainError::InvalidConfig(format!(
                "reconnect delay {}ms exceeds {}ms",
                delay.as_millis(),
                MAX_RECONNECT_DELAY.as_millis()
            )));
        }
        if max_retries > MAX_RETRIES {
            return Err(DomainError::InvalidConfig(format!(
                "max retries {} exceeds {}",
                max_retries, MAX_RETRIES
            )));
        }

        Ok(Self { delay, max_retries })
    }

    /// Build from the millisecond/count pair stored in output configs
    pub fn from_millis(delay_ms: i32, max_retries: i32) -> Result<Self> {
        let delay_ms = u64::try_from(delay_ms).map_err(|_| {
            DomainError::InvalidConfig(format!("negative reconnect delay {}ms", delay_ms))
        })?;
        let max_retries = u32::try_from(max_retries).map_err(|_| {
            DomainError::InvalidConfig(format!("negative max retries {}", max_retries))
        })?;
        Self::new(Duration::from_millis(delay_ms), max_retries)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Whether attempt number `attempt` (1-based) is still allowed
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt >= 1 && attempt <= self.max_retries
    }

    /// Write the auto-reconnect keys a transport handle reads
    pub fn write_settings(&self, settings: &mut Settings) {
        let delay_ms = u64::try_from(self.delay.as_millis()).unwrap_or(u64::MAX);
        settings.insert("auto_reconnect".into(), Value::Bool(true));
        settings.insert("reconnect_delay_sec".into(), Value::from(delay_ms / 1000));
        settings.insert("reconnect_delay_ms".into(), Value::from(delay_ms));
        settings.insert("max_retries".into(), Value::from(self.max_retries));
    }

    /// Policy pushed to a transport handle; `None` when auto-reconnect is off
    /// or the pushed values are out of range
    pub fn from_settings(settings: &Settings) -> Option<Self> {
        if settings.get("auto_reconnect").and_then(Value::as_bool) != Some(true) {
            return None;
        }
        let defaults = Self::default();
        let delay_ms = settings
            .get("reconnect_delay_ms")
            .and_then(Value::as_u64)
            .unwrap_or(defaults.delay.as_millis() as u64);
        let max_retries = settings
            .get("max_retries")
            .and_then(Value::as_u64)
            .map(|v| u32::try_from(v).unwrap_or(u32::MAX))
            .unwrap_or(defaults.max_retries);
        Self::new(Duration::from_millis(delay_ms), max_retries).ok()
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(3000),
            max_retries: 20,
        }
    }
}
