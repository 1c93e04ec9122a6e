use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::domain::value_objects::ServiceDescriptor;
use crate::infrastructure::persistence::JsonFileBackend;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "stream-outputs",
    version = "0.1.0",
    about = "Multi-destination stream output manager with persistent per-service configuration"
)]
pub struct Config {
    /// Outputs configuration document
    #[arg(long, env = "OUTPUTS_CONFIG_FILE", default_value = "outputs.json")]
    pub config_file: PathBuf,

    /// Metrics server port
    #[arg(long, env = "METRICS_PORT", default_value = "9003")]
    pub metrics_port: u16,

    /// Handshake latency of the loopback transport in milliseconds
    #[arg(long, default_value = "500")]
    pub connect_delay_ms: u64,

    /// Service to start once the outputs are loaded (repeatable)
    #[arg(long = "start", value_name = "SERVICE")]
    pub start: Vec<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Minimum allowed port (ports below 1024 are privileged)
const MIN_USER_PORT: u16 = 1024;

/// Longest accepted loopback handshake
const MAX_CONNECT_DELAY_MS: u64 = 60_000;

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.config_file.as_os_str().is_empty() {
            anyhow::bail!("Config file path cannot be empty");
        }

        Self::validate_port(self.metrics_port, "metrics")?;

        if self.connect_delay_ms > MAX_CONNECT_DELAY_MS {
            anyhow::bail!(
                "Connect delay {}ms exceeds the maximum of {}ms",
                self.connect_delay_ms,
                MAX_CONNECT_DELAY_MS
            );
        }

        for name in &self.start {
            if ServiceDescriptor::find(name).is_none() {
                let known: Vec<_> = ServiceDescriptor::all().iter().map(|s| s.name()).collect();
                anyhow::bail!("Unknown service '{}' (known: {})", name, known.join(", "));
            }
        }

        Ok(())
    }

    fn validate_port(port: u16, name: &str) -> anyhow::Result<()> {
        if port == 0 {
            anyhow::bail!("Invalid {} port: port cannot be 0", name);
        }
        if port < MIN_USER_PORT {
            anyhow::bail!(
                "Invalid {} port: {} is a privileged port (< {}). Use a port >= {}",
                name,
                port,
                MIN_USER_PORT,
                MIN_USER_PORT
            );
        }
        Ok(())
    }

    pub fn to_backend(&self) -> JsonFileBackend {
        JsonFileBackend::new(self.config_file.clone())
    }

    pub fn connect_delay(&self) -> Duration {
        Duration::from_millis(self.connect_delay_ms)
    }
}
