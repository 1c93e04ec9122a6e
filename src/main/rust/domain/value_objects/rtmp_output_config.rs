use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use super::output_config::{invalid, prefixed};
use super::{OutputConfig, Settings};
use crate::domain::entities::ConfigStore;
use crate::domain::errors::Result;

lazy_static! {
    static ref RTMP_URL_PATTERN: Regex = Regex::new(r"^rtmps?://.+").expect("rtmp pattern compiles");
}

/// Configuration for RTMP push destinations
#[derive(Debug, Clone, PartialEq)]
pub struct RtmpOutputConfig {
    pub base: OutputConfig,
    pub server_url: String,
    pub backup_server_url: String,
    pub stream_key: String,
    pub use_auto_reconnect: bool,
}

impl Default for RtmpOutputConfig {
    fn default() -> Self {
        Self {
            base: OutputConfig::default(),
            server_url: String::new(),
            backup_server_url: String::new(),
            stream_key: String::new(),
            use_auto_reconnect: true,
        }
    }
}

impl RtmpOutputConfig {
    pub fn with_server(mut self, server_url: impl Into<String>, stream_key: impl Into<String>) -> Self {
        self.server_url = server_url.into();
        self.stream_key = stream_key.into();
        self
    }

    pub fn load(store: &ConfigStore, section: &str, prefix: &str, default_server_url: &str) -> Self {
        let base = OutputConfig::load(store, section, prefix);
        let key = |field: &str| prefixed(prefix, field);

        Self {
            base,
            server_url: store.get(section, &key("server_url"), default_server_url.to_string()),
            backup_server_url: store.get(section, &key("backup_server_url"), String::new()),
            stream_key: store.get(section, &key("stream_key"), String::new()),
            use_auto_reconnect: store.get(section, &key("use_auto_reconnect"), true),
        }
    }

    pub fn save(&self, store: &mut ConfigStore, section: &str, prefix: &str) -> Result<()> {
        self.base.save(store, section, prefix)?;
        let key = |field: &str| prefixed(prefix, field);

        store.set(section, &key("server_url"), self.server_url.as_str())?;
        store.set(section, &key("backup_server_url"), self.backup_server_url.as_str())?;
        store.set(section, &key("stream_key"), self.stream_key.as_str())?;
        store.set(section, &key("use_auto_reconnect"), self.use_auto_reconnect)?;
        Ok(())
    }

    /// Base rules first; RTMP rules only run when those pass
    pub fn validate(&self) -> Result<()> {
        self.base.validate()?;

        if !Self::validate_rtmp_url(&self.server_url) {
            return Err(invalid(format!("server URL '{}'", self.server_url)));
        }
        if !self.backup_server_url.is_empty() && !Self::validate_rtmp_url(&self.backup_server_url) {
            return Err(invalid(format!("backup server URL '{}'", self.backup_server_url)));
        }
        if self.stream_key.is_empty() {
            return Err(invalid("stream key is empty"));
        }

        Ok(())
    }

    pub fn validate_rtmp_url(url: &str) -> bool {
        RTMP_URL_PATTERN.is_match(url)
    }

    pub fn transport_settings(&self) -> Settings {
        let mut settings = Settings::new();
        settings.insert("server".into(), Value::from(self.server_url.as_str()));
        settings.insert("key".into(), Value::from(self.stream_key.as_str()));
        if !self.backup_server_url.is_empty() {
            settings.insert(
                "backup_server".into(),
                Value::from(self.backup_server_url.as_str()),
            );
        }
        if self.use_auto_reconnect {
            self.base.insert_reconnect_settings(&mut settings);
        }
        settings
    }
}
