use chrono::{DateTime, Duration, SecondsFormat, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use super::output_config::{invalid, prefixed};
use super::{OutputConfig, Settings};
use crate::domain::entities::ConfigStore;
use crate::domain::errors::Result;

/// Tokens expiring within this window should be refreshed proactively
pub const EXPIRY_WARNING_HOURS: i64 = 48;

pub const SUPPORTED_TRANSPORTS: [&str; 2] = ["tcp", "udp"];
pub const SUPPORTED_DTLS_ROLES: [&str; 3] = ["auto", "server", "client"];

lazy_static! {
    static ref HTTP_URL_PATTERN: Regex = Regex::new(r"^https?://.+").expect("http pattern compiles");
}

/// Configuration for WHIP (WebRTC ingest) destinations
#[derive(Debug, Clone, PartialEq)]
pub struct WhipOutputConfig {
    pub base: OutputConfig,
    pub use_oauth: bool,
    pub use_auto_reconnect: bool,
    pub access_token: String,
    pub stream_key: String,
    pub ingest_url: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub whip_transport: String,
    pub dtls_role: String,
}

impl Default for WhipOutputConfig {
    fn default() -> Self {
        Self {
            base: OutputConfig::default(),
            use_oauth: true,
            use_auto_reconnect: true,
            access_token: String::new(),
            stream_key: String::new(),
            ingest_url: String::new(),
            expires_at: None,
            whip_transport: "tcp".to_string(),
            dtls_role: "auto".to_string(),
        }
    }
}

impl WhipOutputConfig {
    pub fn load(store: &ConfigStore, section: &str, prefix: &str) -> Self {
        let base = OutputConfig::load(store, section, prefix);
        let key = |field: &str| prefixed(prefix, field);
        let d = Self::default();

        let expires_at = store.get(section, &key("expires_at"), String::new());

        Self {
            base,
            use_oauth: store.get(section, &key("use_oauth"), d.use_oauth),
            use_auto_reconnect: store.get(section, &key("use_auto_reconnect"), d.use_auto_reconnect),
            access_token: store.get(section, &key("access_token"), d.access_token),
            stream_key: store.get(section, &key("stream_key"), d.stream_key),
            ingest_url: store.get(section, &key("ingest_url"), d.ingest_url),
            expires_at: DateTime::parse_from_rfc3339(&expires_at)
                .ok()
                .map(|t| t.with_timezone(&Utc)),
            whip_transport: store.get(section, &key("whip_transport"), d.whip_transport),
            dtls_role: store.get(section, &key("dtls_role"), d.dtls_role),
        }
    }

    pub fn save(&self, store: &mut ConfigStore, section: &str, prefix: &str) -> Result<()> {
        self.base.save(store, section, prefix)?;
        let key = |field: &str| prefixed(prefix, field);

        let expires_at = self
            .expires_at
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_default();

        store.set(section, &key("use_oauth"), self.use_oauth)?;
        store.set(section, &key("use_auto_reconnect"), self.use_auto_reconnect)?;
        store.set(section, &key("access_token"), self.access_token.as_str())?;
        store.set(section, &key("stream_key"), self.stream_key.as_str())?;
        store.set(section, &key("ingest_url"), self.ingest_url.as_str())?;
        store.set(section, &key("expires_at"), expires_at)?;
        store.set(section, &key("whip_transport"), self.whip_transport.as_str())?;
        store.set(section, &key("dtls_role"), self.dtls_role.as_str())?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.validate_at(Utc::now())
    }

    /// Base rules first, then WHIP rules, judged against `now`
    pub fn validate_at(&self, now: DateTime<Utc>) -> Result<()> {
        self.base.validate()?;

        if self.use_oauth {
            if self.access_token.is_empty() {
                return Err(invalid("OAuth access token is empty"));
            }
            if self.is_token_expired_at(now) {
                return Err(invalid("OAuth access token has expired"));
            }
        }

        if !HTTP_URL_PATTERN.is_match(&self.ingest_url) {
            return Err(invalid(format!("ingest URL '{}'", self.ingest_url)));
        }
        if self.stream_key.is_empty() {
            return Err(invalid("stream key is empty"));
        }
        if !SUPPORTED_TRANSPORTS.contains(&self.whip_transport.as_str()) {
            return Err(invalid(format!("WHIP transport '{}'", self.whip_transport)));
        }
        if !SUPPORTED_DTLS_ROLES.contains(&self.dtls_role.as_str()) {
            return Err(invalid(format!("DTLS role '{}'", self.dtls_role)));
        }

        Ok(())
    }

    pub fn is_token_expired(&self) -> bool {
        self.is_token_expired_at(Utc::now())
    }

    /// A missing expiry counts as expired
    pub fn is_token_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |expires_at| expires_at <= now)
    }

    pub fn is_token_expiring_soon(&self) -> bool {
        self.is_token_expiring_soon_at(Utc::now())
    }

    pub fn is_token_expiring_soon_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |expires_at| {
            expires_at <= now + Duration::hours(EXPIRY_WARNING_HOURS)
        })
    }

    pub fn supported_transports() -> Vec<&'static str> {
        SUPPORTED_TRANSPORTS.to_vec()
    }

    pub fn supported_dtls_roles() -> Vec<&'static str> {
        SUPPORTED_DTLS_ROLES.to_vec()
    }

    /// Credential sent as the WHIP bearer token
    fn bearer_token(&self) -> &str {
        if self.use_oauth {
            &self.access_token
        } else {
            &self.stream_key
        }
    }

    pub fn transport_settings(&self) -> Settings {
        let mut settings = Settings::new();
        settings.insert("server".into(), Value::from(self.ingest_url.as_str()));
        settings.insert("bearer_token".into(), Value::from(self.bearer_token()));
        settings.insert("stream_key".into(), Value::from(self.stream_key.as_str()));
        settings.insert("whip_transport".into(), Value::from(self.whip_transport.as_str()));
        settings.insert("dtls_role".into(), Value::from(self.dtls_role.as_str()));
        if self.use_auto_reconnect {
            self.base.insert_reconnect_settings(&mut settings);
        }
        settings
    }
}
