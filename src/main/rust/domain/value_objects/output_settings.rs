use super::{OutputConfig, OutputKind, RtmpOutputConfig, ServiceDescriptor, Settings, WhipOutputConfig};
use crate::domain::entities::ConfigStore;
use crate::domain::errors::Result;

/// Section holding every output's fields
pub const OUTPUTS_SECTION: &str = "outputs";

/// Protocol-specific output configuration, each variant embedding the
/// shared base fields
#[derive(Debug, Clone, PartialEq)]
pub enum OutputSettings {
    Rtmp(RtmpOutputConfig),
    Whip(WhipOutputConfig),
}

impl OutputSettings {
    /// Defaults for a service, before anything has been stored
    pub fn defaults_for(service: &ServiceDescriptor) -> Self {
        match service.kind() {
            OutputKind::Rtmp => Self::Rtmp(RtmpOutputConfig {
                server_url: service.default_server_url().to_string(),
                ..RtmpOutputConfig::default()
            }),
            OutputKind::Whip => Self::Whip(WhipOutputConfig::default()),
        }
    }

    /// Rebuild a service's configuration from the store
    pub fn load(service: &ServiceDescriptor, store: &ConfigStore) -> Self {
        let prefix = service.key_prefix();
        match service.kind() {
            OutputKind::Rtmp => Self::Rtmp(RtmpOutputConfig::load(
                store,
                OUTPUTS_SECTION,
                &prefix,
                service.default_server_url(),
            )),
            OutputKind::Whip => Self::Whip(WhipOutputConfig::load(store, OUTPUTS_SECTION, &prefix)),
        }
    }

    pub fn save(&self, service: &ServiceDescriptor, store: &mut ConfigStore) -> Result<()> {
        let prefix = service.key_prefix();
        match self {
            Self::Rtmp(config) => config.save(store, OUTPUTS_SECTION, &prefix),
            Self::Whip(config) => config.save(store, OUTPUTS_SECTION, &prefix),
        }
    }

    pub fn kind(&self) -> OutputKind {
        match self {
            Self::Rtmp(_) => OutputKind::Rtmp,
            Self::Whip(_) => OutputKind::Whip,
        }
    }

    pub fn base(&self) -> &OutputConfig {
        match self {
            Self::Rtmp(config) => &config.base,
            Self::Whip(config) => &config.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut OutputConfig {
        match self {
            Self::Rtmp(config) => &mut config.base,
            Self::Whip(config) => &mut config.base,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Rtmp(config) => config.validate(),
            Self::Whip(config) => config.validate(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Endpoint, credentials and reconnect policy for the transport handle
    pub fn transport_settings(&self) -> Settings {
        match self {
            Self::Rtmp(config) => config.transport_settings(),
            Self::Whip(config) => config.transport_settings(),
        }
    }
}
