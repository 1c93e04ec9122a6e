mod config_value;
pub mod encoder_catalog;
mod output_config;
mod output_settings;
mod output_state;
mod reconnect_policy;
mod rtmp_output_config;
mod service_descriptor;
mod transport;
mod whip_output_config;

pub use config_value::{ConfigValue, ValueType};
pub use output_config::{OutputConfig, DEFAULT_AUDIO_ENCODER, DEFAULT_VIDEO_ENCODER};
pub use output_settings::{OutputSettings, OUTPUTS_SECTION};
pub use output_state::OutputState;
pub use reconnect_policy::ReconnectPolicy;
pub use rtmp_output_config::RtmpOutputConfig;
pub use service_descriptor::ServiceDescriptor;
pub use transport::{
    stop_code, EncoderKind, OutputKind, Settings, SignalKind, TransportSignal,
};
pub use whip_output_config::{WhipOutputConfig, EXPIRY_WARNING_HOURS};
