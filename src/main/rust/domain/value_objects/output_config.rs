use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use super::{ReconnectPolicy, Settings};
use crate::domain::entities::ConfigStore;
use crate::domain::errors::{DomainError, Result};

pub const DEFAULT_VIDEO_ENCODER: &str = "obs_x264";
pub const DEFAULT_AUDIO_ENCODER: &str = "ffmpeg_aac";

pub const VALID_FPS: [i32; 6] = [24, 25, 30, 48, 50, 60];
pub const VALID_AUDIO_CHANNELS: [&str; 3] = ["mono", "stereo", "5.1"];
pub const VALID_SAMPLE_RATES: [i32; 2] = [44100, 48000];

lazy_static! {
    static ref RESOLUTION_PATTERN: Regex =
        Regex::new(r"^\d{3,4}x\d{3,4}$").expect("resolution pattern compiles");
}

/// Store key for `field` under an output's prefix
pub(crate) fn prefixed(prefix: &str, field: &str) -> String {
    format!("{}{}", prefix, field)
}

/// Fields shared by every output, whatever its protocol
#[derive(Debug, Clone, PartialEq)]
pub struct OutputConfig {
    pub enabled: bool,
    pub custom_title: String,
    pub scene_id: String,
    pub video_encoder_id: String,
    pub video_bitrate_kbps: i32,
    pub keyframe_interval_sec: i32,
    pub encoder_profile: String,
    pub encoder_preset: String,
    pub resolution: String,
    pub fps: i32,
    pub audio_encoder_id: String,
    pub audio_bitrate_kbps: i32,
    pub audio_channels: String,
    pub audio_sample_rate: i32,
    pub reconnect_delay_ms: i32,
    pub max_retries: i32,
    pub custom_params_json: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            custom_title: String::new(),
            scene_id: String::new(),
            video_encoder_id: DEFAULT_VIDEO_ENCODER.to_string(),
            video_bitrate_kbps: 2500,
            keyframe_interval_sec: 2,
            encoder_profile: String::new(),
            encoder_preset: String::new(),
            resolution: "1280x720".to_string(),
            fps: 60,
            audio_encoder_id: DEFAULT_AUDIO_ENCODER.to_string(),
            audio_bitrate_kbps: 128,
            audio_channels: "stereo".to_string(),
            audio_sample_rate: 48000,
            reconnect_delay_ms: 3000,
            max_retries: 20,
            custom_params_json: String::new(),
        }
    }
}

impl OutputConfig {
    /// Read every base field; missing keys keep their defaults
    pub fn load(store: &ConfigStore, section: &str, prefix: &str) -> Self {
        let d = Self::default();
        let key = |field: &str| prefixed(prefix, field);

        Self {
            enabled: store.get(section, &key("enabled"), d.enabled),
            custom_title: store.get(section, &key("custom_title"), d.custom_title),
            scene_id: store.get(section, &key("scene_id"), d.scene_id),
            video_encoder_id: store.get(section, &key("video_encoder_id"), d.video_encoder_id),
            video_bitrate_kbps: store.get(section, &key("video_bitrate_kbps"), d.video_bitrate_kbps),
            keyframe_interval_sec: store.get(
                section,
                &key("keyframe_interval_s"),
                d.keyframe_interval_sec,
            ),
            encoder_profile: store.get(section, &key("encoder_profile"), d.encoder_profile),
            encoder_preset: store.get(section, &key("encoder_preset"), d.encoder_preset),
            resolution: store.get(section, &key("resolution"), d.resolution),
            fps: store.get(section, &key("fps"), d.fps),
            audio_encoder_id: store.get(section, &key("audio_encoder_id"), d.audio_encoder_id),
            audio_bitrate_kbps: store.get(section, &key("audio_bitrate_kbps"), d.audio_bitrate_kbps),
            audio_channels: store.get(section, &key("audio_channels"), d.audio_channels),
            audio_sample_rate: store.get(section, &key("audio_sample_rate"), d.audio_sample_rate),
            reconnect_delay_ms: store.get(section, &key("reconnect_delay_ms"), d.reconnect_delay_ms),
            max_retries: store.get(section, &key("max_retries"), d.max_retries),
            custom_params_json: store.get(
                section,
                &key("custom_params_json"),
                d.custom_params_json,
            ),
        }
    }

    /// Write every base field
    pub fn save(&self, store: &mut ConfigStore, section: &str, prefix: &str) -> Result<()> {
        let key = |field: &str| prefixed(prefix, field);

        store.set(section, &key("enabled"), self.enabled)?;
        store.set(section, &key("custom_title"), self.custom_title.as_str())?;
        store.set(section, &key("scene_id"), self.scene_id.as_str())?;
        store.set(section, &key("video_encoder_id"), self.video_encoder_id.as_str())?;
        store.set(section, &key("video_bitrate_kbps"), self.video_bitrate_kbps)?;
        store.set(section, &key("keyframe_interval_s"), self.keyframe_interval_sec)?;
        store.set(section, &key("encoder_profile"), self.encoder_profile.as_str())?;
        store.set(section, &key("encoder_preset"), self.encoder_preset.as_str())?;
        store.set(section, &key("resolution"), self.resolution.as_str())?;
        store.set(section, &key("fps"), self.fps)?;
        store.set(section, &key("audio_encoder_id"), self.audio_encoder_id.as_str())?;
        store.set(section, &key("audio_bitrate_kbps"), self.audio_bitrate_kbps)?;
        store.set(section, &key("audio_channels"), self.audio_channels.as_str())?;
        store.set(section, &key("audio_sample_rate"), self.audio_sample_rate)?;
        store.set(section, &key("reconnect_delay_ms"), self.reconnect_delay_ms)?;
        store.set(section, &key("max_retries"), self.max_retries)?;
        store.set(section, &key("custom_params_json"), self.custom_params_json.as_str())?;
        Ok(())
    }

    /// Base validation rules. Never mutates anything.
    pub fn validate(&self) -> Result<()> {
        check_range("video bitrate (kbps)", self.video_bitrate_kbps, 50, 60_000)?;
        check_range("keyframe interval (s)", self.keyframe_interval_sec, 1, 10)?;
        check_range("audio bitrate (kbps)", self.audio_bitrate_kbps, 32, 320)?;
        check_range("reconnect delay (ms)", self.reconnect_delay_ms, 0, 30_000)?;
        check_range("max retries", self.max_retries, 0, 100)?;

        if !Self::validate_resolution(&self.resolution) {
            return Err(invalid(format!("resolution '{}'", self.resolution)));
        }
        if !VALID_FPS.contains(&self.fps) {
            return Err(invalid(format!("fps {}", self.fps)));
        }
        if !VALID_AUDIO_CHANNELS.contains(&self.audio_channels.as_str()) {
            return Err(invalid(format!("audio channels '{}'", self.audio_channels)));
        }
        if !VALID_SAMPLE_RATES.contains(&self.audio_sample_rate) {
            return Err(invalid(format!("sample rate {}", self.audio_sample_rate)));
        }
        if !self.custom_params_json.is_empty() && !Self::validate_json(&self.custom_params_json) {
            return Err(invalid("custom parameters are not a JSON document"));
        }

        Ok(())
    }

    /// `WIDTHxHEIGHT`, each side 3-4 digits
    pub fn validate_resolution(resolution: &str) -> bool {
        RESOLUTION_PATTERN.is_match(resolution)
    }

    /// Must parse as a JSON object or array
    pub fn validate_json(json: &str) -> bool {
        matches!(
            serde_json::from_str::<Value>(json),
            Ok(Value::Object(_)) | Ok(Value::Array(_))
        )
    }

    pub fn reconnect_policy(&self) -> Result<ReconnectPolicy> {
        ReconnectPolicy::from_millis(self.reconnect_delay_ms, self.max_retries)
    }

    pub fn video_encoder_settings(&self) -> Settings {
        let mut settings = Settings::new();
        settings.insert("bitrate".into(), Value::from(self.video_bitrate_kbps));
        settings.insert("keyint_sec".into(), Value::from(self.keyframe_interval_sec));
        if !self.encoder_profile.is_empty() {
            settings.insert("profile".into(), Value::from(self.encoder_profile.as_str()));
        }
        if !self.encoder_preset.is_empty() {
            settings.insert("preset".into(), Value::from(self.encoder_preset.as_str()));
        }
        settings
    }

    pub fn audio_encoder_settings(&self) -> Settings {
        let mut settings = Settings::new();
        settings.insert("bitrate".into(), Value::from(self.audio_bitrate_kbps));
        settings
    }

    /// Reconnect keys pushed to the transport when auto-reconnect is on
    pub(crate) fn insert_reconnect_settings(&self, settings: &mut Settings) {
        match self.reconnect_policy() {
            Ok(policy) => policy.write_settings(settings),
            Err(e) => tracing::warn!("Auto-reconnect not pushed: {}", e),
        }
    }
}

fn check_range(name: &str, value: i32, min: i32, max: i32) -> Result<()> {
    if value < min || value > max {
        return Err(invalid(format!(
            "{} {} outside {}..={}",
            name, value, min, max
        )));
    }
    Ok(())
}

pub(crate) fn invalid(message: impl Into<String>) -> DomainError {
    DomainError::InvalidConfig(message.into())
}
