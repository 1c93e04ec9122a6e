use std::fmt;

/// Lifecycle state of a single output (pure domain)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputState {
    /// No valid configuration yet
    #[default]
    Unused,
    /// Configured but not streaming
    Offline,
    /// Start requested, handshake in progress
    Connecting,
    /// Actively streaming
    Online,
    /// Start failed or connection lost abnormally
    Error,
}

impl fmt::Display for OutputState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl OutputState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unused => "UNUSED",
            Self::Offline => "OFFLINE",
            Self::Connecting => "CONNECTING",
            Self::Online => "ONLINE",
            Self::Error => "ERROR",
        }
    }

    /// Style class consumed by the presentation layer
    pub fn style_class(&self) -> &'static str {
        match self {
            Self::Unused => "state-unused",
            Self::Offline => "state-offline",
            Self::Connecting => "state-connecting",
            Self::Online => "state-online",
            Self::Error => "state-error",
        }
    }

    /// Convert state to numeric value for metrics
    pub fn as_metric(&self) -> i64 {
        match self {
            Self::Unused => 0,
            Self::Offline => 1,
            Self::Connecting => 2,
            Self::Online => 3,
            Self::Error => 4,
        }
    }

    /// A start may be requested from here
    pub fn can_start(&self) -> bool {
        matches!(self, Self::Offline | Self::Error)
    }

    /// A stop may be requested from here
    pub fn can_stop(&self) -> bool {
        self.is_active()
    }

    /// Connecting or online: a transport handle is in play
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Connecting | Self::Online)
    }
}
