use std::fmt;

use serde_json::{Map, Value};

/// Key/value settings pushed into transport handles and encoders
pub type Settings = Map<String, Value>;

/// Transport stop codes, as reported with the `stopped` signal
pub mod stop_code {
    pub const SUCCESS: i64 = 0;
    pub const BAD_PATH: i64 = -1;
    pub const CONNECT_FAILED: i64 = -2;
    pub const INVALID_STREAM: i64 = -3;
    pub const ERROR: i64 = -4;
    pub const DISCONNECTED: i64 = -5;
}

/// Kind of transport handle an output needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputKind {
    Rtmp,
    Whip,
}

impl OutputKind {
    pub fn id(&self) -> &'static str {
        match self {
            Self::Rtmp => "rtmp_output",
            Self::Whip => "whip_output",
        }
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncoderKind {
    Video,
    Audio,
}

impl fmt::Display for EncoderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
        }
    }
}

/// Signal raised by a transport handle from its own execution context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportSignal {
    Started,
    Stopped { code: i64 },
    Reconnecting,
    ReconnectSuccess,
}

impl TransportSignal {
    pub fn kind(&self) -> SignalKind {
        match self {
            Self::Started => SignalKind::Started,
            Self::Stopped { .. } => SignalKind::Stopped,
            Self::Reconnecting => SignalKind::Reconnecting,
            Self::ReconnectSuccess => SignalKind::ReconnectSuccess,
        }
    }
}

impl fmt::Display for TransportSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped { code } => write!(f, "stop (code {})", code),
            other => f.write_str(other.kind().name()),
        }
    }
}

/// Signals an output subscribes to on its handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    Started,
    Stopped,
    Reconnecting,
    ReconnectSuccess,
}

impl SignalKind {
    pub const ALL: [SignalKind; 4] = [
        SignalKind::Started,
        SignalKind::Stopped,
        SignalKind::Reconnecting,
        SignalKind::ReconnectSuccess,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Started => "start",
            Self::Stopped => "stop",
            Self::Reconnecting => "reconnect",
            Self::ReconnectSuccess => "reconnect_success",
        }
    }
}
