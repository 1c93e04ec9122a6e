use super::OutputKind;

/// A fixed streaming destination the application knows about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    name: &'static str,
    icon: &'static str,
    kind: OutputKind,
    default_server_url: &'static str,
}

/// Creation order of the outputs
static SERVICES: [ServiceDescriptor; 5] = [
    ServiceDescriptor {
        name: "PlayFame",
        icon: "playfame_icon.png",
        kind: OutputKind::Whip,
        default_server_url: "",
    },
    ServiceDescriptor {
        name: "YouTube",
        icon: "youtube_icon.png",
        kind: OutputKind::Rtmp,
        default_server_url: "rtmp://a.rtmp.youtube.com/live2",
    },
    ServiceDescriptor {
        name: "Twitch",
        icon: "twitch_icon.png",
        kind: OutputKind::Rtmp,
        default_server_url: "rtmp://live.twitch.tv/app",
    },
    ServiceDescriptor {
        name: "Facebook",
        icon: "facebook_icon.png",
        kind: OutputKind::Rtmp,
        default_server_url: "rtmps://live-api-s.facebook.com:443/rtmp/",
    },
    ServiceDescriptor {
        name: "Kick",
        icon: "kick_icon.png",
        kind: OutputKind::Rtmp,
        default_server_url: "rtmps://fa723fc1b171.global-contribute.live-video.net/app",
    },
];

impl ServiceDescriptor {
    /// All services, in creation order
    pub fn all() -> &'static [ServiceDescriptor] {
        &SERVICES
    }

    /// Case-insensitive lookup by service name
    pub fn find(name: &str) -> Option<&'static ServiceDescriptor> {
        SERVICES.iter().find(|s| s.name.eq_ignore_ascii_case(name))
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn icon(&self) -> &'static str {
        self.icon
    }

    pub fn kind(&self) -> OutputKind {
        self.kind
    }

    pub fn default_server_url(&self) -> &'static str {
        self.default_server_url
    }

    /// Prefix for this service's keys in the shared outputs section
    pub fn key_prefix(&self) -> String {
        format!("{}_", self.name.to_lowercase())
    }
}
