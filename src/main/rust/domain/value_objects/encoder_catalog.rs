/// Encoder families with known profile/preset tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EncoderFamily {
    X264,
    Nvenc,
    Qsv,
    Amd,
}

impl EncoderFamily {
    fn of(encoder_id: &str) -> Option<Self> {
        let id = encoder_id.to_ascii_lowercase();
        if id.contains("x264") {
            Some(Self::X264)
        } else if id.contains("nvenc") {
            Some(Self::Nvenc)
        } else if id.contains("qsv") {
            Some(Self::Qsv)
        } else if id.contains("amd") {
            Some(Self::Amd)
        } else {
            None
        }
    }
}

/// H.264 profiles offered for `encoder_id`; empty when unknown
pub fn supported_profiles(encoder_id: &str) -> Vec<&'static str> {
    match EncoderFamily::of(encoder_id) {
        Some(_) => vec!["baseline", "main", "high"],
        None => Vec::new(),
    }
}

/// Speed/quality presets offered for `encoder_id`; empty when unknown
pub fn supported_presets(encoder_id: &str) -> Vec<&'static str> {
    match EncoderFamily::of(encoder_id) {
        Some(EncoderFamily::X264) => vec![
            "ultrafast",
            "superfast",
            "veryfast",
            "faster",
            "fast",
            "medium",
            "slow",
            "slower",
            "veryslow",
        ],
        Some(EncoderFamily::Nvenc) => vec!["default", "hq", "hp", "ll", "llhq", "llhp"],
        Some(EncoderFamily::Qsv) | Some(EncoderFamily::Amd) => {
            vec!["speed", "balanced", "quality"]
        }
        None => Vec::new(),
    }
}
