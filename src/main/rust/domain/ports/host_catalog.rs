/// Read-only enumeration services offered by the host environment
pub trait HostCatalog: Send + Sync {
    fn video_encoders(&self) -> Vec<String>;
    fn audio_encoders(&self) -> Vec<String>;
    fn scenes(&self) -> Vec<String>;
}
