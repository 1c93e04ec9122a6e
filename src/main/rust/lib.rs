pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-exports for convenience
pub use application::services::{CommandSender, OutputRegistry, StreamOutput};
pub use config::Config;
pub use domain::entities::{
    ConfigStore, LifecycleEvent, LoadOutcome, OutputLifecycle, Section, StateTransition,
};
pub use domain::errors::{DomainError, Result};
pub use domain::ports::{
    Document, DocumentBackend, Encoder, HostCatalog, MetricsReporter, OutputHandle, SignalSink,
    StateObserver, TransportHost,
};
pub use domain::value_objects::{
    ConfigValue, EncoderKind, OutputConfig, OutputKind, OutputSettings, OutputState,
    ReconnectPolicy, RtmpOutputConfig, ServiceDescriptor, Settings, SignalKind, TransportSignal,
    ValueType, WhipOutputConfig,
};
pub use infrastructure::metrics::{serve_metrics, PrometheusReporter};
pub use infrastructure::observers::LoggingObserver;
pub use infrastructure::persistence::{JsonFileBackend, MemoryBackend};
pub use infrastructure::transport::LoopbackTransportHost;
