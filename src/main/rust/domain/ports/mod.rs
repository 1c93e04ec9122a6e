mod document_backend;
mod host_catalog;
mod metrics_reporter;
mod state_observer;
mod transport_host;

pub use document_backend::{Document, DocumentBackend};
pub use host_catalog::HostCatalog;
pub use metrics_reporter::MetricsReporter;
pub use state_observer::StateObserver;
pub use transport_host::{Encoder, OutputHandle, SignalSink, TransportHost};
