use std::sync::Arc;

use crate::domain::errors::Result;
use crate::domain::value_objects::{EncoderKind, OutputKind, Settings, SignalKind, TransportSignal};

/// Receives signals raised by a handle.
///
/// Called from the transport's own execution context; implementations must
/// only forward the signal, never touch output state directly.
pub trait SignalSink: Send + Sync {
    fn deliver(&self, signal: TransportSignal);
}

/// Configured encoder ready to be attached to a handle
pub trait Encoder: Send {
    fn id(&self) -> &str;
    fn kind(&self) -> EncoderKind;
    fn settings(&self) -> &Settings;
}

/// Network output handle owned by exactly one output
pub trait OutputHandle: Send {
    /// Register `sink` for one kind of signal
    fn subscribe(&mut self, kind: SignalKind, sink: Arc<dyn SignalSink>);

    /// Push endpoint, credentials and reconnect settings
    fn update(&mut self, settings: &Settings);

    fn attach_encoder(&mut self, encoder: Box<dyn Encoder>, track: usize);

    /// Issue the start command. Returns once the command is issued; the
    /// outcome is reported through signals.
    fn start(&mut self) -> Result<()>;

    /// Issue the stop command; completion is reported through signals
    fn stop(&mut self);

    fn is_active(&self) -> bool;
}

/// Port for the host environment that creates handles and encoders
pub trait TransportHost: Send + Sync {
    fn create_output(&self, kind: OutputKind, name: &str) -> Option<Box<dyn OutputHandle>>;

    fn create_encoder(
        &self,
        kind: EncoderKind,
        id: &str,
        settings: &Settings,
    ) -> Option<Box<dyn Encoder>>;
}
