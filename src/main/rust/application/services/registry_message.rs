use std::sync::mpsc::Sender;

use crate::domain::ports::SignalSink;
use crate::domain::value_objects::{OutputSettings, TransportSignal};

/// Signal tagged with the output and handle generation it came from
#[derive(Debug, Clone)]
pub struct SignalEnvelope {
    pub service: &'static str,
    pub generation: u64,
    pub signal: TransportSignal,
}

/// User commands issued by the presentation layer
#[derive(Debug, Clone)]
pub enum Command {
    Start(String),
    Stop(String),
    Configure(String, OutputSettings),
}

/// Everything drained by the registry on its owner thread
#[derive(Debug, Clone)]
pub enum RegistryMessage {
    Signal(SignalEnvelope),
    Command(Command),
}

/// Forwards handle signals into the registry channel
pub struct ChannelSignalSink {
    service: &'static str,
    generation: u64,
    tx: Sender<RegistryMessage>,
}

impl ChannelSignalSink {
    pub fn new(service: &'static str, generation: u64, tx: Sender<RegistryMessage>) -> Self {
        Self {
            service,
            generation,
            tx,
        }
    }
}

impl SignalSink for ChannelSignalSink {
    fn deliver(&self, signal: TransportSignal) {
        let envelope = SignalEnvelope {
            service: self.service,
            generation: self.generation,
            signal,
        };
        if self.tx.send(RegistryMessage::Signal(envelope)).is_err() {
            tracing::debug!(service = self.service, "Registry gone, dropping {}", signal);
        }
    }
}

/// Cloneable handle for issuing user commands from any thread
#[derive(Clone)]
pub struct CommandSender {
    tx: Sender<RegistryMessage>,
}

impl CommandSender {
    pub(crate) fn new(tx: Sender<RegistryMessage>) -> Self {
        Self { tx }
    }

    pub fn request_start(&self, service: impl Into<String>) -> bool {
        self.send(Command::Start(service.into()))
    }

    pub fn request_stop(&self, service: impl Into<String>) -> bool {
        self.send(Command::Stop(service.into()))
    }

    pub fn request_config(&self, service: impl Into<String>, settings: OutputSettings) -> bool {
        self.send(Command::Configure(service.into(), settings))
    }

    fn send(&self, command: Command) -> bool {
        self.tx.send(RegistryMessage::Command(command)).is_ok()
    }
}
