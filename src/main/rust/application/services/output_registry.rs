use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;

use super::registry_message::{Command, CommandSender, RegistryMessage, SignalEnvelope};
use super::stream_output::StreamOutput;
use crate::domain::entities::ConfigStore;
use crate::domain::errors::{DomainError, Result};
use crate::domain::ports::{MetricsReporter, StateObserver, TransportHost};
use crate::domain::value_objects::{OutputSettings, ServiceDescriptor};

/// How long the owner loop blocks waiting for a message
const POLL_TIMEOUT_MS: u64 = 100;

/// Owns every output and the shared config store for the process lifetime.
///
/// Outputs are created in service-table order and loaded immediately. All
/// state mutation happens on the thread that owns the registry: transport
/// signals and user commands both arrive through one channel and are applied
/// in arrival order.
pub struct OutputRegistry {
    store: ConfigStore,
    outputs: Vec<StreamOutput>,
    tx: Sender<RegistryMessage>,
    rx: Receiver<RegistryMessage>,
    running: Arc<AtomicBool>,
    shut_down: bool,
}

impl OutputRegistry {
    pub fn new(
        mut store: ConfigStore,
        host: Arc<dyn TransportHost>,
        observer: Arc<dyn StateObserver>,
        metrics: Arc<dyn MetricsReporter>,
    ) -> Self {
        if !store.is_loaded() {
            store.load();
        }

        let (tx, rx) = mpsc::channel();
        let outputs = ServiceDescriptor::all()
            .iter()
            .map(|service| {
                let mut output = StreamOutput::new(
                    service,
                    host.clone(),
                    tx.clone(),
                    observer.clone(),
                    metrics.clone(),
                );
                output.load_config(&store);
                output
            })
            .collect::<Vec<_>>();

        tracing::info!(
            outputs = outputs.len(),
            store = %store.location(),
            "Output registry ready"
        );

        Self {
            store,
            outputs,
            tx,
            rx,
            running: Arc::new(AtomicBool::new(true)),
            shut_down: false,
        }
    }

    /// Set from creation; clearing it makes `run` return
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    pub fn command_sender(&self) -> CommandSender {
        CommandSender::new(self.tx.clone())
    }

    /// Outputs in creation order
    pub fn outputs(&self) -> &[StreamOutput] {
        &self.outputs
    }

    pub fn output(&self, name: &str) -> Option<&StreamOutput> {
        self.outputs
            .iter()
            .find(|o| o.name().eq_ignore_ascii_case(name))
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn start(&mut self, name: &str) -> Result<()> {
        self.output_mut(name)?.start_stream()
    }

    pub fn stop(&mut self, name: &str) -> Result<()> {
        self.output_mut(name)?.stop_stream();
        Ok(())
    }

    /// Save a user's configuration change and persist the store.
    ///
    /// A validation failure is reported after the store has been written.
    pub fn configure(&mut self, name: &str, settings: OutputSettings) -> Result<()> {
        let index = self.index_of(name)?;
        let outcome = self.outputs[index].configure(settings, &mut self.store);
        if let Err(e @ DomainError::InvalidConfig(_)) = &outcome {
            tracing::warn!(service = self.outputs[index].name(), "Config not usable: {}", e);
        }
        // An invalid config is still written out: the fields stay editable across
        // restarts and the output loads as Unused. Validation blocks the start,
        // not the save.
        if matches!(outcome, Ok(()) | Err(DomainError::InvalidConfig(_))) {
            self.store.save()?;
        }
        outcome
    }

    /// Apply one message on the owner thread
    pub fn dispatch(&mut self, message: RegistryMessage) {
        match message {
            RegistryMessage::Signal(envelope) => self.route_signal(envelope),
            RegistryMessage::Command(command) => {
                let outcome = match command {
                    Command::Start(name) => self.start(&name),
                    Command::Stop(name) => self.stop(&name),
                    Command::Configure(name, settings) => self.configure(&name, settings),
                };
                if let Err(e) = outcome {
                    tracing::warn!("Command failed: {}", e);
                }
            }
        }
    }

    /// Apply every message already queued; returns how many were applied
    pub fn drain_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(message) = self.rx.try_recv() {
            self.dispatch(message);
            applied += 1;
        }
        applied
    }

    /// Block the calling thread applying messages until the running flag is
    /// cleared, then shut down
    pub fn run(&mut self) -> Result<()> {
        tracing::info!("Output registry running");

        while self.running.load(Ordering::SeqCst) {
            match self.rx.recv_timeout(Duration::from_millis(POLL_TIMEOUT_MS)) {
                Ok(message) => self.dispatch(message),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            for output in &self.outputs {
                output.report_uptime();
            }
        }

        tracing::info!("Output registry stopping");
        self.shutdown()
    }

    /// Persist the store, then stop and release every output.
    ///
    /// Runs once; later calls are no-ops.
    pub fn shutdown(&mut self) -> Result<()> {
        if self.shut_down {
            return Ok(());
        }
        self.shut_down = true;
        self.running.store(false, Ordering::SeqCst);

        let saved = self.store.save();
        if let Err(e) = &saved {
            tracing::error!("Failed to persist config on shutdown: {}", e);
        }

        for output in &mut self.outputs {
            if output.state().is_active() {
                output.stop_stream();
            }
            output.release_handle();
        }

        tracing::info!("Output registry shut down");
        saved
    }

    fn route_signal(&mut self, envelope: SignalEnvelope) {
        match self.outputs.iter_mut().find(|o| o.name() == envelope.service) {
            Some(output) => output.handle_signal(envelope.generation, envelope.signal),
            None => tracing::warn!(service = envelope.service, "Signal for unknown output"),
        }
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.outputs
            .iter()
            .position(|o| o.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| DomainError::UnknownOutput(name.to_string()))
    }

    fn output_mut(&mut self, name: &str) -> Result<&mut StreamOutput> {
        let index = self.index_of(name)?;
        Ok(&mut self.outputs[index])
    }
}

impl Drop for OutputRegistry {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::error!("Shutdown during drop failed: {}", e);
        }
    }
}
