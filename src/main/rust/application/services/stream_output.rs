use std::sync::mpsc::Sender;
use std::sync::Arc;

use super::registry_message::{ChannelSignalSink, RegistryMessage};
use crate::domain::entities::{ConfigStore, LifecycleEvent, OutputLifecycle};
use crate::domain::errors::{DomainError, Result};
use crate::domain::ports::{MetricsReporter, OutputHandle, StateObserver, TransportHost};
use crate::domain::value_objects::{
    EncoderKind, OutputSettings, OutputState, ServiceDescriptor, SignalKind, TransportSignal,
};

/// Track both encoders are attached to
const PRIMARY_TRACK: usize = 0;

/// Application service driving one streaming destination: its configuration,
/// lifecycle and transport handle.
///
/// All methods run on the registry's owner thread. Transport signals reach
/// [`StreamOutput::handle_signal`] through the registry channel, tagged with
/// the generation of the handle that raised them.
pub struct StreamOutput {
    service: &'static ServiceDescriptor,
    settings: OutputSettings,
    lifecycle: OutputLifecycle,
    handle: Option<Box<dyn OutputHandle>>,
    generation: u64,
    host: Arc<dyn TransportHost>,
    signal_tx: Sender<RegistryMessage>,
    observer: Arc<dyn StateObserver>,
    metrics: Arc<dyn MetricsReporter>,
}

impl StreamOutput {
    pub fn new(
        service: &'static ServiceDescriptor,
        host: Arc<dyn TransportHost>,
        signal_tx: Sender<RegistryMessage>,
        observer: Arc<dyn StateObserver>,
        metrics: Arc<dyn MetricsReporter>,
    ) -> Self {
        let output = Self {
            service,
            settings: OutputSettings::defaults_for(service),
            lifecycle: OutputLifecycle::new(),
            handle: None,
            generation: 0,
            host,
            signal_tx,
            observer,
            metrics,
        };
        output
            .metrics
            .report_state_change(service.name(), &output.lifecycle.current_state());
        output
    }

    pub fn name(&self) -> &'static str {
        self.service.name()
    }

    pub fn service(&self) -> &'static ServiceDescriptor {
        self.service
    }

    pub fn state(&self) -> OutputState {
        self.lifecycle.current_state()
    }

    pub fn settings(&self) -> &OutputSettings {
        &self.settings
    }

    pub fn lifecycle(&self) -> &OutputLifecycle {
        &self.lifecycle
    }

    /// Generation of the current (or most recent) handle
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn has_handle(&self) -> bool {
        self.handle.is_some()
    }

    /// Rebuild the configuration from the store and derive the state from it
    pub fn load_config(&mut self, store: &ConfigStore) {
        if self.state().is_active() {
            tracing::warn!(service = self.name(), "Reloading config of an active output, stopping it");
            self.release_handle();
        }

        self.settings = OutputSettings::load(self.service, store);
        let validation = self.settings.validate();
        tracing::info!(
            service = self.name(),
            valid = validation.is_ok(),
            "Loaded output config"
        );
        self.apply(
            LifecycleEvent::ConfigLoaded {
                valid: validation.is_ok(),
            },
            validation.err().map(|e| e.to_string()),
        );
    }

    /// Adopt a configuration saved by the user and write it into the store.
    ///
    /// Fields are written even when validation fails; the output then drops
    /// to Unused and the validation error is returned. An active output keeps
    /// its state and picks the change up on the next start.
    pub fn configure(&mut self, settings: OutputSettings, store: &mut ConfigStore) -> Result<()> {
        if settings.kind() != self.service.kind() {
            return Err(DomainError::InvalidConfig(format!(
                "{} expects {} settings, got {}",
                self.name(),
                self.service.kind(),
                settings.kind()
            )));
        }

        self.settings = settings;
        self.settings.save(self.service, store)?;

        let validation = self.settings.validate();
        self.apply(
            LifecycleEvent::ConfigSaved {
                valid: validation.is_ok(),
            },
            validation.as_ref().err().map(|e| e.to_string()),
        );
        validation
    }

    /// Validate, set up a fresh handle and issue the start command.
    ///
    /// Returns once the command is issued; going Online is reported later
    /// through signals.
    pub fn start_stream(&mut self) -> Result<()> {
        let state = self.state();
        if state.is_active() {
            return Err(DomainError::AlreadyActive {
                service: self.name().to_string(),
                state,
            });
        }

        tracing::info!(service = self.name(), "Starting stream");
        self.metrics.report_start_attempt(self.name());

        if let Err(e) = self.settings.validate() {
            tracing::warn!(service = self.name(), "Refusing to start: {}", e);
            self.metrics.report_start_failure(self.name());
            self.apply(LifecycleEvent::StartRejected, Some(e.to_string()));
            return Err(e);
        }

        if let OutputSettings::Whip(whip) = &self.settings {
            if whip.use_oauth && whip.is_token_expiring_soon() {
                tracing::warn!(
                    service = self.name(),
                    expires_at = ?whip.expires_at,
                    "Access token expires soon, refresh it"
                );
            }
        }

        if let Err(e) = self.setup_handle() {
            tracing::error!(service = self.name(), "Output setup failed: {}", e);
            self.release_handle();
            self.metrics.report_start_failure(self.name());
            self.apply(LifecycleEvent::HandleFailed, Some(e.to_string()));
            return Err(e);
        }

        self.apply(LifecycleEvent::StartIssued, None);

        let started = match self.handle.as_mut() {
            Some(handle) => handle.start(),
            None => Err(DomainError::HandleCreationFailed(
                self.service.kind().id().to_string(),
            )),
        };
        if let Err(e) = started {
            tracing::error!(service = self.name(), "Transport refused to start: {}", e);
            self.release_handle();
            self.metrics.report_start_failure(self.name());
            self.apply(LifecycleEvent::HandleFailed, Some(e.to_string()));
            return Err(e);
        }

        Ok(())
    }

    /// Issue the stop command if the handle is active and force Offline
    pub fn stop_stream(&mut self) {
        tracing::info!(service = self.name(), "Stopping stream");
        if let Some(handle) = self.handle.as_mut() {
            if handle.is_active() {
                handle.stop();
            }
        }
        self.apply(LifecycleEvent::StopRequested, Some("Stopped by user".to_string()));
    }

    /// Apply a signal drained from the registry channel
    pub fn handle_signal(&mut self, generation: u64, signal: TransportSignal) {
        if self.handle.is_none() || generation != self.generation {
            tracing::debug!(
                service = self.name(),
                generation,
                current = self.generation,
                "Dropping stale {}",
                signal
            );
            return;
        }

        if signal == TransportSignal::Reconnecting {
            self.metrics.report_reconnect(self.name());
        }

        let reason = match signal {
            TransportSignal::Stopped { code } => Some(format!("transport stopped with code {}", code)),
            _ => None,
        };
        self.apply(LifecycleEvent::Signal(signal), reason);
    }

    /// Stop (if active) and drop the current handle
    pub fn release_handle(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            if handle.is_active() {
                handle.stop();
            }
            tracing::debug!(service = self.name(), generation = self.generation, "Released handle");
        }
    }

    pub fn report_uptime(&self) {
        let uptime = self.lifecycle.uptime().map_or(0.0, |d| d.as_secs_f64());
        self.metrics.report_uptime(self.name(), uptime);
    }

    fn setup_handle(&mut self) -> Result<()> {
        self.release_handle();
        self.generation += 1;

        let kind = self.service.kind();
        let mut handle = self
            .host
            .create_output(kind, self.name())
            .ok_or_else(|| DomainError::HandleCreationFailed(kind.id().to_string()))?;

        let sink = Arc::new(ChannelSignalSink::new(
            self.name(),
            self.generation,
            self.signal_tx.clone(),
        ));
        for signal in SignalKind::ALL {
            handle.subscribe(signal, sink.clone());
        }

        handle.update(&self.settings.transport_settings());

        let base = self.settings.base();
        let video = self
            .host
            .create_encoder(
                EncoderKind::Video,
                &base.video_encoder_id,
                &base.video_encoder_settings(),
            )
            .ok_or_else(|| DomainError::EncoderCreationFailed {
                kind: EncoderKind::Video.to_string(),
                id: base.video_encoder_id.clone(),
            })?;
        let audio = self
            .host
            .create_encoder(
                EncoderKind::Audio,
                &base.audio_encoder_id,
                &base.audio_encoder_settings(),
            )
            .ok_or_else(|| DomainError::EncoderCreationFailed {
                kind: EncoderKind::Audio.to_string(),
                id: base.audio_encoder_id.clone(),
            })?;

        handle.attach_encoder(video, PRIMARY_TRACK);
        handle.attach_encoder(audio, PRIMARY_TRACK);

        self.handle = Some(handle);
        Ok(())
    }

    fn apply(&mut self, event: LifecycleEvent, reason: Option<String>) {
        match self.lifecycle.apply(event, reason) {
            Some(transition) => {
                tracing::info!(
                    service = self.name(),
                    from = %transition.from,
                    to = %transition.to,
                    reason = transition.reason.as_deref().unwrap_or(""),
                    "Output state changed"
                );
                self.metrics.report_state_change(self.name(), &transition.to);
                self.observer.on_state_changed(self.name(), transition.to);
            }
            None => {
                tracing::debug!(
                    service = self.name(),
                    state = %self.state(),
                    "{:?} left state unchanged",
                    event
                );
            }
        }
    }
}
