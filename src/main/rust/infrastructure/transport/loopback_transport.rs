use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde_json::Value;

use crate::domain::errors::{DomainError, Result};
use crate::domain::ports::{Encoder, HostCatalog, OutputHandle, SignalSink, TransportHost};
use crate::domain::value_objects::{
    stop_code, EncoderKind, OutputKind, ReconnectPolicy, Settings, SignalKind, TransportSignal,
};

const VIDEO_ENCODERS: [&str; 4] = ["obs_x264", "jim_nvenc", "obs_qsv11", "h264_texture_amf"];
const AUDIO_ENCODERS: [&str; 2] = ["ffmpeg_aac", "ffmpeg_opus"];
const SCENES: [&str; 2] = ["Scene", "Starting Soon"];

/// Servers containing this marker never complete the handshake
const UNREACHABLE_MARKER: &str = "unreachable";

/// In-process transport host.
///
/// Handles run one worker thread per session and raise signals from it,
/// the way a real network stack would: `start` after the handshake delay,
/// `reconnect`/`reconnect_success` when a dropped connection is recovered
/// within the reconnect policy, and `stop` with a host stop code.
#[derive(Debug, Clone)]
pub struct LoopbackTransportHost {
    connect_delay: Duration,
    drop_after: Option<Duration>,
    attempts_to_recover: u32,
    refuse_outputs: bool,
}

impl LoopbackTransportHost {
    pub fn new(connect_delay: Duration) -> Self {
        Self {
            connect_delay,
            drop_after: None,
            attempts_to_recover: 1,
            refuse_outputs: false,
        }
    }

    /// Drop every connection after it has been online for `after`; the
    /// transport recovers on reconnect attempt `attempts_to_recover`
    pub fn with_connection_drop(mut self, after: Duration, attempts_to_recover: u32) -> Self {
        self.drop_after = Some(after);
        self.attempts_to_recover = attempts_to_recover.max(1);
        self
    }

    /// A host that cannot create output handles
    pub fn refusing() -> Self {
        Self {
            refuse_outputs: true,
            ..Self::new(Duration::ZERO)
        }
    }
}

impl TransportHost for LoopbackTransportHost {
    fn create_output(&self, kind: OutputKind, name: &str) -> Option<Box<dyn OutputHandle>> {
        if self.refuse_outputs {
            tracing::warn!(output = name, "Refusing to create {}", kind);
            return None;
        }
        tracing::debug!(output = name, "Created {}", kind);
        Some(Box::new(LoopbackOutput::new(name, self.clone())))
    }

    fn create_encoder(
        &self,
        kind: EncoderKind,
        id: &str,
        settings: &Settings,
    ) -> Option<Box<dyn Encoder>> {
        let known = match kind {
            EncoderKind::Video => VIDEO_ENCODERS.contains(&id),
            EncoderKind::Audio => AUDIO_ENCODERS.contains(&id),
        };
        if !known {
            tracing::warn!("Unknown {} encoder '{}'", kind, id);
            return None;
        }
        Some(Box::new(LoopbackEncoder {
            id: id.to_string(),
            kind,
            settings: settings.clone(),
        }))
    }
}

impl HostCatalog for LoopbackTransportHost {
    fn video_encoders(&self) -> Vec<String> {
        VIDEO_ENCODERS.iter().map(|s| s.to_string()).collect()
    }

    fn audio_encoders(&self) -> Vec<String> {
        AUDIO_ENCODERS.iter().map(|s| s.to_string()).collect()
    }

    fn scenes(&self) -> Vec<String> {
        SCENES.iter().map(|s| s.to_string()).collect()
    }
}

#[derive(Debug)]
struct LoopbackEncoder {
    id: String,
    kind: EncoderKind,
    settings: Settings,
}

impl Encoder for LoopbackEncoder {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> EncoderKind {
        self.kind
    }

    fn settings(&self) -> &Settings {
        &self.settings
    }
}

type Subscribers = HashMap<SignalKind, Vec<Arc<dyn SignalSink>>>;

struct Session {
    stop_tx: Sender<()>,
    worker: JoinHandle<()>,
}

struct LoopbackOutput {
    name: String,
    host: LoopbackTransportHost,
    settings: Settings,
    subscribers: Subscribers,
    encoders: Vec<(usize, Box<dyn Encoder>)>,
    active: Arc<AtomicBool>,
    session: Option<Session>,
}

impl LoopbackOutput {
    fn new(name: &str, host: LoopbackTransportHost) -> Self {
        Self {
            name: name.to_string(),
            host,
            settings: Settings::new(),
            subscribers: Subscribers::new(),
            encoders: Vec::new(),
            active: Arc::new(AtomicBool::new(false)),
            session: None,
        }
    }

    fn has_encoder(&self, kind: EncoderKind) -> bool {
        self.encoders.iter().any(|(_, e)| e.kind() == kind)
    }

    fn join_session(&mut self) {
        if let Some(session) = self.session.take() {
            let _ = session.stop_tx.send(());
            if session.worker.join().is_err() {
                tracing::error!(output = %self.name, "Transport worker panicked");
            }
        }
    }
}

impl OutputHandle for LoopbackOutput {
    fn subscribe(&mut self, kind: SignalKind, sink: Arc<dyn SignalSink>) {
        self.subscribers.entry(kind).or_default().push(sink);
    }

    fn update(&mut self, settings: &Settings) {
        for (key, value) in settings {
            self.settings.insert(key.clone(), value.clone());
        }
    }

    fn attach_encoder(&mut self, encoder: Box<dyn Encoder>, track: usize) {
        tracing::debug!(
            output = %self.name,
            track,
            bitrate = ?encoder.settings().get("bitrate"),
            "Attached {} encoder '{}'",
            encoder.kind(),
            encoder.id()
        );
        self.encoders.push((track, encoder));
    }

    fn start(&mut self) -> Result<()> {
        if self.active.load(Ordering::SeqCst) {
            return Err(DomainError::StartFailed(format!("{} is already active", self.name)));
        }
        let server = self
            .settings
            .get("server")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        if server.is_empty() {
            return Err(DomainError::StartFailed("no server configured".to_string()));
        }
        if !self.has_encoder(EncoderKind::Video) || !self.has_encoder(EncoderKind::Audio) {
            return Err(DomainError::StartFailed("encoders not attached".to_string()));
        }

        // Reap a finished previous session
        self.join_session();

        let plan = SessionPlan {
            connect_delay: self.host.connect_delay,
            reachable: !server.contains(UNREACHABLE_MARKER),
            drop_after: self.host.drop_after,
            attempts_to_recover: self.host.attempts_to_recover,
            policy: ReconnectPolicy::from_settings(&self.settings),
        };
        let emitter = Emitter {
            subscribers: self.subscribers.clone(),
        };
        let (stop_tx, stop_rx) = mpsc::channel();
        let active = self.active.clone();
        active.store(true, Ordering::SeqCst);

        let thread_name = format!("loopback-{}", self.name.to_lowercase());
        let worker = thread::Builder::new()
            .name(thread_name)
            .spawn(move || {
                run_session(&plan, &stop_rx, &emitter);
                active.store(false, Ordering::SeqCst);
            })
            .map_err(|e| {
                self.active.store(false, Ordering::SeqCst);
                DomainError::StartFailed(e.to_string())
            })?;

        tracing::info!(output = %self.name, server = %server, "Loopback session started");
        self.session = Some(Session { stop_tx, worker });
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(session) = &self.session {
            let _ = session.stop_tx.send(());
        }
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl Drop for LoopbackOutput {
    fn drop(&mut self) {
        self.join_session();
    }
}

struct SessionPlan {
    connect_delay: Duration,
    reachable: bool,
    drop_after: Option<Duration>,
    attempts_to_recover: u32,
    policy: Option<ReconnectPolicy>,
}

struct Emitter {
    subscribers: Subscribers,
}

impl Emitter {
    fn emit(&self, signal: TransportSignal) {
        if let Some(sinks) = self.subscribers.get(&signal.kind()) {
            for sink in sinks {
                sink.deliver(signal);
            }
        }
    }
}

/// Wait for `timeout`; true when a stop was requested or the handle dropped
fn stop_requested(stop_rx: &Receiver<()>, timeout: Duration) -> bool {
    match stop_rx.recv_timeout(timeout) {
        Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
        Err(RecvTimeoutError::Timeout) => false,
    }
}

fn run_session(plan: &SessionPlan, stop_rx: &Receiver<()>, emitter: &Emitter) {
    if stop_requested(stop_rx, plan.connect_delay) {
        emitter.emit(TransportSignal::Stopped { code: stop_code::SUCCESS });
        return;
    }
    if !plan.reachable {
        emitter.emit(TransportSignal::Stopped { code: stop_code::CONNECT_FAILED });
        return;
    }
    emitter.emit(TransportSignal::Started);

    let drop_after = match plan.drop_after {
        Some(after) => after,
        None => {
            let _ = stop_rx.recv();
            emitter.emit(TransportSignal::Stopped { code: stop_code::SUCCESS });
            return;
        }
    };

    loop {
        if stop_requested(stop_rx, drop_after) {
            emitter.emit(TransportSignal::Stopped { code: stop_code::SUCCESS });
            return;
        }

        let policy = match &plan.policy {
            Some(policy) => policy,
            None => {
                emitter.emit(TransportSignal::Stopped { code: stop_code::DISCONNECTED });
                return;
            }
        };

        let mut attempt = 1;
        loop {
            if !policy.should_retry(attempt) {
                emitter.emit(TransportSignal::Stopped { code: stop_code::DISCONNECTED });
                return;
            }
            emitter.emit(TransportSignal::Reconnecting);
            if stop_requested(stop_rx, policy.delay()) {
                emitter.emit(TransportSignal::Stopped { code: stop_code::SUCCESS });
                return;
            }
            if attempt >= plan.attempts_to_recover {
                emitter.emit(TransportSignal::ReconnectSuccess);
                break;
            }
            attempt += 1;
        }
    }
}
