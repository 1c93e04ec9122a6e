use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde_json::Value;
use stream_outputs::{
    ConfigStore, Document, DocumentBackend, DomainError, Encoder, EncoderKind, LoopbackTransportHost,
    MemoryBackend, MetricsReporter, OutputHandle, OutputKind, OutputRegistry, OutputSettings,
    OutputState, RtmpOutputConfig, ServiceDescriptor, Settings, SignalKind, SignalSink,
    StateObserver, TransportHost, TransportSignal, WhipOutputConfig,
};

type Log = Arc<Mutex<Vec<String>>>;

#[derive(Default)]
struct HostState {
    calls: Vec<String>,
    handles: Vec<HashMap<SignalKind, Arc<dyn SignalSink>>>,
    updates: Vec<Settings>,
}

/// Transport host that records every call and lets tests raise signals
#[derive(Clone, Default)]
struct FakeHost {
    state: Arc<Mutex<HostState>>,
    log: Log,
    refuse_outputs: bool,
    refuse_start: bool,
}

impl FakeHost {
    fn with_log(log: Log) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    fn handle_count(&self) -> usize {
        self.state.lock().unwrap().handles.len()
    }

    fn last_update(&self) -> Settings {
        self.state.lock().unwrap().updates.last().cloned().unwrap()
    }

    /// Raise a signal from the handle created `handle`-th (0-based)
    fn emit_from(&self, handle: usize, signal: TransportSignal) {
        let sink = self.state.lock().unwrap().handles[handle]
            .get(&signal.kind())
            .cloned()
            .expect("signal subscribed");
        sink.deliver(signal);
    }

    fn emit(&self, signal: TransportSignal) {
        let last = self.handle_count() - 1;
        self.emit_from(last, signal);
    }

    fn record(&self, call: String) {
        self.log.lock().unwrap().push(call.clone());
        self.state.lock().unwrap().calls.push(call);
    }
}

impl TransportHost for FakeHost {
    fn create_output(&self, kind: OutputKind, name: &str) -> Option<Box<dyn OutputHandle>> {
        self.record(format!("create:{}:{}", kind, name));
        if self.refuse_outputs {
            return None;
        }
        let index = {
            let mut state = self.state.lock().unwrap();
            state.handles.push(HashMap::new());
            state.handles.len() - 1
        };
        Some(Box::new(FakeHandle {
            host: self.clone(),
            index,
            active: false,
        }))
    }

    fn create_encoder(
        &self,
        kind: EncoderKind,
        id: &str,
        settings: &Settings,
    ) -> Option<Box<dyn Encoder>> {
        self.record(format!("encoder:{}:{}", kind, id));
        if id == "missing_encoder" {
            return None;
        }
        Some(Box::new(FakeEncoder {
            id: id.to_string(),
            kind,
            settings: settings.clone(),
        }))
    }
}

struct FakeEncoder {
    id: String,
    kind: EncoderKind,
    settings: Settings,
}

impl Encoder for FakeEncoder {
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

struct FakeHandle {
    host: FakeHost,
    index: usize,
    active: bool,
}

impl OutputHandle for FakeHandle {
    fn subscribe(&mut self, kind: SignalKind, sink: Arc<dyn SignalSink>) {
        self.host.record(format!("subscribe:{}", kind.name()));
        self.host.state.lock().unwrap().handles[self.index].insert(kind, sink);
    }

    fn update(&mut self, settings: &Settings) {
        self.host.record("update".to_string());
        self.host.state.lock().unwrap().updates.push(settings.clone());
    }

    fn attach_encoder(&mut self, encoder: Box<dyn Encoder>, track: usize) {
        self.host.record(format!("attach:{}:{}", encoder.kind(), track));
    }

    fn start(&mut self) -> stream_outputs::Result<()> {
        self.host.record("start".to_string());
        if self.host.refuse_start {
            return Err(DomainError::StartFailed("refused".to_string()));
        }
        self.active = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.host.record("stop".to_string());
        self.active = false;
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

impl Drop for FakeHandle {
    fn drop(&mut self) {
        self.host.record(format!("release:{}", self.index));
    }
}

#[derive(Default)]
struct RecordingObserver {
    changes: Mutex<Vec<(String, OutputState)>>,
}

impl RecordingObserver {
    fn states_of(&self, service: &str) -> Vec<OutputState> {
        self.changes
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == service)
            .map(|(_, state)| *state)
            .collect()
    }
}

impl StateObserver for RecordingObserver {
    fn on_state_changed(&self, service: &str, state: OutputState) {
        self.changes.lock().unwrap().push((service.to_string(), state));
    }
}

#[derive(Default)]
struct CountingMetrics {
    counts: Mutex<HashMap<String, u32>>,
}

impl CountingMetrics {
    fn count(&self, what: &str, service: &str) -> u32 {
        let key = format!("{}:{}", what, service);
        self.counts.lock().unwrap().get(&key).copied().unwrap_or(0)
    }

    fn bump(&self, what: &str, service: &str) {
        *self
            .counts
            .lock()
            .unwrap()
            .entry(format!("{}:{}", what, service))
            .or_default() += 1;
    }
}

impl MetricsReporter for CountingMetrics {
    fn report_state_change(&self, service: &str, _state: &OutputState) {
        self.bump("state", service);
    }

    fn report_start_attempt(&self, service: &str) {
        self.bump("attempt", service);
    }

    fn report_start_failure(&self, service: &str) {
        self.bump("failure", service);
    }

    fn report_reconnect(&self, service: &str) {
        self.bump("reconnect", service);
    }

    fn report_uptime(&self, _service: &str, _uptime_secs: f64) {}
}

/// Memory backend that writes into the shared call log on every persist
struct LoggedBackend {
    inner: MemoryBackend,
    log: Log,
}

impl DocumentBackend for LoggedBackend {
    fn read_document(&self) -> stream_outputs::Result<Option<Document>> {
        self.inner.read_document()
    }

    fn write_document_atomic(&self, document: &Document) -> stream_outputs::Result<()> {
        self.log.lock().unwrap().push("persist".to_string());
        self.inner.write_document_atomic(document)
    }

    fn location(&self) -> String {
        self.inner.location()
    }
}

struct Harness {
    registry: OutputRegistry,
    host: FakeHost,
    observer: Arc<RecordingObserver>,
    metrics: Arc<CountingMetrics>,
    backend: MemoryBackend,
    log: Log,
}

fn harness_with(host: FakeHost, backend: MemoryBackend) -> Harness {
    let log = host.log.clone();
    let observer = Arc::new(RecordingObserver::default());
    let metrics = Arc::new(CountingMetrics::default());
    let store = ConfigStore::new(Box::new(LoggedBackend {
        inner: backend.clone(),
        log: log.clone(),
    }));
    let registry = OutputRegistry::new(
        store,
        Arc::new(host.clone()),
        observer.clone(),
        metrics.clone(),
    );
    Harness {
        registry,
        host,
        observer,
        metrics,
        backend,
        log,
    }
}

fn harness() -> Harness {
    harness_with(FakeHost::with_log(Log::default()), MemoryBackend::new())
}

fn valid_rtmp(server: &str, key: &str) -> OutputSettings {
    OutputSettings::Rtmp(RtmpOutputConfig::default().with_server(server, key))
}

fn configured_youtube() -> Harness {
    let mut h = harness();
    h.registry
        .configure("YouTube", valid_rtmp("rtmp://a.rtmp.youtube.com/live2", "yt-key"))
        .unwrap();
    h
}

fn state(h: &Harness, service: &str) -> OutputState {
    h.registry.output(service).unwrap().state()
}

#[test]
fn test_outputs_created_in_service_order() {
    let h = harness();
    let names: Vec<_> = h.registry.outputs().iter().map(|o| o.name()).collect();
    assert_eq!(names, vec!["PlayFame", "YouTube", "Twitch", "Facebook", "Kick"]);

    for output in h.registry.outputs() {
        assert_eq!(output.state(), OutputState::Unused);
        assert_eq!(output.settings().kind(), output.service().kind());
    }
    assert_eq!(h.host.handle_count(), 0);
}

#[test]
fn test_sequential_scenario() {
    let mut h = harness();
    assert_eq!(state(&h, "YouTube"), OutputState::Unused);

    h.registry
        .configure("YouTube", valid_rtmp("rtmp://a.rtmp.youtube.com/live2", "yt-key"))
        .unwrap();
    assert_eq!(state(&h, "YouTube"), OutputState::Offline);

    h.registry.start("YouTube").unwrap();
    assert_eq!(state(&h, "YouTube"), OutputState::Connecting);

    h.host.emit(TransportSignal::Started);
    // Signals only apply once drained on the owner thread
    assert_eq!(state(&h, "YouTube"), OutputState::Connecting);
    assert_eq!(h.registry.drain_pending(), 1);
    assert_eq!(state(&h, "YouTube"), OutputState::Online);

    h.host.emit(TransportSignal::Stopped { code: 0 });
    h.registry.drain_pending();
    assert_eq!(state(&h, "YouTube"), OutputState::Offline);

    assert_eq!(
        h.observer.states_of("YouTube"),
        vec![
            OutputState::Offline,
            OutputState::Connecting,
            OutputState::Online,
            OutputState::Offline
        ]
    );
}

#[test]
fn test_setup_sequence_order() {
    let mut h = configured_youtube();
    h.registry.start("YouTube").unwrap();

    assert_eq!(
        h.host.calls(),
        vec![
            "create:rtmp_output:YouTube",
            "subscribe:start",
            "subscribe:stop",
            "subscribe:reconnect",
            "subscribe:reconnect_success",
            "update",
            "encoder:video:obs_x264",
            "encoder:audio:ffmpeg_aac",
            "attach:video:0",
            "attach:audio:0",
            "start",
        ]
    );

    let settings = h.host.last_update();
    assert_eq!(settings["server"], "rtmp://a.rtmp.youtube.com/live2");
    assert_eq!(settings["key"], "yt-key");
    assert_eq!(settings["auto_reconnect"], true);
    assert_eq!(settings["max_retries"], 20);
    assert!(settings.get("backup_server").is_none());
}

#[test]
fn test_handle_creation_failure_goes_to_error() {
    let host = FakeHost {
        refuse_outputs: true,
        ..FakeHost::with_log(Log::default())
    };
    let mut h = harness_with(host, MemoryBackend::new());
    h.registry
        .configure("Twitch", valid_rtmp("rtmp://live.twitch.tv/app", "live_1"))
        .unwrap();

    let result = h.registry.start("Twitch");
    assert!(matches!(result, Err(DomainError::HandleCreationFailed(_))));
    assert_eq!(state(&h, "Twitch"), OutputState::Error);
    assert!(!h.registry.output("Twitch").unwrap().has_handle());

    let states = h.observer.states_of("Twitch");
    assert!(!states.contains(&OutputState::Connecting));
    assert!(!states.contains(&OutputState::Online));
    assert!(!h.host.calls().iter().any(|c| c.starts_with("encoder")));
    assert_eq!(h.metrics.count("failure", "Twitch"), 1);
}

#[test]
fn test_encoder_failure_releases_handle() {
    let mut h = harness();
    let mut settings = valid_rtmp("rtmp://live.twitch.tv/app", "live_1");
    settings.base_mut().video_encoder_id = "missing_encoder".to_string();
    h.registry.configure("Twitch", settings).unwrap();

    let result = h.registry.start("Twitch");
    assert!(matches!(result, Err(DomainError::EncoderCreationFailed { .. })));
    assert_eq!(state(&h, "Twitch"), OutputState::Error);

    let calls = h.host.calls();
    assert!(calls.contains(&"release:0".to_string()));
    assert!(!calls.contains(&"start".to_string()));
}

#[test]
fn test_refused_start_goes_to_error() {
    let host = FakeHost {
        refuse_start: true,
        ..FakeHost::with_log(Log::default())
    };
    let mut h = harness_with(host, MemoryBackend::new());
    h.registry
        .configure("Kick", valid_rtmp("rtmps://kick.example.com/app", "sk"))
        .unwrap();

    assert!(h.registry.start("Kick").is_err());
    assert_eq!(state(&h, "Kick"), OutputState::Error);
    assert!(!h.registry.output("Kick").unwrap().has_handle());
}

#[test]
fn test_invalid_config_blocks_start() {
    let mut h = harness();
    let result = h.registry.start("Facebook");

    assert!(matches!(result, Err(DomainError::InvalidConfig(_))));
    assert_eq!(state(&h, "Facebook"), OutputState::Error);
    assert_eq!(h.host.handle_count(), 0);
    assert!(h.host.calls().is_empty());
}

#[test]
fn test_abnormal_stop_goes_to_error() {
    let mut h = configured_youtube();
    h.registry.start("YouTube").unwrap();
    h.host.emit(TransportSignal::Stopped { code: -2 });
    h.registry.drain_pending();
    assert_eq!(state(&h, "YouTube"), OutputState::Error);

    // Error allows another start
    h.registry.start("YouTube").unwrap();
    assert_eq!(state(&h, "YouTube"), OutputState::Connecting);
}

#[test]
fn test_repeated_reconnecting_is_idempotent() {
    let mut h = configured_youtube();
    h.registry.start("YouTube").unwrap();
    h.host.emit(TransportSignal::Started);
    for _ in 0..3 {
        h.host.emit(TransportSignal::Reconnecting);
    }
    h.registry.drain_pending();
    assert_eq!(state(&h, "YouTube"), OutputState::Connecting);

    h.host.emit(TransportSignal::ReconnectSuccess);
    h.registry.drain_pending();
    assert_eq!(state(&h, "YouTube"), OutputState::Online);

    assert_eq!(
        h.observer.states_of("YouTube"),
        vec![
            OutputState::Offline,
            OutputState::Connecting,
            OutputState::Online,
            OutputState::Connecting,
            OutputState::Online
        ]
    );
    assert_eq!(h.metrics.count("reconnect", "YouTube"), 3);
}

#[test]
fn test_start_while_active_is_rejected() {
    let mut h = configured_youtube();
    h.registry.start("YouTube").unwrap();

    let result = h.registry.start("YouTube");
    assert!(matches!(
        result,
        Err(DomainError::AlreadyActive {
            state: OutputState::Connecting,
            ..
        })
    ));
    assert_eq!(h.host.handle_count(), 1);
}

#[test]
fn test_stop_forces_offline() {
    let mut h = configured_youtube();
    h.registry.start("YouTube").unwrap();
    h.host.emit(TransportSignal::Started);
    h.registry.drain_pending();

    h.registry.stop("YouTube").unwrap();
    assert_eq!(state(&h, "YouTube"), OutputState::Offline);
    assert!(h.host.calls().contains(&"stop".to_string()));

    // Not active: still Offline, no stop command issued
    let stops = h.host.calls().iter().filter(|c| *c == "stop").count();
    h.registry.stop("YouTube").unwrap();
    assert_eq!(state(&h, "YouTube"), OutputState::Offline);
    assert_eq!(h.host.calls().iter().filter(|c| *c == "stop").count(), stops);

    // Stopping an output with no usable config also lands on Offline
    assert_eq!(state(&h, "Kick"), OutputState::Unused);
    h.registry.stop("Kick").unwrap();
    assert_eq!(state(&h, "Kick"), OutputState::Offline);
    assert_eq!(h.host.calls().iter().filter(|c| *c == "stop").count(), stops);
}

#[test]
fn test_late_stop_after_user_stop_is_ignored() {
    let mut h = configured_youtube();
    h.registry.start("YouTube").unwrap();
    h.registry.stop("YouTube").unwrap();

    h.host.emit(TransportSignal::Stopped { code: -5 });
    h.registry.drain_pending();
    assert_eq!(state(&h, "YouTube"), OutputState::Offline);
}

#[test]
fn test_signals_from_released_handle_are_dropped() {
    let mut h = configured_youtube();
    h.registry.start("YouTube").unwrap();
    h.registry.stop("YouTube").unwrap();
    h.registry.start("YouTube").unwrap();
    assert_eq!(h.registry.output("YouTube").unwrap().generation(), 2);

    h.host.emit_from(0, TransportSignal::Started);
    h.registry.drain_pending();
    assert_eq!(state(&h, "YouTube"), OutputState::Connecting);

    h.host.emit_from(1, TransportSignal::Started);
    h.registry.drain_pending();
    assert_eq!(state(&h, "YouTube"), OutputState::Online);
}

#[test]
fn test_invalid_save_persists_and_drops_to_unused() {
    let mut h = configured_youtube();
    let result = h
        .registry
        .configure("YouTube", valid_rtmp("rtmp://a.rtmp.youtube.com/live2", ""));

    assert!(matches!(result, Err(DomainError::InvalidConfig(_))));
    assert_eq!(state(&h, "YouTube"), OutputState::Unused);

    let persisted = h.backend.persisted().unwrap();
    assert_eq!(persisted["outputs"]["youtube_stream_key"], Value::from(""));
}

#[test]
fn test_configure_while_online_keeps_state() {
    let mut h = configured_youtube();
    h.registry.start("YouTube").unwrap();
    h.host.emit(TransportSignal::Started);
    h.registry.drain_pending();

    let result = h
        .registry
        .configure("YouTube", valid_rtmp("rtmp://a.rtmp.youtube.com/live2", "new-key"));
    assert!(result.is_ok());
    assert_eq!(state(&h, "YouTube"), OutputState::Online);
}

#[test]
fn test_configure_rejects_wrong_variant() {
    let mut h = harness();
    let result = h
        .registry
        .configure("PlayFame", valid_rtmp("rtmp://example.com/app", "key"));
    assert!(matches!(result, Err(DomainError::InvalidConfig(_))));
    assert_eq!(state(&h, "PlayFame"), OutputState::Unused);
}

#[test]
fn test_whip_start_pushes_bearer_token() {
    let mut h = harness();
    let whip = WhipOutputConfig {
        access_token: "oauth-token".to_string(),
        stream_key: "pf-key".to_string(),
        ingest_url: "https://ingest.playfame.example/whip".to_string(),
        expires_at: Some(chrono::Utc::now() + chrono::Duration::hours(2)),
        ..WhipOutputConfig::default()
    };
    h.registry
        .configure("PlayFame", OutputSettings::Whip(whip))
        .unwrap();
    h.registry.start("PlayFame").unwrap();

    assert_eq!(h.host.calls()[0], "create:whip_output:PlayFame");
    let settings = h.host.last_update();
    assert_eq!(settings["server"], "https://ingest.playfame.example/whip");
    assert_eq!(settings["bearer_token"], "oauth-token");
    assert_eq!(settings["whip_transport"], "tcp");
}

#[test]
fn test_unknown_output() {
    let mut h = harness();
    assert!(matches!(
        h.registry.start("Vimeo"),
        Err(DomainError::UnknownOutput(name)) if name == "Vimeo"
    ));
    assert!(h.registry.output("vimeo").is_none());
    assert!(h.registry.output("youtube").is_some());
}

#[test]
fn test_saved_config_loads_offline() {
    let backend = MemoryBackend::new();
    {
        let mut h = harness_with(FakeHost::with_log(Log::default()), backend.clone());
        h.registry
            .configure("Twitch", valid_rtmp("rtmp://live.twitch.tv/app", "live_1"))
            .unwrap();
    }

    let h = harness_with(FakeHost::with_log(Log::default()), backend);
    assert_eq!(state(&h, "Twitch"), OutputState::Offline);
    assert_eq!(state(&h, "YouTube"), OutputState::Unused);
}

#[test]
fn test_corrupt_store_starts_all_unused() {
    let h = harness_with(FakeHost::with_log(Log::default()), MemoryBackend::corrupted());
    for output in h.registry.outputs() {
        assert_eq!(output.state(), OutputState::Unused);
    }
}

#[test]
fn test_commands_apply_when_drained() {
    let mut h = configured_youtube();
    let commands = h.registry.command_sender();

    assert!(commands.request_start("YouTube"));
    assert_eq!(state(&h, "YouTube"), OutputState::Offline);
    h.registry.drain_pending();
    assert_eq!(state(&h, "YouTube"), OutputState::Connecting);

    assert!(commands.request_stop("youtube"));
    h.registry.drain_pending();
    assert_eq!(state(&h, "YouTube"), OutputState::Offline);

    assert!(commands.request_config(
        "Kick",
        valid_rtmp("rtmps://kick.example.com/app", "kick-key")
    ));
    h.registry.drain_pending();
    assert_eq!(state(&h, "Kick"), OutputState::Offline);
}

#[test]
fn test_shutdown_persists_before_releasing() {
    let mut h = configured_youtube();
    h.registry.start("YouTube").unwrap();
    h.host.emit(TransportSignal::Started);
    h.registry.drain_pending();
    h.log.lock().unwrap().clear();

    h.registry.shutdown().unwrap();

    let log = h.log.lock().unwrap().clone();
    assert_eq!(log, vec!["persist", "stop", "release:0"]);
    assert_eq!(state(&h, "YouTube"), OutputState::Offline);

    // Second call is a no-op
    h.registry.shutdown().unwrap();
    assert_eq!(h.log.lock().unwrap().len(), 3);
}

#[test]
fn test_loopback_end_to_end() {
    let backend = MemoryBackend::new();
    let store = ConfigStore::new(Box::new(backend.clone()));
    let observer = Arc::new(RecordingObserver::default());
    let host = LoopbackTransportHost::new(Duration::from_millis(10));
    let mut registry = OutputRegistry::new(
        store,
        Arc::new(host),
        observer.clone(),
        Arc::new(CountingMetrics::default()),
    );
    let commands = registry.command_sender();
    let running = registry.running_flag();

    commands.request_config("Twitch", valid_rtmp("rtmp://live.twitch.tv/app", "live_1"));
    commands.request_start("Twitch");
    commands.request_config(
        "Kick",
        valid_rtmp("rtmps://unreachable.example.com/app", "kick-key"),
    );
    commands.request_start("Kick");

    let worker = thread::spawn(move || {
        registry.run().unwrap();
        registry
    });

    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while observer.states_of("Twitch").last() != Some(&OutputState::Online)
        || observer.states_of("Kick").last() != Some(&OutputState::Error)
    {
        assert!(std::time::Instant::now() < deadline, "outputs never settled");
        thread::sleep(Duration::from_millis(10));
    }

    running.store(false, Ordering::SeqCst);
    let registry = worker.join().unwrap();

    assert_eq!(registry.output("Twitch").unwrap().state(), OutputState::Offline);
    assert_eq!(registry.output("Kick").unwrap().state(), OutputState::Error);
    let persisted = backend.persisted().unwrap();
    assert_eq!(persisted["outputs"]["twitch_stream_key"], "live_1");
    assert!(ServiceDescriptor::all()
        .iter()
        .all(|s| registry.output(s.name()).is_some()));
}
