use std::fs;

use chrono::{Duration as ChronoDuration, Utc};
use serde_json::Value;
use stream_outputs::{
    ConfigStore, ConfigValue, DomainError, JsonFileBackend, LoadOutcome, OutputConfig,
    OutputSettings, RtmpOutputConfig, Section, ServiceDescriptor, ValueType, WhipOutputConfig,
};
use tempfile::TempDir;

fn file_store(dir: &TempDir) -> (ConfigStore, JsonFileBackend) {
    let backend = JsonFileBackend::new(dir.path().join("outputs.json"));
    let mut store = ConfigStore::new(Box::new(backend.clone()));
    store.load();
    (store, backend)
}

fn reload(backend: &JsonFileBackend) -> (ConfigStore, LoadOutcome) {
    let mut store = ConfigStore::new(Box::new(backend.clone()));
    let outcome = store.load();
    (store, outcome)
}

#[test]
fn test_fresh_store_initializes_empty() {
    let dir = TempDir::new().unwrap();
    let backend = JsonFileBackend::new(dir.path().join("outputs.json"));
    let (store, outcome) = reload(&backend);

    assert_eq!(outcome, LoadOutcome::Initialized);
    assert!(store.is_loaded());
    assert!(store.section("outputs").is_none());
}

#[test]
fn test_set_value_accepts_only_declared_type_within_bounds() {
    let dir = TempDir::new().unwrap();
    let (mut store, _) = file_store(&dir);
    let min = ConfigValue::Int(50);
    let max = ConfigValue::Int(50_000);

    assert!(store
        .set_value("outputs", "bitrate", 2500, Some(ValueType::Int), Some(&min), Some(&max))
        .is_ok());

    let cases: Vec<(ConfigValue, Option<ValueType>)> = vec![
        (ConfigValue::Int(49), Some(ValueType::Int)),
        (ConfigValue::Int(50_001), Some(ValueType::Int)),
        (ConfigValue::String("3000".into()), Some(ValueType::Int)),
        (ConfigValue::Double(3000.0), Some(ValueType::Int)),
        (ConfigValue::Int64(3000), Some(ValueType::Int)),
    ];
    for (value, declared) in cases {
        let result = store.set_value("outputs", "bitrate", value, declared, Some(&min), Some(&max));
        assert!(result.is_err());
    }

    // Failed writes leave the previous value in place
    assert_eq!(store.get("outputs", "bitrate", 0i32), 2500);
}

#[test]
fn test_set_value_errors_are_typed() {
    let dir = TempDir::new().unwrap();
    let (mut store, _) = file_store(&dir);

    let result = store.set_value("s", "k", "text", Some(ValueType::Bool), None, None);
    assert!(matches!(
        result,
        Err(DomainError::TypeMismatch {
            expected: ValueType::Bool,
            actual: ValueType::String
        })
    ));

    let min = ConfigValue::Int(1);
    let result = store.set_value("s", "k", vec![1u8, 2], None, Some(&min), None);
    assert!(matches!(result, Err(DomainError::RangeUnsupported(ValueType::Bytes))));

    let min = ConfigValue::String("a".into());
    let result = store.set_value("s", "k", 5, None, Some(&min), None);
    assert!(matches!(result, Err(DomainError::BoundNotConvertible(ValueType::Int))));

    assert!(store.section("s").is_none());
}

#[test]
fn test_every_type_round_trips_through_disk() {
    let dir = TempDir::new().unwrap();
    let (mut store, backend) = file_store(&dir);

    store.set("general", "int", 42).unwrap();
    store.set("general", "int64", 9_000_000_000i64).unwrap();
    store.set("general", "double", 0.25).unwrap();
    store.set("general", "bool", true).unwrap();
    store.set("general", "string", "hello").unwrap();
    store.set("general", "bytes", vec![0u8, 159, 255]).unwrap();
    store.save().unwrap();

    let (store, outcome) = reload(&backend);
    assert_eq!(outcome, LoadOutcome::Loaded);
    assert_eq!(store.get("general", "int", 0i32), 42);
    assert_eq!(store.get("general", "int64", 0i64), 9_000_000_000);
    assert_eq!(store.get("general", "double", 0.0f64), 0.25);
    assert!(store.get("general", "bool", false));
    assert_eq!(store.get("general", "string", String::new()), "hello");
    assert_eq!(store.get("general", "bytes", Vec::<u8>::new()), vec![0u8, 159, 255]);
}

#[test]
fn test_missing_values_return_default() {
    let dir = TempDir::new().unwrap();
    let (mut store, _) = file_store(&dir);
    store.set("outputs", "present", 1).unwrap();

    assert_eq!(
        store.get_value("outputs", "absent", ConfigValue::Int(7)),
        ConfigValue::Int(7)
    );
    assert_eq!(
        store.get_value("missing", "present", ConfigValue::String("d".into())),
        ConfigValue::String("d".into())
    );
    // Stored int does not coerce to a string default
    assert_eq!(store.get("outputs", "present", "d".to_string()), "d");
}

#[test]
fn test_corrupt_document_loads_empty() {
    let dir = TempDir::new().unwrap();
    let backend = JsonFileBackend::new(dir.path().join("outputs.json"));
    fs::write(backend.path(), "{ not json").unwrap();

    let (store, outcome) = reload(&backend);
    assert_eq!(outcome, LoadOutcome::Reset);
    assert!(store.is_loaded());
    assert_eq!(store.get("outputs", "youtube_fps", 60i32), 60);
    assert_eq!(store.get("outputs", "youtube_stream_key", String::new()), "");
}

#[test]
fn test_non_object_document_is_corrupt() {
    let dir = TempDir::new().unwrap();
    let backend = JsonFileBackend::new(dir.path().join("outputs.json"));
    fs::write(backend.path(), "[1, 2, 3]").unwrap();

    let (_, outcome) = reload(&backend);
    assert_eq!(outcome, LoadOutcome::Reset);
}

#[test]
fn test_backup_recovers_previous_save() {
    let dir = TempDir::new().unwrap();
    let (mut store, backend) = file_store(&dir);

    store.set("outputs", "twitch_fps", 30).unwrap();
    store.save().unwrap();
    store.set("outputs", "twitch_fps", 60).unwrap();
    store.save().unwrap();
    assert!(backend.backup_path().exists());
    assert!(!backend.temp_path().exists());

    fs::write(backend.path(), "garbage").unwrap();

    let (store, outcome) = reload(&backend);
    assert_eq!(outcome, LoadOutcome::Loaded);
    assert_eq!(store.get("outputs", "twitch_fps", 0i32), 30);
}

#[test]
fn test_save_writes_sections_as_flat_objects() {
    let dir = TempDir::new().unwrap();
    let (mut store, backend) = file_store(&dir);

    let mut section = Section::new();
    section.insert("kick_enabled".into(), Value::Bool(false));
    store.replace_section("outputs", section).unwrap();
    store.save().unwrap();

    let raw: Value = serde_json::from_str(&fs::read_to_string(backend.path()).unwrap()).unwrap();
    assert_eq!(raw["outputs"]["kick_enabled"], Value::Bool(false));
}

#[test]
fn test_unloaded_store_refuses_writes() {
    let dir = TempDir::new().unwrap();
    let mut store = ConfigStore::new(Box::new(JsonFileBackend::new(dir.path().join("o.json"))));

    assert!(matches!(store.save(), Err(DomainError::NoDocument)));
    assert!(matches!(store.set("a", "b", 1), Err(DomainError::NoDocument)));
    assert_eq!(store.get("a", "b", 3i32), 3);
}

#[test]
fn test_resolution_validator() {
    for ok in ["1280x720", "1920x1080"] {
        assert!(OutputConfig::validate_resolution(ok));
    }
    for bad in ["1280", "12800x7200x10", "abcxdef"] {
        assert!(!OutputConfig::validate_resolution(bad));
    }
}

#[test]
fn test_rtmp_requires_stream_key() {
    let config = RtmpOutputConfig::default().with_server("rtmp://a.rtmp.youtube.com/live2", "");
    assert!(RtmpOutputConfig::validate_rtmp_url(&config.server_url));
    assert!(config.validate().is_err());
}

#[test]
fn test_whip_with_expired_token_is_invalid() {
    let config = WhipOutputConfig {
        use_oauth: true,
        access_token: "token".to_string(),
        stream_key: "key".to_string(),
        ingest_url: "https://ingest.example.com/whip".to_string(),
        expires_at: Some(Utc::now() - ChronoDuration::hours(1)),
        ..WhipOutputConfig::default()
    };
    assert!(config.validate().is_err());

    let config = WhipOutputConfig {
        expires_at: Some(Utc::now() + ChronoDuration::days(30)),
        ..config
    };
    assert!(config.validate().is_ok());
}

#[test]
fn test_output_settings_survive_restart() {
    let dir = TempDir::new().unwrap();
    let (mut store, backend) = file_store(&dir);
    let youtube = ServiceDescriptor::find("YouTube").unwrap();

    let mut settings = OutputSettings::Rtmp(
        RtmpOutputConfig::default().with_server("rtmp://a.rtmp.youtube.com/live2", "yt-key"),
    );
    settings.base_mut().video_bitrate_kbps = 6000;
    settings.base_mut().resolution = "1920x1080".to_string();
    settings.save(youtube, &mut store).unwrap();
    store.save().unwrap();

    let (store, _) = reload(&backend);
    let loaded = OutputSettings::load(youtube, &store);
    assert_eq!(loaded, settings);
    assert!(loaded.is_valid());
    assert_eq!(store.get("outputs", "youtube_stream_key", String::new()), "yt-key");
}
