use std::collections::HashMap;

use canvas::input::{Key, Modifiers};
use canvas::keymap::Command;

use super::*;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
    move |key| map.get(key).cloned()
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("screenmark-{}-{name}", uuid::Uuid::new_v4()))
}

#[test]
fn missing_values_use_defaults() {
    let config = Config::from_lookup(|_| None);
    assert_eq!(config, Config::default());
    assert_eq!(config.share_max_bytes, 10 * 1024 * 1024);
    assert_eq!(config.message_attempts, 5);
    assert_eq!(config.export_prefix, "screenshot");
    assert!(config.keymap_path.is_none());
}

#[test]
fn present_values_override_defaults() {
    let config = Config::from_lookup(lookup_from(&[
        ("SCREENMARK_SHARE_MAX_BYTES", "2048"),
        ("SCREENMARK_MESSAGE_ATTEMPTS", "3"),
        ("SCREENMARK_MESSAGE_BACKOFF_MS", "50"),
        ("SCREENMARK_MESSAGE_BACKOFF_MAX_MS", "400"),
        ("SCREENMARK_REDRAW_INTERVAL_MS", "33.3"),
        ("SCREENMARK_KEYMAP", "/etc/screenmark/keys.json"),
        ("SCREENMARK_EXPORT_PREFIX", "capture"),
        ("SCREENMARK_ASSET_BASE_URL", " https://cdn.example/ext "),
    ]));
    assert_eq!(config.share_max_bytes, 2048);
    assert_eq!(config.message_attempts, 3);
    assert_eq!(config.message_backoff_ms, 50);
    assert_eq!(config.message_backoff_max_ms, 400);
    assert!((config.redraw_interval_ms - 33.3).abs() < 1e-9);
    assert_eq!(config.keymap_path, Some(PathBuf::from("/etc/screenmark/keys.json")));
    assert_eq!(config.export_prefix, "capture");
    assert_eq!(config.asset_base_url, "https://cdn.example/ext");
}

#[test]
fn invalid_values_fall_back() {
    let config = Config::from_lookup(lookup_from(&[
        ("SCREENMARK_SHARE_MAX_BYTES", "ten megs"),
        ("SCREENMARK_MESSAGE_ATTEMPTS", "-1"),
        ("SCREENMARK_REDRAW_INTERVAL_MS", "NaN"),
        ("SCREENMARK_EXPORT_PREFIX", "   "),
    ]));
    assert_eq!(config.share_max_bytes, DEFAULT_SHARE_MAX_BYTES);
    assert_eq!(config.message_attempts, DEFAULT_MESSAGE_ATTEMPTS);
    assert!((config.redraw_interval_ms - FRAME_INTERVAL_MS).abs() < f64::EPSILON);
    assert_eq!(config.export_prefix, DEFAULT_EXPORT_PREFIX);
}

#[test]
fn zero_attempts_clamped_to_one() {
    let config = Config::from_lookup(lookup_from(&[("SCREENMARK_MESSAGE_ATTEMPTS", "0")]));
    assert_eq!(config.message_attempts, 1);
}

#[test]
fn backoff_ceiling_never_below_base() {
    let config = Config::from_lookup(lookup_from(&[
        ("SCREENMARK_MESSAGE_BACKOFF_MS", "500"),
        ("SCREENMARK_MESSAGE_BACKOFF_MAX_MS", "100"),
    ]));
    assert_eq!(config.message_backoff_max_ms, 500);
}

#[test]
fn retry_policy_mirrors_settings() {
    let config = Config::from_lookup(lookup_from(&[
        ("SCREENMARK_MESSAGE_ATTEMPTS", "4"),
        ("SCREENMARK_MESSAGE_BACKOFF_MS", "25"),
        ("SCREENMARK_MESSAGE_BACKOFF_MAX_MS", "75"),
    ]));
    let policy = config.retry_policy();
    assert_eq!(policy.attempts, 4);
    assert_eq!(policy.base, Duration::from_millis(25));
    assert_eq!(policy.max, Duration::from_millis(75));
}

#[test]
fn export_filename_uses_prefix() {
    let config = Config { export_prefix: "bug-report".into(), ..Config::default() };
    assert_eq!(config.export_filename_at(1_700_000_000), "bug-report-1700000000.png");
    assert!(config.export_filename().starts_with("bug-report-"));
}

#[test]
fn load_keymap_without_path_is_default() {
    let keymap = Config::default().load_keymap().unwrap();
    assert_eq!(keymap.lookup(&Key::named("x"), Modifiers::default()), Some(Command::Crop));
}

#[test]
fn load_keymap_applies_overrides() {
    let path = temp_path("keys.json");
    std::fs::write(&path, r#"{ "x": null, "k": "crop" }"#).unwrap();
    let config = Config { keymap_path: Some(path.clone()), ..Config::default() };

    let keymap = config.load_keymap().unwrap();
    assert_eq!(keymap.lookup(&Key::named("x"), Modifiers::default()), None);
    assert_eq!(keymap.lookup(&Key::named("k"), Modifiers::default()), Some(Command::Crop));
    std::fs::remove_file(path).unwrap();
}

#[test]
fn load_keymap_missing_file_errors() {
    let config = Config { keymap_path: Some(temp_path("absent.json")), ..Config::default() };
    assert!(matches!(config.load_keymap(), Err(ConfigError::KeymapRead { .. })));
}

#[test]
fn load_keymap_bad_json_errors() {
    let path = temp_path("bad.json");
    std::fs::write(&path, "{ not json").unwrap();
    let config = Config { keymap_path: Some(path.clone()), ..Config::default() };
    assert!(matches!(config.load_keymap(), Err(ConfigError::Keymap { .. })));
    std::fs::remove_file(path).unwrap();
}
