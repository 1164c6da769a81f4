#![allow(clippy::unwrap_used)]
// File round-trips for `crestron-config` using temporary directories.

use std::time::Duration;

use pretty_assertions::assert_eq;

use crestron_config::{Config, load_config_from, save_config_to};
use crestron_core::{DeviceCategory, TlsVerification};

#[test]
fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();

    assert_eq!(cfg.poll_interval_secs, 15);
    assert_eq!(cfg.timeout_secs, 10);
    assert!(!cfg.verify_tls);
    assert!(cfg.ignored_names.is_empty());
}

#[test]
fn reads_toml_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
host = "cws.home.lan"
token = "abc123"
poll_interval_secs = 20
enabled_categories = ["light", "binary_sensor"]
ignored_names = ["%bathroom%", "Garage%"]
"#,
    )
    .unwrap();

    let cfg = load_config_from(&path).unwrap();
    assert_eq!(cfg.host.as_deref(), Some("cws.home.lan"));
    assert_eq!(
        cfg.enabled_categories,
        Some(vec![DeviceCategory::Light, DeviceCategory::BinarySensor])
    );

    let bridge = cfg.to_bridge_config().unwrap();
    assert_eq!(bridge.poll_interval, Duration::from_secs(20));
    assert_eq!(bridge.tls, TlsVerification::DangerAcceptInvalid);
    assert!(bridge.is_enabled(DeviceCategory::BinarySensor));
    assert!(!bridge.is_enabled(DeviceCategory::Scene));
}

#[test]
fn save_then_load_preserves_settings() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");
    let cfg = Config {
        host: Some("10.0.0.5".into()),
        token_env: Some("HOME_TOKEN".into()),
        poll_interval_secs: 60,
        ignored_names: vec!["%test%".into()],
        verify_tls: true,
        ..Config::default()
    };

    save_config_to(&cfg, &path).unwrap();
    assert_eq!(load_config_from(&path).unwrap(), cfg);
}

#[test]
fn rejects_unknown_category() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "enabled_categories = [\"fans\"]\n").unwrap();

    assert!(load_config_from(&path).is_err());
}
