use chanwiz::config::{load_settings, save_settings, ConfigError, Settings};
use std::fs;
use tempfile::tempdir;

#[test]
fn config_settings_module_saved_settings_load_back() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("nested/config.yaml");
    let mut settings = Settings::default();
    settings.configtxlator_url = Some("http://configtxlator:7059".to_string());
    settings.features.capabilities_enabled = false;
    settings.request_timeout_secs = 5;

    save_settings(&settings, &path).expect("save settings");
    let loaded = load_settings(&path).expect("load settings");

    assert_eq!(
        loaded.configtxlator_url.as_deref(),
        Some("http://configtxlator:7059")
    );
    assert!(!loaded.features.capabilities_enabled);
    assert_eq!(loaded.request_timeout_secs, 5);
    assert_eq!(loaded.capability_catalog, settings.capability_catalog);
}

#[test]
fn config_settings_module_rejects_invalid_values_on_load() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("config.yaml");

    fs::write(&path, "default_application_capability: \"V 2\"\n").expect("write");
    let err = load_settings(&path).expect_err("invalid capability");
    assert!(matches!(err, ConfigError::Settings(_)));
    assert!(err.to_string().contains("default_application_capability"));

    fs::write(&path, "block_defaults:\n  absolute_max_bytes: lots\n").expect("write");
    let err = load_settings(&path).expect_err("invalid byte size");
    assert!(err.to_string().contains("block_defaults.absolute_max_bytes"));

    fs::write(&path, "api_base: [\n").expect("write");
    let err = load_settings(&path).expect_err("invalid yaml");
    assert!(matches!(err, ConfigError::Parse { .. }));
}
