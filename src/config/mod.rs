pub mod error;
pub mod load;
pub mod paths;
pub mod save;
pub mod settings;

pub use error::ConfigError;
pub use load::{load_global_settings, load_settings, load_settings_or_default};
pub use paths::{
    default_global_config_path, default_state_root, API_BASE_ENV, CONFIG_PATH_ENV,
    GLOBAL_SETTINGS_FILE_NAME, GLOBAL_STATE_DIR,
};
pub use save::save_settings;
pub use settings::{
    BlockDefaults, CapabilityCatalog, FeatureFlags, Settings, TimeoutBounds, DEFAULT_API_BASE,
    DEFAULT_APPLICATION_CAPABILITY,
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn partial_yaml_keeps_defaults_for_missing_sections() {
        let settings: Settings = serde_yaml::from_str(
            r#"
api_base: https://console.example.com/api/v3
features:
  scale_raft_nodes_enabled: false
"#,
        )
        .expect("parse settings");

        assert_eq!(settings.api_base, "https://console.example.com/api/v3");
        assert!(settings.features.capabilities_enabled);
        assert!(!settings.features.scale_raft_nodes_enabled);
        assert_eq!(settings.block_defaults.timeout, "2s");
        assert_eq!(settings.default_application_capability, "V2_0");
        settings.validate().expect("valid settings");
    }

    #[test]
    fn validate_rejects_inverted_timeout_bounds() {
        let mut settings = Settings::default();
        settings.block_timeout.min = "20s".to_string();
        let err = settings.validate().expect_err("inverted bounds");
        assert!(err.to_string().contains("block_timeout.min"));
    }

    #[test]
    fn env_override_replaces_api_base() {
        let _guard = ENV_LOCK.lock().expect("env lock");
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("config.yaml");
        fs::write(&path, "api_base: http://from-file:3000/api/v3\n").expect("write config");

        std::env::set_var(API_BASE_ENV, "http://from-env:3000/api/v3");
        let settings = load_settings(&path).expect("load settings");
        std::env::remove_var(API_BASE_ENV);

        assert_eq!(settings.api_base, "http://from-env:3000/api/v3");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let _guard = ENV_LOCK.lock().expect("env lock");
        let dir = tempdir().expect("tempdir");
        let settings =
            load_settings_or_default(&dir.path().join("absent.yaml")).expect("default settings");
        assert_eq!(settings.api_base, DEFAULT_API_BASE);
    }
}
