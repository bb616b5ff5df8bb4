use super::{default_global_config_path, ConfigError, Settings};
use std::path::Path;

pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    let mut settings = Settings::from_path(path)?;
    settings.apply_env_overrides();
    settings.validate()?;
    Ok(settings)
}

pub fn load_global_settings() -> Result<Settings, ConfigError> {
    let path = default_global_config_path()?;
    load_settings(&path)
}

/// Falls back to defaults (plus env overrides) when no settings file exists yet.
pub fn load_settings_or_default(path: &Path) -> Result<Settings, ConfigError> {
    if path.exists() {
        return load_settings(path);
    }
    let mut settings = Settings::default();
    settings.apply_env_overrides();
    settings.validate()?;
    Ok(settings)
}
