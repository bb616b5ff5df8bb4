use super::{ConfigError, Settings};
use std::fs;
use std::path::Path;

pub fn save_settings(settings: &Settings, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
            path: parent.display().to_string(),
            source,
        })?;
    }
    let encoded = serde_yaml::to_string(settings).map_err(|source| ConfigError::Encode {
        path: path.display().to_string(),
        source,
    })?;
    fs::write(path, encoded).map_err(|source| ConfigError::Write {
        path: path.display().to_string(),
        source,
    })
}
