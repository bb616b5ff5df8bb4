use super::ConfigError;
use crate::shared::ids::CapabilityId;
use crate::wizard::units::{parse_byte_size, parse_duration_ms};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_API_BASE: &str = "http://localhost:3000/api/v3";
pub const DEFAULT_APPLICATION_CAPABILITY: &str = "V2_0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FeatureFlags {
    pub capabilities_enabled: bool,
    pub scale_raft_nodes_enabled: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            capabilities_enabled: true,
            scale_raft_nodes_enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutBounds {
    pub min: String,
    pub max: String,
}

impl Default for TimeoutBounds {
    fn default() -> Self {
        Self {
            min: "250ms".to_string(),
            max: "10s".to_string(),
        }
    }
}

/// Values a new channel starts from when no baseline exists.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BlockDefaults {
    pub absolute_max_bytes: String,
    pub max_message_count: u32,
    pub preferred_max_bytes: String,
    pub timeout: String,
    pub snapshot_interval_size: String,
}

impl Default for BlockDefaults {
    fn default() -> Self {
        Self {
            absolute_max_bytes: "10MB".to_string(),
            max_message_count: 500,
            preferred_max_bytes: "2MB".to_string(),
            timeout: "2s".to_string(),
            snapshot_interval_size: "16MB".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CapabilityCatalog {
    pub channel: Vec<CapabilityId>,
    pub orderer: Vec<CapabilityId>,
    pub application: Vec<CapabilityId>,
}

impl Default for CapabilityCatalog {
    fn default() -> Self {
        let ids = |raw: &[&str]| {
            raw.iter()
                .filter_map(|id| CapabilityId::parse(id).ok())
                .collect::<Vec<_>>()
        };
        Self {
            channel: ids(&["V1_3", "V1_4_2", "V1_4_3", "V2_0"]),
            orderer: ids(&["V1_1", "V1_4_2", "V2_0"]),
            application: ids(&["V1_1", "V1_2", "V1_3", "V1_4_2", "V2_0"]),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub api_base: String,
    pub configtxlator_url: Option<String>,
    pub features: FeatureFlags,
    pub default_application_capability: String,
    pub block_timeout: TimeoutBounds,
    pub block_defaults: BlockDefaults,
    pub capability_catalog: CapabilityCatalog,
    pub log_path: Option<PathBuf>,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            configtxlator_url: None,
            features: FeatureFlags::default(),
            default_application_capability: DEFAULT_APPLICATION_CAPABILITY.to_string(),
            block_timeout: TimeoutBounds::default(),
            block_defaults: BlockDefaults::default(),
            capability_catalog: CapabilityCatalog::default(),
            log_path: None,
            request_timeout_secs: 30,
        }
    }
}

impl Settings {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_url("api_base", &self.api_base)?;
        if let Some(url) = &self.configtxlator_url {
            validate_url("configtxlator_url", url)?;
        }
        CapabilityId::parse(&self.default_application_capability).map_err(|err| {
            ConfigError::Settings(format!("`default_application_capability`: {err}"))
        })?;
        let min = parse_duration_ms(&self.block_timeout.min).ok_or_else(|| {
            ConfigError::Settings(format!(
                "`block_timeout.min` is not a duration: `{}`",
                self.block_timeout.min
            ))
        })?;
        let max = parse_duration_ms(&self.block_timeout.max).ok_or_else(|| {
            ConfigError::Settings(format!(
                "`block_timeout.max` is not a duration: `{}`",
                self.block_timeout.max
            ))
        })?;
        if min > max {
            return Err(ConfigError::Settings(
                "`block_timeout.min` must not exceed `block_timeout.max`".to_string(),
            ));
        }
        for (field, value) in [
            (
                "block_defaults.absolute_max_bytes",
                &self.block_defaults.absolute_max_bytes,
            ),
            (
                "block_defaults.preferred_max_bytes",
                &self.block_defaults.preferred_max_bytes,
            ),
            (
                "block_defaults.snapshot_interval_size",
                &self.block_defaults.snapshot_interval_size,
            ),
        ] {
            if parse_byte_size(value).is_none() {
                return Err(ConfigError::Settings(format!(
                    "`{field}` is not a byte size: `{value}`"
                )));
            }
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Settings(
                "`request_timeout_secs` must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(api_base) = std::env::var(super::paths::API_BASE_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
        {
            self.api_base = api_base;
        }
    }
}

fn validate_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return Ok(());
    }
    Err(ConfigError::Settings(format!(
        "`{field}` must be an http(s) url, got `{value}`"
    )))
}
