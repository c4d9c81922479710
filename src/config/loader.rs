use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use super::types::{Config, PortRange, RuntimeEnvironment};

/// File name looked up in the config directory.
pub const CONFIG_FILE: &str = ".svsc";

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "SVS_CONFIG";

/// What a `.svsc` file may set. Absent keys keep their defaults.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub volume_base_path: Option<PathBuf>,
    pub port_range: Option<PortRange>,
    pub port_attempts: Option<u32>,
    pub volume_attempts: Option<u32>,
    pub volume_id_length: Option<usize>,
    pub admin_group: Option<String>,
    pub self_managed_image_marker: Option<String>,
    pub runtime_binary: Option<String>,
    pub stop_timeout: Option<u64>,
    pub environment: Option<RuntimeEnvironment>,
}

impl FileConfig {
    /// Read the config file at `path`, or `None` if it does not exist.
    pub fn read(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let file: FileConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("invalid config in {}", path.display()))?;
        Ok(Some(file))
    }

    pub fn apply(self, cfg: &mut Config) {
        if let Some(v) = self.volume_base_path {
            cfg.volume_base_path = v;
        }
        if let Some(v) = self.port_range {
            cfg.port_range = v;
        }
        if let Some(v) = self.port_attempts {
            cfg.port_attempts = v;
        }
        if let Some(v) = self.volume_attempts {
            cfg.volume_attempts = v;
        }
        if let Some(v) = self.volume_id_length {
            cfg.volume_id_length = v;
        }
        if let Some(v) = self.admin_group {
            cfg.admin_group = v;
        }
        if let Some(v) = self.self_managed_image_marker {
            cfg.self_managed_image_marker = v;
        }
        if let Some(v) = self.runtime_binary {
            cfg.runtime_binary = v;
        }
        if let Some(v) = self.stop_timeout {
            cfg.stop_timeout = v;
        }
        if let Some(v) = self.environment {
            cfg.environment = v;
        }
    }
}

/// Resolve which file to read: `$SVS_CONFIG` if set, else `<dir>/.svsc`.
pub fn config_path(dir: &Path) -> PathBuf {
    match std::env::var_os(CONFIG_ENV) {
        Some(p) if !p.is_empty() => PathBuf::from(p),
        _ => dir.join(CONFIG_FILE),
    }
}

/// Load and validate the config for `dir`, falling back to defaults.
pub fn load(dir: &Path) -> Result<Config> {
    load_from(&config_path(dir))
}

pub fn load_from(path: &Path) -> Result<Config> {
    let mut cfg = Config::default();
    if let Some(file) = FileConfig::read(path)? {
        file.apply(&mut cfg);
    }
    cfg.validate()
        .with_context(|| format!("invalid config in {}", path.display()))?;
    Ok(cfg)
}
