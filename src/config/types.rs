use std::fmt;
use std::path::PathBuf;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RuntimeEnvironment {
    Production,
    #[default]
    Development,
    Testing,
}

impl RuntimeEnvironment {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimeEnvironment::Production => "production",
            RuntimeEnvironment::Development => "development",
            RuntimeEnvironment::Testing => "testing",
        }
    }

    /// Parse leniently: unknown names fall back to development.
    pub fn from_str_lossy(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" => RuntimeEnvironment::Production,
            "testing" => RuntimeEnvironment::Testing,
            "development" => RuntimeEnvironment::Development,
            other => {
                tracing::warn!("unknown environment '{other}', defaulting to development");
                RuntimeEnvironment::Development
            }
        }
    }
}

impl Serialize for RuntimeEnvironment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RuntimeEnvironment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EnvironmentVisitor;

        impl Visitor<'_> for EnvironmentVisitor {
            type Value = RuntimeEnvironment;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("\"production\", \"development\" or \"testing\"")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<RuntimeEnvironment, E> {
                Ok(RuntimeEnvironment::from_str_lossy(value))
            }
        }

        deserializer.deserialize_str(EnvironmentVisitor)
    }
}

/// Inclusive host port range the port allocator samples from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRange {
    pub low: u16,
    pub high: u16,
}

impl PortRange {
    pub fn new(low: u16, high: u16) -> Self {
        Self { low, high }
    }

    pub fn contains(&self, port: u16) -> bool {
        (self.low..=self.high).contains(&port)
    }
}

impl Default for PortRange {
    fn default() -> Self {
        Self {
            low: 49152,
            high: 65535,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub volume_base_path: PathBuf,
    pub port_range: PortRange,
    pub port_attempts: u32,
    pub volume_attempts: u32,
    pub volume_id_length: usize,
    pub admin_group: String,
    pub self_managed_image_marker: String,
    pub runtime_binary: String,
    pub stop_timeout: u64,
    pub environment: RuntimeEnvironment,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            volume_base_path: PathBuf::from("/var/svs/volumes"),
            port_range: PortRange::default(),
            port_attempts: 100,
            volume_attempts: 50,
            volume_id_length: 16,
            admin_group: "svs-admins".to_string(),
            self_managed_image_marker: "linuxserver".to_string(),
            runtime_binary: "docker".to_string(),
            stop_timeout: 10,
            environment: RuntimeEnvironment::Development,
        }
    }
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.port_range.low == 0 || self.port_range.low > self.port_range.high {
            anyhow::bail!(
                "port_range must satisfy 1 <= low <= high, got {}..={}",
                self.port_range.low,
                self.port_range.high
            );
        }
        if self.port_attempts == 0 || self.volume_attempts == 0 {
            anyhow::bail!("port_attempts and volume_attempts must be positive");
        }
        if self.volume_id_length == 0 {
            anyhow::bail!("volume_id_length must be positive");
        }
        if !self.volume_base_path.is_absolute() {
            anyhow::bail!(
                "volume_base_path must be absolute, got {}",
                self.volume_base_path.display()
            );
        }
        if self.admin_group.trim().is_empty() {
            anyhow::bail!("admin_group must not be blank");
        }
        Ok(())
    }
}
