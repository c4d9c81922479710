use std::fmt;
use std::hash::Hash;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::decode::{PairInput, PortInput, VolumeInput};

/// An entry whose identity is a key, so lists of them can be merged by identity.
pub trait KeyedValue: Clone {
    type Key: Eq + Hash + Clone;

    fn key(&self) -> &Self::Key;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PairInput")]
pub struct EnvVariable {
    pub key: String,
    pub value: String,
}

impl EnvVariable {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl KeyedValue for EnvVariable {
    type Key = String;

    fn key(&self) -> &String {
        &self.key
    }
}

impl fmt::Display for EnvVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PairInput")]
pub struct Label {
    pub key: String,
    pub value: String,
}

impl Label {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl KeyedValue for Label {
    type Key = String;

    fn key(&self) -> &String {
        &self.key
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }

    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Some(Protocol::Tcp),
            "udp" => Some(Protocol::Udp),
            _ => None,
        }
    }
}

/// A container port, optionally pinned to a host port.
///
/// `host_port == None` lets the runtime pick a host port at start time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PortInput")]
pub struct ExposedPort {
    #[serde(rename = "container")]
    pub container_port: u16,
    #[serde(rename = "host")]
    pub host_port: Option<u16>,
    #[serde(default)]
    pub protocol: Protocol,
}

impl ExposedPort {
    pub fn new(container_port: u16, host_port: Option<u16>) -> Self {
        Self {
            container_port,
            host_port,
            protocol: Protocol::Tcp,
        }
    }

    /// Runtime-side identity, e.g. `80/tcp`.
    pub fn port_key(&self) -> String {
        format!("{}/{}", self.container_port, self.protocol.as_str())
    }
}

impl KeyedValue for ExposedPort {
    type Key = u16;

    fn key(&self) -> &u16 {
        &self.container_port
    }
}

impl fmt::Display for ExposedPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.host_port {
            Some(host) => write!(f, "{host}:{}", self.container_port),
            None => write!(f, "{}", self.container_port),
        }
    }
}

/// A bind mount. The host side is filled in by the volume allocator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "VolumeInput")]
pub struct Volume {
    #[serde(rename = "container")]
    pub container_path: String,
    #[serde(rename = "host")]
    pub host_path: Option<PathBuf>,
}

impl Volume {
    pub fn new(container_path: impl Into<String>, host_path: Option<PathBuf>) -> Self {
        Self {
            container_path: container_path.into(),
            host_path,
        }
    }
}

impl KeyedValue for Volume {
    type Key = String;

    fn key(&self) -> &String {
        &self.container_path
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.host_path {
            Some(host) => write!(f, "{}:{}", host.display(), self.container_path),
            None => f.write_str(&self.container_path),
        }
    }
}
