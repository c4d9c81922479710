use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::model::{EnvVariable, ExposedPort, Healthcheck, Label};

/// Lifecycle state reported by the container runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    Created,
    Running,
    Restarting,
    Paused,
    Exited,
    Removing,
    Dead,
    #[default]
    Unknown,
}

impl ContainerState {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "created" => ContainerState::Created,
            "running" => ContainerState::Running,
            "restarting" => ContainerState::Restarting,
            "paused" => ContainerState::Paused,
            "exited" => ContainerState::Exited,
            "removing" => ContainerState::Removing,
            "dead" => ContainerState::Dead,
            _ => ContainerState::Unknown,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, ContainerState::Running | ContainerState::Restarting)
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContainerState::Created => "created",
            ContainerState::Running => "running",
            ContainerState::Restarting => "restarting",
            ContainerState::Paused => "paused",
            ContainerState::Exited => "exited",
            ContainerState::Removing => "removing",
            ContainerState::Dead => "dead",
            ContainerState::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// What a successful `create` hands back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerHandle {
    pub id: String,
    pub name: String,
}

impl ContainerHandle {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A bind mount as the runtime reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountPoint {
    pub destination: String,
    pub source: Option<String>,
}

/// Live configuration of a container, freshly read from the runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedContainer {
    pub id: String,
    pub name: String,
    pub image: String,
    pub state: ContainerState,
    /// Argument vector the container runs (`Config.Cmd`).
    pub cmd: Vec<String>,
    /// `KEY=VALUE` entries as the runtime reports them.
    pub env: Vec<String>,
    /// `KEY=VALUE` entries baked into the image rather than set at creation.
    pub image_env: Vec<String>,
    /// Published container-side ports, e.g. `80/tcp`.
    pub ports: Vec<String>,
    pub mounts: Vec<MountPoint>,
    pub labels: BTreeMap<String, String>,
    pub user: String,
}

impl ObservedContainer {
    pub fn handle(&self) -> ContainerHandle {
        ContainerHandle::new(&self.id, &self.name)
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }
}

/// One row of a container listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSummary {
    pub id: String,
    pub name: String,
    pub image: String,
    pub state: ContainerState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindMount {
    pub source: PathBuf,
    pub target: String,
}

/// A fully validated runtime `create` call. Built by the materializer only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRequest {
    pub name: String,
    pub image: String,
    /// Argument vector; empty keeps the image's default command.
    pub command: Vec<String>,
    /// Explicit `uid:gid` execution identity.
    pub user: Option<String>,
    pub env: Vec<EnvVariable>,
    pub labels: Vec<Label>,
    pub ports: Vec<ExposedPort>,
    pub mounts: Vec<BindMount>,
    pub healthcheck: Option<Healthcheck>,
    pub networks: Vec<String>,
}

impl CreateRequest {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            command: Vec::new(),
            user: None,
            env: Vec::new(),
            labels: Vec::new(),
            ports: Vec::new(),
            mounts: Vec::new(),
            healthcheck: None,
            networks: Vec::new(),
        }
    }

    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_parses_docker_strings() {
        assert_eq!(ContainerState::parse("running"), ContainerState::Running);
        assert_eq!(ContainerState::parse("Exited"), ContainerState::Exited);
        assert_eq!(ContainerState::parse("weird"), ContainerState::Unknown);
        assert_eq!(ContainerState::Paused.to_string(), "paused");
    }

    #[test]
    fn restarting_counts_as_running() {
        assert!(ContainerState::Restarting.is_running());
        assert!(!ContainerState::Created.is_running());
    }

    #[test]
    fn env_value_looks_up_by_key() {
        let mut req = CreateRequest::new("web", "nginx");
        req.env.push(EnvVariable::new("PUID", "1000"));
        assert_eq!(req.env_value("PUID"), Some("1000"));
        assert_eq!(req.env_value("PGID"), None);
    }
}
