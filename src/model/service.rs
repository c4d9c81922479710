use std::fmt;

use serde::{Deserialize, Serialize};

use super::healthcheck::Healthcheck;
use super::keyed::{EnvVariable, ExposedPort, Label, Volume};
use crate::runtime::ContainerState;

/// The user a service belongs to. `name` is the host account used for uid lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: u32,
    pub name: String,
}

impl Owner {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    #[default]
    Created,
    Running,
    Stopped,
}

impl ServiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Created => "created",
            ServiceStatus::Running => "running",
            ServiceStatus::Stopped => "stopped",
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ContainerState> for ServiceStatus {
    fn from(state: ContainerState) -> Self {
        match state {
            ContainerState::Created => ServiceStatus::Created,
            ContainerState::Running | ContainerState::Restarting => ServiceStatus::Running,
            ContainerState::Paused
            | ContainerState::Exited
            | ContainerState::Removing
            | ContainerState::Dead
            | ContainerState::Unknown => ServiceStatus::Stopped,
        }
    }
}

/// One owner's resolved instance of a template.
///
/// Everything here is a snapshot taken at creation time; editing the
/// template later does not reach existing services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: i64,
    pub name: String,
    pub owner: Owner,
    pub template_id: i64,
    pub domain: Option<String>,
    pub image: String,
    pub env: Vec<EnvVariable>,
    pub ports: Vec<ExposedPort>,
    pub volumes: Vec<Volume>,
    pub labels: Vec<Label>,
    pub command: Option<String>,
    pub args: Vec<String>,
    pub healthcheck: Option<Healthcheck>,
    pub networks: Vec<String>,
    pub container_id: Option<String>,
    pub status: ServiceStatus,
}

/// A service that has not been stored yet, so it has no id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewService {
    pub name: String,
    pub owner: Owner,
    pub template_id: i64,
    pub domain: Option<String>,
    pub image: String,
    pub env: Vec<EnvVariable>,
    pub ports: Vec<ExposedPort>,
    pub volumes: Vec<Volume>,
    pub labels: Vec<Label>,
    pub command: Option<String>,
    pub args: Vec<String>,
    pub healthcheck: Option<Healthcheck>,
    pub networks: Vec<String>,
}

impl NewService {
    pub fn with_id(self, id: i64) -> Service {
        Service {
            id,
            name: self.name,
            owner: self.owner,
            template_id: self.template_id,
            domain: self.domain,
            image: self.image,
            env: self.env,
            ports: self.ports,
            volumes: self.volumes,
            labels: self.labels,
            command: self.command,
            args: self.args,
            healthcheck: self.healthcheck,
            networks: self.networks,
            container_id: None,
            status: ServiceStatus::Created,
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |items: Vec<String>| items.join(", ");
        write!(
            f,
            "Service(id={}, name={}, template_id={}, owner={}, domain={}, container_id={}, image={}, \
             ports=[{}], env=[{}], volumes=[{}], labels=[{}], status={})",
            self.id,
            self.name,
            self.template_id,
            self.owner.name,
            self.domain.as_deref().unwrap_or("-"),
            self.container_id.as_deref().unwrap_or("-"),
            self.image,
            join(self.ports.iter().map(ToString::to_string).collect()),
            join(self.env.iter().map(ToString::to_string).collect()),
            join(self.volumes.iter().map(ToString::to_string).collect()),
            join(self.labels.iter().map(ToString::to_string).collect()),
            self.status,
        )
    }
}
