use serde::{Deserialize, Serialize};

use super::healthcheck::Healthcheck;
use super::keyed::{EnvVariable, ExposedPort, Label, Volume};
use super::service::{Owner, Service};

/// Fully resolved description of the container a service should have.
///
/// Plain value: built from a [`Service`] or read from a spec file, handed to
/// the materializer and drift detector, never mutated by them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub owner: Owner,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub ports: Vec<ExposedPort>,
    #[serde(default)]
    pub volumes: Vec<Volume>,
    #[serde(default)]
    pub env: Vec<EnvVariable>,
    #[serde(default)]
    pub healthcheck: Option<Healthcheck>,
    #[serde(default)]
    pub networks: Vec<String>,
}

impl ContainerSpec {
    pub fn new(name: impl Into<String>, image: impl Into<String>, owner: Owner) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            owner,
            command: None,
            args: Vec::new(),
            labels: Vec::new(),
            ports: Vec::new(),
            volumes: Vec::new(),
            env: Vec::new(),
            healthcheck: None,
            networks: Vec::new(),
        }
    }

    /// Command and arguments joined into one executable line.
    ///
    /// `None` means the image's default command applies.
    pub fn command_line(&self) -> Option<String> {
        let command = self.command.as_deref().map(str::trim).filter(|c| !c.is_empty());
        match (command, self.args.is_empty()) {
            (Some(cmd), true) => Some(cmd.to_string()),
            (Some(cmd), false) => Some(format!("{cmd} {}", self.args.join(" "))),
            (None, false) => Some(self.args.join(" ")),
            (None, true) => None,
        }
    }
}

impl From<&Service> for ContainerSpec {
    fn from(service: &Service) -> Self {
        Self {
            name: service.name.clone(),
            image: service.image.clone(),
            owner: service.owner.clone(),
            command: service.command.clone(),
            args: service.args.clone(),
            labels: service.labels.clone(),
            ports: service.ports.clone(),
            volumes: service.volumes.clone(),
            env: service.env.clone(),
            healthcheck: service.healthcheck.clone(),
            networks: service.networks.clone(),
        }
    }
}
