use serde::Deserialize;

use crate::model::{
    EnvVariable, ExposedPort, Healthcheck, Label, NewService, Owner, Template, Volume, merge,
};

/// Per-instance changes to a template's defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Overrides {
    #[serde(default)]
    pub env: Vec<EnvVariable>,
    #[serde(default)]
    pub ports: Vec<ExposedPort>,
    #[serde(default)]
    pub volumes: Vec<Volume>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Option<Vec<String>>,
    #[serde(default)]
    pub healthcheck: Option<Healthcheck>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateServiceRequest {
    pub name: String,
    pub owner: Owner,
    pub template_id: i64,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub overrides: Overrides,
    #[serde(default)]
    pub networks: Vec<String>,
}

impl CreateServiceRequest {
    pub fn new(name: impl Into<String>, owner: Owner, template_id: i64) -> Self {
        Self {
            name: name.into(),
            owner,
            template_id,
            domain: None,
            overrides: Overrides::default(),
            networks: Vec::new(),
        }
    }
}

/// Merge a template's defaults with a request's overrides.
///
/// Keyed lists merge by identity with overrides winning; scalar fields
/// take the override when present. Nothing is allocated here, so ports and
/// volumes may still have empty host sides.
pub fn resolve(template: &Template, request: &CreateServiceRequest) -> NewService {
    let o = &request.overrides;
    NewService {
        name: request.name.trim().to_string(),
        owner: request.owner.clone(),
        template_id: template.id,
        domain: request.domain.clone().filter(|d| !d.trim().is_empty()),
        image: template.image.reference().to_string(),
        env: merge(&template.default_env, &o.env),
        ports: merge(&template.default_ports, &o.ports),
        volumes: merge(&template.default_volumes, &o.volumes),
        labels: merge(&template.labels, &o.labels),
        command: o.command.clone().or_else(|| template.start_cmd.clone()),
        args: o.args.clone().unwrap_or_else(|| template.args.clone()),
        healthcheck: o.healthcheck.clone().or_else(|| template.healthcheck.clone()),
        networks: request.networks.clone(),
    }
}
