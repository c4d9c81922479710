use std::collections::BTreeSet;
use std::fmt;

use tracing::{debug, warn};

use super::materializer::IDENTITY_ENV_KEYS;
use crate::error::{EngineError, Result};
use crate::model::ContainerSpec;
use crate::runtime::{ContainerRuntime, ObservedContainer};

/// One dimension in which a live container differs from its desired spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Drift {
    Image {
        observed: String,
        desired: String,
    },
    Command {
        observed: String,
        desired: String,
    },
    Env(SetDiff),
    Ports(SetDiff),
    Volumes(SetDiff),
}

/// Entries only the desired side has, and entries only the live side has.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetDiff {
    pub missing: Vec<String>,
    pub unexpected: Vec<String>,
}

impl SetDiff {
    fn between(observed: &BTreeSet<String>, desired: &BTreeSet<String>) -> Option<Self> {
        if observed == desired {
            return None;
        }
        Some(Self {
            missing: desired.difference(observed).cloned().collect(),
            unexpected: observed.difference(desired).cloned().collect(),
        })
    }
}

impl fmt::Display for SetDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "missing [{}], unexpected [{}]",
            self.missing.join(", "),
            self.unexpected.join(", ")
        )
    }
}

impl Drift {
    pub fn dimension(&self) -> &'static str {
        match self {
            Drift::Image { .. } => "image",
            Drift::Command { .. } => "command",
            Drift::Env(_) => "env",
            Drift::Ports(_) => "ports",
            Drift::Volumes(_) => "volumes",
        }
    }
}

impl fmt::Display for Drift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Drift::Image { observed, desired } | Drift::Command { observed, desired } => {
                write!(f, "{}: '{observed}' -> '{desired}'", self.dimension())
            }
            Drift::Env(d) | Drift::Ports(d) | Drift::Volumes(d) => {
                write!(f, "{}: {d}", self.dimension())
            }
        }
    }
}

/// Compare a live container against a desired spec.
///
/// Image and command compare as exact strings. Env compares as a set of
/// `KEY=VALUE`, ports by container port and protocol, volumes by container
/// path. Host-side ports and paths are ignored since the runtime may assign them.
pub fn diff(observed: &ObservedContainer, desired: &ContainerSpec) -> Vec<Drift> {
    let mut drift = Vec::new();

    if observed.image != desired.image {
        drift.push(Drift::Image {
            observed: observed.image.clone(),
            desired: desired.image.clone(),
        });
    }

    // No desired command means the image default runs, whatever it is.
    if let Some(line) = desired.command_line() {
        let joined = observed.cmd.join(" ");
        let same_argv = shell_words::split(&line).is_ok_and(|argv| argv == observed.cmd);
        if joined != line && !same_argv {
            drift.push(Drift::Command {
                observed: joined,
                desired: line,
            });
        }
    }

    let desired_env: BTreeSet<String> = desired.env.iter().map(ToString::to_string).collect();
    if let Some(d) = SetDiff::between(&observed_env(observed, desired), &desired_env) {
        drift.push(Drift::Env(d));
    }

    let desired_ports: BTreeSet<String> = desired.ports.iter().map(|p| p.port_key()).collect();
    let observed_ports: BTreeSet<String> = observed.ports.iter().cloned().collect();
    if let Some(d) = SetDiff::between(&observed_ports, &desired_ports) {
        drift.push(Drift::Ports(d));
    }

    let desired_mounts: BTreeSet<String> = desired
        .volumes
        .iter()
        .map(|v| v.container_path.clone())
        .collect();
    let observed_mounts: BTreeSet<String> = observed
        .mounts
        .iter()
        .map(|m| m.destination.clone())
        .collect();
    if let Some(d) = SetDiff::between(&observed_mounts, &desired_mounts) {
        drift.push(Drift::Volumes(d));
    }

    drift
}

/// Env the engine is responsible for: image-baked entries and injected
/// identity variables are dropped unless the desired spec sets them itself.
fn observed_env(observed: &ObservedContainer, desired: &ContainerSpec) -> BTreeSet<String> {
    let desired_keys: BTreeSet<&str> = desired.env.iter().map(|e| e.key.as_str()).collect();
    observed
        .env
        .iter()
        .filter(|entry| {
            let key = entry.split_once('=').map_or(entry.as_str(), |(k, _)| k);
            if desired_keys.contains(key) {
                return true;
            }
            !observed.image_env.contains(*entry) && !IDENTITY_ENV_KEYS.contains(&key)
        })
        .cloned()
        .collect()
}

/// Reloads a container from the runtime and compares it with its desired spec.
pub struct DriftDetector<'a> {
    runtime: &'a dyn ContainerRuntime,
}

impl<'a> DriftDetector<'a> {
    pub fn new(runtime: &'a dyn ContainerRuntime) -> Self {
        Self { runtime }
    }

    /// Fresh live view of `id`. A vanished container is `NotFound`.
    pub fn reload(&self, id: &str) -> Result<ObservedContainer> {
        self.runtime
            .inspect(id)?
            .ok_or_else(|| EngineError::not_found("container", id))
    }

    /// Every drifted dimension, after reloading the container.
    pub fn check(&self, observed: &ObservedContainer, desired: &ContainerSpec) -> Result<Vec<Drift>> {
        let live = self.reload(&observed.id)?;
        let drift = diff(&live, desired);
        if drift.is_empty() {
            debug!(container = %live.name, "no drift");
        } else {
            for d in &drift {
                warn!(container = %live.name, dimension = d.dimension(), "drift: {d}");
            }
        }
        Ok(drift)
    }

    pub fn has_changed(&self, observed: &ObservedContainer, desired: &ContainerSpec) -> Result<bool> {
        Ok(!self.check(observed, desired)?.is_empty())
    }
}
