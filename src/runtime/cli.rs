use std::process::Command;

use tracing::debug;

use super::inspect::{parse_container_inspect, parse_container_list, parse_image_env};
use super::types::{ContainerHandle, ContainerSummary, CreateRequest, ObservedContainer};
use super::{ContainerRuntime, RuntimeError};
use crate::model::Healthcheck;

/// Drives a docker-compatible CLI (`docker`, `podman`) with `std::process::Command`.
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: String,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new("docker")
    }
}

impl DockerCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Build the `docker create` argument vector for a request.
    ///
    /// Only the first network is attached at create time; the rest are
    /// connected afterwards.
    pub fn create_args(request: &CreateRequest) -> Vec<String> {
        let mut args = vec!["create".to_string(), "--name".into(), request.name.clone()];

        for label in &request.labels {
            args.push("--label".into());
            args.push(label.to_string());
        }
        for env in &request.env {
            args.push("-e".into());
            args.push(env.to_string());
        }
        for port in &request.ports {
            args.push("-p".into());
            args.push(match port.host_port {
                Some(host) => format!("{host}:{}", port.port_key()),
                None => port.port_key(),
            });
        }
        for mount in &request.mounts {
            args.push("-v".into());
            args.push(format!("{}:{}", mount.source.display(), mount.target));
        }
        if let Some(user) = &request.user {
            args.push("--user".into());
            args.push(user.clone());
        }
        if let Some(health) = &request.healthcheck {
            push_health_args(&mut args, health);
        }
        if let Some(network) = request.networks.first() {
            args.push("--network".into());
            args.push(network.clone());
        }

        args.push(request.image.clone());
        args.extend(request.command.iter().cloned());
        args
    }

    fn run<S: AsRef<str>>(&self, args: &[S]) -> Result<String, RuntimeError> {
        let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
        debug!("{} {}", self.binary, args.join(" "));

        let output = Command::new(&self.binary)
            .args(&args)
            .output()
            .map_err(|source| RuntimeError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(RuntimeError::Command {
                command: format!("{} {}", self.binary, args.first().copied().unwrap_or_default()),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Map "no such container" failures to `NotFound` so callers can tell
    /// a vanished container from a broken daemon.
    fn run_on(&self, id: &str, args: &[&str]) -> Result<String, RuntimeError> {
        self.run(args).map_err(|err| match err {
            RuntimeError::Command { stderr, .. } if is_missing(&stderr) => {
                RuntimeError::NotFound(id.to_string())
            }
            other => other,
        })
    }

    fn image_env(&self, image: &str) -> Result<Vec<String>, RuntimeError> {
        match self.run(&["image", "inspect", image]) {
            Ok(out) => parse_image_env(&out),
            // A locally removed image has no baked env to subtract.
            Err(RuntimeError::Command { stderr, .. }) if is_missing(&stderr) => Ok(Vec::new()),
            Err(err) => Err(err),
        }
    }
}

fn is_missing(stderr: &str) -> bool {
    stderr.contains("No such object") || stderr.contains("No such container")
}

fn push_health_args(args: &mut Vec<String>, health: &Healthcheck) {
    let Some(cmd) = health.command_line() else {
        args.push("--no-healthcheck".into());
        return;
    };
    args.push("--health-cmd".into());
    args.push(cmd);
    let durations = [
        ("--health-interval", health.interval),
        ("--health-timeout", health.timeout),
        ("--health-start-period", health.start_period),
    ];
    for (flag, secs) in durations {
        if let Some(secs) = secs {
            args.push(flag.into());
            args.push(format!("{secs}s"));
        }
    }
    if let Some(retries) = health.retries {
        args.push("--health-retries".into());
        args.push(retries.to_string());
    }
}

impl ContainerRuntime for DockerCli {
    fn create(&self, request: &CreateRequest) -> Result<ContainerHandle, RuntimeError> {
        let out = self.run(&Self::create_args(request))?;
        let id = out.trim().to_string();

        for network in request.networks.iter().skip(1) {
            self.run_on(&id, &["network", "connect", network.as_str(), id.as_str()])?;
        }
        Ok(ContainerHandle::new(id, &request.name))
    }

    fn start(&self, id: &str) -> Result<(), RuntimeError> {
        self.run_on(id, &["start", id]).map(drop)
    }

    fn stop(&self, id: &str, timeout_secs: u64) -> Result<(), RuntimeError> {
        let timeout = timeout_secs.to_string();
        self.run_on(id, &["stop", "--time", timeout.as_str(), id]).map(drop)
    }

    fn remove(&self, id: &str, force: bool) -> Result<(), RuntimeError> {
        let mut args = vec!["rm"];
        if force {
            args.push("--force");
        }
        args.push(id);
        self.run_on(id, &args).map(drop)
    }

    fn inspect(&self, id: &str) -> Result<Option<ObservedContainer>, RuntimeError> {
        let out = match self.run_on(id, &["inspect", "--type", "container", id]) {
            Ok(out) => out,
            Err(RuntimeError::NotFound(_)) => return Ok(None),
            Err(err) => return Err(err),
        };
        let Some(mut observed) = parse_container_inspect(&out)? else {
            return Ok(None);
        };
        observed.image_env = self.image_env(&observed.image)?;
        Ok(Some(observed))
    }

    fn list(&self) -> Result<Vec<ContainerSummary>, RuntimeError> {
        let out = self.run(&["ps", "--all", "--no-trunc", "--format", "{{json .}}"])?;
        parse_container_list(&out)
    }

    fn logs(&self, id: &str, tail: usize) -> Result<String, RuntimeError> {
        let tail = tail.to_string();
        let output = Command::new(&self.binary)
            .args(["logs", "--tail", tail.as_str(), id])
            .output()
            .map_err(|source| RuntimeError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            if is_missing(&stderr) {
                return Err(RuntimeError::NotFound(id.to_string()));
            }
            return Err(RuntimeError::Command {
                command: format!("{} logs", self.binary),
                code: output.status.code(),
                stderr: stderr.trim().to_string(),
            });
        }
        // Containers write to both streams; docker replays them separately.
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&stderr);
        Ok(text)
    }
}
