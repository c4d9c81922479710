use std::collections::HashSet;
use std::path::Path;

use tracing::info;

use crate::alloc::{in_owner_namespace, owner_root};
use crate::config::Config;
use crate::error::{EngineError, Result};
use crate::model::{ContainerSpec, EnvVariable, merge};
use crate::runtime::{
    AccountResolver, BindMount, ContainerHandle, ContainerRuntime, CreateRequest, user_spec,
};

/// Env keys that carry the execution identity for self-managing images.
pub const IDENTITY_ENV_KEYS: [&str; 2] = ["PUID", "PGID"];

/// Turns a resolved [`ContainerSpec`] into one runtime `create` call.
pub struct Materializer<'a> {
    runtime: &'a dyn ContainerRuntime,
    accounts: &'a dyn AccountResolver,
    config: &'a Config,
}

impl<'a> Materializer<'a> {
    pub fn new(
        runtime: &'a dyn ContainerRuntime,
        accounts: &'a dyn AccountResolver,
        config: &'a Config,
    ) -> Self {
        Self {
            runtime,
            accounts,
            config,
        }
    }

    /// Whether the image manages file ownership itself through `PUID`/`PGID`.
    pub fn is_self_managed(&self, image: &str) -> bool {
        let marker = self.config.self_managed_image_marker.as_str();
        !marker.is_empty() && image.contains(marker)
    }

    /// Validate `spec` and resolve it into a runtime request. No runtime call.
    pub fn plan(&self, spec: &ContainerSpec) -> Result<CreateRequest> {
        validate_name(&spec.name)?;
        if spec.image.trim().is_empty() {
            return Err(EngineError::validation("image reference must not be empty"));
        }
        let env = validate_env(&spec.env)?;
        validate_ports(spec)?;
        let mounts = self.resolve_mounts(spec)?;

        let command = match spec.command_line() {
            Some(line) => shell_words::split(&line).map_err(|e| {
                EngineError::validation(format!("cannot parse command line '{line}': {e}"))
            })?,
            None => Vec::new(),
        };

        let uid = self.accounts.uid_of(&spec.owner.name)?;
        let gid = self.accounts.gid_of(&self.config.admin_group)?;

        let mut request = CreateRequest::new(&spec.name, &spec.image);
        request.command = command;
        request.labels = spec.labels.clone();
        request.ports = spec.ports.clone();
        request.mounts = mounts;
        request.healthcheck = spec.healthcheck.clone();
        request.networks = spec.networks.clone();
        if self.is_self_managed(&spec.image) {
            let identity = [
                EnvVariable::new(IDENTITY_ENV_KEYS[0], uid.to_string()),
                EnvVariable::new(IDENTITY_ENV_KEYS[1], gid.to_string()),
            ];
            request.env = merge(&env, &identity);
        } else {
            request.env = env;
            request.user = Some(user_spec(uid, gid));
        }
        Ok(request)
    }

    /// Hand a planned request to the runtime. The container is created, not started.
    pub fn submit(&self, request: &CreateRequest) -> Result<ContainerHandle> {
        let handle = self
            .runtime
            .create(request)
            .map_err(|source| EngineError::Create {
                name: request.name.clone(),
                image: request.image.clone(),
                source,
            })?;
        info!(name = %handle.name, id = %handle.id, image = %request.image, "created container");
        Ok(handle)
    }

    pub fn create(&self, spec: &ContainerSpec) -> Result<ContainerHandle> {
        let request = self.plan(spec)?;
        self.submit(&request)
    }

    fn resolve_mounts(&self, spec: &ContainerSpec) -> Result<Vec<BindMount>> {
        let base = self.config.volume_base_path.as_path();
        let mut seen = HashSet::new();
        let mut mounts = Vec::with_capacity(spec.volumes.len());

        for volume in &spec.volumes {
            let target = volume.container_path.trim();
            if target.is_empty() {
                return Err(EngineError::validation("volume container path is required"));
            }
            if !Path::new(target).is_absolute() {
                return Err(EngineError::validation(format!(
                    "volume container path '{target}' must be absolute"
                )));
            }
            if !seen.insert(target) {
                return Err(EngineError::validation(format!(
                    "volume container path '{target}' is listed twice"
                )));
            }
            let Some(source) = &volume.host_path else {
                return Err(EngineError::validation(format!(
                    "volume '{target}' has no allocated host path"
                )));
            };
            if !in_owner_namespace(base, spec.owner.id, source) {
                return Err(EngineError::Permission(format!(
                    "volume host path {} is outside the allowed directory {}",
                    source.display(),
                    owner_root(base, spec.owner.id).display()
                )));
            }
            mounts.push(BindMount {
                source: source.clone(),
                target: target.to_string(),
            });
        }
        Ok(mounts)
    }
}

fn validate_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(EngineError::validation("container name must not be empty"));
    };
    let valid = first.is_ascii_alphanumeric()
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if !valid {
        return Err(EngineError::validation(format!(
            "invalid container name '{name}': use letters, digits, '_', '.' or '-'"
        )));
    }
    Ok(())
}

fn validate_env(env: &[EnvVariable]) -> Result<Vec<EnvVariable>> {
    let mut seen = HashSet::new();
    for var in env {
        if var.key.is_empty() || var.key.contains('=') {
            return Err(EngineError::validation(format!(
                "invalid environment variable name '{}'",
                var.key
            )));
        }
        if !seen.insert(var.key.as_str()) {
            return Err(EngineError::validation(format!(
                "environment variable '{}' is listed twice",
                var.key
            )));
        }
    }
    Ok(env.to_vec())
}

fn validate_ports(spec: &ContainerSpec) -> Result<()> {
    let mut seen = HashSet::new();
    for port in &spec.ports {
        if port.container_port == 0 {
            return Err(EngineError::validation("container port must be between 1 and 65535"));
        }
        if port.host_port == Some(0) {
            return Err(EngineError::validation(format!(
                "host port for container port {} must be between 1 and 65535",
                port.container_port
            )));
        }
        if !seen.insert(port.container_port) {
            return Err(EngineError::validation(format!(
                "container port {} is listed twice",
                port.container_port
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::error::ErrorKind;
    use crate::model::{ExposedPort, Label, Owner, Volume};
    use crate::runtime::fake::{FakeAccounts, FakeRuntime, Op};

    fn config() -> Config {
        Config::default()
    }

    fn spec() -> ContainerSpec {
        let mut s = ContainerSpec::new("web", "nginx:alpine", Owner::new(5, "alice"));
        s.env = vec![EnvVariable::new("PORT", "8080")];
        s.ports = vec![ExposedPort::new(80, None), ExposedPort::new(443, Some(8443))];
        s.volumes = vec![Volume::new(
            "/usr/share/nginx/html",
            Some(PathBuf::from("/var/svs/volumes/5/abcdefgh")),
        )];
        s.labels = vec![Label::new("svs_user", "alice")];
        s
    }

    #[test]
    fn plain_image_gets_user_identity() {
        let (rt, accounts, cfg) = (FakeRuntime::new(), FakeAccounts::standard(), config());
        let m = Materializer::new(&rt, &accounts, &cfg);

        let req = m.plan(&spec()).unwrap();
        assert_eq!(req.user.as_deref(), Some("1000:1001"));
        assert_eq!(req.env_value("PUID"), None);
        assert_eq!(req.env_value("PORT"), Some("8080"));
        assert_eq!(req.mounts[0].target, "/usr/share/nginx/html");
    }

    #[test]
    fn self_managed_image_gets_env_identity() {
        let (rt, accounts, cfg) = (FakeRuntime::new(), FakeAccounts::standard(), config());
        let m = Materializer::new(&rt, &accounts, &cfg);
        let mut s = spec();
        s.image = "lscr.io/linuxserver/jellyfin:latest".into();

        let req = m.plan(&s).unwrap();
        assert_eq!(req.user, None);
        assert_eq!(req.env_value("PUID"), Some("1000"));
        assert_eq!(req.env_value("PGID"), Some("1001"));
        assert_eq!(req.env_value("PORT"), Some("8080"));
    }

    #[test]
    fn volume_outside_owner_namespace_is_a_permission_error() {
        let (rt, accounts, cfg) = (FakeRuntime::new(), FakeAccounts::standard(), config());
        let m = Materializer::new(&rt, &accounts, &cfg);
        let mut s = spec();
        s.volumes = vec![Volume::new("/data", Some(PathBuf::from("/var/svs/volumes/6/xyz")))];

        let err = m.create(&s).unwrap_err();
        assert!(matches!(err, EngineError::Permission(_)));
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("outside the allowed directory"));
        assert!(rt.calls().is_empty());
    }

    #[test]
    fn traversal_out_of_namespace_is_rejected() {
        let (rt, accounts, cfg) = (FakeRuntime::new(), FakeAccounts::standard(), config());
        let m = Materializer::new(&rt, &accounts, &cfg);
        let mut s = spec();
        s.volumes = vec![Volume::new(
            "/data",
            Some(PathBuf::from("/var/svs/volumes/5/../6/xyz")),
        )];
        assert!(matches!(m.plan(&s), Err(EngineError::Permission(_))));
    }

    #[test]
    fn unallocated_volume_is_a_validation_error() {
        let (rt, accounts, cfg) = (FakeRuntime::new(), FakeAccounts::standard(), config());
        let m = Materializer::new(&rt, &accounts, &cfg);
        let mut s = spec();
        s.volumes = vec![Volume::new("/data", None)];
        assert!(matches!(m.create(&s), Err(EngineError::Validation(_))));
        assert!(rt.calls().is_empty());
    }

    #[test]
    fn structural_errors_fail_before_the_runtime() {
        let (rt, accounts, cfg) = (FakeRuntime::new(), FakeAccounts::standard(), config());
        let m = Materializer::new(&rt, &accounts, &cfg);

        let mut s = spec();
        s.name = String::new();
        assert!(matches!(m.create(&s), Err(EngineError::Validation(_))));

        let mut s = spec();
        s.ports.push(ExposedPort::new(80, Some(9000)));
        assert!(matches!(m.create(&s), Err(EngineError::Validation(_))));

        let mut s = spec();
        s.volumes = vec![Volume::new(
            "relative",
            Some(PathBuf::from("/var/svs/volumes/5/abc")),
        )];
        assert!(matches!(m.create(&s), Err(EngineError::Validation(_))));

        let mut s = spec();
        s.command = Some("sh -c 'unterminated".into());
        assert!(matches!(m.create(&s), Err(EngineError::Validation(_))));

        assert!(rt.calls().is_empty());
    }

    #[test]
    fn command_and_args_become_one_argv() {
        let (rt, accounts, cfg) = (FakeRuntime::new(), FakeAccounts::standard(), config());
        let m = Materializer::new(&rt, &accounts, &cfg);
        let mut s = spec();
        s.command = Some("sh -c".into());
        s.args = vec!["'echo hi'".into()];

        let req = m.plan(&s).unwrap();
        assert_eq!(req.command, vec!["sh", "-c", "echo hi"]);
    }

    #[test]
    fn unknown_owner_account_fails() {
        let (rt, cfg) = (FakeRuntime::new(), config());
        let accounts = FakeAccounts::new().group("svs-admins", 1001);
        let m = Materializer::new(&rt, &accounts, &cfg);
        assert!(matches!(m.create(&spec()), Err(EngineError::Account(_))));
        assert!(rt.calls().is_empty());
    }

    #[test]
    fn create_makes_exactly_one_runtime_call() {
        let (rt, accounts, cfg) = (FakeRuntime::new(), FakeAccounts::standard(), config());
        let m = Materializer::new(&rt, &accounts, &cfg);

        let handle = m.create(&spec()).unwrap();
        assert_eq!(handle.name, "web");
        assert_eq!(rt.mutations(), vec![Op::Create]);
        let c = rt.container(&handle.id).unwrap();
        assert!(!c.is_running());
    }

    #[test]
    fn runtime_failure_is_wrapped_with_name_and_image() {
        let (rt, accounts, cfg) = (FakeRuntime::new(), FakeAccounts::standard(), config());
        rt.fail(Op::Create);
        let m = Materializer::new(&rt, &accounts, &cfg);

        let err = m.create(&spec()).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("'web'"));
        assert!(text.contains("nginx:alpine"));
        assert_eq!(err.kind(), ErrorKind::OperationFailed);
    }

    #[test]
    fn taken_host_port_fails_loudly() {
        let (rt, accounts, cfg) = (FakeRuntime::new(), FakeAccounts::standard(), config());
        let m = Materializer::new(&rt, &accounts, &cfg);
        m.create(&spec()).unwrap();

        let mut other = spec();
        other.name = "web2".into();
        let err = m.create(&other).unwrap_err();
        assert!(matches!(err, EngineError::Create { .. }));
    }
}
