// In-memory runtime and account doubles for unit tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use super::types::{
    ContainerHandle, ContainerState, ContainerSummary, CreateRequest, MountPoint, ObservedContainer,
};
use super::{AccountResolver, ContainerRuntime, RuntimeError};
use crate::error::{EngineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Create,
    Start,
    Stop,
    Remove,
    Inspect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create(CreateRequest),
    Start(String),
    Stop(String),
    Remove { id: String, force: bool },
    Inspect(String),
}

impl Call {
    pub fn op(&self) -> Op {
        match self {
            Call::Create(_) => Op::Create,
            Call::Start(_) => Op::Start,
            Call::Stop(_) => Op::Stop,
            Call::Remove { .. } => Op::Remove,
            Call::Inspect(_) => Op::Inspect,
        }
    }
}

#[derive(Default)]
struct State {
    containers: BTreeMap<String, ObservedContainer>,
    image_env: HashMap<String, Vec<String>>,
    logs: HashMap<String, String>,
    bound: HashMap<String, Vec<u16>>,
    failing: HashSet<Op>,
    calls: Vec<Call>,
    next_id: u32,
}

/// Records every call and keeps containers in a map. Operations can be
/// made to fail with [`FakeRuntime::fail`].
#[derive(Default)]
pub struct FakeRuntime {
    state: Mutex<State>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, op: Op) {
        self.state.lock().unwrap().failing.insert(op);
    }

    pub fn recover(&self, op: Op) {
        self.state.lock().unwrap().failing.remove(&op);
    }

    /// Env the runtime reports as baked into `image`.
    pub fn set_image_env(&self, image: &str, env: &[&str]) {
        self.state
            .lock()
            .unwrap()
            .image_env
            .insert(image.to_string(), env.iter().map(|e| e.to_string()).collect());
    }

    pub fn set_logs(&self, id: &str, text: &str) {
        self.state
            .lock()
            .unwrap()
            .logs
            .insert(id.to_string(), text.to_string());
    }

    pub fn insert(&self, container: ObservedContainer) {
        self.state
            .lock()
            .unwrap()
            .containers
            .insert(container.id.clone(), container);
    }

    pub fn container(&self, id: &str) -> Option<ObservedContainer> {
        self.state.lock().unwrap().containers.get(id).cloned()
    }

    pub fn edit(&self, id: &str, f: impl FnOnce(&mut ObservedContainer)) {
        let mut state = self.state.lock().unwrap();
        if let Some(c) = state.containers.get_mut(id) {
            f(c);
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Recorded operations, without the read-only inspects.
    pub fn mutations(&self) -> Vec<Op> {
        self.calls()
            .iter()
            .map(Call::op)
            .filter(|op| *op != Op::Inspect)
            .collect()
    }

    pub fn created(&self) -> Vec<CreateRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Create(req) => Some(req),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    fn record(&self, call: Call) -> std::result::Result<(), RuntimeError> {
        let mut state = self.state.lock().unwrap();
        let op = call.op();
        state.calls.push(call);
        if state.failing.contains(&op) {
            return Err(RuntimeError::Command {
                command: format!("docker {op:?}").to_lowercase(),
                code: Some(1),
                stderr: "injected failure".into(),
            });
        }
        Ok(())
    }
}

fn missing(id: &str) -> RuntimeError {
    RuntimeError::NotFound(id.to_string())
}

impl ContainerRuntime for FakeRuntime {
    fn create(&self, request: &CreateRequest) -> std::result::Result<ContainerHandle, RuntimeError> {
        self.record(Call::Create(request.clone()))?;
        let mut state = self.state.lock().unwrap();

        if state.containers.values().any(|c| c.name == request.name) {
            return Err(RuntimeError::Command {
                command: "docker create".into(),
                code: Some(125),
                stderr: format!("Conflict. The container name \"/{}\" is already in use", request.name),
            });
        }
        let taken: HashSet<u16> = state.bound.values().flatten().copied().collect();
        let host_ports: Vec<u16> = request.ports.iter().filter_map(|p| p.host_port).collect();
        if let Some(port) = host_ports.iter().find(|p| taken.contains(*p)) {
            return Err(RuntimeError::Command {
                command: "docker create".into(),
                code: Some(125),
                stderr: format!("Bind for 0.0.0.0:{port} failed: port is already allocated"),
            });
        }

        state.next_id += 1;
        let id = format!("fake{:04}", state.next_id);
        let image_env = state.image_env.get(&request.image).cloned().unwrap_or_default();

        let mut env = image_env.clone();
        for var in &request.env {
            let prefix = format!("{}=", var.key);
            env.retain(|e| !e.starts_with(&prefix));
            env.push(var.to_string());
        }

        let labels: BTreeMap<String, String> = request
            .labels
            .iter()
            .map(|l| (l.key.clone(), l.value.clone()))
            .collect();
        state.bound.insert(id.clone(), host_ports);

        let container = ObservedContainer {
            id: id.clone(),
            name: request.name.clone(),
            image: request.image.clone(),
            state: ContainerState::Created,
            cmd: request.command.clone(),
            env,
            image_env,
            ports: request.ports.iter().map(|p| p.port_key()).collect(),
            mounts: request
                .mounts
                .iter()
                .map(|m| MountPoint {
                    destination: m.target.clone(),
                    source: Some(m.source.display().to_string()),
                })
                .collect(),
            labels,
            user: request.user.clone().unwrap_or_default(),
        };
        state.containers.insert(id.clone(), container);
        Ok(ContainerHandle::new(id, &request.name))
    }

    fn start(&self, id: &str) -> std::result::Result<(), RuntimeError> {
        self.record(Call::Start(id.to_string()))?;
        let mut state = self.state.lock().unwrap();
        let c = state.containers.get_mut(id).ok_or_else(|| missing(id))?;
        c.state = ContainerState::Running;
        Ok(())
    }

    fn stop(&self, id: &str, _timeout_secs: u64) -> std::result::Result<(), RuntimeError> {
        self.record(Call::Stop(id.to_string()))?;
        let mut state = self.state.lock().unwrap();
        let c = state.containers.get_mut(id).ok_or_else(|| missing(id))?;
        c.state = ContainerState::Exited;
        Ok(())
    }

    fn remove(&self, id: &str, force: bool) -> std::result::Result<(), RuntimeError> {
        self.record(Call::Remove {
            id: id.to_string(),
            force,
        })?;
        let mut state = self.state.lock().unwrap();
        let running = state
            .containers
            .get(id)
            .map(|c| c.is_running())
            .ok_or_else(|| missing(id))?;
        if running && !force {
            return Err(RuntimeError::Command {
                command: "docker rm".into(),
                code: Some(1),
                stderr: "You cannot remove a running container".into(),
            });
        }
        state.containers.remove(id);
        state.bound.remove(id);
        Ok(())
    }

    fn inspect(&self, id: &str) -> std::result::Result<Option<ObservedContainer>, RuntimeError> {
        self.record(Call::Inspect(id.to_string()))?;
        let state = self.state.lock().unwrap();
        Ok(state
            .containers
            .get(id)
            .or_else(|| state.containers.values().find(|c| c.name == id))
            .cloned())
    }

    fn list(&self) -> std::result::Result<Vec<ContainerSummary>, RuntimeError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .containers
            .values()
            .map(|c| ContainerSummary {
                id: c.id.clone(),
                name: c.name.clone(),
                image: c.image.clone(),
                state: c.state,
            })
            .collect())
    }

    fn logs(&self, id: &str, tail: usize) -> std::result::Result<String, RuntimeError> {
        let state = self.state.lock().unwrap();
        if !state.containers.contains_key(id) {
            return Err(missing(id));
        }
        let text = state.logs.get(id).cloned().unwrap_or_default();
        let lines: Vec<&str> = text.lines().collect();
        let start = lines.len().saturating_sub(tail);
        Ok(lines[start..].iter().map(|l| format!("{l}\n")).collect())
    }
}

/// Fixed user and group tables.
#[derive(Debug, Default, Clone)]
pub struct FakeAccounts {
    users: HashMap<String, u32>,
    groups: HashMap<String, u32>,
}

impl FakeAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// `alice` = 1000, `bob` = 1002, group `svs-admins` = 1001.
    pub fn standard() -> Self {
        Self::new()
            .user("alice", 1000)
            .user("bob", 1002)
            .group("svs-admins", 1001)
    }

    pub fn user(mut self, name: &str, uid: u32) -> Self {
        self.users.insert(name.to_string(), uid);
        self
    }

    pub fn group(mut self, name: &str, gid: u32) -> Self {
        self.groups.insert(name.to_string(), gid);
        self
    }
}

impl AccountResolver for FakeAccounts {
    fn uid_of(&self, user: &str) -> Result<u32> {
        self.users
            .get(user)
            .copied()
            .ok_or_else(|| EngineError::Account(format!("user '{user}' does not exist")))
    }

    fn gid_of(&self, group: &str) -> Result<u32> {
        self.groups
            .get(group)
            .copied()
            .ok_or_else(|| EngineError::Account(format!("group '{group}' does not exist")))
    }
}
