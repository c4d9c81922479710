// Container runtime seam: the client trait, the docker CLI client, inspect parsing, account lookup.

mod cli;
pub mod engine;
#[cfg(test)]
pub mod fake;
mod identity;
pub mod inspect;
mod types;

use thiserror::Error;

pub use cli::DockerCli;
pub use engine::ensure_available;
pub use identity::{AccountResolver, SystemAccounts};
pub(crate) use identity::user_spec;
pub use types::{
    BindMount, ContainerHandle, ContainerState, ContainerSummary, CreateRequest, MountPoint,
    ObservedContainer,
};

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("failed to invoke `{binary}`")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` failed with {}: {stderr}", describe_exit(.code))]
    Command {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("unreadable runtime output")]
    Parse(#[from] serde_json::Error),

    #[error("no such container: {0}")]
    NotFound(String),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("exit status {c}"),
        None => "a signal".to_string(),
    }
}

/// Synchronous client for one host's container engine.
///
/// Every call goes to the runtime; implementations keep no cached view.
pub trait ContainerRuntime {
    /// Create a container without starting it.
    fn create(&self, request: &CreateRequest) -> Result<ContainerHandle, RuntimeError>;

    fn start(&self, id: &str) -> Result<(), RuntimeError>;

    fn stop(&self, id: &str, timeout_secs: u64) -> Result<(), RuntimeError>;

    fn remove(&self, id: &str, force: bool) -> Result<(), RuntimeError>;

    /// Fresh read of a container's live configuration. `Ok(None)` when it does not exist.
    fn inspect(&self, id: &str) -> Result<Option<ObservedContainer>, RuntimeError>;

    fn list(&self) -> Result<Vec<ContainerSummary>, RuntimeError>;

    fn get_by_name(&self, name: &str) -> Result<Option<ObservedContainer>, RuntimeError> {
        self.inspect(name)
    }

    /// Last `tail` lines of the container's combined output.
    fn logs(&self, id: &str, tail: usize) -> Result<String, RuntimeError>;
}
