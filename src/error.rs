use std::fmt;

use thiserror::Error;

use crate::runtime::RuntimeError;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Which bounded allocator ran out of candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Port,
    Volume,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Port => f.write_str("port"),
            Self::Volume => f.write_str("volume"),
        }
    }
}

/// Step of a destructive recreation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Stop,
    Remove,
    Create,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stop => f.write_str("stop"),
            Self::Remove => f.write_str("remove"),
            Self::Create => f.write_str("create"),
        }
    }
}

/// Coarse classification callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller's input broke a structural or authorization rule. Nothing ran.
    Validation,
    /// An allocator used up its attempt budget. Safe to retry.
    ResourceExhausted,
    /// A runtime or OS call failed mid-flight.
    OperationFailed,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("permission denied: {0}")]
    Permission(String),

    #[error("no free {resource} found after {attempts} attempts")]
    Exhausted { resource: Resource, attempts: u32 },

    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error("{stage} failed for container '{container}'")]
    Stage {
        stage: Stage,
        container: String,
        #[source]
        source: Box<EngineError>,
    },

    #[error("failed to create container '{name}' from image '{image}'")]
    Create {
        name: String,
        image: String,
        #[source]
        source: RuntimeError,
    },

    #[error("account lookup failed: {0}")]
    Account(String),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("record store error: {0}")]
    Store(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn stage(stage: Stage, container: impl Into<String>, source: EngineError) -> Self {
        Self::Stage {
            stage,
            container: container.into(),
            source: Box::new(source),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::Permission(_) | Self::NotFound { .. } => {
                ErrorKind::Validation
            }
            Self::Exhausted { .. } => ErrorKind::ResourceExhausted,
            Self::Stage { .. }
            | Self::Create { .. }
            | Self::Account(_)
            | Self::Runtime(_)
            | Self::Store(_)
            | Self::Io(_) => ErrorKind::OperationFailed,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::ResourceExhausted
    }

    /// Stage tag of a reconciler failure, if this is one.
    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn exhaustion_is_the_only_retryable_kind() {
        let err = EngineError::Exhausted {
            resource: Resource::Port,
            attempts: 100,
        };
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "no free port found after 100 attempts");

        assert!(!EngineError::validation("empty name").is_retryable());
        assert!(!EngineError::Permission("outside".into()).is_retryable());
    }

    #[test]
    fn permission_counts_as_validation() {
        let err = EngineError::Permission("host path outside namespace".into());
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn stage_error_keeps_its_cause() {
        let cause = EngineError::Runtime(RuntimeError::NotFound("abc".into()));
        let err = EngineError::stage(Stage::Stop, "web", cause);

        assert_eq!(err.failed_stage(), Some(Stage::Stop));
        assert_eq!(err.kind(), ErrorKind::OperationFailed);
        assert_eq!(err.to_string(), "stop failed for container 'web'");
        let source = err.source().expect("stage error has a source");
        assert!(source.to_string().contains("abc"));
    }
}
