//! Single-host service reconciliation.
//!
//! Services are created from templates plus per-instance overrides, backed by
//! containers on a local runtime, and recreated whenever the live container
//! drifts from the stored spec.

pub mod alloc;
pub mod config;
pub mod container;
pub mod error;
pub mod logging;
pub mod model;
pub mod runtime;
pub mod service;

pub use error::{EngineError, ErrorKind, Result};
pub use service::{Collaborators, CreateServiceRequest, Engine};
