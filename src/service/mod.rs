// Service workflows: create from a template, start, stop, recreate, delete.

mod create;
mod engine;
mod hooks;
mod lifecycle;
mod request;
mod store;

pub use create::{HTTP_PORTS, OWNER_LABEL, SERVICE_ID_LABEL, system_labels};
pub use engine::{Collaborators, Engine};
pub use hooks::{LogHook, ServiceHook};
pub use lifecycle::RebuildReport;
pub use request::{CreateServiceRequest, Overrides, resolve};
pub use store::{MemoryStore, RecordStore};
