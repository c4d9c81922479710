use crate::alloc::{PortAllocator, PortProbe, VolumeAllocator, VolumeFs};
use crate::config::Config;
use crate::container::{DriftDetector, Materializer};
use crate::error::{EngineError, Result};
use crate::model::Service;
use crate::runtime::{AccountResolver, ContainerRuntime, ObservedContainer};

use super::hooks::ServiceHook;
use super::store::RecordStore;

/// Every external collaborator the engine calls through.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub runtime: &'a dyn ContainerRuntime,
    pub accounts: &'a dyn AccountResolver,
    pub store: &'a dyn RecordStore,
    pub probe: &'a dyn PortProbe,
    pub fs: &'a dyn VolumeFs,
}

/// Service workflows over one host's runtime.
///
/// Holds no mutable state of its own: everything lives in the record store
/// and the runtime, so separate engines may serve different services at once.
pub struct Engine<'a> {
    pub(super) runtime: &'a dyn ContainerRuntime,
    pub(super) store: &'a dyn RecordStore,
    pub(super) config: &'a Config,
    pub(super) hooks: Vec<&'a dyn ServiceHook>,
    accounts: &'a dyn AccountResolver,
    probe: &'a dyn PortProbe,
    fs: &'a dyn VolumeFs,
}

impl<'a> Engine<'a> {
    pub fn new(collaborators: Collaborators<'a>, config: &'a Config) -> Self {
        Self {
            runtime: collaborators.runtime,
            store: collaborators.store,
            config,
            hooks: Vec::new(),
            accounts: collaborators.accounts,
            probe: collaborators.probe,
            fs: collaborators.fs,
        }
    }

    pub fn with_hook(mut self, hook: &'a dyn ServiceHook) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn materializer(&self) -> Materializer<'a> {
        Materializer::new(self.runtime, self.accounts, self.config)
    }

    pub fn detector(&self) -> DriftDetector<'a> {
        DriftDetector::new(self.runtime)
    }

    pub fn ports(&self) -> PortAllocator<'a> {
        PortAllocator::from_config(self.probe, self.config)
    }

    pub fn volumes(&self) -> VolumeAllocator<'a> {
        VolumeAllocator::from_config(self.fs, self.config)
    }

    pub fn service(&self, id: i64) -> Result<Service> {
        self.store
            .service(id)?
            .ok_or_else(|| EngineError::not_found("service", id))
    }

    pub fn services(&self) -> Result<Vec<Service>> {
        self.store.services()
    }

    /// Fresh view of the service's container.
    pub(super) fn live(&self, service: &Service) -> Result<ObservedContainer> {
        let id = container_id(service)?;
        self.detector().reload(id)
    }
}

pub(super) fn container_id(service: &Service) -> Result<&str> {
    service.container_id.as_deref().ok_or_else(|| {
        EngineError::validation(format!("service '{}' has no container", service.name))
    })
}
