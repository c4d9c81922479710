use tracing::{info, warn};

use super::engine::{Engine, container_id};
use crate::container::{Drift, Reconciler};
use crate::error::{EngineError, Result, Stage};
use crate::model::{ContainerSpec, Service, ServiceStatus};
use crate::runtime::{ObservedContainer, RuntimeError};

/// Outcome of [`Engine::rebuild_drifted`].
#[derive(Debug, Default)]
pub struct RebuildReport {
    pub recreated: Vec<i64>,
    pub unchanged: Vec<i64>,
    pub failed: Vec<(i64, EngineError)>,
}

impl RebuildReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// A runtime error on a known container; a vanished one becomes `NotFound`.
fn on_container(id: &str, err: RuntimeError) -> EngineError {
    match err {
        RuntimeError::NotFound(_) => EngineError::not_found("container", id),
        other => other.into(),
    }
}

impl Engine<'_> {
    /// Start the service's container, recreating it first if it drifted.
    pub fn start(&self, service_id: i64) -> Result<Service> {
        let mut service = self.service(service_id)?;
        let observed = self.live(&service)?;
        let desired = ContainerSpec::from(&service);

        if !self.detector().check(&observed, &desired)?.is_empty() {
            self.reconcile(&mut service, &observed, &desired)?;
        }

        let id = container_id(&service)?.to_string();
        info!(service = %service.name, container = %id, "starting service");
        self.runtime.start(&id).map_err(|e| on_container(&id, e))?;
        service.status = ServiceStatus::Running;
        self.store.update_service(&service)?;
        Ok(service)
    }

    pub fn stop(&self, service_id: i64) -> Result<Service> {
        let mut service = self.service(service_id)?;
        let id = container_id(&service)?.to_string();
        info!(service = %service.name, container = %id, "stopping service");
        self.runtime
            .stop(&id, self.config.stop_timeout)
            .map_err(|e| on_container(&id, e))?;
        service.status = ServiceStatus::Stopped;
        self.store.update_service(&service)?;
        Ok(service)
    }

    /// Replace the container with one built from the stored spec. A running
    /// service is started again afterwards. The service id never changes.
    pub fn recreate(&self, service_id: i64) -> Result<Service> {
        let mut service = self.service(service_id)?;
        let observed = self.live(&service)?;
        let was_running = observed.is_running();
        let desired = ContainerSpec::from(&service);

        let id = self.reconcile(&mut service, &observed, &desired)?;
        if was_running {
            self.runtime.start(&id).map_err(|e| on_container(&id, e))?;
            service.status = ServiceStatus::Running;
            self.store.update_service(&service)?;
        }
        Ok(service)
    }

    /// Drift of one service's container against its stored spec.
    pub fn drift(&self, service_id: i64) -> Result<Vec<Drift>> {
        let service = self.service(service_id)?;
        let observed = self.live(&service)?;
        self.detector().check(&observed, &ContainerSpec::from(&service))
    }

    /// Recreate every service whose container drifted. One failure does not
    /// stop the sweep; it is reported with its service id.
    pub fn rebuild_drifted(&self) -> Result<RebuildReport> {
        let mut report = RebuildReport::default();
        for service in self.store.services()? {
            if service.container_id.is_none() {
                continue;
            }
            let outcome = self
                .drift(service.id)
                .and_then(|drift| {
                    if drift.is_empty() {
                        Ok(false)
                    } else {
                        self.recreate(service.id).map(|_| true)
                    }
                });
            match outcome {
                Ok(true) => report.recreated.push(service.id),
                Ok(false) => report.unchanged.push(service.id),
                Err(err) => {
                    warn!(service = %service.name, "rebuild failed: {err}");
                    report.failed.push((service.id, err));
                }
            }
        }
        info!(
            recreated = report.recreated.len(),
            failed = report.failed.len(),
            "rebuild finished"
        );
        Ok(report)
    }

    /// Remove the container, the service's volumes and its record.
    pub fn delete(&self, service_id: i64) -> Result<()> {
        let service = self.service(service_id)?;
        if let Some(id) = &service.container_id {
            if self.runtime.inspect(id)?.is_some() {
                info!(service = %service.name, container = %id, "removing container");
                self.runtime.remove(id, true).map_err(|e| on_container(id, e))?;
            }
        }

        let volumes = self.volumes();
        for path in service.volumes.iter().filter_map(|v| v.host_path.as_ref()) {
            if volumes.contains(service.owner.id, path) {
                volumes.delete_volume(path)?;
            } else {
                warn!(path = %path.display(), "not deleting volume outside the owner namespace");
            }
        }

        self.store.delete_service(service.id)?;
        for hook in &self.hooks {
            hook.on_service_deleted(&service);
        }
        info!(service = %service.name, "service deleted");
        Ok(())
    }

    /// Re-derive the stored status from the live container.
    pub fn refresh_status(&self, service_id: i64) -> Result<Service> {
        let mut service = self.service(service_id)?;
        let state = match &service.container_id {
            Some(id) => self.runtime.inspect(id)?.map(|c| c.state),
            None => None,
        };
        service.status = state.map_or(ServiceStatus::Created, ServiceStatus::from);
        self.store.update_service(&service)?;
        Ok(service)
    }

    /// Last `tail` lines of the service's container output.
    pub fn logs(&self, service_id: i64, tail: usize) -> Result<String> {
        let service = self.service(service_id)?;
        let id = container_id(&service)?;
        self.runtime.logs(id, tail).map_err(|e| on_container(id, e))
    }

    /// Run the reconciler and record the outcome before anything else runs:
    /// the new container id on success, no container if the old one is
    /// already gone when the replacement fails.
    fn reconcile(
        &self,
        service: &mut Service,
        observed: &ObservedContainer,
        desired: &ContainerSpec,
    ) -> Result<String> {
        let materializer = self.materializer();
        let reconciler = Reconciler::new(self.runtime, &materializer, self.config.stop_timeout);
        match reconciler.recreate(observed, desired) {
            Ok(handle) => {
                service.container_id = Some(handle.id.clone());
                service.status = ServiceStatus::Created;
                self.store.update_service(service)?;
                Ok(handle.id)
            }
            Err(err) => {
                if err.failed_stage() == Some(Stage::Create) {
                    service.container_id = None;
                    service.status = ServiceStatus::Created;
                    self.store.update_service(service)?;
                }
                Err(err)
            }
        }
    }
}
