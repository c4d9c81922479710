use std::path::PathBuf;

use tracing::{info, warn};

use super::engine::Engine;
use super::request::{CreateServiceRequest, resolve};
use crate::error::{EngineError, Result};
use crate::model::{ContainerSpec, Label, NewService, Service, merge};

/// Label naming the owning account.
pub const OWNER_LABEL: &str = "svs_user";
/// Label carrying the service's record id.
pub const SERVICE_ID_LABEL: &str = "service_id";
/// Container ports the reverse proxy forwards to.
pub const HTTP_PORTS: [u16; 2] = [80, 443];

/// Labels derived from the stored record: its id and, with a domain, the
/// reverse proxy routing.
pub fn system_labels(service: &Service) -> Vec<Label> {
    let mut labels = vec![Label::new(SERVICE_ID_LABEL, service.id.to_string())];
    if let Some(domain) = &service.domain {
        labels.push(Label::new("caddy", domain));
        let upstreams: Vec<String> = service
            .ports
            .iter()
            .filter(|p| HTTP_PORTS.contains(&p.container_port))
            .map(|p| format!("{{{{upstreams {}}}}}", p.container_port))
            .collect();
        if !upstreams.is_empty() {
            labels.push(Label::new("caddy.reverse_proxy", upstreams.join(" ")));
        }
    }
    labels
}

impl Engine<'_> {
    /// Create a service from a template and materialize its container.
    ///
    /// The merge of template and overrides happens here, once. On a failed
    /// create the stored record and any freshly allocated volumes are removed.
    pub fn create_service(&self, request: &CreateServiceRequest) -> Result<Service> {
        if request.name.trim().is_empty() {
            return Err(EngineError::validation("service name must not be empty"));
        }
        let template = self
            .store
            .template(request.template_id)?
            .ok_or_else(|| EngineError::not_found("template", request.template_id))?;
        info!(service = %request.name, template = %template.name, "creating service");

        let mut resolved = resolve(&template, request);
        resolved.labels = merge(
            &resolved.labels,
            &[Label::new(OWNER_LABEL, &request.owner.name)],
        );

        let mut allocated = Vec::new();
        let result = self
            .allocate(&mut resolved, &mut allocated)
            .and_then(|()| self.store_and_materialize(resolved));
        if result.is_err() {
            self.release_volumes(&allocated);
        }
        result
    }

    fn allocate(&self, service: &mut NewService, allocated: &mut Vec<PathBuf>) -> Result<()> {
        let ports = self.ports();
        for port in service.ports.iter_mut().filter(|p| p.host_port.is_none()) {
            port.host_port = Some(ports.find_free_port()?);
        }
        let volumes = self.volumes();
        for volume in service.volumes.iter_mut().filter(|v| v.host_path.is_none()) {
            let path = volumes.generate_free_volume(service.owner.id)?;
            allocated.push(path.clone());
            volume.host_path = Some(path);
        }
        Ok(())
    }

    fn store_and_materialize(&self, resolved: NewService) -> Result<Service> {
        let mut service = self.store.insert_service(resolved)?;
        service.labels = merge(&service.labels, &system_labels(&service));

        let created = self
            .materializer()
            .create(&ContainerSpec::from(&service))
            .and_then(|handle| {
                service.container_id = Some(handle.id.clone());
                self.store.update_service(&service).map_err(|err| {
                    self.discard_container(&handle.id);
                    err
                })
            });
        match created {
            Ok(()) => {
                for hook in &self.hooks {
                    hook.on_service_created(&service);
                }
                info!(service_id = service.id, name = %service.name, "service created");
                Ok(service)
            }
            Err(err) => {
                if let Err(cleanup) = self.store.delete_service(service.id) {
                    warn!(service_id = service.id, "could not remove record after failed create: {cleanup}");
                }
                Err(err)
            }
        }
    }

    fn discard_container(&self, id: &str) {
        if let Err(err) = self.runtime.remove(id, true) {
            warn!(container = %id, "could not remove container after failed create: {err}");
        }
    }

    fn release_volumes(&self, paths: &[PathBuf]) {
        let volumes = self.volumes();
        for path in paths {
            if let Err(err) = volumes.delete_volume(path) {
                warn!(path = %path.display(), "could not release volume: {err}");
            }
        }
    }
}
