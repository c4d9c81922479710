use tracing::info;

use crate::model::Service;

/// Side effects that follow service lifecycle events, such as updating a
/// reverse proxy. Hooks are handed to the engine explicitly.
pub trait ServiceHook {
    fn on_service_created(&self, _service: &Service) {}

    fn on_service_deleted(&self, _service: &Service) {}
}

/// Logs lifecycle events.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogHook;

impl ServiceHook for LogHook {
    fn on_service_created(&self, service: &Service) {
        info!(service_id = service.id, name = %service.name, "service created");
    }

    fn on_service_deleted(&self, service: &Service) {
        info!(service_id = service.id, name = %service.name, "service deleted");
    }
}
