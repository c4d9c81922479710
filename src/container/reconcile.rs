use tracing::{info, warn};

use super::materializer::Materializer;
use crate::error::{EngineError, Result, Stage};
use crate::model::ContainerSpec;
use crate::runtime::{ContainerHandle, ContainerRuntime, ObservedContainer};

/// Replaces a container with a fresh one built from its desired spec.
///
/// Destroy-then-create: once the old container is removed it is gone, even
/// if creating the new one fails. Nothing is rolled back.
pub struct Reconciler<'a> {
    runtime: &'a dyn ContainerRuntime,
    materializer: &'a Materializer<'a>,
    stop_timeout: u64,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        runtime: &'a dyn ContainerRuntime,
        materializer: &'a Materializer<'a>,
        stop_timeout: u64,
    ) -> Self {
        Self {
            runtime,
            materializer,
            stop_timeout,
        }
    }

    /// Stop (if running), force-remove, then create from `desired`.
    ///
    /// `desired` is validated before anything is touched. Each later stage
    /// runs only if the one before it succeeded; failures carry their stage.
    pub fn recreate(
        &self,
        observed: &ObservedContainer,
        desired: &ContainerSpec,
    ) -> Result<ContainerHandle> {
        let request = self.materializer.plan(desired)?;
        let name = observed.name.as_str();
        info!(container = name, id = %observed.id, "recreating container");

        if observed.is_running() {
            self.runtime
                .stop(&observed.id, self.stop_timeout)
                .map_err(|e| EngineError::stage(Stage::Stop, name, e.into()))?;
        }

        self.runtime
            .remove(&observed.id, true)
            .map_err(|e| EngineError::stage(Stage::Remove, name, e.into()))?;

        let handle = self.materializer.submit(&request).map_err(|e| {
            warn!(container = name, "old container removed but replacement failed");
            EngineError::stage(Stage::Create, name, e)
        })?;
        info!(container = %handle.name, old = %observed.id, new = %handle.id, "recreated container");
        Ok(handle)
    }
}
