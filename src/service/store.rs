use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::{EngineError, Result};
use crate::model::{NewService, Service, Template};

/// Where templates and services live. The engine only reads and writes
/// plain values through this; schema and persistence belong to the store.
pub trait RecordStore {
    fn template(&self, id: i64) -> Result<Option<Template>>;

    /// Store a new service and return it with its assigned id.
    fn insert_service(&self, service: NewService) -> Result<Service>;

    fn service(&self, id: i64) -> Result<Option<Service>>;

    fn services(&self) -> Result<Vec<Service>>;

    fn update_service(&self, service: &Service) -> Result<()>;

    fn delete_service(&self, id: i64) -> Result<()>;
}

#[derive(Default)]
struct Tables {
    templates: BTreeMap<i64, Template>,
    services: BTreeMap<i64, Service>,
    next_service_id: i64,
}

/// Process-local store, for tools and tests that have no database.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_template(&self, template: Template) -> Result<()> {
        self.lock()?.templates.insert(template.id, template);
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| EngineError::Store("memory store lock poisoned".into()))
    }
}

impl RecordStore for MemoryStore {
    fn template(&self, id: i64) -> Result<Option<Template>> {
        Ok(self.lock()?.templates.get(&id).cloned())
    }

    fn insert_service(&self, service: NewService) -> Result<Service> {
        let mut tables = self.lock()?;
        if tables.services.values().any(|s| s.name == service.name) {
            return Err(EngineError::Store(format!(
                "a service named '{}' already exists",
                service.name
            )));
        }
        tables.next_service_id += 1;
        let stored = service.with_id(tables.next_service_id);
        tables.services.insert(stored.id, stored.clone());
        Ok(stored)
    }

    fn service(&self, id: i64) -> Result<Option<Service>> {
        Ok(self.lock()?.services.get(&id).cloned())
    }

    fn services(&self) -> Result<Vec<Service>> {
        Ok(self.lock()?.services.values().cloned().collect())
    }

    fn update_service(&self, service: &Service) -> Result<()> {
        let mut tables = self.lock()?;
        match tables.services.get_mut(&service.id) {
            Some(row) => {
                *row = service.clone();
                Ok(())
            }
            None => Err(EngineError::not_found("service", service.id)),
        }
    }

    fn delete_service(&self, id: i64) -> Result<()> {
        self.lock()?.services.remove(&id);
        Ok(())
    }
}
