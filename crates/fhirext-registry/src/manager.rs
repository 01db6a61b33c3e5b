//! Module manager: loads customization modules into one registry and seals it.

use std::sync::Arc;

use tracing::info;

use fhirext_core::{AppError, AppResult};

use crate::builder::RegistryBuilder;
use crate::hooks::dispatcher::HandlerDispatcher;
use crate::module::{CustomizationModule, ModuleInfo};
use crate::registry::Registry;

/// Collects modules, runs their registrations in insertion order, and seals the result.
#[derive(Debug, Default)]
pub struct ModuleManager {
    modules: Vec<Arc<dyn CustomizationModule>>,
}

impl ModuleManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a module. Ids must be unique.
    pub fn add(&mut self, module: Arc<dyn CustomizationModule>) -> AppResult<&mut Self> {
        let id = module.info().id;
        if self.modules.iter().any(|m| m.info().id == id) {
            return Err(AppError::conflict(format!(
                "Customization module '{id}' is already added"
            )));
        }
        self.modules.push(module);
        Ok(self)
    }

    /// Metadata of every added module, in insertion order.
    pub fn list(&self) -> Vec<ModuleInfo> {
        self.modules.iter().map(|m| m.info()).collect()
    }

    /// Runs every module's registration against `builder`.
    ///
    /// The first failing module aborts loading.
    pub fn load(&self, builder: &mut RegistryBuilder) -> AppResult<()> {
        for module in &self.modules {
            let info = module.info();
            let handlers_before = builder.handler_count();
            let operations_before = builder.operation_count();

            module.register(builder).map_err(|e| {
                AppError::with_source(
                    e.kind,
                    format!("Customization module '{}' failed to register", info.id),
                    e,
                )
            })?;

            info!(
                module_id = %info.id,
                name = %info.name,
                version = %info.version,
                handlers = builder.handler_count() - handlers_before,
                operations = builder.operation_count() - operations_before,
                "Customization module loaded"
            );
        }
        Ok(())
    }

    /// Loads every module into a fresh builder and seals it.
    pub fn seal(&self) -> AppResult<Arc<Registry>> {
        let mut builder = RegistryBuilder::new();
        self.load(&mut builder)?;
        Ok(Arc::new(builder.build()))
    }

    /// Seals and wraps the registry in a dispatcher.
    pub fn dispatcher(&self) -> AppResult<HandlerDispatcher> {
        Ok(HandlerDispatcher::new(self.seal()?))
    }
}
