//! Customization modules: units of registration loaded by the [`crate::ModuleManager`].

use serde::{Deserialize, Serialize};

use fhirext_core::AppResult;

use crate::builder::RegistryBuilder;

/// Metadata about a customization module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfo {
    /// Unique module identifier.
    pub id: String,
    /// Human-readable module name.
    pub name: String,
    /// Module version string.
    pub version: String,
    /// Module description.
    pub description: String,
    /// Author or maintainer.
    pub author: String,
}

/// Trait that all customization modules implement.
pub trait CustomizationModule: Send + Sync + std::fmt::Debug {
    /// Returns module metadata.
    fn info(&self) -> ModuleInfo;

    /// Registers the module's handlers and operations.
    fn register(&self, builder: &mut RegistryBuilder) -> AppResult<()>;
}
