//! # fhirext-registry
//!
//! Extension-point registry for FHIR server customization. Provides:
//!
//! - Extension point catalogue with per-point precedence families
//! - Registration API (`RegistryBuilder`) sealed into an immutable `Registry`
//! - Tiered resolution (global / resource type / wildcard)
//! - Operation index keyed by name, scope, and resource type
//! - Host-side dispatcher with the documented call semantics
//! - Customization modules and their manager

pub mod builder;
pub mod hooks;
pub mod macros;
pub mod manager;
pub mod module;
pub mod operations;
pub mod prelude;
pub mod registry;

pub use builder::RegistryBuilder;
pub use hooks::definitions::{ExtensionPoint, Interaction, PrecedenceFamily};
pub use hooks::dispatcher::{HandlerDispatcher, ValidationReport};
pub use hooks::handler::Handler;
pub use manager::ModuleManager;
pub use module::{CustomizationModule, ModuleInfo};
pub use operations::{OperationInvocation, OperationKey, OperationScope, SupportedOperation};
pub use registry::{Registry, RegistrySummary};
