//! CLI command definitions and dispatch.

pub mod capability;
pub mod inspect;
pub mod operations;
pub mod validate;

use std::path::Path;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::Value;

use crate::output::OutputFormat;
use fhirext_core::config::AppConfig;
use fhirext_core::error::{AppError, ErrorKind};
use fhirext_registry::{HandlerDispatcher, ModuleManager};
use fhirext_sample::SampleCustomization;

/// fhirext: inspect and exercise the extension registry of a FHIR server
#[derive(Debug, Parser)]
#[command(name = "fhirext", version, about, long_about = None)]
pub struct Cli {
    /// Configuration environment (overlay `config/<env>.toml`)
    #[arg(short, long, default_value = "development")]
    pub env: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show loaded modules and every extension point with handlers
    Inspect,
    /// Show the ordered handlers of an extension point
    Resolve(inspect::ResolveArgs),
    /// List registered operations
    Operations,
    /// Look up the handler of one operation
    Operation(operations::OperationArgs),
    /// Run resource or bundle validators over a JSON file
    Validate(validate::ValidateArgs),
    /// Run capability statement handlers over a JSON file
    Capability(capability::CapabilityArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(&self, config: &AppConfig) -> Result<(), AppError> {
        let (manager, dispatcher) = build_registry(config)?;
        match &self.command {
            Commands::Inspect => inspect::inspect(&manager, &dispatcher, self.format),
            Commands::Resolve(args) => inspect::resolve(args, &dispatcher, self.format),
            Commands::Operations => operations::list(&dispatcher, self.format),
            Commands::Operation(args) => operations::lookup(args, &dispatcher, self.format),
            Commands::Validate(args) => validate::execute(args, &dispatcher, config, self.format),
            Commands::Capability(args) => capability::execute(args, &dispatcher),
        }
    }
}

/// Helper: load the sample module and seal the registry
pub fn build_registry(config: &AppConfig) -> Result<(ModuleManager, HandlerDispatcher), AppError> {
    let mut manager = ModuleManager::new();
    manager.add(Arc::new(SampleCustomization::new(config.sample.clone())))?;
    let dispatcher = manager.dispatcher()?;
    Ok((manager, dispatcher))
}

/// Helper: read a JSON document from disk
pub fn read_json(path: &Path) -> Result<Value, AppError> {
    let source = std::fs::read_to_string(path).map_err(|e| {
        AppError::with_source(
            ErrorKind::NotFound,
            format!("Failed to read '{}'", path.display()),
            e,
        )
    })?;
    Ok(serde_json::from_str(&source)?)
}
