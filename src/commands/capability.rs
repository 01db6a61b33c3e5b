//! Capability statement command.

use std::path::PathBuf;

use clap::Args;

use crate::output;
use fhirext_core::error::AppError;
use fhirext_registry::HandlerDispatcher;

/// Arguments for `capability`
#[derive(Debug, Args)]
pub struct CapabilityArgs {
    /// JSON file holding a CapabilityStatement
    pub file: PathBuf,
}

/// Prints the statement after every capability handler ran, with supported operations appended.
pub fn execute(args: &CapabilityArgs, dispatcher: &HandlerDispatcher) -> Result<(), AppError> {
    let statement = super::read_json(&args.file)?;
    let mut statement = dispatcher.customize_capability_statement(statement)?;

    let operations: Vec<serde_json::Value> = dispatcher
        .registry()
        .supported_operations()
        .into_iter()
        .map(|op| serde_json::json!({"name": op.name, "definition": op.definition}))
        .collect();
    if let Some(rest) = statement.pointer_mut("/rest/0").and_then(|r| r.as_object_mut()) {
        rest.insert("operation".to_string(), serde_json::Value::Array(operations));
    }

    output::print_json(&statement);
    Ok(())
}
