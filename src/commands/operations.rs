//! Operation index commands.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use fhirext_core::error::AppError;
use fhirext_registry::hooks::WILDCARD;
use fhirext_registry::{HandlerDispatcher, OperationScope};

/// Arguments for `operation`
#[derive(Debug, Args)]
pub struct OperationArgs {
    /// Operation name without the leading `$`
    pub name: String,

    /// Invocation level: `System`, `Type`, or `Instance`
    pub scope: OperationScope,

    /// Resource type the operation is invoked on
    #[arg(short, long, default_value = "*")]
    pub resource_type: String,
}

#[derive(Debug, Serialize, Tabled)]
struct OperationRow {
    #[tabled(rename = "Operation")]
    name: String,
    #[tabled(rename = "Scope")]
    scope: String,
    #[tabled(rename = "Resource type")]
    resource_type: String,
    #[tabled(rename = "Handler")]
    handler: String,
}

/// Lists every operation and the supported operation definitions.
pub fn list(dispatcher: &HandlerDispatcher, format: OutputFormat) -> Result<(), AppError> {
    let registry = dispatcher.registry();
    let rows: Vec<OperationRow> = registry
        .describe()
        .operations
        .into_iter()
        .map(|op| OperationRow {
            name: format!("${}", op.name),
            scope: op.scope.to_string(),
            resource_type: op.resource_type,
            handler: op.handler,
        })
        .collect();

    match format {
        OutputFormat::Json => output::print_json(&serde_json::json!({
            "operations": rows,
            "supported": registry.supported_operations(),
        })),
        OutputFormat::Table => {
            output::print_list(&rows, format);
            for supported in registry.supported_operations() {
                output::print_kv(&supported.name, &supported.definition);
            }
        }
    }
    Ok(())
}

/// Resolves one operation the way the host would on invocation.
pub fn lookup(
    args: &OperationArgs,
    dispatcher: &HandlerDispatcher,
    format: OutputFormat,
) -> Result<(), AppError> {
    let registry = dispatcher.registry();
    if registry
        .resolve_operation(&args.name, args.scope, &args.resource_type)
        .is_none()
    {
        return Err(AppError::not_found(format!(
            "operation ${} not supported at {} level for {}",
            args.name, args.scope, args.resource_type
        )));
    }

    // Report the entry that answered: the exact key, else its wildcard.
    let operations = registry.describe().operations;
    let matched = [args.resource_type.as_str(), WILDCARD]
        .into_iter()
        .find_map(|resource_type| {
            operations.iter().find(|op| {
                op.name == args.name && op.scope == args.scope && op.resource_type == resource_type
            })
        });

    if let Some(op) = matched {
        let row = OperationRow {
            name: format!("${}", op.name),
            scope: op.scope.to_string(),
            resource_type: op.resource_type.clone(),
            handler: op.handler.clone(),
        };
        output::print_list(std::slice::from_ref(&row), format);
    }
    Ok(())
}
