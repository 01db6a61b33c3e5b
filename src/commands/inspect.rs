//! Registry inspection commands.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use fhirext_core::error::AppError;
use fhirext_registry::hooks::Cardinality;
use fhirext_registry::{ExtensionPoint, HandlerDispatcher, ModuleManager};

/// Arguments for `resolve`
#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// Extension point, e.g. `before_create` or `consent`
    pub point: ExtensionPoint,

    /// Resource type to resolve for (`*` queries wildcard handlers only)
    #[arg(short, long, default_value = "*")]
    pub resource_type: String,
}

#[derive(Debug, Serialize, Tabled)]
struct ScopeRow {
    #[tabled(rename = "Extension point")]
    point: String,
    #[tabled(rename = "Scope")]
    scope: String,
    #[tabled(rename = "Handlers")]
    handlers: String,
}

#[derive(Debug, Serialize, Tabled)]
struct ResolvedRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "Handler")]
    handler: String,
}

/// Lists loaded modules and every point with handlers.
pub fn inspect(
    manager: &ModuleManager,
    dispatcher: &HandlerDispatcher,
    format: OutputFormat,
) -> Result<(), AppError> {
    let summary = dispatcher.registry().describe();

    if format == OutputFormat::Json {
        output::print_json(&serde_json::json!({
            "modules": manager.list(),
            "registry": summary,
        }));
        return Ok(());
    }

    for module in manager.list() {
        output::print_kv(&module.id, &format!("{} v{}", module.name, module.version));
    }
    println!();

    let rows: Vec<ScopeRow> = summary
        .points
        .iter()
        .flat_map(|point| {
            point.scopes.iter().map(move |scope| ScopeRow {
                point: point.point.to_string(),
                scope: scope.scope.clone().unwrap_or_else(|| "-".to_string()),
                handlers: scope.handlers.join("\n"),
            })
        })
        .collect();
    output::print_list(&rows, format);
    output::print_kv("Registered handlers", &dispatcher.registry().len().to_string());
    output::print_kv("Operations", &summary.operations.len().to_string());
    Ok(())
}

/// Prints the handlers of a point in invocation order.
pub fn resolve(
    args: &ResolveArgs,
    dispatcher: &HandlerDispatcher,
    format: OutputFormat,
) -> Result<(), AppError> {
    if args.point.cardinality() == Cardinality::Indexed {
        output::print_warning("Operations are keyed by name; use `fhirext operation` instead");
        return Ok(());
    }

    let rows: Vec<ResolvedRow> = dispatcher
        .registry()
        .resolve_entries(args.point, &args.resource_type)
        .into_iter()
        .enumerate()
        .map(|(index, entry)| ResolvedRow {
            position: index + 1,
            handler: entry.name.to_string(),
        })
        .collect();

    if format == OutputFormat::Table {
        output::print_kv("Extension point", args.point.as_str());
        output::print_kv("Resource type", &args.resource_type);
    }
    output::print_list(&rows, format);
    Ok(())
}
