//! Validation command.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use serde_json::Value;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use fhirext_core::config::AppConfig;
use fhirext_core::error::AppError;
use fhirext_core::types::OutcomeIssue;
use fhirext_registry::HandlerDispatcher;

/// Arguments for `validate`
#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// JSON file holding a resource or a Bundle
    pub file: PathBuf,

    /// Validate the resource as a transaction entry
    #[arg(long)]
    pub in_transaction: bool,
}

#[derive(Debug, Serialize, Tabled)]
struct IssueRow {
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Code")]
    code: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Message")]
    message: String,
}

impl From<&OutcomeIssue> for IssueRow {
    fn from(issue: &OutcomeIssue) -> Self {
        Self {
            severity: serde_json::to_value(issue.severity)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default(),
            code: issue.code.clone(),
            location: issue.expression.join(", "),
            message: issue.text().unwrap_or_default().to_string(),
        }
    }
}

/// Runs the validators; Bundles go through the bundle validators.
pub fn execute(
    args: &ValidateArgs,
    dispatcher: &HandlerDispatcher,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let document = super::read_json(&args.file)?;
    let result = match document.get("resourceType").and_then(Value::as_str) {
        Some("Bundle") => dispatcher.validate_bundle(&document, &config.host.fhir_version),
        _ => dispatcher.validate_resource(&document, args.in_transaction),
    };

    match result {
        Ok(report) => {
            let rows: Vec<IssueRow> = report.issues.iter().map(IssueRow::from).collect();
            if format == OutputFormat::Json {
                output::print_json(&report.into_outcome());
            } else {
                output::print_success(&format!("'{}' is valid", args.file.display()));
                if !rows.is_empty() {
                    output::print_list(&rows, format);
                }
            }
            Ok(())
        }
        Err(e) => {
            let outcome = e.to_operation_outcome();
            match format {
                OutputFormat::Json => output::print_json(&outcome),
                OutputFormat::Table => {
                    let rows: Vec<IssueRow> = outcome.issues.iter().map(IssueRow::from).collect();
                    output::print_list(&rows, format);
                }
            }
            output::print_error(&format!("'{}' failed validation", args.file.display()));
            Err(e)
        }
    }
}
