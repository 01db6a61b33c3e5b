//! Capability statement pruning.

use serde_json::Value;
use tracing::debug;

use fhirext_core::{AppError, AppResult};

/// Removes the listed resource types from `rest[0].resource`.
pub fn hide_resources(mut statement: Value, hidden: &[String]) -> AppResult<Value> {
    let resources = statement
        .pointer_mut("/rest/0/resource")
        .and_then(Value::as_array_mut)
        .ok_or_else(|| AppError::validation("capability statement has no rest[0].resource list"))?;

    let before = resources.len();
    resources.retain(|resource| {
        resource
            .get("type")
            .and_then(Value::as_str)
            .is_none_or(|resource_type| !hidden.iter().any(|h| h == resource_type))
    });
    debug!(removed = before - resources.len(), "Capability statement pruned");

    Ok(statement)
}
