//! Consent by security label, and the read/search filters built on it.

use serde_json::Value;
use tracing::debug;

use fhirext_core::AppResult;
use fhirext_core::types::{RequestContext, SearchResultSet};

/// `false` when any `meta.security[].code` of the resource is denied to the user.
pub fn security_label_consent(resource: &Value, ctx: &RequestContext) -> AppResult<bool> {
    let denied = resource
        .pointer("/meta/security")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|label| label.get("code").and_then(Value::as_str))
        .any(|code| ctx.denies_label(code));
    Ok(!denied)
}

/// Hides Patient reads the user has no consent for.
pub fn filter_patient_read(ctx: &RequestContext, resource: &Value) -> AppResult<bool> {
    security_label_consent(resource, ctx)
}

/// Logs every read; never hides anything.
pub fn log_read(_ctx: &RequestContext, resource: &Value) -> AppResult<bool> {
    debug!(
        resource_type = resource.get("resourceType").and_then(serde_json::Value::as_str).unwrap_or("?"),
        id = resource.get("id").and_then(serde_json::Value::as_str).unwrap_or("?"),
        "Resource read"
    );
    Ok(true)
}

/// Marks Patient rows without consent as deleted.
///
/// Rows the host delivered without a body are left untouched.
pub fn filter_patient_search(
    ctx: &RequestContext,
    results: &mut SearchResultSet,
    resource_type: &str,
) -> AppResult<()> {
    for row in results.rows_mut() {
        let Some(resource) = row.resource.as_ref() else {
            continue;
        };
        if !security_label_consent(resource, ctx)? {
            debug!(
                resource_type = resource_type,
                id = %row.resource_id,
                "Search row hidden by consent"
            );
            row.mark_deleted();
        }
    }
    Ok(())
}
