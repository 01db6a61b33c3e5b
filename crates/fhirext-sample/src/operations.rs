//! Custom operations: `$diff` on Patient instances and `$validate` on the Patient type.

use serde_json::{Value, json};
use tracing::debug;

use fhirext_core::traits::FhirService;
use fhirext_core::types::{FhirRequest, FhirResponse, IssueSeverity, OperationOutcome, OutcomeIssue};
use fhirext_core::{AppError, AppResult};
use fhirext_registry::OperationInvocation;

use crate::validation::{require_id, validate_patient};

/// Compares the stored resource with the one in the request body.
///
/// The response body is `{"changes": <JSON Patch>}`: the RFC 6902 operations
/// turning the stored resource into the candidate.
pub fn patient_diff(
    invocation: &OperationInvocation,
    service: &dyn FhirService,
    request: &FhirRequest,
    response: FhirResponse,
) -> AppResult<FhirResponse> {
    let resource_type = request
        .resource_type
        .as_deref()
        .ok_or_else(|| AppError::validation("$diff needs a resource type"))?;
    let id = request
        .id
        .as_deref()
        .ok_or_else(|| AppError::validation("$diff needs a resource id"))?;

    let stored = service.read(resource_type, id)?;
    let candidate = request.json.as_ref().unwrap_or(&invocation.body);

    let changes = json_patch::diff(&stored, candidate);
    debug!(
        resource_type = resource_type,
        id = id,
        changes = changes.0.len(),
        "Computed $diff"
    );

    Ok(response.with_json(json!({ "changes": changes })))
}

/// Runs the Patient validators over the request body and returns their outcome.
pub fn patient_validate(
    invocation: &OperationInvocation,
    _service: &dyn FhirService,
    request: &FhirRequest,
    response: FhirResponse,
) -> AppResult<FhirResponse> {
    let resource = request.json.as_ref().unwrap_or(&invocation.body);

    let mut issues = Vec::new();
    for outcome in [require_id(resource, false)?, validate_patient(resource, false)?]
        .into_iter()
        .flatten()
    {
        issues.extend(outcome.issues);
    }
    if issues.is_empty() {
        issues.push(OutcomeIssue::new(
            IssueSeverity::Information,
            "informational",
            "Validation successful",
        ));
    }

    let outcome = OperationOutcome::new(issues);
    let mut response = response.with_json(serde_json::to_value(&outcome)?);
    if outcome.has_blocking_issues() {
        response.status = 400;
    }
    Ok(response)
}
