//! Resource and bundle validation rules.
//!
//! Rules report problems as OperationOutcome issues rather than failing, so
//! the dispatcher can merge the findings of every validator.

use serde_json::Value;

use fhirext_core::AppResult;
use fhirext_core::types::{IssueSeverity, OperationOutcome, OutcomeIssue};

/// Identifier system whose values must carry the `MRN-` prefix.
pub const MRN_SYSTEM: &str = "http://hospital.org/mrn";

/// Observation codes that require a `note`.
pub const CRITICAL_CODES: [&str; 2] = ["critical-001", "critical-002"];

/// HTTP methods accepted in transaction entries.
pub const ALLOWED_METHODS: [&str; 5] = ["GET", "POST", "PUT", "DELETE", "PATCH"];

/// Every resource must carry an `id`.
pub fn require_id(resource: &Value, _in_transaction: bool) -> AppResult<Option<OperationOutcome>> {
    let mut issues = Vec::new();
    if resource.get("id").is_none() {
        issues.push(OutcomeIssue::error("required", "Resource must have an 'id' field").at("id"));
    }
    Ok(outcome(issues))
}

/// Patient business rules: a name, an explicit `active`, well-formed MRNs.
pub fn validate_patient(resource: &Value, _in_transaction: bool) -> AppResult<Option<OperationOutcome>> {
    let mut issues = Vec::new();

    let has_name = resource
        .get("name")
        .and_then(Value::as_array)
        .is_some_and(|names| !names.is_empty());
    if !has_name {
        issues.push(
            OutcomeIssue::error("required", "Patient must have at least one name").at("Patient.name"),
        );
    }

    if resource.get("active").is_none_or(Value::is_null) {
        issues.push(
            OutcomeIssue::error("required", "Patient active status must be explicitly set")
                .at("Patient.active"),
        );
    }

    match resource.get("identifier").and_then(Value::as_array) {
        Some(identifiers) => {
            for (index, identifier) in identifiers.iter().enumerate() {
                if identifier.get("system").and_then(Value::as_str) != Some(MRN_SYSTEM) {
                    continue;
                }
                let value = identifier.get("value").and_then(Value::as_str).unwrap_or("");
                if !value.starts_with("MRN-") {
                    issues.push(
                        OutcomeIssue::error("value", "Hospital MRN must start with 'MRN-'")
                            .at(&format!("Patient.identifier[{index}].value")),
                    );
                }
            }
        }
        None => issues.push(
            OutcomeIssue::new(
                IssueSeverity::Information,
                "informational",
                "Patient has no identifier",
            )
            .at("Patient.identifier"),
        ),
    }

    Ok(outcome(issues))
}

/// Critical Observations must include a note.
pub fn validate_observation(
    resource: &Value,
    _in_transaction: bool,
) -> AppResult<Option<OperationOutcome>> {
    let critical = resource
        .pointer("/code/coding")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|coding| coding.get("code").and_then(Value::as_str))
        .any(|code| CRITICAL_CODES.contains(&code));

    let mut issues = Vec::new();
    if critical && resource.get("note").is_none() {
        issues.push(
            OutcomeIssue::error("required", "Critical observations must include a note")
                .at("Observation.note"),
        );
    }
    Ok(outcome(issues))
}

/// Transaction bundle rules: bounded size, every entry has a request with an allowed method.
pub fn validate_transaction(
    max_entries: usize,
) -> impl Fn(&Value, &str) -> AppResult<Option<OperationOutcome>> + Send + Sync + 'static {
    move |bundle: &Value, _fhir_version: &str| -> AppResult<Option<OperationOutcome>> {
        if bundle.get("type").and_then(Value::as_str) != Some("transaction") {
            return Ok(None);
        }

        let entries = bundle
            .get("entry")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut issues = Vec::new();
        if entries.len() > max_entries {
            issues.push(
                OutcomeIssue::error(
                    "too-costly",
                    &format!("Transaction bundles cannot exceed {max_entries} entries"),
                )
                .at("Bundle.entry"),
            );
        }

        for (index, entry) in entries.iter().enumerate() {
            let Some(request) = entry.get("request") else {
                issues.push(
                    OutcomeIssue::error("required", "Transaction bundle entries must have a request")
                        .at(&format!("Bundle.entry[{index}].request")),
                );
                continue;
            };
            let method = request.get("method").and_then(Value::as_str).unwrap_or("");
            if !ALLOWED_METHODS.contains(&method) {
                issues.push(
                    OutcomeIssue::error("value", &format!("Invalid HTTP method: {method}"))
                        .at(&format!("Bundle.entry[{index}].request.method")),
                );
            }
        }

        Ok(outcome(issues))
    }
}

fn outcome(issues: Vec<OutcomeIssue>) -> Option<OperationOutcome> {
    if issues.is_empty() {
        None
    } else {
        Some(OperationOutcome::new(issues))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn texts(outcome: Option<OperationOutcome>) -> Vec<String> {
        outcome
            .map(|o| o.issues.iter().filter_map(|i| i.text().map(str::to_string)).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_missing_id() {
        assert_eq!(
            texts(require_id(&json!({"resourceType": "Patient"}), false).expect("validate")),
            vec!["Resource must have an 'id' field"]
        );
        assert!(require_id(&json!({"id": "p1"}), false).expect("validate").is_none());
    }

    #[test]
    fn test_valid_patient_passes() {
        let patient = json!({
            "resourceType": "Patient",
            "id": "p1",
            "active": true,
            "name": [{"family": "Doe"}],
            "identifier": [{"system": MRN_SYSTEM, "value": "MRN-0001"}]
        });
        assert!(validate_patient(&patient, false).expect("validate").is_none());
    }

    #[test]
    fn test_patient_rules_collect_every_problem() {
        let patient = json!({
            "resourceType": "Patient",
            "name": [],
            "identifier": [{"system": MRN_SYSTEM, "value": "0001"}]
        });
        let outcome = validate_patient(&patient, false)
            .expect("validate")
            .expect("issues");
        assert_eq!(outcome.blocking_issues().count(), 3);
    }

    #[test]
    fn test_patient_without_identifier_is_informational() {
        let patient = json!({"resourceType": "Patient", "active": false, "name": [{"family": "Doe"}]});
        let outcome = validate_patient(&patient, false)
            .expect("validate")
            .expect("issues");
        assert!(!outcome.has_blocking_issues());
    }

    #[test]
    fn test_critical_observation_needs_note() {
        let observation = json!({"resourceType": "Observation", "code": {"coding": [{"code": "critical-001"}]}});
        assert_eq!(texts(validate_observation(&observation, false).expect("validate")).len(), 1);

        let mut noted = observation.clone();
        noted["note"] = json!([{"text": "called physician"}]);
        assert!(validate_observation(&noted, false).expect("validate").is_none());
    }

    #[test]
    fn test_transaction_rules() {
        let validate = validate_transaction(2);
        let bundle = json!({
            "resourceType": "Bundle",
            "type": "transaction",
            "entry": [
                {"request": {"method": "POST", "url": "Patient"}},
                {"resource": {"resourceType": "Patient"}},
                {"request": {"method": "TRACE", "url": "Patient"}}
            ]
        });
        assert_eq!(
            texts(validate(&bundle, "R4").expect("validate")),
            vec![
                "Transaction bundles cannot exceed 2 entries",
                "Transaction bundle entries must have a request",
                "Invalid HTTP method: TRACE",
            ]
        );

        let batch = json!({"resourceType": "Bundle", "type": "batch", "entry": []});
        assert!(validate(&batch, "R4").expect("validate").is_none());
    }
}
