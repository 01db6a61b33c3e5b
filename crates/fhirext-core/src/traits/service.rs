//! Host service handle passed to request and operation handlers.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::AppError;
use crate::result::AppResult;

/// Interactions the host exposes to handlers.
///
/// Implemented by the host engine over its resource store; handlers only
/// read through it.
pub trait FhirService: Send + Sync {
    /// Reads the current version of a resource.
    fn read(&self, resource_type: &str, id: &str) -> AppResult<Value>;

    /// FHIR version served by this endpoint (e.g. `"R4"`).
    fn fhir_version(&self) -> &str;
}

/// A map-backed [`FhirService`] used by the CLI and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFhirService {
    fhir_version: String,
    resources: HashMap<(String, String), Value>,
}

impl InMemoryFhirService {
    /// Creates an empty store for a FHIR version.
    pub fn new(fhir_version: &str) -> Self {
        Self {
            fhir_version: fhir_version.to_string(),
            resources: HashMap::new(),
        }
    }

    /// Stores a resource keyed by its `resourceType` and `id`.
    pub fn with_resource(mut self, resource: Value) -> AppResult<Self> {
        let resource_type = resource
            .get("resourceType")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::validation("resource has no resourceType"))?
            .to_string();
        let id = resource
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::validation("resource has no id"))?
            .to_string();
        self.resources.insert((resource_type, id), resource);
        Ok(self)
    }
}

impl FhirService for InMemoryFhirService {
    fn read(&self, resource_type: &str, id: &str) -> AppResult<Value> {
        self.resources
            .get(&(resource_type.to_string(), id.to_string()))
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("{resource_type}/{id} not found")))
    }

    fn fhir_version(&self) -> &str {
        &self.fhir_version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_read_stored_resource() {
        let service = InMemoryFhirService::new("R4")
            .with_resource(json!({"resourceType": "Patient", "id": "p1"}))
            .expect("valid resource");
        assert_eq!(service.read("Patient", "p1").expect("found")["id"], "p1");
        assert_eq!(service.fhir_version(), "R4");
    }

    #[test]
    fn test_missing_resource_is_not_found() {
        let service = InMemoryFhirService::new("R4");
        let err = service.read("Patient", "nope").expect_err("missing");
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[test]
    fn test_rejects_resource_without_id() {
        let err = InMemoryFhirService::new("R4")
            .with_resource(json!({"resourceType": "Patient"}))
            .expect_err("no id");
        assert_eq!(err.kind, ErrorKind::Validation);
    }
}
