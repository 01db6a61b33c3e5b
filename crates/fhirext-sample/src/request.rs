//! Request lifecycle hooks: user context extraction, cleanup, and auditing.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info};

use fhirext_core::AppResult;
use fhirext_core::traits::FhirService;
use fhirext_core::types::{FhirRequest, FhirResponse, RequestContext};

/// `additional_info` key holding the space-separated OAuth scopes of the token.
pub const SCOPES_INFO_KEY: &str = "USER:OAuthScopes";

/// Seeds the context with the requesting user, roles, scopes, and denied labels.
///
/// Each scope names a `Permission` resource; the security codes listed in
/// its `rule[].data[].security[]` become labels the user may not see.
pub fn extract_user_context(
    ctx: &mut RequestContext,
    service: &dyn FhirService,
    request: &FhirRequest,
    _body: &Value,
    _timeout: Option<Duration>,
) -> AppResult<()> {
    ctx.username = request.username.clone();
    ctx.roles = request.roles.clone();
    ctx.scopes = request
        .additional_info
        .get(SCOPES_INFO_KEY)
        .map(|scopes| scopes.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();
    ctx.security_labels = ctx
        .scopes
        .iter()
        .flat_map(|scope| permission_labels(service, scope))
        .collect();

    debug!(
        request_id = %ctx.request_id,
        username = %ctx.username,
        scopes = ctx.scopes.len(),
        security_labels = ctx.security_labels.len(),
        "Request context extracted"
    );
    Ok(())
}

/// Clears the request context.
pub fn cleanup_context(
    ctx: &mut RequestContext,
    _service: &dyn FhirService,
    _request: &FhirRequest,
    _response: &FhirResponse,
    _body: &Value,
) -> AppResult<()> {
    ctx.clear();
    Ok(())
}

/// Audit log for Patient creation.
pub fn audit_patient_create(
    ctx: &RequestContext,
    _service: &dyn FhirService,
    request: &FhirRequest,
    _body: &Value,
    _timeout: Option<Duration>,
) -> AppResult<()> {
    info!(
        request_id = %ctx.request_id,
        username = %ctx.username,
        method = %request.method,
        "Patient create"
    );
    Ok(())
}

/// Audit log for Patient updates.
pub fn audit_patient_update(
    ctx: &RequestContext,
    _service: &dyn FhirService,
    request: &FhirRequest,
    _body: &Value,
    _timeout: Option<Duration>,
) -> AppResult<()> {
    info!(
        request_id = %ctx.request_id,
        username = %ctx.username,
        id = request.id.as_deref().unwrap_or(""),
        "Patient update"
    );
    Ok(())
}

fn permission_labels(service: &dyn FhirService, scope: &str) -> Vec<String> {
    let permission = match service.read("Permission", scope) {
        Ok(permission) => permission,
        Err(e) => {
            debug!(scope = scope, error = %e, "No Permission for scope");
            return Vec::new();
        }
    };

    let mut labels = Vec::new();
    for rule in array(&permission, "rule") {
        for data in array(rule, "data") {
            for security in array(data, "security") {
                if let Some(code) = security.get("code").and_then(Value::as_str) {
                    labels.push(code.to_string());
                }
            }
        }
    }
    labels
}

fn array<'a>(value: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> {
    value.get(key).and_then(Value::as_array).into_iter().flatten()
}

#[cfg(test)]
mod tests {
    use fhirext_core::traits::InMemoryFhirService;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_labels_come_from_permissions_named_by_scopes() {
        let service = InMemoryFhirService::new("R4")
            .with_resource(json!({
                "resourceType": "Permission",
                "id": "clinician",
                "rule": [{"data": [{"security": [{"code": "V"}, {"code": "R"}]}]}]
            }))
            .expect("stored");
        let request = FhirRequest::new("GET", "Patient")
            .with_user("alice", "doctor")
            .with_info(SCOPES_INFO_KEY, "clinician unknown");

        let mut ctx = RequestContext::new();
        extract_user_context(&mut ctx, &service, &request, &Value::Null, None).expect("extract");

        assert_eq!(ctx.username, "alice");
        assert_eq!(ctx.scopes, vec!["clinician", "unknown"]);
        assert_eq!(ctx.security_labels, vec!["V", "R"]);

        cleanup_context(&mut ctx, &service, &request, &FhirResponse::ok(), &Value::Null)
            .expect("cleanup");
        assert!(ctx.username.is_empty());
        assert!(ctx.security_labels.is_empty());
    }
}
