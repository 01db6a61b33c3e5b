//! OAuth hooks: token setup, introspection, user info, and access verification.

use serde_json::{Map, Value, json};
use tracing::{debug, info};

use fhirext_core::AppResult;
use fhirext_core::types::{OAuthToken, RequestContext, SearchRequest};

/// Role granting access to resources labelled restricted (`R`).
pub const RESTRICTED_CLEARANCE_ROLE: &str = "restricted-clearance";

const DEFAULT_SCOPE: &str = "patient/*.read patient/*.write";

/// Stores the token details in the context.
pub fn setup_oauth_token(ctx: &mut RequestContext, token: &OAuthToken) -> AppResult<()> {
    if !token.username.is_empty() {
        ctx.username = token.username.clone();
    }
    ctx.token = Some(token.clone());
    info!(username = %ctx.username, client = %token.oauth_client, "OAuth token set");
    Ok(())
}

/// Describes the token stored in the context as active; `None` without a token.
pub fn token_introspection(ctx: &RequestContext) -> AppResult<Option<Map<String, Value>>> {
    let Some(token) = ctx.token.as_ref() else {
        return Ok(None);
    };
    let scope = if ctx.scopes.is_empty() {
        DEFAULT_SCOPE.to_string()
    } else {
        ctx.scopes.join(" ")
    };

    let mut document = Map::new();
    document.insert("active".to_string(), json!(true));
    document.insert("scope".to_string(), json!(scope));
    document.insert("client_id".to_string(), json!(token.oauth_client));
    document.insert("username".to_string(), json!(ctx.username));
    document.insert("token_type".to_string(), json!("Bearer"));
    Ok(Some(document))
}

/// User info derived from the context, falling back to basic-auth values.
pub fn user_info(
    ctx: &RequestContext,
    basic_auth_username: &str,
    basic_auth_roles: &str,
) -> AppResult<Option<Map<String, Value>>> {
    let username = if ctx.username.is_empty() {
        basic_auth_username
    } else {
        ctx.username.as_str()
    };
    let roles = if ctx.roles.is_empty() {
        basic_auth_roles
    } else {
        ctx.roles.as_str()
    };

    let mut info = Map::new();
    info.insert("Username".to_string(), json!(username));
    info.insert("Roles".to_string(), json!(roles));
    Ok(Some(info))
}

/// Denies reads of restricted Patient ids.
pub fn verify_patient_id(
    restricted: Vec<String>,
) -> impl Fn(&RequestContext, &str, &str, &str) -> AppResult<bool> + Send + Sync + 'static {
    move |_ctx: &RequestContext,
          resource_type: &str,
          resource_id: &str,
          privilege: &str|
          -> AppResult<bool> {
        debug!(
            resource_type = resource_type,
            resource_id = resource_id,
            privilege = privilege,
            "Verifying access by id"
        );
        Ok(!restricted.iter().any(|id| id == resource_id))
    }
}

/// Denies restricted-labelled Patients to users without clearance.
pub fn verify_patient_content(
    ctx: &RequestContext,
    resource: &Value,
    _privilege: &str,
    _allow_shared_resource: bool,
) -> AppResult<bool> {
    let restricted = resource
        .pointer("/meta/security")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .any(|label| label.get("code").and_then(Value::as_str) == Some("R"));
    Ok(!restricted || ctx.has_role(RESTRICTED_CLEARANCE_ROLE))
}

/// Only administrators may delete Patients.
pub fn verify_patient_delete(
    ctx: &RequestContext,
    _resource_type: &str,
    _resource_id: &str,
    _privilege: &str,
) -> AppResult<bool> {
    Ok(ctx.has_role("admin"))
}

/// Denies Patient-compartment searches on restricted ids.
pub fn verify_patient_search(
    restricted: Vec<String>,
) -> impl Fn(&RequestContext, &SearchRequest, &str) -> AppResult<bool> + Send + Sync + 'static {
    move |_ctx: &RequestContext, search: &SearchRequest, privilege: &str| -> AppResult<bool> {
        debug!(
            resource_type = %search.resource_type,
            compartment_type = search.compartment_type.as_deref().unwrap_or(""),
            privilege = privilege,
            "Verifying search access"
        );
        let restricted_compartment = search.compartment_type.as_deref() == Some("Patient")
            && search
                .compartment_id
                .as_deref()
                .is_some_and(|id| restricted.iter().any(|r| r == id));
        Ok(!restricted_compartment)
    }
}

/// System-level requests need the `system-admin` role.
pub fn verify_system_access(ctx: &RequestContext) -> AppResult<bool> {
    Ok(ctx.has_role("system-admin"))
}
