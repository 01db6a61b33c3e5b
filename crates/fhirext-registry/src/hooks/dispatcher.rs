//! Handler dispatcher: runs resolved handlers with host semantics.
//!
//! - Fold points (`capability_statement`) thread the document through each handler.
//! - Request and interaction hooks run in order; the first error aborts.
//! - Filters (`after_read`, `consent`) short-circuit on the first `false`.
//! - OAuth verification turns any `false` into an authorization error.
//! - Validation merges outcomes; only `error` and `fatal` issues block.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use fhirext_core::traits::FhirService;
use fhirext_core::types::{
    FhirRequest, FhirResponse, OAuthToken, OperationOutcome, OutcomeIssue, RequestContext,
    SearchRequest, SearchResultSet,
};
use fhirext_core::{AppError, AppResult};

use super::definitions::{ExtensionPoint, Interaction};
use super::store::WILDCARD;
use crate::operations::OperationInvocation;
use crate::registry::Registry;

/// Non-blocking issues collected from validation handlers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Warning and information issues, in handler order.
    pub issues: Vec<OutcomeIssue>,
}

impl ValidationReport {
    /// Whether no handler reported anything.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// The report as an OperationOutcome document.
    pub fn into_outcome(self) -> OperationOutcome {
        OperationOutcome::new(self.issues)
    }
}

/// Invokes registered handlers on behalf of the host engine.
#[derive(Debug, Clone)]
pub struct HandlerDispatcher {
    registry: Arc<Registry>,
}

impl HandlerDispatcher {
    /// Creates a dispatcher over a sealed registry.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Returns the registry.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    // ── Capability statement ──

    /// Passes the document through every handler in registration order.
    pub fn customize_capability_statement(&self, document: Value) -> AppResult<Value> {
        let handlers = self.registry.capability_statement_handlers();
        trace_dispatch(ExtensionPoint::CapabilityStatement, WILDCARD, handlers.len());
        handlers
            .iter()
            .try_fold(document, |document, handler| handler(document))
    }

    // ── Request ──

    /// Runs `before_request` handlers.
    pub fn before_request(
        &self,
        ctx: &mut RequestContext,
        service: &dyn FhirService,
        request: &FhirRequest,
        body: &Value,
        timeout: Option<Duration>,
    ) -> AppResult<()> {
        let handlers = self.registry.before_request_handlers();
        trace_dispatch(
            ExtensionPoint::BeforeRequest,
            request.resource_type_or_wildcard(),
            handlers.len(),
        );
        for handler in &handlers {
            handler(ctx, service, request, body, timeout)?;
        }
        Ok(())
    }

    /// Runs `after_request` handlers.
    pub fn after_request(
        &self,
        ctx: &mut RequestContext,
        service: &dyn FhirService,
        request: &FhirRequest,
        response: &FhirResponse,
        body: &Value,
    ) -> AppResult<()> {
        let handlers = self.registry.after_request_handlers();
        trace_dispatch(
            ExtensionPoint::AfterRequest,
            request.resource_type_or_wildcard(),
            handlers.len(),
        );
        for handler in &handlers {
            handler(ctx, service, request, response, body)?;
        }
        Ok(())
    }

    // ── Interactions ──

    /// Runs the `before_<interaction>` handlers for the request's resource type.
    pub fn before_interaction(
        &self,
        interaction: Interaction,
        ctx: &RequestContext,
        service: &dyn FhirService,
        request: &FhirRequest,
        body: &Value,
        timeout: Option<Duration>,
    ) -> AppResult<()> {
        let resource_type = request.resource_type_or_wildcard();
        let handlers = self
            .registry
            .before_interaction_handlers(interaction, resource_type);
        trace_dispatch(interaction.before_point(), resource_type, handlers.len());
        for handler in &handlers {
            handler(ctx, service, request, body, timeout)?;
        }
        Ok(())
    }

    /// Runs the `after_<interaction>` handlers for create, update, or delete.
    ///
    /// Reads and searches are post-processed with
    /// [`HandlerDispatcher::post_process_read`] and
    /// [`HandlerDispatcher::post_process_search`].
    pub fn after_interaction(
        &self,
        interaction: Interaction,
        ctx: &RequestContext,
        service: &dyn FhirService,
        request: &FhirRequest,
        response: &FhirResponse,
        body: &Value,
    ) -> AppResult<()> {
        if matches!(interaction, Interaction::Read | Interaction::Search) {
            return Err(AppError::not_implemented(format!(
                "{} has a dedicated post-processing call",
                interaction.after_point()
            )));
        }

        let resource_type = request.resource_type_or_wildcard();
        let handlers = self
            .registry
            .after_interaction_handlers(interaction, resource_type);
        trace_dispatch(interaction.after_point(), resource_type, handlers.len());
        for handler in &handlers {
            handler(ctx, service, request, response, body)?;
        }
        Ok(())
    }

    /// Whether a read resource stays visible. Stops at the first `false`.
    pub fn post_process_read(&self, ctx: &RequestContext, resource: &Value) -> AppResult<bool> {
        let resource_type = resource_type_of(resource);
        let handlers = self.registry.after_read_handlers(resource_type);
        trace_dispatch(ExtensionPoint::AfterRead, resource_type, handlers.len());
        for handler in &handlers {
            if !handler(ctx, resource)? {
                info!(resource_type = resource_type, "Read result hidden by handler");
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Lets `after_search` handlers mark rows of a result set as deleted.
    pub fn post_process_search(
        &self,
        ctx: &RequestContext,
        results: &mut SearchResultSet,
        resource_type: &str,
    ) -> AppResult<()> {
        let handlers = self.registry.after_search_handlers(resource_type);
        trace_dispatch(ExtensionPoint::AfterSearch, resource_type, handlers.len());
        for handler in &handlers {
            handler(ctx, results, resource_type)?;
        }
        Ok(())
    }

    // ── Consent ──

    /// Whether every consent handler allows the resource. Stops at the first `false`.
    pub fn check_consent(&self, resource: &Value, ctx: &RequestContext) -> AppResult<bool> {
        let resource_type = resource_type_of(resource);
        let handlers = self.registry.consent_handlers(resource_type);
        trace_dispatch(ExtensionPoint::Consent, resource_type, handlers.len());
        for handler in &handlers {
            if !handler(resource, ctx)? {
                info!(
                    resource_type = resource_type,
                    username = %ctx.username,
                    "Consent denied"
                );
                return Ok(false);
            }
        }
        Ok(true)
    }

    // ── Operations ──

    /// Invokes the operation handler for the call, or fails with not found.
    pub fn invoke_operation(
        &self,
        invocation: &OperationInvocation,
        resource_type: &str,
        service: &dyn FhirService,
        request: &FhirRequest,
        response: FhirResponse,
    ) -> AppResult<FhirResponse> {
        let handler = self
            .registry
            .resolve_operation(&invocation.name, invocation.scope, resource_type)
            .ok_or_else(|| {
                AppError::not_found(format!(
                    "operation ${} not supported at {} level for {}",
                    invocation.name, invocation.scope, resource_type
                ))
            })?;
        debug!(
            operation = %invocation.name,
            scope = %invocation.scope,
            resource_type = resource_type,
            "Dispatching operation"
        );
        handler(invocation, service, request, response)
    }

    // ── OAuth ──

    /// Runs token setup handlers.
    pub fn set_oauth_instance(&self, ctx: &mut RequestContext, token: &OAuthToken) -> AppResult<()> {
        let handlers = self.registry.oauth_set_instance_handlers();
        trace_dispatch(ExtensionPoint::OAuthSetInstance, WILDCARD, handlers.len());
        for handler in &handlers {
            handler(ctx, token)?;
        }
        Ok(())
    }

    /// Introspection document from the first handler that returns one.
    pub fn introspect(&self, ctx: &RequestContext) -> AppResult<Option<Map<String, Value>>> {
        let handlers = self.registry.oauth_introspection_handlers();
        trace_dispatch(ExtensionPoint::OAuthGetIntrospection, WILDCARD, handlers.len());
        for handler in &handlers {
            if let Some(document) = handler(ctx)? {
                return Ok(Some(document));
            }
        }
        Ok(None)
    }

    /// User info merged from every handler; later keys overwrite earlier ones.
    pub fn user_info(
        &self,
        ctx: &RequestContext,
        username: &str,
        roles: &str,
    ) -> AppResult<Option<Map<String, Value>>> {
        let handlers = self.registry.oauth_user_info_handlers();
        trace_dispatch(ExtensionPoint::OAuthGetUserInfo, WILDCARD, handlers.len());
        let mut merged: Option<Map<String, Value>> = None;
        for handler in &handlers {
            if let Some(info) = handler(ctx, username, roles)? {
                merged.get_or_insert_with(Map::new).extend(info);
            }
        }
        Ok(merged)
    }

    /// Verifies access to a resource by type and id.
    pub fn verify_resource_id(
        &self,
        ctx: &RequestContext,
        resource_type: &str,
        resource_id: &str,
        privilege: &str,
    ) -> AppResult<()> {
        let handlers = self.registry.oauth_verify_resource_id_handlers(resource_type);
        require_all(ExtensionPoint::OAuthVerifyResourceId, resource_type, &handlers, |h| {
            h(ctx, resource_type, resource_id, privilege)
        })
    }

    /// Verifies access to a resource by its content.
    pub fn verify_resource_content(
        &self,
        ctx: &RequestContext,
        resource: &Value,
        privilege: &str,
        allow_shared_resource: bool,
    ) -> AppResult<()> {
        let resource_type = resource_type_of(resource);
        let handlers = self
            .registry
            .oauth_verify_resource_content_handlers(resource_type);
        require_all(
            ExtensionPoint::OAuthVerifyResourceContent,
            resource_type,
            &handlers,
            |h| h(ctx, resource, privilege, allow_shared_resource),
        )
    }

    /// Verifies access to a history-instance response.
    pub fn verify_history(
        &self,
        ctx: &RequestContext,
        resource_type: &str,
        resource: &Value,
        privilege: &str,
    ) -> AppResult<()> {
        let handlers = self.registry.oauth_verify_history_handlers(resource_type);
        require_all(ExtensionPoint::OAuthVerifyHistory, resource_type, &handlers, |h| {
            h(ctx, resource_type, resource, privilege)
        })
    }

    /// Verifies access for a delete.
    pub fn verify_delete(
        &self,
        ctx: &RequestContext,
        resource_type: &str,
        resource_id: &str,
        privilege: &str,
    ) -> AppResult<()> {
        let handlers = self.registry.oauth_verify_delete_handlers(resource_type);
        require_all(ExtensionPoint::OAuthVerifyDelete, resource_type, &handlers, |h| {
            h(ctx, resource_type, resource_id, privilege)
        })
    }

    /// Verifies access for a search.
    pub fn verify_search(
        &self,
        ctx: &RequestContext,
        search: &SearchRequest,
        privilege: &str,
    ) -> AppResult<()> {
        let resource_type = search.resource_type.as_str();
        let handlers = self.registry.oauth_verify_search_handlers(resource_type);
        require_all(ExtensionPoint::OAuthVerifySearch, resource_type, &handlers, |h| {
            h(ctx, search, privilege)
        })
    }

    /// Verifies access for a system-level request.
    pub fn verify_system_level(&self, ctx: &RequestContext) -> AppResult<()> {
        let handlers = self.registry.oauth_verify_system_level_handlers();
        require_all(ExtensionPoint::OAuthVerifySystemLevel, WILDCARD, &handlers, |h| h(ctx))
    }

    // ── Validation ──

    /// Runs resource validators and merges their outcomes.
    pub fn validate_resource(
        &self,
        resource: &Value,
        in_transaction: bool,
    ) -> AppResult<ValidationReport> {
        let resource_type = resource_type_of(resource);
        let handlers = self.registry.validate_resource_handlers(resource_type);
        trace_dispatch(ExtensionPoint::ValidateResource, resource_type, handlers.len());
        let mut outcomes = Vec::with_capacity(handlers.len());
        for handler in &handlers {
            outcomes.push(handler(resource, in_transaction)?);
        }
        merge_outcomes(ExtensionPoint::ValidateResource, outcomes)
    }

    /// Runs bundle validators and merges their outcomes.
    pub fn validate_bundle(&self, bundle: &Value, fhir_version: &str) -> AppResult<ValidationReport> {
        let handlers = self.registry.validate_bundle_handlers();
        trace_dispatch(ExtensionPoint::ValidateBundle, "Bundle", handlers.len());
        let mut outcomes = Vec::with_capacity(handlers.len());
        for handler in &handlers {
            outcomes.push(handler(bundle, fhir_version)?);
        }
        merge_outcomes(ExtensionPoint::ValidateBundle, outcomes)
    }
}

fn trace_dispatch(point: ExtensionPoint, resource_type: &str, handler_count: usize) {
    debug!(
        kind = %point,
        resource_type = resource_type,
        handler_count = handler_count,
        "Dispatching extension point"
    );
}

/// `resourceType` of a resource, or `"*"`.
fn resource_type_of(resource: &Value) -> &str {
    resource
        .get("resourceType")
        .and_then(Value::as_str)
        .unwrap_or(WILDCARD)
}

fn require_all<H>(
    point: ExtensionPoint,
    resource_type: &str,
    handlers: &[H],
    call: impl Fn(&H) -> AppResult<bool>,
) -> AppResult<()> {
    trace_dispatch(point, resource_type, handlers.len());
    for handler in handlers {
        if !call(handler)? {
            info!(kind = %point, resource_type = resource_type, "Access denied by handler");
            return Err(AppError::authorization(format!(
                "access denied by {point} for {resource_type}"
            )));
        }
    }
    Ok(())
}

fn merge_outcomes(
    point: ExtensionPoint,
    outcomes: Vec<Option<OperationOutcome>>,
) -> AppResult<ValidationReport> {
    let mut blocking = Vec::new();
    let mut advisory = Vec::new();
    for outcome in outcomes.into_iter().flatten() {
        for issue in outcome.issues {
            if issue.severity.is_blocking() {
                blocking.push(issue);
            } else {
                advisory.push(issue);
            }
        }
    }

    if blocking.is_empty() {
        return Ok(ValidationReport { issues: advisory });
    }

    info!(kind = %point, issues = blocking.len(), "Validation failed");
    Err(AppError::invalid_outcome(OperationOutcome::new(blocking)))
}
