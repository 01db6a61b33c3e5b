//! Registration phase: collects handlers and operations, then seals them into a [`Registry`].

use std::any::type_name;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use fhirext_core::AppResult;
use fhirext_core::traits::FhirService;
use fhirext_core::types::{
    FhirRequest, FhirResponse, OAuthToken, OperationOutcome, RequestContext, SearchRequest,
    SearchResultSet,
};

use crate::hooks::definitions::{Cardinality, ExtensionPoint};
use crate::hooks::handler::{Handler, HandlerEntry, OperationFn};
use crate::hooks::store::{GLOBAL, HandlerStore, ScopeKey, WILDCARD};
use crate::operations::{OperationIndex, OperationInvocation, OperationKey, OperationScope};
use crate::registry::Registry;

/// Mutable registration surface.
///
/// Every registration method appends and returns `&mut Self`. Nothing is
/// ever deduplicated: registering the same handler twice stores it twice.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    handlers: HandlerStore<HandlerEntry>,
    operations: OperationIndex,
}

impl RegistryBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pre-built handler for any extension point.
    ///
    /// Always appends. The typed accessors of [`Registry`] yield only the
    /// variant matching the point's call signature, so a handler of another
    /// shape is stored and listed but never invoked by the dispatcher.
    /// Operations are keyed by name; use [`RegistryBuilder::operation`].
    pub fn register(
        &mut self,
        point: ExtensionPoint,
        resource_type: Option<&str>,
        handler: Handler,
    ) -> &mut Self {
        let name = handler.signature();
        self.insert(point, resource_type, name, handler)
    }

    /// Registers an operation handler under `(name, scope, resource_type)`.
    ///
    /// `None` means every resource type. A later registration under the same
    /// key replaces the earlier one.
    pub fn operation<F>(
        &mut self,
        name: &str,
        scope: OperationScope,
        resource_type: Option<&str>,
        handler: F,
    ) -> &mut Self
    where
        F: Fn(&OperationInvocation, &dyn FhirService, &FhirRequest, FhirResponse) -> AppResult<FhirResponse>
            + Send
            + Sync
            + 'static,
    {
        let key = OperationKey::new(name, scope, resource_type.unwrap_or(WILDCARD));
        self.insert_operation(key, type_name::<F>(), Arc::new(handler))
    }

    /// Registers a pre-built operation handler; see [`RegistryBuilder::operation`].
    pub fn register_operation(
        &mut self,
        name: &str,
        scope: OperationScope,
        resource_type: Option<&str>,
        handler: OperationFn,
    ) -> &mut Self {
        let key = OperationKey::new(name, scope, resource_type.unwrap_or(WILDCARD));
        self.insert_operation(key, "Operation", handler)
    }

    /// Number of handlers registered so far, operations excluded.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Number of operations registered so far.
    pub fn operation_count(&self) -> usize {
        self.operations.len()
    }

    /// Seals the registrations. The returned registry is immutable.
    pub fn build(self) -> Registry {
        info!(
            handlers = self.handlers.len(),
            operations = self.operations.len(),
            "Extension registry sealed"
        );
        Registry::new(self.handlers, self.operations)
    }

    fn insert_operation(
        &mut self,
        key: OperationKey,
        name: &'static str,
        handler: OperationFn,
    ) -> &mut Self {
        if let Some(previous) = self.operations.insert(key.clone(), name, handler) {
            warn!(operation = %key, replaced = previous, "Operation handler replaced");
        }
        debug!(operation = %key, handler = name, "Operation registered");
        self
    }

    fn insert(
        &mut self,
        point: ExtensionPoint,
        resource_type: Option<&str>,
        name: &'static str,
        handler: Handler,
    ) -> &mut Self {
        if point.cardinality() == Cardinality::Unscoped {
            if let Some(scope) = resource_type.filter(|scope| *scope != GLOBAL) {
                warn!(
                    point = %point,
                    scope = scope,
                    "Extension point is not resource-scoped, scope ignored"
                );
            }
        }

        let scope = ScopeKey::from_option(resource_type, ScopeKey::default_for(point)).normalize(point);
        debug!(point = %point, scope = %scope, handler = name, "Handler registered");
        self.handlers
            .insert(point, scope, HandlerEntry::new(name, handler));
        self
    }
}

macro_rules! scoped_registrations {
    ($( $(#[$meta:meta])* $method:ident => $point:ident, $variant:ident, Fn($($arg:ty),*) -> $ret:ty; )*) => {
        impl RegistryBuilder {
            $(
                $(#[$meta])*
                pub fn $method<F>(&mut self, resource_type: Option<&str>, handler: F) -> &mut Self
                where
                    F: Fn($($arg),*) -> $ret + Send + Sync + 'static,
                {
                    self.insert(
                        ExtensionPoint::$point,
                        resource_type,
                        type_name::<F>(),
                        Handler::$variant(Arc::new(handler)),
                    )
                }
            )*
        }
    };
}

macro_rules! unscoped_registrations {
    ($( $(#[$meta:meta])* $method:ident => $point:ident, $variant:ident, Fn($($arg:ty),*) -> $ret:ty; )*) => {
        impl RegistryBuilder {
            $(
                $(#[$meta])*
                pub fn $method<F>(&mut self, handler: F) -> &mut Self
                where
                    F: Fn($($arg),*) -> $ret + Send + Sync + 'static,
                {
                    self.insert(
                        ExtensionPoint::$point,
                        None,
                        type_name::<F>(),
                        Handler::$variant(Arc::new(handler)),
                    )
                }
            )*
        }
    };
}

unscoped_registrations! {
    /// `(capability_statement) -> capability_statement`. Handlers run as a fold.
    on_capability_statement => CapabilityStatement, CapabilityStatement,
        Fn(Value) -> AppResult<Value>;
    /// `(ctx, service, request, body, timeout)`, before any request.
    on_before_request => BeforeRequest, BeforeRequest,
        Fn(&mut RequestContext, &dyn FhirService, &FhirRequest, &Value, Option<Duration>) -> AppResult<()>;
    /// `(ctx, service, request, response, body)`, after any request.
    on_after_request => AfterRequest, AfterRequest,
        Fn(&mut RequestContext, &dyn FhirService, &FhirRequest, &FhirResponse, &Value) -> AppResult<()>;
    /// `(ctx, token)`.
    oauth_set_instance => OAuthSetInstance, OAuthSetInstance,
        Fn(&mut RequestContext, &OAuthToken) -> AppResult<()>;
    /// `(ctx) -> introspection`. The first `Some` wins.
    oauth_get_introspection => OAuthGetIntrospection, OAuthIntrospection,
        Fn(&RequestContext) -> AppResult<Option<Map<String, Value>>>;
    /// `(ctx, username, roles) -> user info`. Results are merged.
    oauth_get_user_info => OAuthGetUserInfo, OAuthUserInfo,
        Fn(&RequestContext, &str, &str) -> AppResult<Option<Map<String, Value>>>;
    /// `(ctx) -> allowed`, for system-level requests.
    oauth_verify_system_level => OAuthVerifySystemLevel, VerifySystemLevel,
        Fn(&RequestContext) -> AppResult<bool>;
    /// `(bundle, fhir_version) -> outcome`.
    on_validate_bundle => ValidateBundle, ValidateBundle,
        Fn(&Value, &str) -> AppResult<Option<OperationOutcome>>;
}

scoped_registrations! {
    /// `(ctx, service, request, body, timeout)`, before a create.
    on_before_create => BeforeCreate, BeforeInteraction,
        Fn(&RequestContext, &dyn FhirService, &FhirRequest, &Value, Option<Duration>) -> AppResult<()>;
    /// `(ctx, service, request, body, timeout)`, before a read.
    on_before_read => BeforeRead, BeforeInteraction,
        Fn(&RequestContext, &dyn FhirService, &FhirRequest, &Value, Option<Duration>) -> AppResult<()>;
    /// `(ctx, service, request, body, timeout)`, before an update.
    on_before_update => BeforeUpdate, BeforeInteraction,
        Fn(&RequestContext, &dyn FhirService, &FhirRequest, &Value, Option<Duration>) -> AppResult<()>;
    /// `(ctx, service, request, body, timeout)`, before a delete.
    on_before_delete => BeforeDelete, BeforeInteraction,
        Fn(&RequestContext, &dyn FhirService, &FhirRequest, &Value, Option<Duration>) -> AppResult<()>;
    /// `(ctx, service, request, body, timeout)`, before a search.
    on_before_search => BeforeSearch, BeforeInteraction,
        Fn(&RequestContext, &dyn FhirService, &FhirRequest, &Value, Option<Duration>) -> AppResult<()>;
    /// `(ctx, service, request, response, body)`, after a create.
    on_after_create => AfterCreate, AfterInteraction,
        Fn(&RequestContext, &dyn FhirService, &FhirRequest, &FhirResponse, &Value) -> AppResult<()>;
    /// `(ctx, resource) -> visible`, after a read.
    on_after_read => AfterRead, PostRead,
        Fn(&RequestContext, &Value) -> AppResult<bool>;
    /// `(ctx, service, request, response, body)`, after an update.
    on_after_update => AfterUpdate, AfterInteraction,
        Fn(&RequestContext, &dyn FhirService, &FhirRequest, &FhirResponse, &Value) -> AppResult<()>;
    /// `(ctx, service, request, response, body)`, after a delete.
    on_after_delete => AfterDelete, AfterInteraction,
        Fn(&RequestContext, &dyn FhirService, &FhirRequest, &FhirResponse, &Value) -> AppResult<()>;
    /// `(ctx, result_set, resource_type)`, after a search.
    on_after_search => AfterSearch, PostSearch,
        Fn(&RequestContext, &mut SearchResultSet, &str) -> AppResult<()>;
    /// `(resource, ctx) -> allowed`.
    consent => Consent, Consent,
        Fn(&Value, &RequestContext) -> AppResult<bool>;
    /// `(ctx, resource_type, resource_id, privilege) -> allowed`.
    oauth_verify_resource_id => OAuthVerifyResourceId, VerifyResourceId,
        Fn(&RequestContext, &str, &str, &str) -> AppResult<bool>;
    /// `(ctx, resource, privilege, allow_shared_resource) -> allowed`.
    oauth_verify_resource_content => OAuthVerifyResourceContent, VerifyResourceContent,
        Fn(&RequestContext, &Value, &str, bool) -> AppResult<bool>;
    /// `(ctx, resource_type, resource, privilege) -> allowed`.
    oauth_verify_history => OAuthVerifyHistory, VerifyHistory,
        Fn(&RequestContext, &str, &Value, &str) -> AppResult<bool>;
    /// `(ctx, resource_type, resource_id, privilege) -> allowed`, for deletes.
    oauth_verify_delete => OAuthVerifyDelete, VerifyResourceId,
        Fn(&RequestContext, &str, &str, &str) -> AppResult<bool>;
    /// `(ctx, search, privilege) -> allowed`.
    oauth_verify_search => OAuthVerifySearch, VerifySearch,
        Fn(&RequestContext, &SearchRequest, &str) -> AppResult<bool>;
    /// `(resource, is_in_transaction) -> outcome`.
    on_validate_resource => ValidateResource, ValidateResource,
        Fn(&Value, bool) -> AppResult<Option<OperationOutcome>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allow(_resource: &Value, _ctx: &RequestContext) -> AppResult<bool> {
        Ok(true)
    }

    fn visible(_ctx: &RequestContext, _resource: &Value) -> AppResult<bool> {
        Ok(true)
    }

    fn passthrough(doc: Value) -> AppResult<Value> {
        Ok(doc)
    }

    #[test]
    fn test_typed_registration_uses_default_scope() {
        let mut builder = RegistryBuilder::new();
        builder.consent(None, allow).on_after_read(None, visible);
        let registry = builder.build();

        let consent = registry.describe_point(ExtensionPoint::Consent);
        assert_eq!(consent.scopes.len(), 1);
        assert_eq!(consent.scopes[0].scope.as_deref(), Some(WILDCARD));

        let after_read = registry.describe_point(ExtensionPoint::AfterRead);
        assert_eq!(after_read.scopes[0].scope.as_deref(), Some(GLOBAL));
    }

    #[test]
    fn test_generic_register_always_appends() {
        let mut builder = RegistryBuilder::new();
        builder.register(
            ExtensionPoint::AfterRead,
            Some("Patient"),
            Handler::Consent(Arc::new(allow)),
        );
        assert_eq!(builder.handler_count(), 1);

        let registry = builder.build();
        assert_eq!(registry.resolve(ExtensionPoint::AfterRead, "Patient").len(), 1);
        assert_eq!(registry.describe_point(ExtensionPoint::AfterRead).handler_count(), 1);
        // Typed access filters by call shape.
        assert!(registry.after_read_handlers("Patient").is_empty());
    }

    #[test]
    fn test_generic_register_on_operation_point_is_kept_out_of_the_index() {
        let mut builder = RegistryBuilder::new();
        builder.register(ExtensionPoint::Operation, None, Handler::Consent(Arc::new(allow)));
        assert_eq!(builder.handler_count(), 1);
        assert_eq!(builder.operation_count(), 0);
    }

    #[test]
    fn test_unscoped_point_ignores_scope() {
        let mut builder = RegistryBuilder::new();
        builder.register(
            ExtensionPoint::CapabilityStatement,
            Some("Patient"),
            Handler::CapabilityStatement(Arc::new(passthrough)),
        );
        let registry = builder.build();
        assert_eq!(
            registry
                .resolve(ExtensionPoint::CapabilityStatement, "Observation")
                .len(),
            1
        );
    }

    #[test]
    fn test_display_name_comes_from_callable_type() {
        let mut builder = RegistryBuilder::new();
        builder.consent(Some("Patient"), allow);
        let registry = builder.build();
        let summary = registry.describe_point(ExtensionPoint::Consent);
        assert!(summary.scopes[0].handlers[0].ends_with("allow"));
    }
}
