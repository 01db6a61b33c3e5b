//! Sealed extension registry: read-only resolution over the registered handlers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::hooks::definitions::{Cardinality, ExtensionPoint, Interaction};
use crate::hooks::handler::{
    AfterInteractionFn, AfterRequestFn, BeforeInteractionFn, BeforeRequestFn,
    CapabilityStatementFn, ConsentFn, Handler, HandlerEntry, OAuthIntrospectionFn,
    OAuthSetInstanceFn, OAuthUserInfoFn, OperationFn, PostReadFn, PostSearchFn,
    ValidateBundleFn, ValidateResourceFn, VerifyHistoryFn, VerifyResourceContentFn,
    VerifyResourceIdFn, VerifySearchFn, VerifySystemLevelFn,
};
use crate::hooks::store::HandlerStore;
use crate::operations::{OperationIndex, OperationKey, OperationScope, SupportedOperation};

/// Immutable set of registered handlers and operations.
///
/// Built once by [`crate::RegistryBuilder::build`] and then shared (usually
/// behind an `Arc`) between any number of threads. Every query returns
/// freshly allocated collections.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    handlers: HandlerStore<HandlerEntry>,
    operations: OperationIndex,
}

/// Handler names registered under one scope of an extension point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeSummary {
    /// Resource type, `"*"`, or `"__global__"`; `None` for points that are not resource-scoped.
    pub scope: Option<String>,
    /// Display names in registration order.
    pub handlers: Vec<String>,
}

/// Registrations of one extension point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointSummary {
    /// The extension point.
    pub point: ExtensionPoint,
    /// How the point stores its handlers.
    pub cardinality: Cardinality,
    /// Scopes with at least one handler.
    pub scopes: Vec<ScopeSummary>,
}

impl PointSummary {
    /// Total number of handlers across scopes.
    pub fn handler_count(&self) -> usize {
        self.scopes.iter().map(|s| s.handlers.len()).sum()
    }
}

/// One registered operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationSummary {
    /// Operation name.
    pub name: String,
    /// Invocation level.
    pub scope: OperationScope,
    /// Resource type or `"*"`.
    pub resource_type: String,
    /// Display name of the handler.
    pub handler: String,
}

/// Serializable view of a whole registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySummary {
    /// Every extension point with at least one handler, in catalogue order.
    pub points: Vec<PointSummary>,
    /// Every operation, ordered by key.
    pub operations: Vec<OperationSummary>,
}

impl Registry {
    pub(crate) fn new(handlers: HandlerStore<HandlerEntry>, operations: OperationIndex) -> Self {
        Self {
            handlers,
            operations,
        }
    }

    /// Ordered handlers of an extension point for a resource type.
    ///
    /// Resource-scoped points follow their precedence family; other points
    /// return their single list and ignore `resource_type`. Operations are
    /// not returned here, see [`Registry::resolve_operation`].
    pub fn resolve(&self, point: ExtensionPoint, resource_type: &str) -> Vec<Handler> {
        self.handlers
            .resolve(point, resource_type)
            .into_iter()
            .map(|entry| entry.handler)
            .collect()
    }

    /// Like [`Registry::resolve`], keeping display names.
    pub fn resolve_entries(&self, point: ExtensionPoint, resource_type: &str) -> Vec<HandlerEntry> {
        self.handlers.resolve(point, resource_type)
    }

    /// Operation handler for `(name, scope, resource_type)`, falling back to `"*"`.
    pub fn resolve_operation(
        &self,
        name: &str,
        scope: OperationScope,
        resource_type: &str,
    ) -> Option<OperationFn> {
        self.operations.resolve(name, scope, resource_type)
    }

    /// Copy of the operation index.
    pub fn snapshot_operations(&self) -> BTreeMap<OperationKey, OperationFn> {
        self.operations.snapshot()
    }

    /// Distinct operations with their OperationDefinition URLs.
    pub fn supported_operations(&self) -> Vec<SupportedOperation> {
        self.operations.supported()
    }

    /// `before_<interaction>` handlers for a resource type.
    pub fn before_interaction_handlers(
        &self,
        interaction: Interaction,
        resource_type: &str,
    ) -> Vec<BeforeInteractionFn> {
        self.typed(interaction.before_point(), resource_type, Handler::into_before_interaction)
    }

    /// `after_<interaction>` handlers for create, update, and delete.
    ///
    /// Read and search have their own post-processing signatures and yield
    /// nothing here.
    pub fn after_interaction_handlers(
        &self,
        interaction: Interaction,
        resource_type: &str,
    ) -> Vec<AfterInteractionFn> {
        self.typed(interaction.after_point(), resource_type, Handler::into_after_interaction)
    }

    /// Number of handlers registered for a point (operations: number of keys).
    pub fn handler_count(&self, point: ExtensionPoint) -> usize {
        match point.cardinality() {
            Cardinality::Indexed => self.operations.len(),
            Cardinality::Unscoped | Cardinality::Scoped(_) => self.handlers.handler_count(point),
        }
    }

    /// Total number of handlers, operations excluded.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether nothing at all was registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty() && self.operations.is_empty()
    }

    /// Summary of one extension point.
    pub fn describe_point(&self, point: ExtensionPoint) -> PointSummary {
        let cardinality = point.cardinality();
        let scopes = self
            .handlers
            .tiers(point)
            .map(|tiers| {
                tiers
                    .tiers()
                    .into_iter()
                    .map(|(scope, entries)| ScopeSummary {
                        scope: match cardinality {
                            Cardinality::Scoped(_) => Some(scope.to_string()),
                            Cardinality::Unscoped | Cardinality::Indexed => None,
                        },
                        handlers: entries.iter().map(|e| e.name.to_string()).collect(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        PointSummary {
            point,
            cardinality,
            scopes,
        }
    }

    /// Summary of every registration, for inspection.
    pub fn describe(&self) -> RegistrySummary {
        let points = ExtensionPoint::ALL
            .iter()
            .map(|point| self.describe_point(*point))
            .filter(|summary| !summary.scopes.is_empty())
            .collect();

        let operations = self
            .operations
            .describe()
            .into_iter()
            .map(|(key, handler)| OperationSummary {
                name: key.name,
                scope: key.scope,
                resource_type: key.resource_type,
                handler: handler.to_string(),
            })
            .collect();

        RegistrySummary { points, operations }
    }

    fn typed<T>(
        &self,
        point: ExtensionPoint,
        resource_type: &str,
        select: fn(Handler) -> Option<T>,
    ) -> Vec<T> {
        self.handlers
            .resolve(point, resource_type)
            .into_iter()
            .filter_map(|entry| select(entry.handler))
            .collect()
    }
}

macro_rules! scoped_accessors {
    ($( $(#[$meta:meta])* $method:ident => $point:ident, $into:ident -> $alias:ident; )*) => {
        impl Registry {
            $(
                $(#[$meta])*
                pub fn $method(&self, resource_type: &str) -> Vec<$alias> {
                    self.typed(ExtensionPoint::$point, resource_type, Handler::$into)
                }
            )*
        }
    };
}

macro_rules! unscoped_accessors {
    ($( $(#[$meta:meta])* $method:ident => $point:ident, $into:ident -> $alias:ident; )*) => {
        impl Registry {
            $(
                $(#[$meta])*
                pub fn $method(&self) -> Vec<$alias> {
                    self.typed(ExtensionPoint::$point, "*", Handler::$into)
                }
            )*
        }
    };
}

unscoped_accessors! {
    /// Capability statement handlers, in registration order.
    capability_statement_handlers => CapabilityStatement, into_capability_statement -> CapabilityStatementFn;
    /// Pre-request handlers.
    before_request_handlers => BeforeRequest, into_before_request -> BeforeRequestFn;
    /// Post-request handlers.
    after_request_handlers => AfterRequest, into_after_request -> AfterRequestFn;
    /// Token setup handlers.
    oauth_set_instance_handlers => OAuthSetInstance, into_oauth_set_instance -> OAuthSetInstanceFn;
    /// Introspection handlers.
    oauth_introspection_handlers => OAuthGetIntrospection, into_oauth_introspection -> OAuthIntrospectionFn;
    /// User info handlers.
    oauth_user_info_handlers => OAuthGetUserInfo, into_oauth_user_info -> OAuthUserInfoFn;
    /// System-level verification handlers.
    oauth_verify_system_level_handlers => OAuthVerifySystemLevel, into_verify_system_level -> VerifySystemLevelFn;
    /// Bundle validation handlers.
    validate_bundle_handlers => ValidateBundle, into_validate_bundle -> ValidateBundleFn;
}

scoped_accessors! {
    /// `before_create` handlers: global, then the type, then wildcard.
    before_create_handlers => BeforeCreate, into_before_interaction -> BeforeInteractionFn;
    /// `before_read` handlers.
    before_read_handlers => BeforeRead, into_before_interaction -> BeforeInteractionFn;
    /// `before_update` handlers.
    before_update_handlers => BeforeUpdate, into_before_interaction -> BeforeInteractionFn;
    /// `before_delete` handlers.
    before_delete_handlers => BeforeDelete, into_before_interaction -> BeforeInteractionFn;
    /// `before_search` handlers.
    before_search_handlers => BeforeSearch, into_before_interaction -> BeforeInteractionFn;
    /// `after_create` handlers.
    after_create_handlers => AfterCreate, into_after_interaction -> AfterInteractionFn;
    /// `after_read` handlers.
    after_read_handlers => AfterRead, into_post_read -> PostReadFn;
    /// `after_update` handlers.
    after_update_handlers => AfterUpdate, into_after_interaction -> AfterInteractionFn;
    /// `after_delete` handlers.
    after_delete_handlers => AfterDelete, into_after_interaction -> AfterInteractionFn;
    /// `after_search` handlers.
    after_search_handlers => AfterSearch, into_post_search -> PostSearchFn;
    /// Consent handlers: wildcard first, then the type.
    consent_handlers => Consent, into_consent -> ConsentFn;
    /// Resource id verification handlers.
    oauth_verify_resource_id_handlers => OAuthVerifyResourceId, into_verify_resource_id -> VerifyResourceIdFn;
    /// Resource content verification handlers.
    oauth_verify_resource_content_handlers => OAuthVerifyResourceContent, into_verify_resource_content -> VerifyResourceContentFn;
    /// History verification handlers.
    oauth_verify_history_handlers => OAuthVerifyHistory, into_verify_history -> VerifyHistoryFn;
    /// Delete verification handlers.
    oauth_verify_delete_handlers => OAuthVerifyDelete, into_verify_resource_id -> VerifyResourceIdFn;
    /// Search verification handlers.
    oauth_verify_search_handlers => OAuthVerifySearch, into_verify_search -> VerifySearchFn;
    /// Resource validation handlers: wildcard first, then the type.
    validate_resource_handlers => ValidateResource, into_validate_resource -> ValidateResourceFn;
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use fhirext_core::AppResult;
    use fhirext_core::types::RequestContext;
    use serde_json::Value;

    use crate::builder::RegistryBuilder;

    use super::*;

    fn allow(_resource: &Value, _ctx: &RequestContext) -> AppResult<bool> {
        Ok(true)
    }

    #[test]
    fn test_empty_registry() {
        let registry = RegistryBuilder::new().build();
        assert!(registry.is_empty());
        assert!(registry.consent_handlers("Patient").is_empty());
        assert!(registry.describe().points.is_empty());
        assert!(registry.snapshot_operations().is_empty());
    }

    #[test]
    fn test_typed_accessor_preserves_identity() {
        let handler: ConsentFn = Arc::new(allow);
        let mut builder = RegistryBuilder::new();
        builder.register(
            ExtensionPoint::Consent,
            Some("Patient"),
            Handler::Consent(handler.clone()),
        );
        let registry = builder.build();
        let resolved = registry.consent_handlers("Patient");
        assert_eq!(resolved.len(), 1);
        assert!(Arc::ptr_eq(&resolved[0], &handler));
    }

    #[test]
    fn test_after_interaction_for_read_is_empty() {
        let mut builder = RegistryBuilder::new();
        builder.on_after_read(None, |_ctx: &RequestContext, _resource: &Value| Ok(true));
        let registry = builder.build();
        assert_eq!(registry.after_read_handlers("Patient").len(), 1);
        assert!(registry
            .after_interaction_handlers(Interaction::Read, "Patient")
            .is_empty());
    }

    #[test]
    fn test_describe_lists_points_in_catalogue_order() {
        let mut builder = RegistryBuilder::new();
        builder
            .consent(Some("Patient"), allow)
            .on_capability_statement(|doc: Value| Ok(doc));
        let summary = builder.build().describe();
        let points: Vec<ExtensionPoint> = summary.points.iter().map(|p| p.point).collect();
        assert_eq!(
            points,
            vec![ExtensionPoint::CapabilityStatement, ExtensionPoint::Consent]
        );
        assert_eq!(summary.points[0].scopes[0].scope, None);
        assert_eq!(summary.points[1].scopes[0].scope.as_deref(), Some("Patient"));
    }
}
