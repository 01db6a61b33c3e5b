//! Handler callable types, one per documented extension point contract.
//!
//! Handlers are reference-counted closures. Identity is the `Arc` pointer:
//! cloning a handler out of the registry never copies its logic.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};

use fhirext_core::AppResult;
use fhirext_core::traits::FhirService;
use fhirext_core::types::{
    FhirRequest, FhirResponse, OAuthToken, OperationOutcome, RequestContext, SearchRequest,
    SearchResultSet,
};

use crate::operations::OperationInvocation;

/// `(capability_statement) -> capability_statement`
pub type CapabilityStatementFn = Arc<dyn Fn(Value) -> AppResult<Value> + Send + Sync>;

/// `(ctx, service, request, body, timeout)`; may populate the context.
pub type BeforeRequestFn = Arc<
    dyn Fn(&mut RequestContext, &dyn FhirService, &FhirRequest, &Value, Option<Duration>) -> AppResult<()>
        + Send
        + Sync,
>;

/// `(ctx, service, request, response, body)`; may clear the context.
pub type AfterRequestFn = Arc<
    dyn Fn(&mut RequestContext, &dyn FhirService, &FhirRequest, &FhirResponse, &Value) -> AppResult<()>
        + Send
        + Sync,
>;

/// `(ctx, service, request, body, timeout)` before create/read/update/delete/search.
pub type BeforeInteractionFn = Arc<
    dyn Fn(&RequestContext, &dyn FhirService, &FhirRequest, &Value, Option<Duration>) -> AppResult<()>
        + Send
        + Sync,
>;

/// `(ctx, service, request, response, body)` after create/update/delete.
pub type AfterInteractionFn = Arc<
    dyn Fn(&RequestContext, &dyn FhirService, &FhirRequest, &FhirResponse, &Value) -> AppResult<()>
        + Send
        + Sync,
>;

/// `(ctx, resource) -> visible`; `false` hides the resource.
pub type PostReadFn = Arc<dyn Fn(&RequestContext, &Value) -> AppResult<bool> + Send + Sync>;

/// `(ctx, result_set, resource_type)`; marks rows deleted to hide them.
pub type PostSearchFn =
    Arc<dyn Fn(&RequestContext, &mut SearchResultSet, &str) -> AppResult<()> + Send + Sync>;

/// `(resource, ctx) -> allowed`; `false` denies.
pub type ConsentFn = Arc<dyn Fn(&Value, &RequestContext) -> AppResult<bool> + Send + Sync>;

/// `(invocation, service, request, response) -> response`
pub type OperationFn = Arc<
    dyn Fn(&OperationInvocation, &dyn FhirService, &FhirRequest, FhirResponse) -> AppResult<FhirResponse>
        + Send
        + Sync,
>;

/// `(ctx, token)`
pub type OAuthSetInstanceFn =
    Arc<dyn Fn(&mut RequestContext, &OAuthToken) -> AppResult<()> + Send + Sync>;

/// `(ctx) -> introspection document`
pub type OAuthIntrospectionFn =
    Arc<dyn Fn(&RequestContext) -> AppResult<Option<Map<String, Value>>> + Send + Sync>;

/// `(ctx, basic_auth_username, basic_auth_roles) -> user info`
pub type OAuthUserInfoFn =
    Arc<dyn Fn(&RequestContext, &str, &str) -> AppResult<Option<Map<String, Value>>> + Send + Sync>;

/// `(ctx, resource_type, resource_id, required_privilege) -> allowed`
pub type VerifyResourceIdFn =
    Arc<dyn Fn(&RequestContext, &str, &str, &str) -> AppResult<bool> + Send + Sync>;

/// `(ctx, resource, required_privilege, allow_shared_resource) -> allowed`
pub type VerifyResourceContentFn =
    Arc<dyn Fn(&RequestContext, &Value, &str, bool) -> AppResult<bool> + Send + Sync>;

/// `(ctx, resource_type, resource, required_privilege) -> allowed`
pub type VerifyHistoryFn =
    Arc<dyn Fn(&RequestContext, &str, &Value, &str) -> AppResult<bool> + Send + Sync>;

/// `(ctx, search, required_privilege) -> allowed`
pub type VerifySearchFn =
    Arc<dyn Fn(&RequestContext, &SearchRequest, &str) -> AppResult<bool> + Send + Sync>;

/// `(ctx) -> allowed`
pub type VerifySystemLevelFn = Arc<dyn Fn(&RequestContext) -> AppResult<bool> + Send + Sync>;

/// `(resource, is_in_transaction) -> outcome`
pub type ValidateResourceFn =
    Arc<dyn Fn(&Value, bool) -> AppResult<Option<OperationOutcome>> + Send + Sync>;

/// `(bundle, fhir_version) -> outcome`
pub type ValidateBundleFn =
    Arc<dyn Fn(&Value, &str) -> AppResult<Option<OperationOutcome>> + Send + Sync>;

macro_rules! handler_kinds {
    ($( $(#[$meta:meta])* $variant:ident($alias:ident) => $into:ident ),* $(,)?) => {
        /// A registered handler, tagged by its call signature.
        #[derive(Clone)]
        pub enum Handler {
            $( $(#[$meta])* $variant($alias), )*
        }

        impl Handler {
            /// Name of the call signature this handler implements.
            pub fn signature(&self) -> &'static str {
                match self {
                    $( Self::$variant(_) => stringify!($variant), )*
                }
            }

            /// Whether both values hold the same callable.
            pub fn ptr_eq(&self, other: &Handler) -> bool {
                match (self, other) {
                    $( (Self::$variant(a), Self::$variant(b)) => Arc::ptr_eq(a, b), )*
                    _ => false,
                }
            }

            $(
                #[doc = concat!("Returns the callable if this is a `", stringify!($variant), "` handler.")]
                pub fn $into(self) -> Option<$alias> {
                    match self {
                        Self::$variant(f) => Some(f),
                        _ => None,
                    }
                }
            )*
        }
    };
}

handler_kinds! {
    /// Capability statement customization.
    CapabilityStatement(CapabilityStatementFn) => into_capability_statement,
    /// Pre-request hook.
    BeforeRequest(BeforeRequestFn) => into_before_request,
    /// Post-request hook.
    AfterRequest(AfterRequestFn) => into_after_request,
    /// Pre-create/read/update/delete/search hook.
    BeforeInteraction(BeforeInteractionFn) => into_before_interaction,
    /// Post-create/update/delete hook.
    AfterInteraction(AfterInteractionFn) => into_after_interaction,
    /// Post-read filter.
    PostRead(PostReadFn) => into_post_read,
    /// Post-search filter.
    PostSearch(PostSearchFn) => into_post_search,
    /// Consent rule.
    Consent(ConsentFn) => into_consent,
    /// OAuth token setup.
    OAuthSetInstance(OAuthSetInstanceFn) => into_oauth_set_instance,
    /// OAuth introspection.
    OAuthIntrospection(OAuthIntrospectionFn) => into_oauth_introspection,
    /// OAuth user info.
    OAuthUserInfo(OAuthUserInfoFn) => into_oauth_user_info,
    /// OAuth verification by resource type and id (also used for deletes).
    VerifyResourceId(VerifyResourceIdFn) => into_verify_resource_id,
    /// OAuth verification by resource content.
    VerifyResourceContent(VerifyResourceContentFn) => into_verify_resource_content,
    /// OAuth verification of history-instance responses.
    VerifyHistory(VerifyHistoryFn) => into_verify_history,
    /// OAuth verification of searches.
    VerifySearch(VerifySearchFn) => into_verify_search,
    /// OAuth verification of system-level requests.
    VerifySystemLevel(VerifySystemLevelFn) => into_verify_system_level,
    /// Resource validation.
    ValidateResource(ValidateResourceFn) => into_validate_resource,
    /// Bundle validation.
    ValidateBundle(ValidateBundleFn) => into_validate_bundle,
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handler").field(&self.signature()).finish()
    }
}

/// A handler together with the display name it was registered under.
#[derive(Debug, Clone)]
pub struct HandlerEntry {
    /// Display name, derived from the callable's type.
    pub name: &'static str,
    /// The handler.
    pub handler: Handler,
}

impl HandlerEntry {
    /// Creates an entry.
    pub fn new(name: &'static str, handler: Handler) -> Self {
        Self { name, handler }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allow(_resource: &Value, _ctx: &RequestContext) -> AppResult<bool> {
        Ok(true)
    }

    #[test]
    fn test_clone_keeps_identity() {
        let handler = Handler::Consent(Arc::new(allow));
        let copy = handler.clone();
        assert!(handler.ptr_eq(&copy));
    }

    #[test]
    fn test_distinct_registrations_differ() {
        let a = Handler::Consent(Arc::new(allow));
        let b = Handler::Consent(Arc::new(allow));
        assert!(!a.ptr_eq(&b));
    }

    #[test]
    fn test_into_matches_variant_only() {
        let handler = Handler::Consent(Arc::new(allow));
        assert_eq!(handler.signature(), "Consent");
        assert!(handler.clone().into_post_read().is_none());
        assert!(handler.into_consent().is_some());
    }
}
