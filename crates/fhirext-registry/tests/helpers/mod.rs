//! Shared handler builders for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use fhirext_core::AppResult;
use fhirext_core::traits::FhirService;
use fhirext_core::types::{FhirRequest, FhirResponse, OperationOutcome, RequestContext};
use fhirext_registry::OperationInvocation;
use fhirext_registry::hooks::handler::{
    BeforeInteractionFn, ConsentFn, OperationFn, ValidateResourceFn, VerifyResourceIdFn,
};

/// A `before_*` handler that does nothing. Every call returns a distinct `Arc`.
pub fn before_hook() -> BeforeInteractionFn {
    Arc::new(
        |_: &RequestContext,
         _: &dyn FhirService,
         _: &FhirRequest,
         _: &Value,
         _: Option<Duration>|
         -> AppResult<()> { Ok(()) },
    )
}

/// A consent handler that always allows.
pub fn consent_hook() -> ConsentFn {
    Arc::new(|_: &Value, _: &RequestContext| -> AppResult<bool> { Ok(true) })
}

/// A resource validator that reports nothing.
pub fn validate_hook() -> ValidateResourceFn {
    Arc::new(|_: &Value, _: bool| -> AppResult<Option<OperationOutcome>> { Ok(None) })
}

/// A `(ctx, type, id, privilege)` verifier that always allows.
pub fn verify_id_hook() -> VerifyResourceIdFn {
    Arc::new(|_: &RequestContext, _: &str, _: &str, _: &str| -> AppResult<bool> { Ok(true) })
}

/// An operation handler that tags the response with `label`.
pub fn operation_hook(label: &'static str) -> OperationFn {
    Arc::new(
        move |_: &OperationInvocation,
              _: &dyn FhirService,
              _: &FhirRequest,
              response: FhirResponse|
              -> AppResult<FhirResponse> {
            Ok(response.with_json(serde_json::json!({ "handledBy": label })))
        },
    )
}

/// Whether two resolved lists hold the same callables in the same order.
pub fn same_order<T: ?Sized>(actual: &[Arc<T>], expected: &[&Arc<T>]) -> bool {
    actual.len() == expected.len()
        && actual
            .iter()
            .zip(expected)
            .all(|(a, e)| Arc::ptr_eq(a, e))
}
