//! Host request flows driven through the sealed registry.

mod helpers;

use fhirext_core::error::ErrorKind;
use fhirext_core::types::FhirRequest;
use fhirext_registry::OperationScope;

const SCOPES: &str = "USER:OAuthScopes";

fn patient_read(id: &str, scopes: &str) -> FhirRequest {
    FhirRequest::new("GET", "Patient")
        .with_id(id)
        .with_user("alice", "doctor")
        .with_info(SCOPES, scopes)
}

#[tokio::test]
async fn test_read_without_denied_labels_is_visible() {
    let host = helpers::TestHost::new("");
    let resource = host
        .read(&patient_read("p2", ""))
        .expect("read")
        .expect("visible");
    assert_eq!(resource["id"], "p2");
}

#[tokio::test]
async fn test_permission_scope_hides_labelled_patient() {
    let host = helpers::TestHost::new("");
    assert!(host
        .read(&patient_read("p2", "no-very-restricted"))
        .expect("read")
        .is_none());
    assert!(host
        .read(&patient_read("p1", "no-very-restricted"))
        .expect("read")
        .is_some());
}

#[tokio::test]
async fn test_restricted_id_is_rejected_before_lookup() {
    let host = helpers::TestHost::new("");
    let err = host
        .read(&patient_read("restricted-patient-123", ""))
        .expect_err("restricted");
    assert_eq!(err.kind, ErrorKind::Authorization);
}

#[tokio::test]
async fn test_configured_restrictions_replace_defaults() {
    let host = helpers::TestHost::new(
        r#"
        [sample]
        restricted_resource_ids = ["p1"]
        "#,
    );
    let err = host.read(&patient_read("p1", "")).expect_err("restricted");
    assert_eq!(err.kind, ErrorKind::Authorization);

    // No longer restricted, so the lookup runs and misses.
    let err = host
        .read(&patient_read("restricted-patient-123", ""))
        .expect_err("missing");
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_concurrent_requests_keep_their_own_context() {
    let host = std::sync::Arc::new(helpers::TestHost::new(""));

    let mut tasks = Vec::new();
    for i in 0..16 {
        let host = host.clone();
        tasks.push(tokio::task::spawn_blocking(move || {
            let scopes = if i % 2 == 0 { "no-very-restricted" } else { "" };
            (i, host.read(&patient_read("p2", scopes)))
        }));
    }

    for task in tasks {
        let (i, result) = task.await.expect("task");
        let visible = result.expect("read").is_some();
        assert_eq!(visible, i % 2 == 1, "request {i}");
    }
}

#[tokio::test]
async fn test_supported_operations_for_capability_statement() {
    let host = helpers::TestHost::new("");
    let supported = host.dispatcher.registry().supported_operations();
    let names: Vec<&str> = supported.iter().map(|op| op.name.as_str()).collect();
    assert_eq!(names, vec!["diff", "validate"]);
    assert!(host
        .dispatcher
        .registry()
        .resolve_operation("validate", OperationScope::Type, "Patient")
        .is_some());
}
