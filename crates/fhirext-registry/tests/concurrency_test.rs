//! Concurrent resolution against a sealed, shared registry.

mod helpers;

use std::sync::Arc;

use fhirext_registry::{
    ExtensionPoint, Handler, HandlerDispatcher, OperationScope, Registry, RegistryBuilder,
};

use helpers::{before_hook, consent_hook, operation_hook, same_order};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_tasks_resolve_consistently() {
    let global = before_hook();
    let patient = before_hook();
    let wildcard = consent_hook();
    let diff = operation_hook("diff");

    let mut builder = RegistryBuilder::new();
    builder
        .register(
            ExtensionPoint::BeforeRead,
            None,
            Handler::BeforeInteraction(global.clone()),
        )
        .register(
            ExtensionPoint::BeforeRead,
            Some("Patient"),
            Handler::BeforeInteraction(patient.clone()),
        )
        .register(
            ExtensionPoint::Consent,
            Some("*"),
            Handler::Consent(wildcard.clone()),
        )
        .register_operation("diff", OperationScope::Instance, Some("Patient"), diff.clone());
    let registry: Arc<Registry> = Arc::new(builder.build());

    let mut tasks = Vec::new();
    for i in 0..64 {
        let registry = registry.clone();
        let (global, patient, wildcard, diff) =
            (global.clone(), patient.clone(), wildcard.clone(), diff.clone());
        tasks.push(tokio::spawn(async move {
            let resource_type = if i % 2 == 0 { "Patient" } else { "Observation" };
            for _ in 0..100 {
                let before = registry.before_read_handlers(resource_type);
                if resource_type == "Patient" {
                    assert!(same_order(&before, &[&global, &patient]));
                    let op = registry
                        .resolve_operation("diff", OperationScope::Instance, resource_type)
                        .expect("registered");
                    assert!(Arc::ptr_eq(&op, &diff));
                } else {
                    assert!(same_order(&before, &[&global]));
                    assert!(
                        registry
                            .resolve_operation("diff", OperationScope::Instance, resource_type)
                            .is_none()
                    );
                }
                assert!(same_order(
                    &registry.consent_handlers(resource_type),
                    &[&wildcard]
                ));
                tokio::task::yield_now().await;
            }
        }));
    }

    for task in tasks {
        task.await.expect("task completed");
    }
}

#[test]
fn test_registry_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Registry>();
    assert_send_sync::<HandlerDispatcher>();
}
