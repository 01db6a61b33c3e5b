//! Integration tests for tiered handler resolution.

mod helpers;

use fhirext_registry::hooks::handler::Handler;
use fhirext_registry::hooks::store::GLOBAL;
use fhirext_registry::{ExtensionPoint, RegistryBuilder};

use helpers::{before_hook, consent_hook, same_order, validate_hook, verify_id_hook};

#[test]
fn test_before_create_global_then_specific() {
    let h1 = before_hook();
    let h2 = before_hook();
    let mut builder = RegistryBuilder::new();
    builder
        .register(ExtensionPoint::BeforeCreate, None, Handler::BeforeInteraction(h1.clone()))
        .register(
            ExtensionPoint::BeforeCreate,
            Some("Patient"),
            Handler::BeforeInteraction(h2.clone()),
        );
    let registry = builder.build();

    assert!(same_order(&registry.before_create_handlers("Patient"), &[&h1, &h2]));
    assert!(same_order(&registry.before_create_handlers("Observation"), &[&h1]));
}

#[test]
fn test_lifecycle_three_tiers_in_exact_order() {
    let global = before_hook();
    let specific = before_hook();
    let wildcard = before_hook();
    let mut builder = RegistryBuilder::new();
    builder
        .register(ExtensionPoint::BeforeDelete, Some("*"), Handler::BeforeInteraction(wildcard.clone()))
        .register(ExtensionPoint::BeforeDelete, Some("Patient"), Handler::BeforeInteraction(specific.clone()))
        .register(ExtensionPoint::BeforeDelete, Some(GLOBAL), Handler::BeforeInteraction(global.clone()));
    let registry = builder.build();

    assert!(same_order(
        &registry.before_delete_handlers("Patient"),
        &[&global, &specific, &wildcard]
    ));
    assert!(same_order(
        &registry.before_delete_handlers("*"),
        &[&global, &wildcard]
    ));
    assert!(same_order(
        &registry.before_delete_handlers(GLOBAL),
        &[&global, &wildcard]
    ));
}

#[test]
fn test_consent_wildcard_then_specific() {
    let c1 = consent_hook();
    let c2 = consent_hook();
    let mut builder = RegistryBuilder::new();
    builder
        .register(ExtensionPoint::Consent, Some("*"), Handler::Consent(c1.clone()))
        .register(ExtensionPoint::Consent, Some("Patient"), Handler::Consent(c2.clone()));
    let registry = builder.build();

    assert!(same_order(&registry.consent_handlers("Patient"), &[&c1, &c2]));
    assert!(same_order(&registry.consent_handlers("Observation"), &[&c1]));
    assert!(same_order(&registry.consent_handlers("*"), &[&c1, &c1]));
}

#[test]
fn test_validate_resource_wildcard_query_repeats_wildcard_tier() {
    let v1 = validate_hook();
    let v2 = validate_hook();
    let mut builder = RegistryBuilder::new();
    builder
        .register(ExtensionPoint::ValidateResource, Some("*"), Handler::ValidateResource(v1.clone()))
        .register(ExtensionPoint::ValidateResource, Some("Patient"), Handler::ValidateResource(v2.clone()));
    let registry = builder.build();

    assert!(same_order(&registry.validate_resource_handlers("Patient"), &[&v1, &v2]));
    assert!(same_order(&registry.validate_resource_handlers("*"), &[&v1, &v1]));
}

#[test]
fn test_oauth_verify_wildcard_query_repeats_wildcard_tier() {
    let d1 = verify_id_hook();
    let d2 = verify_id_hook();
    let mut builder = RegistryBuilder::new();
    builder
        .register(ExtensionPoint::OAuthVerifyDelete, None, Handler::VerifyResourceId(d1.clone()))
        .register(ExtensionPoint::OAuthVerifyDelete, Some("Patient"), Handler::VerifyResourceId(d2.clone()));
    let registry = builder.build();

    assert!(same_order(&registry.oauth_verify_delete_handlers("Patient"), &[&d1, &d2]));
    assert!(same_order(&registry.oauth_verify_delete_handlers("Observation"), &[&d1]));
    assert!(same_order(&registry.oauth_verify_delete_handlers("*"), &[&d1, &d1]));
}

#[test]
fn test_generic_register_keeps_mismatched_shape() {
    let stray = before_hook();
    let mut builder = RegistryBuilder::new();
    builder.register(ExtensionPoint::AfterDelete, None, Handler::BeforeInteraction(stray.clone()));
    assert_eq!(builder.handler_count(), 1);
    let registry = builder.build();

    let stored = registry.resolve(ExtensionPoint::AfterDelete, "Patient");
    assert_eq!(stored.len(), 1);
    assert!(stored[0].ptr_eq(&Handler::BeforeInteraction(stray)));
    assert!(registry.after_delete_handlers("Patient").is_empty());
}

#[test]
fn test_unregistered_kind_resolves_empty() {
    let registry = RegistryBuilder::new().build();
    for point in ExtensionPoint::ALL {
        assert!(registry.resolve(point, "Patient").is_empty(), "{point}");
    }
}

#[test]
fn test_resolved_list_is_a_copy() {
    let mut builder = RegistryBuilder::new();
    builder.register(ExtensionPoint::Consent, None, Handler::Consent(consent_hook()));
    let registry = builder.build();

    let mut first = registry.resolve(ExtensionPoint::Consent, "Patient");
    first.push(Handler::Consent(consent_hook()));
    first.push(Handler::Consent(consent_hook()));

    assert_eq!(registry.resolve(ExtensionPoint::Consent, "Patient").len(), 1);
}

#[test]
fn test_same_handler_twice_is_resolved_twice() {
    let audit = before_hook();
    let mut builder = RegistryBuilder::new();
    builder
        .register(ExtensionPoint::BeforeUpdate, Some("Patient"), Handler::BeforeInteraction(audit.clone()))
        .register(ExtensionPoint::BeforeUpdate, Some("Patient"), Handler::BeforeInteraction(audit.clone()));
    let registry = builder.build();

    assert!(same_order(
        &registry.before_update_handlers("Patient"),
        &[&audit, &audit]
    ));
}

#[test]
fn test_generic_and_typed_resolution_agree() {
    let c1 = consent_hook();
    let mut builder = RegistryBuilder::new();
    builder.register(ExtensionPoint::Consent, Some("Patient"), Handler::Consent(c1.clone()));
    let registry = builder.build();

    let generic = registry.resolve(ExtensionPoint::Consent, "Patient");
    assert_eq!(generic.len(), 1);
    assert!(generic[0].ptr_eq(&Handler::Consent(c1)));
}
