//! The sample customization module.

use serde_json::Value;

use fhirext_core::config::sample::SampleConfig;
use fhirext_registry::prelude::*;

use crate::{capability, consent, oauth, operations, request, validation};

/// Registers the sample handlers for every extension point.
#[derive(Debug, Clone, Default)]
pub struct SampleCustomization {
    config: SampleConfig,
}

impl SampleCustomization {
    /// Creates the module with the given settings.
    pub fn new(config: SampleConfig) -> Self {
        Self { config }
    }
}

impl CustomizationModule for SampleCustomization {
    fn info(&self) -> ModuleInfo {
        module_info!(
            id: "fhirext-sample",
            name: "Sample customization",
            version: env!("CARGO_PKG_VERSION"),
            description: "Consent by security label, $diff, OAuth checks, and validation rules",
            author: "fhirext Team"
        )
    }

    fn register(&self, builder: &mut RegistryBuilder) -> AppResult<()> {
        let hidden = self.config.hidden_resources.clone();
        let restricted = self.config.restricted_resource_ids.clone();

        builder
            // Capability statement
            .on_capability_statement(move |statement: Value| {
                capability::hide_resources(statement, &hidden)
            })
            // Request
            .on_before_request(request::extract_user_context)
            .on_after_request(request::cleanup_context)
            .on_before_create(Some("Patient"), request::audit_patient_create)
            .on_before_update(Some("Patient"), request::audit_patient_update)
            // Read / search
            .on_after_read(Some("Patient"), consent::filter_patient_read)
            .on_after_read(None, consent::log_read)
            .on_after_search(Some("Patient"), consent::filter_patient_search)
            // Consent
            .consent(Some("Patient"), consent::security_label_consent)
            // Operations
            .operation("diff", OperationScope::Instance, Some("Patient"), operations::patient_diff)
            .operation("validate", OperationScope::Type, Some("Patient"), operations::patient_validate)
            // OAuth
            .oauth_set_instance(oauth::setup_oauth_token)
            .oauth_get_introspection(oauth::token_introspection)
            .oauth_get_user_info(oauth::user_info)
            .oauth_verify_resource_id(Some("Patient"), oauth::verify_patient_id(restricted.clone()))
            .oauth_verify_resource_content(Some("Patient"), oauth::verify_patient_content)
            .oauth_verify_delete(Some("Patient"), oauth::verify_patient_delete)
            .oauth_verify_search(Some("Patient"), oauth::verify_patient_search(restricted))
            .oauth_verify_system_level(oauth::verify_system_access)
            // Validation
            .on_validate_resource(Some("*"), validation::require_id)
            .on_validate_resource(Some("Patient"), validation::validate_patient)
            .on_validate_resource(Some("Observation"), validation::validate_observation)
            .on_validate_bundle(validation::validate_transaction(
                self.config.max_transaction_entries,
            ));

        Ok(())
    }
}
