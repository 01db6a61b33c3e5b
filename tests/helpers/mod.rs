//! Shared helpers for host-flow tests.

use std::sync::Arc;

use serde_json::{Value, json};

use fhirext_core::config::AppConfig;
use fhirext_core::error::AppError;
use fhirext_core::traits::{FhirService, InMemoryFhirService};
use fhirext_core::types::{FhirRequest, FhirResponse, RequestContext};
use fhirext_registry::{HandlerDispatcher, Interaction, ModuleManager};
use fhirext_sample::SampleCustomization;

/// A host engine stand-in wired the way the CLI wires it.
pub struct TestHost {
    /// Dispatcher over the sealed registry
    pub dispatcher: Arc<HandlerDispatcher>,
    /// Resource store handed to handlers
    pub service: Arc<InMemoryFhirService>,
    /// Application config
    pub config: AppConfig,
}

impl TestHost {
    /// Builds a host from a TOML configuration snippet.
    pub fn new(config: &str) -> Self {
        let config = AppConfig::from_toml(config).expect("valid test config");

        let mut manager = ModuleManager::new();
        manager
            .add(Arc::new(SampleCustomization::new(config.sample.clone())))
            .expect("add sample module");
        let dispatcher = Arc::new(manager.dispatcher().expect("seal registry"));

        let service = InMemoryFhirService::new(&config.host.fhir_version)
            .with_resource(json!({
                "resourceType": "Patient",
                "id": "p1",
                "active": true,
                "name": [{"family": "Doe"}]
            }))
            .and_then(|s| {
                s.with_resource(json!({
                    "resourceType": "Patient",
                    "id": "p2",
                    "active": true,
                    "meta": {"security": [{"code": "V"}]}
                }))
            })
            .and_then(|s| {
                s.with_resource(json!({
                    "resourceType": "Permission",
                    "id": "no-very-restricted",
                    "rule": [{"data": [{"security": [{"code": "V"}]}]}]
                }))
            })
            .expect("fixtures");

        Self {
            dispatcher,
            service: Arc::new(service),
            config,
        }
    }

    /// Serves a read the way the host does: lifecycle hooks around a
    /// stored-resource lookup filtered by the read post-processors.
    ///
    /// Returns `None` when a handler hid the resource.
    pub fn read(&self, request: &FhirRequest) -> Result<Option<Value>, AppError> {
        let timeout = self.config.host.request_timeout();
        let mut ctx = RequestContext::for_request(request);
        let body = Value::Null;

        self.dispatcher
            .before_request(&mut ctx, self.service.as_ref(), request, &body, timeout)?;
        self.dispatcher.before_interaction(
            Interaction::Read,
            &ctx,
            self.service.as_ref(),
            request,
            &body,
            timeout,
        )?;

        let resource_type = request.resource_type_or_wildcard();
        let id = request.id.as_deref().unwrap_or_default();
        self.dispatcher.verify_resource_id(&ctx, resource_type, id, "read")?;
        let resource = self.service.read(resource_type, id)?;
        let visible = self.dispatcher.post_process_read(&ctx, &resource)?;

        self.dispatcher.after_request(
            &mut ctx,
            self.service.as_ref(),
            request,
            &FhirResponse::ok(),
            &body,
        )?;
        Ok(visible.then_some(resource))
    }
}
