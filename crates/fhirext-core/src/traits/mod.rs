//! Traits implemented by the host engine.

pub mod service;

pub use service::{FhirService, InMemoryFhirService};
