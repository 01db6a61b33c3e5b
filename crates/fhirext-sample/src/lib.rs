//! Sample customization for the fhirext extension registry.
//!
//! Demonstrates every registration method: capability statement pruning,
//! request context extraction, consent by security label, a `$diff`
//! operation, OAuth verification, and resource/bundle validation.

pub mod capability;
pub mod consent;
pub mod module;
pub mod oauth;
pub mod operations;
pub mod request;
pub mod validation;

pub use module::SampleCustomization;
