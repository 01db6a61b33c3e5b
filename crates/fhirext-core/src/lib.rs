//! # fhirext-core
//!
//! Core crate for fhirext. Contains the unified error system, configuration
//! schemas, and the host-facing data types that extension handlers receive:
//! requests, responses, the per-request context, search result sets, and
//! OperationOutcome documents.
//!
//! This crate has **no** internal dependencies on other fhirext crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
