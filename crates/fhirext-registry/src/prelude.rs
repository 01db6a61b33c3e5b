//! Prelude for customization modules.

pub use fhirext_core::traits::FhirService;
pub use fhirext_core::types::{
    FhirRequest, FhirResponse, IssueSeverity, OAuthToken, OperationOutcome, OutcomeIssue,
    RequestContext, SearchRequest, SearchResultSet, SearchRow,
};
pub use fhirext_core::{AppError, AppResult};

pub use crate::builder::RegistryBuilder;
pub use crate::hooks::definitions::{ExtensionPoint, Interaction};
pub use crate::module::{CustomizationModule, ModuleInfo};
pub use crate::operations::{OperationInvocation, OperationScope};

pub use crate::module_info;
