//! Host-facing data types handed to extension handlers.

pub mod context;
pub mod outcome;
pub mod request;
pub mod search;

pub use context::RequestContext;
pub use outcome::{IssueSeverity, OperationOutcome, OutcomeIssue};
pub use request::{FhirRequest, FhirResponse, OAuthToken, SearchParameters, SearchRequest};
pub use search::{SearchResultSet, SearchRow};
