//! Convenience result type alias for fhirext.

use crate::error::AppError;

/// A specialized `Result` type for fhirext operations and extension handlers.
///
/// Handlers signal rejection by returning `Err`, which the dispatcher
/// propagates unmodified.
pub type AppResult<T> = Result<T, AppError>;
