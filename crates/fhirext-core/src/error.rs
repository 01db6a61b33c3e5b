//! Unified application error types for fhirext.
//!
//! Extension handlers and the host glue map their failures into
//! [`AppError`] for consistent propagation through the ? operator.

use std::fmt;
use thiserror::Error;

use crate::types::outcome::{IssueSeverity, OperationOutcome, OutcomeIssue};

/// Top-level error kind categorization used across the entire application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// The requested resource or operation was not found.
    NotFound,
    /// The caller does not have permission to perform the action.
    Authorization,
    /// Input validation failed.
    Validation,
    /// A conflict occurred (duplicate module id, etc.).
    Conflict,
    /// An internal error occurred.
    Internal,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An extension handler rejected the request.
    Handler,
    /// The requested feature or operation is not implemented.
    NotImplemented,
}

impl ErrorKind {
    /// FHIR `IssueType` code used when rendering this kind as an OperationOutcome.
    pub fn issue_code(&self) -> &'static str {
        match self {
            Self::NotFound => "not-found",
            Self::Authorization => "forbidden",
            Self::Validation => "invalid",
            Self::Conflict => "conflict",
            Self::NotImplemented => "not-supported",
            Self::Handler => "processing",
            Self::Internal | Self::Configuration | Self::Serialization => "exception",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Authorization => write!(f, "AUTHORIZATION"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::Internal => write!(f, "INTERNAL"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Handler => write!(f, "HANDLER"),
            Self::NotImplemented => write!(f, "NOT_IMPLEMENTED"),
        }
    }
}

/// The unified application error used throughout fhirext.
///
/// A validation failure may carry the merged [`OperationOutcome`] produced
/// by validation handlers so the host can return it verbatim.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Structured outcome attached by validation handlers.
    pub outcome: Option<OperationOutcome>,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            outcome: None,
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            outcome: None,
            source: Some(Box::new(source)),
        }
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create an authorization error.
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authorization, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a validation error carrying the blocking outcome.
    pub fn invalid_outcome(outcome: OperationOutcome) -> Self {
        let message = outcome
            .issues
            .iter()
            .filter_map(OutcomeIssue::text)
            .collect::<Vec<_>>()
            .join("; ");
        Self {
            kind: ErrorKind::Validation,
            message,
            outcome: Some(outcome),
            source: None,
        }
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create a handler error.
    pub fn handler(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Handler, message)
    }

    /// Create a not-implemented error.
    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotImplemented, message)
    }

    /// Returns the attached outcome, if any.
    pub fn outcome(&self) -> Option<&OperationOutcome> {
        self.outcome.as_ref()
    }

    /// Renders this error as an OperationOutcome.
    ///
    /// An attached outcome is returned as-is; otherwise a single `error`
    /// issue is built from the kind and message.
    pub fn to_operation_outcome(&self) -> OperationOutcome {
        match &self.outcome {
            Some(outcome) => outcome.clone(),
            None => OperationOutcome::from_issue(OutcomeIssue::new(
                IssueSeverity::Error,
                self.kind.issue_code(),
                &self.message,
            )),
        }
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            outcome: self.outcome.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Internal, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_kind() {
        let err = AppError::authorization("denied");
        assert_eq!(err.to_string(), "AUTHORIZATION: denied");
    }

    #[test]
    fn test_plain_error_renders_single_issue() {
        let outcome = AppError::not_found("operation not supported").to_operation_outcome();
        assert_eq!(outcome.issues.len(), 1);
        assert_eq!(outcome.issues[0].code, "not-found");
        assert_eq!(outcome.issues[0].severity, IssueSeverity::Error);
    }

    #[test]
    fn test_invalid_outcome_keeps_issues() {
        let outcome = OperationOutcome::new(vec![
            OutcomeIssue::new(IssueSeverity::Error, "required", "id required"),
            OutcomeIssue::new(IssueSeverity::Error, "required", "name required"),
        ]);
        let err = AppError::invalid_outcome(outcome.clone());
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.message, "id required; name required");
        assert_eq!(err.to_operation_outcome(), outcome);
        assert_eq!(err.clone().outcome(), Some(&outcome));
    }
}
