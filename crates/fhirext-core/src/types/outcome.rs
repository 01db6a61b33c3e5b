//! OperationOutcome documents returned by validation handlers.

use serde::{Deserialize, Serialize};

/// Severity of an OperationOutcome issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    /// The issue caused the action to fail and no further checking could be performed.
    Fatal,
    /// The issue is sufficiently important to cause the action to fail.
    Error,
    /// The issue is not important enough to cause the action to fail.
    Warning,
    /// The issue has no relation to the degree of success of the action.
    Information,
}

impl IssueSeverity {
    /// Only `fatal` and `error` issues reject a request.
    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::Fatal | Self::Error)
    }
}

/// Human-readable issue details (`issue.details`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct IssueDetails {
    /// Plain text representation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// A single issue inside an [`OperationOutcome`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeIssue {
    /// Issue severity.
    pub severity: IssueSeverity,
    /// FHIR `IssueType` code (`required`, `value`, `invalid`, ...).
    pub code: String,
    /// Issue details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<IssueDetails>,
    /// Additional diagnostic information.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<String>,
    /// FHIRPath expressions locating the issue.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expression: Vec<String>,
}

impl OutcomeIssue {
    /// Creates an issue with a details text.
    pub fn new(severity: IssueSeverity, code: &str, text: &str) -> Self {
        Self {
            severity,
            code: code.to_string(),
            details: Some(IssueDetails {
                text: Some(text.to_string()),
            }),
            diagnostics: None,
            expression: Vec::new(),
        }
    }

    /// Shorthand for an `error` issue.
    pub fn error(code: &str, text: &str) -> Self {
        Self::new(IssueSeverity::Error, code, text)
    }

    /// Shorthand for a `warning` issue.
    pub fn warning(code: &str, text: &str) -> Self {
        Self::new(IssueSeverity::Warning, code, text)
    }

    /// Adds a FHIRPath expression.
    pub fn at(mut self, expression: &str) -> Self {
        self.expression.push(expression.to_string());
        self
    }

    /// Returns the details text, falling back to diagnostics.
    pub fn text(&self) -> Option<&str> {
        self.details
            .as_ref()
            .and_then(|d| d.text.as_deref())
            .or(self.diagnostics.as_deref())
    }
}

/// An OperationOutcome-shaped document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationOutcome {
    /// Always `"OperationOutcome"`.
    #[serde(rename = "resourceType", default = "default_resource_type")]
    pub resource_type: String,
    /// Issues reported.
    #[serde(rename = "issue", default)]
    pub issues: Vec<OutcomeIssue>,
}

impl OperationOutcome {
    /// Creates an outcome from a list of issues.
    pub fn new(issues: Vec<OutcomeIssue>) -> Self {
        Self {
            resource_type: default_resource_type(),
            issues,
        }
    }

    /// Creates an outcome holding one issue.
    pub fn from_issue(issue: OutcomeIssue) -> Self {
        Self::new(vec![issue])
    }

    /// Parses an outcome from a JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Whether any issue is `error` or `fatal`.
    pub fn has_blocking_issues(&self) -> bool {
        self.issues.iter().any(|i| i.severity.is_blocking())
    }

    /// Issues with `error` or `fatal` severity.
    pub fn blocking_issues(&self) -> impl Iterator<Item = &OutcomeIssue> {
        self.issues.iter().filter(|i| i.severity.is_blocking())
    }

    /// Issues that never block (`warning`, `information`).
    pub fn advisory_issues(&self) -> impl Iterator<Item = &OutcomeIssue> {
        self.issues.iter().filter(|i| !i.severity.is_blocking())
    }

    /// Whether the outcome carries no issues.
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

impl Default for OperationOutcome {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

fn default_resource_type() -> String {
    "OperationOutcome".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parses_handler_document() {
        let outcome = OperationOutcome::from_value(json!({
            "resourceType": "OperationOutcome",
            "issue": [{
                "severity": "error",
                "code": "required",
                "details": {"text": "Patient must have at least one identifier"},
                "expression": ["Patient.identifier"]
            }]
        }))
        .expect("valid outcome");

        assert_eq!(outcome.issues.len(), 1);
        let issue = &outcome.issues[0];
        assert_eq!(issue.severity, IssueSeverity::Error);
        assert_eq!(issue.text(), Some("Patient must have at least one identifier"));
        assert_eq!(issue.expression, vec!["Patient.identifier".to_string()]);
    }

    #[test]
    fn test_warning_is_not_blocking() {
        let outcome = OperationOutcome::new(vec![
            OutcomeIssue::warning("informational", "consider adding a name"),
            OutcomeIssue::new(IssueSeverity::Information, "informational", "fyi"),
        ]);
        assert!(!outcome.has_blocking_issues());
        assert_eq!(outcome.advisory_issues().count(), 2);
    }

    #[test]
    fn test_serializes_fhir_field_names() {
        let outcome = OperationOutcome::from_issue(
            OutcomeIssue::error("too-costly", "too many entries").at("Bundle.entry"),
        );
        let value = serde_json::to_value(&outcome).expect("serialize");
        assert_eq!(value["resourceType"], "OperationOutcome");
        assert_eq!(value["issue"][0]["severity"], "error");
        assert_eq!(value["issue"][0]["expression"][0], "Bundle.entry");
        assert!(value["issue"][0].get("diagnostics").is_none());
    }
}
