//! Operation index: custom `$operations` keyed by (name, scope, resource type).

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::hooks::definitions::ParseError;
use crate::hooks::handler::OperationFn;
use crate::hooks::store::WILDCARD;

/// Level at which an operation is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OperationScope {
    /// `[base]/$name`
    System,
    /// `[base]/Type/$name`
    Type,
    /// `[base]/Type/id/$name`
    Instance,
}

impl OperationScope {
    /// Returns the scope name exactly as the host spells it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "System",
            Self::Type => "Type",
            Self::Instance => "Instance",
        }
    }
}

impl fmt::Display for OperationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OperationScope {
    type Err = ParseError;

    /// Case-sensitive: `"instance"` is not a scope.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "System" => Ok(Self::System),
            "Type" => Ok(Self::Type),
            "Instance" => Ok(Self::Instance),
            other => Err(ParseError::UnknownOperationScope(other.to_string())),
        }
    }
}

/// Composite key of the operation index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OperationKey {
    /// Operation name without the `$` (e.g. `"diff"`).
    pub name: String,
    /// Invocation level.
    pub scope: OperationScope,
    /// Concrete resource type or `"*"`.
    pub resource_type: String,
}

impl OperationKey {
    /// Creates a key.
    pub fn new(name: &str, scope: OperationScope, resource_type: &str) -> Self {
        Self {
            name: name.to_string(),
            scope,
            resource_type: resource_type.to_string(),
        }
    }
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${} ({}, {})", self.name, self.scope, self.resource_type)
    }
}

/// What an operation handler is told about the call.
#[derive(Debug, Clone)]
pub struct OperationInvocation {
    /// Operation name.
    pub name: String,
    /// Invocation level.
    pub scope: OperationScope,
    /// Parameters body.
    pub body: Value,
}

impl OperationInvocation {
    /// Creates an invocation.
    pub fn new(name: &str, scope: OperationScope, body: Value) -> Self {
        Self {
            name: name.to_string(),
            scope,
            body,
        }
    }
}

/// An operation supported by the server, for capability statement generation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SupportedOperation {
    /// Operation name.
    pub name: String,
    /// Canonical OperationDefinition URL.
    pub definition: String,
}

#[derive(Clone)]
struct OperationEntry {
    name: &'static str,
    handler: OperationFn,
}

/// Index of operation handlers. One handler per key; later writes win.
#[derive(Clone, Default)]
pub struct OperationIndex {
    entries: BTreeMap<OperationKey, OperationEntry>,
}

impl OperationIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a handler under the exact key, replacing any previous one.
    ///
    /// Returns the display name of the replaced handler, if any.
    pub fn insert(
        &mut self,
        key: OperationKey,
        name: &'static str,
        handler: OperationFn,
    ) -> Option<&'static str> {
        self.entries
            .insert(key, OperationEntry { name, handler })
            .map(|previous| previous.name)
    }

    /// Exact key first, then the same name and scope under `"*"`.
    pub fn resolve(
        &self,
        name: &str,
        scope: OperationScope,
        resource_type: &str,
    ) -> Option<OperationFn> {
        self.entries
            .get(&OperationKey::new(name, scope, resource_type))
            .or_else(|| self.entries.get(&OperationKey::new(name, scope, WILDCARD)))
            .map(|entry| entry.handler.clone())
    }

    /// Copy of the whole index.
    pub fn snapshot(&self) -> BTreeMap<OperationKey, OperationFn> {
        self.entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.handler.clone()))
            .collect()
    }

    /// Keys with the display names of their handlers.
    pub fn describe(&self) -> Vec<(OperationKey, &'static str)> {
        self.entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.name))
            .collect()
    }

    /// Distinct operations with their OperationDefinition URLs.
    pub fn supported(&self) -> Vec<SupportedOperation> {
        let supported: BTreeSet<SupportedOperation> = self
            .entries
            .keys()
            .map(|key| {
                let base = if key.resource_type == WILDCARD {
                    "Resource"
                } else {
                    key.resource_type.as_str()
                };
                SupportedOperation {
                    name: key.name.clone(),
                    definition: format!(
                        "http://hl7.org/fhir/OperationDefinition/{base}-{}",
                        key.name
                    ),
                }
            })
            .collect();
        supported.into_iter().collect()
    }

    /// Number of registered operations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no operation is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for OperationIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationIndex")
            .field("keys", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use fhirext_core::AppResult;
    use fhirext_core::traits::FhirService;
    use fhirext_core::types::{FhirRequest, FhirResponse};

    use super::*;

    fn echo(
        _call: &OperationInvocation,
        _service: &dyn FhirService,
        _request: &FhirRequest,
        response: FhirResponse,
    ) -> AppResult<FhirResponse> {
        Ok(response)
    }

    fn handler() -> OperationFn {
        Arc::new(echo)
    }

    #[test]
    fn test_scope_parsing_is_case_sensitive() {
        assert_eq!("Instance".parse::<OperationScope>(), Ok(OperationScope::Instance));
        assert!("instance".parse::<OperationScope>().is_err());
    }

    #[test]
    fn test_exact_then_wildcard_then_none() {
        let specific = handler();
        let wildcard = handler();
        let mut index = OperationIndex::new();
        index.insert(
            OperationKey::new("diff", OperationScope::Instance, "Patient"),
            "specific",
            specific.clone(),
        );
        index.insert(
            OperationKey::new("diff", OperationScope::Instance, "*"),
            "wildcard",
            wildcard.clone(),
        );

        let found = index
            .resolve("diff", OperationScope::Instance, "Patient")
            .expect("specific");
        assert!(Arc::ptr_eq(&found, &specific));

        let found = index
            .resolve("diff", OperationScope::Instance, "Observation")
            .expect("wildcard");
        assert!(Arc::ptr_eq(&found, &wildcard));

        assert!(index.resolve("nonexistent", OperationScope::Instance, "Patient").is_none());
        assert!(index.resolve("diff", OperationScope::Type, "Patient").is_none());
    }

    #[test]
    fn test_last_write_wins() {
        let mut index = OperationIndex::new();
        let key = OperationKey::new("validate", OperationScope::Type, "Patient");
        assert_eq!(index.insert(key.clone(), "first", handler()), None);
        let second = handler();
        assert_eq!(index.insert(key, "second", second.clone()), Some("first"));
        assert_eq!(index.len(), 1);
        let found = index
            .resolve("validate", OperationScope::Type, "Patient")
            .expect("registered");
        assert!(Arc::ptr_eq(&found, &second));
    }

    #[test]
    fn test_supported_operations_are_distinct() {
        let mut index = OperationIndex::new();
        index.insert(OperationKey::new("diff", OperationScope::Instance, "Patient"), "a", handler());
        index.insert(OperationKey::new("diff", OperationScope::Type, "Patient"), "b", handler());
        index.insert(OperationKey::new("restart", OperationScope::System, "*"), "c", handler());
        assert_eq!(
            index.supported(),
            vec![
                SupportedOperation {
                    name: "diff".to_string(),
                    definition: "http://hl7.org/fhir/OperationDefinition/Patient-diff".to_string(),
                },
                SupportedOperation {
                    name: "restart".to_string(),
                    definition: "http://hl7.org/fhir/OperationDefinition/Resource-restart"
                        .to_string(),
                },
            ]
        );
    }
}
