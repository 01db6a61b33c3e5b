//! Extension point definitions and their precedence families.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How handlers of a resource-scoped extension point are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrecedenceFamily {
    /// Request lifecycle hooks: global, then specific type, then wildcard.
    Lifecycle,
    /// Policy hooks (consent, OAuth verification, validation): wildcard, then specific type.
    Policy,
}

/// How handlers of an extension point are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// A single flat list in registration order.
    Unscoped,
    /// Partitioned by resource type and ordered by a precedence family.
    Scoped(PrecedenceFamily),
    /// Keyed by (name, scope, resource type) in the operation index.
    Indexed,
}

/// Enumeration of all extension points of the host engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionPoint {
    // ── Capability statement ──
    /// Customizes the capability statement document.
    CapabilityStatement,

    // ── Request ──
    /// Runs before any request is processed.
    BeforeRequest,
    /// Runs after any request is processed.
    AfterRequest,

    // ── Interactions, before ──
    /// Runs before a create (POST).
    BeforeCreate,
    /// Runs before a read (GET).
    BeforeRead,
    /// Runs before an update (PUT).
    BeforeUpdate,
    /// Runs before a delete (DELETE).
    BeforeDelete,
    /// Runs before a search.
    BeforeSearch,

    // ── Interactions, after ──
    /// Runs after a create.
    AfterCreate,
    /// Post-processes a read; may hide the resource.
    AfterRead,
    /// Runs after an update.
    AfterUpdate,
    /// Runs after a delete.
    AfterDelete,
    /// Post-processes a search result set.
    AfterSearch,

    // ── Consent ──
    /// Decides whether a resource may be shown to the user.
    Consent,

    // ── Operations ──
    /// Custom `$operation` handler.
    Operation,

    // ── OAuth ──
    /// Sets up the token instance.
    OAuthSetInstance,
    /// Returns the token introspection document.
    OAuthGetIntrospection,
    /// Derives user information from the token.
    OAuthGetUserInfo,
    /// Verifies access by resource type and id.
    OAuthVerifyResourceId,
    /// Verifies access by resource content.
    OAuthVerifyResourceContent,
    /// Verifies access to a history-instance response.
    OAuthVerifyHistory,
    /// Verifies access for a delete.
    OAuthVerifyDelete,
    /// Verifies access for a search.
    OAuthVerifySearch,
    /// Verifies access for a system-level request.
    OAuthVerifySystemLevel,

    // ── Validation ──
    /// Validates a single resource.
    ValidateResource,
    /// Validates a Bundle.
    ValidateBundle,
}

impl ExtensionPoint {
    /// Every extension point, in catalogue order.
    pub const ALL: [ExtensionPoint; 26] = [
        Self::CapabilityStatement,
        Self::BeforeRequest,
        Self::AfterRequest,
        Self::BeforeCreate,
        Self::BeforeRead,
        Self::BeforeUpdate,
        Self::BeforeDelete,
        Self::BeforeSearch,
        Self::AfterCreate,
        Self::AfterRead,
        Self::AfterUpdate,
        Self::AfterDelete,
        Self::AfterSearch,
        Self::Consent,
        Self::Operation,
        Self::OAuthSetInstance,
        Self::OAuthGetIntrospection,
        Self::OAuthGetUserInfo,
        Self::OAuthVerifyResourceId,
        Self::OAuthVerifyResourceContent,
        Self::OAuthVerifyHistory,
        Self::OAuthVerifyDelete,
        Self::OAuthVerifySearch,
        Self::OAuthVerifySystemLevel,
        Self::ValidateResource,
        Self::ValidateBundle,
    ];

    /// Returns the string name of this extension point.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CapabilityStatement => "capability_statement",
            Self::BeforeRequest => "before_request",
            Self::AfterRequest => "after_request",
            Self::BeforeCreate => "before_create",
            Self::BeforeRead => "before_read",
            Self::BeforeUpdate => "before_update",
            Self::BeforeDelete => "before_delete",
            Self::BeforeSearch => "before_search",
            Self::AfterCreate => "after_create",
            Self::AfterRead => "after_read",
            Self::AfterUpdate => "after_update",
            Self::AfterDelete => "after_delete",
            Self::AfterSearch => "after_search",
            Self::Consent => "consent",
            Self::Operation => "operation",
            Self::OAuthSetInstance => "oauth_set_instance",
            Self::OAuthGetIntrospection => "oauth_get_introspection",
            Self::OAuthGetUserInfo => "oauth_get_user_info",
            Self::OAuthVerifyResourceId => "oauth_verify_resource_id",
            Self::OAuthVerifyResourceContent => "oauth_verify_resource_content",
            Self::OAuthVerifyHistory => "oauth_verify_history",
            Self::OAuthVerifyDelete => "oauth_verify_delete",
            Self::OAuthVerifySearch => "oauth_verify_search",
            Self::OAuthVerifySystemLevel => "oauth_verify_system_level",
            Self::ValidateResource => "validate_resource",
            Self::ValidateBundle => "validate_bundle",
        }
    }

    /// Returns how handlers of this point are stored and ordered.
    pub fn cardinality(&self) -> Cardinality {
        match self {
            Self::BeforeCreate
            | Self::BeforeRead
            | Self::BeforeUpdate
            | Self::BeforeDelete
            | Self::BeforeSearch
            | Self::AfterCreate
            | Self::AfterRead
            | Self::AfterUpdate
            | Self::AfterDelete
            | Self::AfterSearch => Cardinality::Scoped(PrecedenceFamily::Lifecycle),
            Self::Consent
            | Self::OAuthVerifyResourceId
            | Self::OAuthVerifyResourceContent
            | Self::OAuthVerifyHistory
            | Self::OAuthVerifyDelete
            | Self::OAuthVerifySearch
            | Self::ValidateResource => Cardinality::Scoped(PrecedenceFamily::Policy),
            Self::Operation => Cardinality::Indexed,
            Self::CapabilityStatement
            | Self::BeforeRequest
            | Self::AfterRequest
            | Self::OAuthSetInstance
            | Self::OAuthGetIntrospection
            | Self::OAuthGetUserInfo
            | Self::OAuthVerifySystemLevel
            | Self::ValidateBundle => Cardinality::Unscoped,
        }
    }

    /// The precedence family of a resource-scoped point.
    pub fn family(&self) -> Option<PrecedenceFamily> {
        match self.cardinality() {
            Cardinality::Scoped(family) => Some(family),
            Cardinality::Unscoped | Cardinality::Indexed => None,
        }
    }

    /// Whether handlers of this point are partitioned by resource type.
    pub fn is_scoped(&self) -> bool {
        self.family().is_some()
    }
}

impl fmt::Display for ExtensionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an unknown name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The name is not an extension point.
    #[error("unknown extension point '{0}'")]
    UnknownExtensionPoint(String),
    /// The name is not an operation scope.
    #[error("unknown operation scope '{0}' (expected System, Type, or Instance)")]
    UnknownOperationScope(String),
}

impl FromStr for ExtensionPoint {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|point| point.as_str() == s)
            .ok_or_else(|| ParseError::UnknownExtensionPoint(s.to_string()))
    }
}

/// CRUD-style interactions with before/after extension points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interaction {
    /// POST.
    Create,
    /// GET by id.
    Read,
    /// PUT.
    Update,
    /// DELETE.
    Delete,
    /// GET by query.
    Search,
}

impl Interaction {
    /// The extension point run before this interaction.
    pub fn before_point(&self) -> ExtensionPoint {
        match self {
            Self::Create => ExtensionPoint::BeforeCreate,
            Self::Read => ExtensionPoint::BeforeRead,
            Self::Update => ExtensionPoint::BeforeUpdate,
            Self::Delete => ExtensionPoint::BeforeDelete,
            Self::Search => ExtensionPoint::BeforeSearch,
        }
    }

    /// The extension point run after this interaction.
    pub fn after_point(&self) -> ExtensionPoint {
        match self {
            Self::Create => ExtensionPoint::AfterCreate,
            Self::Read => ExtensionPoint::AfterRead,
            Self::Update => ExtensionPoint::AfterUpdate,
            Self::Delete => ExtensionPoint::AfterDelete,
            Self::Search => ExtensionPoint::AfterSearch,
        }
    }
}
