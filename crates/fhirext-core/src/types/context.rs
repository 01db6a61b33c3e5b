//! Per-request context threaded explicitly through every handler call.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::request::{FhirRequest, OAuthToken};

/// Request-scoped state shared by the handlers of one inbound request.
///
/// The host creates one context per request and passes it to each handler
/// it invokes; nothing is stored in globals or thread-locals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// Unique id of the request, for log correlation.
    pub request_id: Uuid,
    /// When the host started processing the request.
    pub started_at: DateTime<Utc>,
    /// Requesting user.
    pub username: String,
    /// Requesting user's roles, as supplied by the host.
    pub roles: String,
    /// OAuth scopes granted to the token.
    pub scopes: Vec<String>,
    /// Security label codes the user may not see.
    pub security_labels: Vec<String>,
    /// OAuth token details, once `oauth_set_instance` ran.
    pub token: Option<OAuthToken>,
    /// Arbitrary handler-owned values.
    pub attributes: HashMap<String, serde_json::Value>,
}

impl RequestContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            started_at: Utc::now(),
            username: String::new(),
            roles: String::new(),
            scopes: Vec::new(),
            security_labels: Vec::new(),
            token: None,
            attributes: HashMap::new(),
        }
    }

    /// Creates a context seeded with the request's user and roles.
    pub fn for_request(request: &FhirRequest) -> Self {
        Self {
            username: request.username.clone(),
            roles: request.roles.clone(),
            ..Self::new()
        }
    }

    /// Sets the user and roles.
    pub fn with_user(mut self, username: &str, roles: &str) -> Self {
        self.username = username.to_string();
        self.roles = roles.to_string();
        self
    }

    /// Sets the denied security labels.
    pub fn with_security_labels(mut self, labels: &[&str]) -> Self {
        self.security_labels = labels.iter().map(|l| l.to_string()).collect();
        self
    }

    /// Case-insensitive role membership test against the comma-separated role list.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles
            .split(',')
            .map(str::trim)
            .any(|r| r.eq_ignore_ascii_case(role))
    }

    /// Whether the given security label code is denied to this user.
    pub fn denies_label(&self, code: &str) -> bool {
        self.security_labels.iter().any(|l| l == code)
    }

    /// Stores an attribute.
    pub fn set_attribute(&mut self, key: &str, value: serde_json::Value) {
        self.attributes.insert(key.to_string(), value);
    }

    /// Reads an attribute.
    pub fn attribute(&self, key: &str) -> Option<&serde_json::Value> {
        self.attributes.get(key)
    }

    /// Clears user-derived state at the end of a request.
    pub fn clear(&mut self) {
        self.username.clear();
        self.roles.clear();
        self.scopes.clear();
        self.security_labels.clear();
        self.token = None;
        self.attributes.clear();
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
