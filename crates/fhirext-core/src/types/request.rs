//! Host request/response shapes handed to extension handlers.
//!
//! These are deliberately thin: the host engine owns the real transport
//! objects and copies the fields handlers are documented to read.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An inbound FHIR interaction as seen by handlers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FhirRequest {
    /// HTTP method (`GET`, `POST`, ...).
    pub method: String,
    /// Resource type addressed by the request, if any.
    pub resource_type: Option<String>,
    /// Resource id addressed by the request, if any.
    pub id: Option<String>,
    /// Effective username.
    pub username: String,
    /// Comma-separated roles of the effective user.
    pub roles: String,
    /// Request body, if any.
    pub json: Option<Value>,
    /// Additional host-provided values (e.g. `USER:OAuthToken`).
    #[serde(default)]
    pub additional_info: HashMap<String, String>,
}

impl FhirRequest {
    /// Creates a request for a method and resource type.
    pub fn new(method: &str, resource_type: &str) -> Self {
        Self {
            method: method.to_string(),
            resource_type: Some(resource_type.to_string()),
            ..Self::default()
        }
    }

    /// Sets the resource id.
    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    /// Sets the effective user and roles.
    pub fn with_user(mut self, username: &str, roles: &str) -> Self {
        self.username = username.to_string();
        self.roles = roles.to_string();
        self
    }

    /// Sets the body.
    pub fn with_json(mut self, json: Value) -> Self {
        self.json = Some(json);
        self
    }

    /// Inserts an additional info entry.
    pub fn with_info(mut self, key: &str, value: &str) -> Self {
        self.additional_info
            .insert(key.to_string(), value.to_string());
        self
    }

    /// Resource type or `"*"` when the request is not type-scoped.
    pub fn resource_type_or_wildcard(&self) -> &str {
        self.resource_type.as_deref().unwrap_or("*")
    }
}

/// The host's response object, threaded through post-request and operation handlers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FhirResponse {
    /// HTTP status.
    pub status: u16,
    /// Response body.
    pub json: Option<Value>,
    /// Response headers.
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl FhirResponse {
    /// An empty `200 OK` response.
    pub fn ok() -> Self {
        Self {
            status: 200,
            json: None,
            headers: HashMap::new(),
        }
    }

    /// Sets the body.
    pub fn with_json(mut self, json: Value) -> Self {
        self.json = Some(json);
        self
    }
}

impl Default for FhirResponse {
    fn default() -> Self {
        Self::ok()
    }
}

/// Token details supplied to `oauth_set_instance` handlers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OAuthToken {
    /// Raw access token string.
    pub token_string: String,
    /// OAuth 2.0 client name.
    pub oauth_client: String,
    /// Base URL of the FHIR endpoint for the interaction.
    pub base_url: String,
    /// Effective username.
    pub username: String,
}

/// Search parameters as ordered name/value pairs.
pub type SearchParameters = Vec<(String, String)>;

/// A search request as seen by `oauth_verify_search` handlers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Resource type searched.
    pub resource_type: String,
    /// Compartment resource type, for compartment searches.
    pub compartment_type: Option<String>,
    /// Compartment resource id, for compartment searches.
    pub compartment_id: Option<String>,
    /// Query parameters.
    #[serde(default)]
    pub parameters: SearchParameters,
}

impl SearchRequest {
    /// Creates a plain type-level search.
    pub fn new(resource_type: &str) -> Self {
        Self {
            resource_type: resource_type.to_string(),
            ..Self::default()
        }
    }

    /// Restricts the search to a compartment.
    pub fn in_compartment(mut self, compartment_type: &str, compartment_id: &str) -> Self {
        self.compartment_type = Some(compartment_type.to_string());
        self.compartment_id = Some(compartment_id.to_string());
        self
    }
}
