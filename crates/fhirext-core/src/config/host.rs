//! Host engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Values the host passes to handlers along with each request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// FHIR endpoint path served by the host.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// FHIR version handed to bundle validators.
    #[serde(default = "default_fhir_version")]
    pub fhir_version: String,
    /// Timeout passed to pre-request and pre-interaction handlers, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl HostConfig {
    /// The request timeout as a [`Duration`]; zero means none.
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_seconds > 0).then(|| Duration::from_secs(self.request_timeout_seconds))
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            fhir_version: default_fhir_version(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

fn default_endpoint() -> String {
    "/fhir/r4".to_string()
}

fn default_fhir_version() -> String {
    "R4".to_string()
}

fn default_request_timeout() -> u64 {
    30
}
