//! Sample customization configuration.

use serde::{Deserialize, Serialize};

/// Settings read by the bundled sample customization module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleConfig {
    /// Resource types removed from the capability statement.
    #[serde(default = "default_hidden_resources")]
    pub hidden_resources: Vec<String>,
    /// Patient ids no token may read by id.
    #[serde(default = "default_restricted_ids")]
    pub restricted_resource_ids: Vec<String>,
    /// Maximum number of entries in a transaction Bundle.
    #[serde(default = "default_max_transaction_entries")]
    pub max_transaction_entries: usize,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            hidden_resources: default_hidden_resources(),
            restricted_resource_ids: default_restricted_ids(),
            max_transaction_entries: default_max_transaction_entries(),
        }
    }
}

fn default_hidden_resources() -> Vec<String> {
    vec!["Account".to_string()]
}

fn default_restricted_ids() -> Vec<String> {
    vec!["restricted-patient-123".to_string()]
}

fn default_max_transaction_entries() -> usize {
    100
}
