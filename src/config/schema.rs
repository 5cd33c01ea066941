//! Configuration schema definitions
//!
//! Defines the structure of the run configuration file using serde.

use crate::models::ResourceType;
use crate::rules::{Flavor, Tier};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root run configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunConfig {
    /// Target platform generation
    pub flavor: Flavor,

    /// Target environment capability tier
    pub tier: Tier,

    /// Environments whose scoped resources are assessed
    #[serde(default)]
    pub environments: Vec<String>,

    /// Resource type selection filter; empty means all types
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<ResourceType>,

    /// Issue dry-run validation calls against the target
    #[serde(default = "default_true")]
    pub validate_target: bool,

    /// Diff the source export against a target export
    #[serde(default = "default_true")]
    pub compare_target: bool,

    /// Source management API
    pub source: EndpointConfig,

    /// Target management API; required only when validation or
    /// comparison is enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<EndpointConfig>,

    /// Directory the assessment and graph documents are written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Validation call pacing
    #[serde(default)]
    pub validation: ValidationTuning,
}

/// One management API endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EndpointConfig {
    /// Base URL of the management API
    pub base_url: String,

    /// Organization (or project) identifier
    pub org: String,

    /// Environment variable holding the bearer token
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Pacing and retry limits for live validation calls
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationTuning {
    /// Maximum records validated concurrently
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Attempts per record, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff before the second attempt, in milliseconds
    #[serde(default = "default_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Multiplier applied to the backoff after each attempt
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: u32,

    /// Timeout per validation call, in seconds
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
}

impl Default for ValidationTuning {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_backoff_ms(),
            backoff_factor: default_backoff_factor(),
            call_timeout_secs: default_call_timeout_secs(),
        }
    }
}

impl RunConfig {
    /// The resource types this run assesses, honoring the filter
    pub fn selected_resources(&self) -> Vec<ResourceType> {
        if self.resources.is_empty() {
            ResourceType::all().to_vec()
        } else {
            self.resources.clone()
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("assessment")
}

fn default_token_env() -> String {
    "SOURCE_AUTH_TOKEN".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_concurrency() -> usize {
    4
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    1000
}

fn default_backoff_factor() -> u32 {
    2
}

fn default_call_timeout_secs() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_parses_with_defaults() {
        let yaml = r#"
flavor: x
tier: base
environments: [prod, test]
source:
  baseUrl: https://api.source.example.com
  org: acme
"#;
        let config: RunConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.flavor, Flavor::X);
        assert_eq!(config.tier, Tier::Base);
        assert!(config.validate_target);
        assert!(config.compare_target);
        assert_eq!(config.source.token_env, "SOURCE_AUTH_TOKEN");
        assert_eq!(config.validation.concurrency, 4);
        assert_eq!(config.output_dir, PathBuf::from("assessment"));
        assert_eq!(config.selected_resources().len(), ResourceType::all().len());
    }

    #[test]
    fn test_resource_filter_round_trip() {
        let yaml = r#"
flavor: hybrid
tier: comprehensive
source:
  baseUrl: https://api.source.example.com
  org: acme
resources: [api-proxy, target-server]
"#;
        let config: RunConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            config.selected_resources(),
            vec![ResourceType::ApiProxy, ResourceType::TargetServer]
        );
    }
}
