//! Configuration loading and override logic
//!
//! Loads the YAML run configuration and applies CLI overrides on top.
//! Tokens never live in the file; only the names of the environment
//! variables that hold them do.

use super::schema::RunConfig;
use super::ConfigError;
use crate::models::ResourceType;
use crate::rules::{Flavor, Tier};
use std::path::{Path, PathBuf};

/// CLI-provided overrides applied after the file is parsed
#[derive(Debug, Default)]
pub struct Overrides {
    pub flavor: Option<Flavor>,
    pub tier: Option<Tier>,
    pub resources: Option<Vec<ResourceType>>,
    pub skip_target_validation: bool,
    pub no_target_compare: bool,
    pub output_dir: Option<PathBuf>,
}

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load the run configuration from a file and apply overrides
    pub fn load(path: &Path, overrides: Overrides) -> Result<RunConfig, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut config: RunConfig = serde_yaml::from_str(&data)?;

        if let Some(flavor) = overrides.flavor {
            config.flavor = flavor;
        }
        if let Some(tier) = overrides.tier {
            config.tier = tier;
        }
        if let Some(resources) = overrides.resources {
            config.resources = resources;
        }
        if overrides.skip_target_validation {
            config.validate_target = false;
        }
        if overrides.no_target_compare {
            config.compare_target = false;
        }
        if let Some(output_dir) = overrides.output_dir {
            config.output_dir = output_dir;
        }

        Self::check(&config)?;
        Ok(config)
    }

    /// Reject configurations that cannot produce a meaningful run
    fn check(config: &RunConfig) -> Result<(), ConfigError> {
        if config.source.base_url.is_empty() {
            return Err(ConfigError::Missing("source.baseUrl"));
        }
        if config.source.org.is_empty() {
            return Err(ConfigError::Missing("source.org"));
        }
        if (config.validate_target || config.compare_target) && config.target.is_none() {
            return Err(ConfigError::Missing(
                "target endpoint (or pass --skip-target-validation and --no-target-compare)",
            ));
        }
        Ok(())
    }

    /// Resolve a bearer token from the configured environment variable
    pub fn resolve_token(token_env: &str) -> Result<String, ConfigError> {
        std::env::var(token_env).map_err(|_| ConfigError::MissingToken(token_env.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_missing_target_is_fatal_when_validation_enabled() {
        let file = write_config(
            r#"
flavor: x
tier: base
source:
  baseUrl: https://api.source.example.com
  org: acme
"#,
        );
        let err = ConfigLoader::load(file.path(), Overrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
    }

    #[test]
    fn test_unknown_flavor_is_a_parse_error() {
        let file = write_config(
            r#"
flavor: edge
tier: base
source:
  baseUrl: https://api.source.example.com
  org: acme
"#,
        );
        let err = ConfigLoader::load(file.path(), Overrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_skip_flags_allow_source_only_run() {
        let file = write_config(
            r#"
flavor: x
tier: base
source:
  baseUrl: https://api.source.example.com
  org: acme
"#,
        );
        let config = ConfigLoader::load(
            file.path(),
            Overrides {
                skip_target_validation: true,
                no_target_compare: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert!(!config.validate_target);
        assert!(!config.compare_target);
    }

    #[test]
    fn test_cli_overrides_take_precedence() {
        let file = write_config(
            r#"
flavor: x
tier: base
source:
  baseUrl: https://api.source.example.com
  org: acme
target:
  baseUrl: https://api.target.example.com
  org: acme-project
  tokenEnv: TARGET_AUTH_TOKEN
"#,
        );
        let config = ConfigLoader::load(
            file.path(),
            Overrides {
                flavor: Some(Flavor::Hybrid),
                tier: Some(Tier::Comprehensive),
                resources: Some(vec![ResourceType::ApiProxy]),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(config.flavor, Flavor::Hybrid);
        assert_eq!(config.tier, Tier::Comprehensive);
        assert_eq!(config.resources, vec![ResourceType::ApiProxy]);
    }
}
