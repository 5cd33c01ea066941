//! Run configuration
//!
//! Configuration is resolved once before assessment begins: a YAML file
//! provides the endpoints and defaults, CLI flags override the toggles.
//! Anything wrong here is fatal and aborts before any record is
//! processed; nothing after this point is allowed to abort the run.

pub mod loader;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::{EndpointConfig, RunConfig, ValidationTuning};

use thiserror::Error;

/// Fatal pre-run configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Missing required setting: {0}")]
    Missing(&'static str),
    #[error("Environment variable {0} is not set")]
    MissingToken(String),
}
