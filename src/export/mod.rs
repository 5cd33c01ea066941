//! External collaborator interfaces
//!
//! The qualification engine never talks to a management API directly; it
//! consumes these seams. `Exporter` retrieves raw configuration objects
//! for one resource type and scope, `TargetClient` issues the dry-run
//! import calls. The bundled HTTP implementations live in
//! [`http`](crate::export::http).

pub mod http;

pub use http::ManagementClient;

use crate::models::{ResourceRecord, ResourceType, Scope};
use async_trait::async_trait;
use thiserror::Error;

/// Transport-level failure talking to a management API
///
/// Transient variants are safe to retry with backoff; everything else is
/// captured once and surfaced as a warning, never aborting the run.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request timed out")]
    Timeout,
    #[error("Rate limited by the management API")]
    RateLimited,
    #[error("Authentication rejected: {0}")]
    Auth(String),
    #[error("Management API returned status {code}: {detail}")]
    Status { code: u16, detail: String },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Shutdown requested before the call was issued")]
    Cancelled,
}

impl TransportError {
    /// Whether a bounded retry is worthwhile
    pub fn is_transient(&self) -> bool {
        match self {
            TransportError::Timeout | TransportError::RateLimited | TransportError::Network(_) => {
                true
            }
            TransportError::Status { code, .. } => *code >= 500,
            TransportError::Auth(_) | TransportError::Cancelled => false,
        }
    }
}

/// Outcome of a dry-run import call against the target
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    /// The target would accept the object
    Accepted,
    /// The target rejected the object; detail carries the violation text
    Rejected(String),
}

/// Retrieves raw configuration objects from a management API
#[async_trait]
pub trait Exporter: Send + Sync {
    /// Export all records of one type within one scope
    async fn export(
        &self,
        resource_type: ResourceType,
        scope: &Scope,
    ) -> Result<Vec<ResourceRecord>, TransportError>;
}

/// Issues non-committing validation calls against the target platform
#[async_trait]
pub trait TargetClient: Send + Sync {
    /// Dry-run import a proxy or shared-flow record
    ///
    /// A rejection is a successful call with a negative outcome; only
    /// transport problems surface as errors.
    async fn validate_import(
        &self,
        record: &ResourceRecord,
    ) -> Result<ValidationOutcome, TransportError>;
}
