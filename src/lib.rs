//! Migration qualification engine for API gateway configuration exports
//!
//! Exports configuration objects from a source organization, builds the
//! dependency graph between them, evaluates a static compatibility rule
//! matrix for a chosen target flavor and tier, optionally dry-runs
//! deployable bundles against the live target, and reports one assessment
//! per object. This library backs the `apiqual` binary and is usable
//! directly for embedding or testing.

pub mod assess;
pub mod cli;
pub mod compare;
pub mod config;
pub mod export;
pub mod graph;
pub mod models;
pub mod output;
pub mod rules;
pub mod validate;

// Re-export the types most callers need
pub use assess::{AssessmentPipeline, AssessmentReport};
pub use graph::{DependencyEdge, DependencyGraph, ReferenceKey, RelationKind};
pub use models::{
    Assessment, DiffClass, DiffEntry, Reason, ReasonOrigin, ResourceIdentity, ResourceRecord,
    ResourceType, Scope, Verdict,
};
pub use rules::{Flavor, RuleTable, Tier};
