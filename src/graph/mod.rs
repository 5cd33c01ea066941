//! Dependency graph of exported configuration objects
//!
//! The graph is built once per run from the export collection and is
//! read-only afterwards, so it can be shared freely across workers. Edges
//! are weak references: an edge records a relation plus a lookup key and
//! never owns its target, because the target may legitimately be absent
//! from the export (a dangling reference is a reportable state, not an
//! error).

pub mod builder;

use crate::models::{ResourceIdentity, ResourceRecord, ResourceType, Scope};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of relation an edge expresses
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum RelationKind {
    /// api-proxy routes traffic to a target server
    RoutesTo,
    /// api-product bundles an api-proxy
    Bundles,
    /// app subscribes to an api-product through its credentials
    SubscribesTo,
    /// shared-flow or api-proxy includes a resource file
    Includes,
    /// flowhook invokes a shared flow
    Invokes,
    /// reference refers to a keystore
    RefersTo,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::RoutesTo => "routes-to",
            RelationKind::Bundles => "bundles",
            RelationKind::SubscribesTo => "subscribes-to",
            RelationKind::Includes => "includes",
            RelationKind::Invokes => "invokes",
            RelationKind::RefersTo => "refers-to",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lookup key for the target of an edge
///
/// `scope` is `None` when the referencing object cannot know which
/// environment the target lives in (e.g. an org-scoped proxy naming an
/// env-scoped target server); resolution then matches any scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceKey {
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
    pub name: String,
}

impl fmt::Display for ReferenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            Some(scope) => write!(f, "{} | {} | {}", self.resource_type, scope, self.name),
            None => write!(f, "{} | {}", self.resource_type, self.name),
        }
    }
}

/// Directed relation between an exported object and something it names
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyEdge {
    pub from: ResourceIdentity,
    pub relation: RelationKind,
    pub to: ReferenceKey,
}

/// Set of resource records plus the reference edges between them
///
/// Invariant: every edge's `from` identity exists in the record set;
/// `to` need not resolve. Records are keyed in a BTreeMap and edges kept
/// in a sorted Vec so iteration order is a stable total order.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    records: BTreeMap<ResourceIdentity, ResourceRecord>,
    edges: Vec<DependencyEdge>,
}

impl DependencyGraph {
    pub(crate) fn new(
        records: BTreeMap<ResourceIdentity, ResourceRecord>,
        edges: Vec<DependencyEdge>,
    ) -> Self {
        Self { records, edges }
    }

    /// Number of records in the graph
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate records in identity order
    pub fn records(&self) -> impl Iterator<Item = &ResourceRecord> {
        self.records.values()
    }

    /// Look up a record by exact identity
    pub fn get(&self, identity: &ResourceIdentity) -> Option<&ResourceRecord> {
        self.records.get(identity)
    }

    /// All edges in their stable total order
    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    /// Edges originating from the given record
    pub fn edges_from<'a>(
        &'a self,
        from: &'a ResourceIdentity,
    ) -> impl Iterator<Item = &'a DependencyEdge> {
        self.edges.iter().filter(move |e| &e.from == from)
    }

    /// Resolve a reference key against the record set
    ///
    /// A key with an explicit scope must match exactly; a scope-less key
    /// matches a record of that type and name in any scope.
    pub fn resolve(&self, key: &ReferenceKey) -> Option<&ResourceRecord> {
        match &key.scope {
            Some(scope) => self.records.get(&ResourceIdentity {
                resource_type: key.resource_type,
                scope: scope.clone(),
                name: key.name.clone(),
            }),
            None => self
                .records
                .values()
                .find(|r| r.resource_type == key.resource_type && r.name == key.name),
        }
    }

    /// Whether an edge's target is absent from the export
    pub fn is_dangling(&self, edge: &DependencyEdge) -> bool {
        self.resolve(&edge.to).is_none()
    }

    /// All edges whose target does not resolve, in edge order
    pub fn dangling_edges(&self) -> impl Iterator<Item = &DependencyEdge> {
        self.edges.iter().filter(|e| self.is_dangling(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(rt: ResourceType, scope: Scope, name: &str) -> ResourceRecord {
        ResourceRecord::new(rt, scope, name, json!({}))
    }

    #[test]
    fn test_resolve_exact_scope() {
        let ts = record(
            ResourceType::TargetServer,
            Scope::Environment("prod".into()),
            "backend",
        );
        let graph = builder::build(vec![ts.clone()]);

        let key = ReferenceKey {
            resource_type: ResourceType::TargetServer,
            scope: Some(Scope::Environment("prod".into())),
            name: "backend".into(),
        };
        assert!(graph.resolve(&key).is_some());

        let wrong_env = ReferenceKey {
            scope: Some(Scope::Environment("test".into())),
            ..key
        };
        assert!(graph.resolve(&wrong_env).is_none());
    }

    #[test]
    fn test_resolve_any_scope() {
        let ts = record(
            ResourceType::TargetServer,
            Scope::Environment("prod".into()),
            "backend",
        );
        let graph = builder::build(vec![ts]);

        let key = ReferenceKey {
            resource_type: ResourceType::TargetServer,
            scope: None,
            name: "backend".into(),
        };
        assert!(graph.resolve(&key).is_some());
    }

    #[test]
    fn test_reference_key_display() {
        let key = ReferenceKey {
            resource_type: ResourceType::Keystore,
            scope: None,
            name: "prod-keystore".into(),
        };
        assert_eq!(key.to_string(), "keystore | prod-keystore");
    }
}
