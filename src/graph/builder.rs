//! Graph builder for discovering references between exported objects
//!
//! Each resource type has a statically known set of fields inside `raw`
//! that name other objects. Extraction never fails the run: a malformed
//! or missing reference field yields zero edges for that record. The
//! resulting edge set is sorted into a stable total order so that two
//! builds over the same export are identical.

use super::{DependencyEdge, DependencyGraph, ReferenceKey, RelationKind};
use crate::models::{ResourceRecord, ResourceType, Scope};
use serde_json::Value;
use std::collections::BTreeMap;

/// Build a dependency graph from an export collection
///
/// Duplicate identities keep the first record seen; the duplicate is
/// logged and dropped so the one-assessment-per-record property holds.
pub fn build(records: Vec<ResourceRecord>) -> DependencyGraph {
    let mut by_identity = BTreeMap::new();
    for record in records {
        let identity = record.identity();
        if by_identity.contains_key(&identity) {
            tracing::warn!("Duplicate record in export, keeping first: {}", identity);
            continue;
        }
        by_identity.insert(identity, record);
    }

    let mut edges: Vec<DependencyEdge> = by_identity.values().flat_map(extract_edges).collect();
    edges.sort();
    edges.dedup();

    tracing::debug!(
        "Built dependency graph: {} records, {} edges",
        by_identity.len(),
        edges.len()
    );
    DependencyGraph::new(by_identity, edges)
}

/// Extract the reference edges one record contributes
fn extract_edges(record: &ResourceRecord) -> Vec<DependencyEdge> {
    let from = record.identity();
    let raw = &record.raw;
    let mut edges = Vec::new();

    match record.resource_type {
        ResourceType::ApiProxy => {
            // Target endpoint host aliases name env-scoped target servers;
            // the proxy itself is org-scoped, so the key carries no scope.
            for name in string_array(raw, "targetServers") {
                edges.push(edge(
                    &from,
                    RelationKind::RoutesTo,
                    ResourceType::TargetServer,
                    None,
                    name,
                ));
            }
        }
        ResourceType::ApiProduct => {
            for name in string_array(raw, "proxies") {
                edges.push(edge(
                    &from,
                    RelationKind::Bundles,
                    ResourceType::ApiProxy,
                    Some(Scope::Organization),
                    name,
                ));
            }
        }
        ResourceType::App => {
            // credentials[].apiProducts[] entries are either bare strings
            // or objects with an "apiproduct" field.
            for cred in raw
                .get("credentials")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
            {
                for product in cred
                    .get("apiProducts")
                    .and_then(Value::as_array)
                    .into_iter()
                    .flatten()
                {
                    let name = product
                        .as_str()
                        .or_else(|| product.get("apiproduct").and_then(Value::as_str));
                    if let Some(name) = name {
                        edges.push(edge(
                            &from,
                            RelationKind::SubscribesTo,
                            ResourceType::ApiProduct,
                            Some(Scope::Organization),
                            name.to_string(),
                        ));
                    }
                }
            }
        }
        ResourceType::SharedFlow => {
            for name in string_array(raw, "resourceFiles") {
                edges.push(edge(
                    &from,
                    RelationKind::Includes,
                    ResourceType::ResourceFile,
                    None,
                    name,
                ));
            }
        }
        ResourceType::FlowHook => {
            if let Some(name) = raw.get("sharedFlow").and_then(Value::as_str) {
                edges.push(edge(
                    &from,
                    RelationKind::Invokes,
                    ResourceType::SharedFlow,
                    Some(Scope::Organization),
                    name.to_string(),
                ));
            }
        }
        ResourceType::Reference => {
            // A reference points at a keystore in its own environment.
            if let Some(name) = raw.get("refers").and_then(Value::as_str) {
                edges.push(edge(
                    &from,
                    RelationKind::RefersTo,
                    ResourceType::Keystore,
                    Some(record.scope.clone()),
                    name.to_string(),
                ));
            }
        }
        // Leaf types: nothing in their raw content names another object.
        ResourceType::TargetServer
        | ResourceType::KeyValueMap
        | ResourceType::ResourceFile
        | ResourceType::Keystore
        | ResourceType::OrgKeyValueMap
        | ResourceType::Developer => {}
    }

    edges
}

fn edge(
    from: &crate::models::ResourceIdentity,
    relation: RelationKind,
    resource_type: ResourceType,
    scope: Option<Scope>,
    name: String,
) -> DependencyEdge {
    DependencyEdge {
        from: from.clone(),
        relation,
        to: ReferenceKey {
            resource_type,
            scope,
            name,
        },
    }
}

/// Collect the string elements of an array field, supporting both bare
/// strings and objects with a "name" field. Anything else contributes
/// nothing.
fn string_array(raw: &Value, field: &str) -> Vec<String> {
    raw.get(field)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|v| {
            v.as_str()
                .or_else(|| v.get("name").and_then(Value::as_str))
                .map(str::to_string)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_array_mixed_shapes() {
        let raw = json!({
            "proxies": ["orders-v1", {"name": "billing-v2"}, 42, null]
        });
        assert_eq!(string_array(&raw, "proxies"), vec!["orders-v1", "billing-v2"]);
    }

    #[test]
    fn test_string_array_missing_or_malformed() {
        assert!(string_array(&json!({}), "proxies").is_empty());
        assert!(string_array(&json!({"proxies": "not-an-array"}), "proxies").is_empty());
        assert!(string_array(&json!({"proxies": null}), "proxies").is_empty());
    }

    #[test]
    fn test_leaf_types_contribute_no_edges() {
        let record = ResourceRecord::new(
            ResourceType::Developer,
            Scope::Organization,
            "jane@example.com",
            json!({"apps": ["should-not-become-an-edge"]}),
        );
        assert!(extract_edges(&record).is_empty());
    }

    #[test]
    fn test_flowhook_edge() {
        let record = ResourceRecord::new(
            ResourceType::FlowHook,
            Scope::Environment("prod".into()),
            "PreProxyFlowHook",
            json!({"sharedFlow": "logging-flow"}),
        );
        let edges = extract_edges(&record);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].relation, RelationKind::Invokes);
        assert_eq!(edges[0].to.name, "logging-flow");
        assert_eq!(edges[0].to.scope, Some(Scope::Organization));
    }
}
