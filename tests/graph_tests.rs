//! Dependency graph tests
//!
//! Tests for graph construction from export collections: ordering,
//! determinism, reference resolution, and dangling edge detection.

use apiqual::graph::builder;
use apiqual::{RelationKind, ResourceRecord, ResourceType, Scope};
use serde_json::json;

fn record(rt: ResourceType, scope: Scope, name: &str, raw: serde_json::Value) -> ResourceRecord {
    ResourceRecord::new(rt, scope, name, raw)
}

fn sample_export() -> Vec<ResourceRecord> {
    vec![
        record(
            ResourceType::ApiProxy,
            Scope::Organization,
            "orders-v1",
            json!({"targetServers": ["orders-backend"], "policies": ["Quota"]}),
        ),
        record(
            ResourceType::TargetServer,
            Scope::Environment("prod".into()),
            "orders-backend",
            json!({"host": "orders.internal", "port": 443}),
        ),
        record(
            ResourceType::ApiProduct,
            Scope::Organization,
            "orders-product",
            json!({"proxies": ["orders-v1"]}),
        ),
        record(
            ResourceType::App,
            Scope::Organization,
            "mobile-app",
            json!({"credentials": [{"apiProducts": [{"apiproduct": "orders-product"}]}]}),
        ),
    ]
}

#[test]
fn test_build_is_deterministic_regardless_of_input_order() {
    let forward = builder::build(sample_export());
    let mut reversed_input = sample_export();
    reversed_input.reverse();
    let reversed = builder::build(reversed_input);

    let forward_identities: Vec<_> = forward.records().map(|r| r.identity()).collect();
    let reversed_identities: Vec<_> = reversed.records().map(|r| r.identity()).collect();
    assert_eq!(forward_identities, reversed_identities);
    assert_eq!(forward.edges(), reversed.edges());
}

#[test]
fn test_rebuild_over_same_export_is_identical() {
    let first = builder::build(sample_export());
    let second = builder::build(sample_export());
    assert_eq!(first.edges(), second.edges());
    assert_eq!(first.len(), second.len());
}

#[test]
fn test_edges_are_sorted_and_deduplicated() {
    let mut export = sample_export();
    // The same proxy listed twice in a product produces one edge.
    export.push(record(
        ResourceType::ApiProduct,
        Scope::Organization,
        "duplicated-refs",
        json!({"proxies": ["orders-v1", "orders-v1"]}),
    ));
    let graph = builder::build(export);

    let mut sorted = graph.edges().to_vec();
    sorted.sort();
    sorted.dedup();
    assert_eq!(graph.edges(), sorted.as_slice());
}

#[test]
fn test_cross_scope_reference_resolves() {
    let graph = builder::build(sample_export());
    let proxy = record(ResourceType::ApiProxy, Scope::Organization, "orders-v1", json!({}));
    let identity = proxy.identity();
    let edges: Vec<_> = graph.edges_from(&identity).collect();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].relation, RelationKind::RoutesTo);
    // Org-scoped proxy to env-scoped target server: resolution ignores scope.
    assert!(!graph.is_dangling(edges[0]));
}

#[test]
fn test_dangling_reference_is_reported_not_fatal() {
    let export = vec![record(
        ResourceType::ApiProxy,
        Scope::Organization,
        "orders-v1",
        json!({"targetServers": ["missing-backend"]}),
    )];
    let graph = builder::build(export);

    let dangling: Vec<_> = graph.dangling_edges().collect();
    assert_eq!(dangling.len(), 1);
    assert_eq!(dangling[0].to.name, "missing-backend");
    assert_eq!(dangling[0].to.resource_type, ResourceType::TargetServer);
}

#[test]
fn test_duplicate_identity_keeps_first_record() {
    let export = vec![
        record(
            ResourceType::KeyValueMap,
            Scope::Environment("prod".into()),
            "settings",
            json!({"encrypted": true}),
        ),
        record(
            ResourceType::KeyValueMap,
            Scope::Environment("prod".into()),
            "settings",
            json!({"encrypted": false}),
        ),
    ];
    let graph = builder::build(export);
    assert_eq!(graph.len(), 1);
    let kept = graph.records().next().unwrap();
    assert_eq!(kept.raw["encrypted"], json!(true));
}

#[test]
fn test_malformed_reference_fields_yield_no_edges() {
    let export = vec![
        record(
            ResourceType::ApiProxy,
            Scope::Organization,
            "broken-refs",
            json!({"targetServers": "not-an-array"}),
        ),
        record(
            ResourceType::FlowHook,
            Scope::Environment("prod".into()),
            "PreProxyFlowHook",
            json!({"sharedFlow": 42}),
        ),
    ];
    let graph = builder::build(export);
    assert_eq!(graph.len(), 2);
    assert!(graph.edges().is_empty());
}

#[test]
fn test_same_name_in_two_environments_are_distinct_records() {
    let export = vec![
        record(
            ResourceType::TargetServer,
            Scope::Environment("prod".into()),
            "backend",
            json!({"host": "prod.internal"}),
        ),
        record(
            ResourceType::TargetServer,
            Scope::Environment("test".into()),
            "backend",
            json!({"host": "test.internal"}),
        ),
    ];
    let graph = builder::build(export);
    assert_eq!(graph.len(), 2);
}
