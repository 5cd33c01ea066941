//! Snapshot comparator
//!
//! Diffs the source export against a target export for the same resource
//! type and scope, keyed by object name. Comparison is purely structural:
//! the only semantic step is stripping platform-generated metadata
//! (timestamps, revision counters) before equality is checked.

use crate::models::{Assessment, DiffClass, DiffEntry, ResourceRecord};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Attribute names the platform generates on every object; they differ
/// between installations without the object itself differing.
const METADATA_FIELDS: &[&str] = &[
    "createdAt",
    "createdBy",
    "lastModifiedAt",
    "lastModifiedBy",
    "lastModified",
    "revision",
    "organization",
    "self",
];

/// Strip platform-generated metadata, recursively
pub fn normalize(raw: &Value) -> Value {
    match raw {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(key, _)| !METADATA_FIELDS.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), normalize(value)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(normalize).collect()),
        other => other.clone(),
    }
}

/// Classify one source record against the target collection
fn classify(source: &ResourceRecord, target: Option<&ResourceRecord>) -> DiffClass {
    let Some(target) = target else {
        return DiffClass::Added;
    };

    let source_norm = normalize(&source.raw);
    let target_norm = normalize(&target.raw);
    if source_norm == target_norm {
        return DiffClass::Unchanged;
    }

    // Differing top-level attribute paths, keys present on one side only
    // included.
    let empty = serde_json::Map::new();
    let source_map = source_norm.as_object().unwrap_or(&empty);
    let target_map = target_norm.as_object().unwrap_or(&empty);
    let mut changed: BTreeSet<String> = BTreeSet::new();
    for (key, value) in source_map {
        if target_map.get(key) != Some(value) {
            changed.insert(key.clone());
        }
    }
    for key in target_map.keys() {
        if !source_map.contains_key(key) {
            changed.insert(key.clone());
        }
    }
    DiffClass::Modified {
        changed_fields: changed.into_iter().collect(),
    }
}

/// Attach a diff entry to every source assessment, and report the
/// target-only leftovers
///
/// Target records are matched by identity (type + scope + name). Records
/// present only on the target are returned as informational `Removed`
/// entries; they have no source assessment to attach to.
pub fn merge_comparison(
    assessments: &mut [Assessment],
    source_records: &[ResourceRecord],
    target_records: &[ResourceRecord],
) -> Vec<DiffEntry> {
    let source_index: BTreeMap<_, _> = source_records
        .iter()
        .map(|r| (r.identity(), r))
        .collect();
    let target_index: BTreeMap<_, _> = target_records
        .iter()
        .map(|r| (r.identity(), r))
        .collect();

    for assessment in assessments.iter_mut() {
        let Some(source) = source_index.get(&assessment.identity) else {
            continue;
        };
        let target = target_index.get(&assessment.identity).copied();
        assessment.diff = Some(DiffEntry {
            identity: assessment.identity.clone(),
            class: classify(source, target),
        });
    }

    target_index
        .into_iter()
        .filter(|(identity, _)| !source_index.contains_key(identity))
        .map(|(identity, _)| DiffEntry {
            identity,
            class: DiffClass::Removed,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ResourceType, Scope};
    use serde_json::json;

    fn record(name: &str, raw: Value) -> ResourceRecord {
        ResourceRecord::new(
            ResourceType::KeyValueMap,
            Scope::Environment("prod".into()),
            name,
            raw,
        )
    }

    #[test]
    fn test_normalize_strips_metadata_recursively() {
        let raw = json!({
            "name": "settings",
            "createdAt": 1700000000,
            "entry": [{"name": "k", "value": "v", "lastModifiedAt": 1700000001}]
        });
        assert_eq!(
            normalize(&raw),
            json!({
                "name": "settings",
                "entry": [{"name": "k", "value": "v"}]
            })
        );
    }

    #[test]
    fn test_metadata_only_difference_is_unchanged() {
        let source = record("settings", json!({"name": "settings", "createdAt": 1}));
        let target = record("settings", json!({"name": "settings", "createdAt": 2}));
        assert_eq!(classify(&source, Some(&target)), DiffClass::Unchanged);
    }

    #[test]
    fn test_modified_reports_changed_fields_from_both_sides() {
        let source = record(
            "settings",
            json!({"name": "settings", "encrypted": false, "onlySource": 1}),
        );
        let target = record(
            "settings",
            json!({"name": "settings", "encrypted": true, "onlyTarget": 2}),
        );
        assert_eq!(
            classify(&source, Some(&target)),
            DiffClass::Modified {
                changed_fields: vec![
                    "encrypted".to_string(),
                    "onlySource".to_string(),
                    "onlyTarget".to_string()
                ]
            }
        );
    }

    #[test]
    fn test_absent_target_is_added() {
        let source = record("settings", json!({"name": "settings"}));
        assert_eq!(classify(&source, None), DiffClass::Added);
    }
}
