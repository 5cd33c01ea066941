//! Capability rule matrix for the target platform
//!
//! Rules are static data keyed by `(resource type, target flavor, target
//! tier)`. They are loaded once per run, indexed in memory, and never
//! re-parsed per record. A built-in rule set ships with the binary; a
//! JSON file can replace it for site-specific matrices.

pub mod engine;

use crate::models::{ResourceType, Verdict};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Platform generation of the migration target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flavor {
    /// Fully managed generation
    X,
    /// Self-hosted runtime on the new control plane
    Hybrid,
}

impl Flavor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Flavor::X => "x",
            Flavor::Hybrid => "hybrid",
        }
    }

    pub fn all() -> &'static [Self] {
        &[Flavor::X, Flavor::Hybrid]
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Flavor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "x" => Ok(Flavor::X),
            "hybrid" => Ok(Flavor::Hybrid),
            _ => Err(format!("Unknown target flavor: {}", s)),
        }
    }
}

/// Provisioned capability level of the target environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Base,
    Intermediate,
    Comprehensive,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Base => "base",
            Tier::Intermediate => "intermediate",
            Tier::Comprehensive => "comprehensive",
        }
    }

    pub fn all() -> &'static [Self] {
        &[Tier::Base, Tier::Intermediate, Tier::Comprehensive]
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "base" => Ok(Tier::Base),
            "intermediate" => Ok(Tier::Intermediate),
            "comprehensive" => Ok(Tier::Comprehensive),
            _ => Err(format!("Unknown target tier: {}", s)),
        }
    }
}

/// How an attribute predicate compares against the record's raw content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchOp {
    /// The path resolves to any value
    Exists,
    /// The path resolves to a scalar equal to `value`
    Equals,
    /// The path resolves to an array containing `value`, or to a string
    /// containing it as a substring
    Contains,
}

/// Attribute predicate of a rule
///
/// `Any` corresponds to the `*` attribute path: the rule applies to the
/// whole resource type regardless of attribute content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeMatcher {
    Any(AnyMarker),
    Predicate {
        /// Dot-separated path into the raw attribute mapping
        path: String,
        #[serde(rename = "match")]
        op: MatchOp,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
}

/// Serde shim so `"*"` deserializes as the whole-type matcher
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AnyMarker {
    #[serde(rename = "*")]
    Star,
}

impl AttributeMatcher {
    pub fn any() -> Self {
        AttributeMatcher::Any(AnyMarker::Star)
    }

    /// Whether this predicate matches the record's raw content
    pub fn matches(&self, raw: &Value) -> bool {
        match self {
            AttributeMatcher::Any(_) => true,
            AttributeMatcher::Predicate { path, op, value } => {
                let resolved = resolve_path(raw, path);
                match op {
                    MatchOp::Exists => resolved.is_some(),
                    MatchOp::Equals => match (resolved, value) {
                        (Some(v), Some(expected)) => scalar_eq(v, expected),
                        _ => false,
                    },
                    MatchOp::Contains => match (resolved, value) {
                        (Some(Value::Array(items)), Some(expected)) => {
                            items.iter().any(|item| scalar_eq(item, expected))
                        }
                        (Some(Value::String(s)), Some(expected)) => s.contains(expected.as_str()),
                        _ => false,
                    },
                }
            }
        }
    }
}

/// Walk a dot-separated path into a JSON value
fn resolve_path<'a>(raw: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = raw;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

/// Compare a JSON scalar against a rule value string
fn scalar_eq(v: &Value, expected: &str) -> bool {
    match v {
        Value::String(s) => s == expected,
        Value::Bool(b) => b.to_string() == expected,
        Value::Number(n) => n.to_string() == expected,
        _ => false,
    }
}

/// One entry of the capability matrix, fully resolved to a concrete
/// (flavor, tier) pair
#[derive(Debug, Clone, PartialEq)]
pub struct RuleEntry {
    pub resource_type: ResourceType,
    pub flavor: Flavor,
    pub tier: Tier,
    pub attribute: AttributeMatcher,
    pub verdict: Verdict,
    pub message: String,
}

/// Rule as written in the JSON file; omitting flavor or tier means the
/// rule applies to all of them
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RuleSpec {
    resource_type: ResourceType,
    #[serde(default)]
    flavor: Option<Flavor>,
    #[serde(default)]
    tier: Option<Tier>,
    #[serde(default)]
    attribute: Option<AttributeMatcher>,
    verdict: Verdict,
    message: String,
}

/// Top-level shape of a rule file
#[derive(Debug, Deserialize)]
struct RuleFile {
    rules: Vec<RuleSpec>,
}

/// Errors raised while loading the rule matrix; all of these are fatal
/// configuration errors discovered before any record is processed
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("Failed to read rule file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse rule data: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("No rules defined for target flavor '{flavor}' tier '{tier}'")]
    NoCoverage { flavor: Flavor, tier: Tier },
}

/// In-memory index over the immutable rule entries
///
/// Keyed by `(resource type, flavor, tier)`; the per-key entry lists
/// preserve the file order so reason lists come out deterministic.
#[derive(Debug, Default)]
pub struct RuleTable {
    index: HashMap<(ResourceType, Flavor, Tier), Vec<RuleEntry>>,
}

impl RuleTable {
    /// Load the rule set embedded in the binary
    pub fn load_default() -> Result<Self, RuleError> {
        Self::from_json_str(include_str!("default_rules.json"))
    }

    /// Load a rule file from disk
    pub fn from_file(path: &Path) -> Result<Self, RuleError> {
        let data = std::fs::read_to_string(path).map_err(|source| RuleError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&data)
    }

    /// Parse rule JSON, expanding flavor/tier wildcards into concrete
    /// entries
    pub fn from_json_str(data: &str) -> Result<Self, RuleError> {
        let file: RuleFile = serde_json::from_str(data)?;
        let mut index: HashMap<(ResourceType, Flavor, Tier), Vec<RuleEntry>> = HashMap::new();

        for spec in file.rules {
            let flavors: Vec<Flavor> = match spec.flavor {
                Some(f) => vec![f],
                None => Flavor::all().to_vec(),
            };
            let tiers: Vec<Tier> = match spec.tier {
                Some(t) => vec![t],
                None => Tier::all().to_vec(),
            };
            let attribute = spec.attribute.clone().unwrap_or_else(AttributeMatcher::any);

            for &flavor in &flavors {
                for &tier in &tiers {
                    index
                        .entry((spec.resource_type, flavor, tier))
                        .or_default()
                        .push(RuleEntry {
                            resource_type: spec.resource_type,
                            flavor,
                            tier,
                            attribute: attribute.clone(),
                            verdict: spec.verdict,
                            message: spec.message.clone(),
                        });
                }
            }
        }

        Ok(Self { index })
    }

    /// Rules applicable to one resource type under the run's target
    pub fn for_record(&self, resource_type: ResourceType, flavor: Flavor, tier: Tier) -> &[RuleEntry] {
        self.index
            .get(&(resource_type, flavor, tier))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Fail fast when the chosen (flavor, tier) pair has no rules at all
    pub fn require_coverage(&self, flavor: Flavor, tier: Tier) -> Result<(), RuleError> {
        let covered = self
            .index
            .keys()
            .any(|(_, f, t)| *f == flavor && *t == tier);
        if covered {
            Ok(())
        } else {
            Err(RuleError::NoCoverage { flavor, tier })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_rules_parse_and_cover_all_pairs() {
        let table = RuleTable::load_default().unwrap();
        for &flavor in Flavor::all() {
            for &tier in Tier::all() {
                table.require_coverage(flavor, tier).unwrap();
            }
        }
    }

    #[test]
    fn test_matcher_any() {
        assert!(AttributeMatcher::any().matches(&json!({})));
        assert!(AttributeMatcher::any().matches(&json!({"host": "example.com"})));
    }

    #[test]
    fn test_matcher_equals_nested_path() {
        let m = AttributeMatcher::Predicate {
            path: "sSLInfo.enabled".into(),
            op: MatchOp::Equals,
            value: Some("false".into()),
        };
        assert!(m.matches(&json!({"sSLInfo": {"enabled": "false"}})));
        assert!(m.matches(&json!({"sSLInfo": {"enabled": false}})));
        assert!(!m.matches(&json!({"sSLInfo": {"enabled": "true"}})));
        assert!(!m.matches(&json!({})));
    }

    #[test]
    fn test_matcher_contains_array_and_string() {
        let m = AttributeMatcher::Predicate {
            path: "policies".into(),
            op: MatchOp::Contains,
            value: Some("OAuthV1".into()),
        };
        assert!(m.matches(&json!({"policies": ["Quota", "OAuthV1"]})));
        assert!(!m.matches(&json!({"policies": ["Quota"]})));
        assert!(m.matches(&json!({"policies": "Quota,OAuthV1"})));
    }

    #[test]
    fn test_wildcard_expansion() {
        let table = RuleTable::from_json_str(
            r#"{"rules": [{"resourceType": "api-proxy", "verdict": "compatible", "message": "ok"}]}"#,
        )
        .unwrap();
        for &flavor in Flavor::all() {
            for &tier in Tier::all() {
                assert_eq!(table.for_record(ResourceType::ApiProxy, flavor, tier).len(), 1);
            }
        }
    }

    #[test]
    fn test_no_coverage_is_an_error() {
        let table = RuleTable::from_json_str(
            r#"{"rules": [{"resourceType": "app", "flavor": "x", "tier": "base", "verdict": "compatible", "message": "ok"}]}"#,
        )
        .unwrap();
        assert!(table.require_coverage(Flavor::X, Tier::Base).is_ok());
        assert!(matches!(
            table.require_coverage(Flavor::Hybrid, Tier::Base),
            Err(RuleError::NoCoverage { .. })
        ));
    }

    #[test]
    fn test_star_attribute_deserializes_as_any() {
        let table = RuleTable::from_json_str(
            r#"{"rules": [{"resourceType": "app", "attribute": "*", "verdict": "compatible", "message": "ok"}]}"#,
        )
        .unwrap();
        let rules = table.for_record(ResourceType::App, Flavor::X, Tier::Base);
        assert_eq!(rules[0].attribute, AttributeMatcher::any());
    }
}
