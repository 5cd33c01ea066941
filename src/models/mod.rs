//! Core data model for migration qualification
//!
//! Defines the exported resource records, the verdict taxonomy, and the
//! final per-object assessment shape handed to the report generator and
//! visualizer. All of these are created fresh per run from exported JSON
//! and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Enumeration of all exportable resource types
///
/// This centralizes the type names so the rest of the codebase never
/// hardcodes strings. The split between environment-scoped and
/// organization-scoped types mirrors the source platform's object model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceType {
    // Environment-scoped resources
    #[serde(rename = "target-server")]
    TargetServer,
    #[serde(rename = "keyvaluemap")]
    KeyValueMap,
    #[serde(rename = "reference")]
    Reference,
    #[serde(rename = "resourcefile")]
    ResourceFile,
    #[serde(rename = "keystore")]
    Keystore,
    #[serde(rename = "flowhook")]
    FlowHook,
    // Organization-scoped resources
    #[serde(rename = "org-keyvaluemap")]
    OrgKeyValueMap,
    #[serde(rename = "developer")]
    Developer,
    #[serde(rename = "api-product")]
    ApiProduct,
    #[serde(rename = "api-proxy")]
    ApiProxy,
    #[serde(rename = "app")]
    App,
    #[serde(rename = "shared-flow")]
    SharedFlow,
}

impl ResourceType {
    /// Get the display name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::TargetServer => "target-server",
            ResourceType::KeyValueMap => "keyvaluemap",
            ResourceType::Reference => "reference",
            ResourceType::ResourceFile => "resourcefile",
            ResourceType::Keystore => "keystore",
            ResourceType::FlowHook => "flowhook",
            ResourceType::OrgKeyValueMap => "org-keyvaluemap",
            ResourceType::Developer => "developer",
            ResourceType::ApiProduct => "api-product",
            ResourceType::ApiProxy => "api-proxy",
            ResourceType::App => "app",
            ResourceType::SharedFlow => "shared-flow",
        }
    }

    /// Get all resource types
    ///
    /// Useful when no `--resources` filter is given and the whole
    /// export surface should be assessed.
    pub fn all() -> &'static [Self] {
        &[
            ResourceType::TargetServer,
            ResourceType::KeyValueMap,
            ResourceType::Reference,
            ResourceType::ResourceFile,
            ResourceType::Keystore,
            ResourceType::FlowHook,
            ResourceType::OrgKeyValueMap,
            ResourceType::Developer,
            ResourceType::ApiProduct,
            ResourceType::ApiProxy,
            ResourceType::App,
            ResourceType::SharedFlow,
        ]
    }

    /// Whether this type lives under an environment (as opposed to the org)
    pub fn is_env_scoped(&self) -> bool {
        matches!(
            self,
            ResourceType::TargetServer
                | ResourceType::KeyValueMap
                | ResourceType::Reference
                | ResourceType::ResourceFile
                | ResourceType::Keystore
                | ResourceType::FlowHook
        )
    }

    /// Whether live target validation applies to this type
    ///
    /// Only deployable bundles (proxies and shared flows) can be dry-run
    /// imported against the target.
    pub fn supports_target_validation(&self) -> bool {
        matches!(self, ResourceType::ApiProxy | ResourceType::SharedFlow)
    }

    /// Try to parse a string into a ResourceType, returning None if invalid
    pub fn parse_optional(s: &str) -> Option<Self> {
        s.parse().ok()
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = String;

    /// Case-insensitive parse accepting both the canonical names and the
    /// plural aliases used by the export tooling (e.g. `targetservers`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "target-server" | "targetserver" | "targetservers" => Ok(ResourceType::TargetServer),
            "keyvaluemap" | "keyvaluemaps" | "kvm" | "kvms" => Ok(ResourceType::KeyValueMap),
            "reference" | "references" => Ok(ResourceType::Reference),
            "resourcefile" | "resourcefiles" => Ok(ResourceType::ResourceFile),
            "keystore" | "keystores" => Ok(ResourceType::Keystore),
            "flowhook" | "flowhooks" => Ok(ResourceType::FlowHook),
            "org-keyvaluemap" | "org_keyvaluemaps" | "org-keyvaluemaps" => {
                Ok(ResourceType::OrgKeyValueMap)
            }
            "developer" | "developers" => Ok(ResourceType::Developer),
            "api-product" | "apiproduct" | "apiproducts" => Ok(ResourceType::ApiProduct),
            "api-proxy" | "apiproxy" | "api" | "apis" => Ok(ResourceType::ApiProxy),
            "app" | "apps" => Ok(ResourceType::App),
            "shared-flow" | "sharedflow" | "sharedflows" => Ok(ResourceType::SharedFlow),
            _ => Err(format!("Unknown resource type: {}", s)),
        }
    }
}

/// Scope an exported object belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Scope {
    /// Organization-level object
    Organization,
    /// Object belonging to a named environment
    Environment(String),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Organization => write!(f, "organization"),
            Scope::Environment(name) => write!(f, "{}", name),
        }
    }
}

/// Stable identity of an exported object within a run
///
/// `name` is unique within `resource_type` + `scope`; the triple is the
/// key everything downstream (graph edges, diffs, assessments) uses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceIdentity {
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub scope: Scope,
    pub name: String,
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {} | {}", self.resource_type, self.scope, self.name)
    }
}

/// One exported configuration object, immutable once constructed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRecord {
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub scope: Scope,
    pub name: String,
    /// The original attribute mapping as retrieved from the export
    pub raw: serde_json::Value,
    /// Ordered revision identifiers (proxies and shared flows only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub revisions: Vec<String>,
}

impl ResourceRecord {
    pub fn new(
        resource_type: ResourceType,
        scope: Scope,
        name: impl Into<String>,
        raw: serde_json::Value,
    ) -> Self {
        Self {
            resource_type,
            scope,
            name: name.into(),
            raw,
            revisions: Vec::new(),
        }
    }

    pub fn identity(&self) -> ResourceIdentity {
        ResourceIdentity {
            resource_type: self.resource_type,
            scope: self.scope.clone(),
            name: self.name.clone(),
        }
    }
}

/// Tagged compatibility outcome for a record
///
/// The precedence between outcomes is total and lives in exactly one
/// place (`precedence`), so "which verdict wins" is never re-decided at
/// call sites. A failed dry-run outranks anything the static rules could
/// soften but never masks a static incompatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    Compatible,
    ConditionallyCompatible,
    NeedsManualIntervention,
    ValidationFailed,
    Incompatible,
    Unknown,
}

impl Verdict {
    /// Rank used for dominance; higher wins
    pub fn precedence(&self) -> u8 {
        match self {
            Verdict::Incompatible => 5,
            Verdict::ValidationFailed => 4,
            Verdict::NeedsManualIntervention => 3,
            Verdict::ConditionallyCompatible => 2,
            Verdict::Compatible => 1,
            Verdict::Unknown => 0,
        }
    }

    /// Get the display name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Compatible => "compatible",
            Verdict::ConditionallyCompatible => "conditionally-compatible",
            Verdict::NeedsManualIntervention => "needs-manual-intervention",
            Verdict::ValidationFailed => "validation-failed",
            Verdict::Incompatible => "incompatible",
            Verdict::Unknown => "unknown",
        }
    }

    /// Dominant verdict over a reason list; `Unknown` when empty
    ///
    /// A record with no matching rule is deliberately `Unknown`, never
    /// `Compatible`: rule coverage gaps must be visible to the user.
    pub fn dominant<'a>(reasons: impl IntoIterator<Item = &'a Reason>) -> Verdict {
        reasons
            .into_iter()
            .map(|r| r.verdict)
            .max_by_key(|v| v.precedence())
            .unwrap_or(Verdict::Unknown)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a contributing reason came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReasonOrigin {
    /// Matched an entry in the static rule matrix
    StaticRule,
    /// A dependency edge whose target is absent from the export
    DanglingReference,
    /// Outcome of a live dry-run import against the target
    LiveValidation,
    /// A validation call that could not be completed
    Transport,
}

/// One contributing reason attached to a record
///
/// All matched reasons are retained in order even though only the
/// highest-precedence one becomes the dominant verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reason {
    pub verdict: Verdict,
    pub origin: ReasonOrigin,
    pub detail: String,
}

impl Reason {
    pub fn new(verdict: Verdict, origin: ReasonOrigin, detail: impl Into<String>) -> Self {
        Self {
            verdict,
            origin,
            detail: detail.into(),
        }
    }
}

/// Classification of one object against the target snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "classification")]
pub enum DiffClass {
    /// Present only in the source export: needs migration
    Added,
    /// Present only on the target: pre-existing, informational
    Removed,
    /// Present in both with identical normalized content
    Unchanged,
    /// Present in both but differing
    Modified {
        /// Top-level attribute paths whose values differ
        #[serde(rename = "changedFields")]
        changed_fields: Vec<String>,
    },
}

/// Diff result for one object identity, produced only when target
/// comparison is enabled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffEntry {
    pub identity: ResourceIdentity,
    #[serde(flatten)]
    pub class: DiffClass,
}

/// Final per-object assessment record
///
/// Every ResourceRecord that enters the pipeline exits as exactly one of
/// these, defaulting to `Unknown` rather than being dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    #[serde(flatten)]
    pub identity: ResourceIdentity,
    pub verdict: Verdict,
    pub reasons: Vec<Reason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<DiffEntry>,
}

impl Assessment {
    pub fn new(identity: ResourceIdentity) -> Self {
        Self {
            identity,
            verdict: Verdict::Unknown,
            reasons: Vec::new(),
            diff: None,
        }
    }

    /// Append a reason and re-derive the dominant verdict
    pub fn push_reason(&mut self, reason: Reason) {
        self.reasons.push(reason);
        self.verdict = Verdict::dominant(&self.reasons);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_type_roundtrip() {
        for rt in ResourceType::all() {
            assert_eq!(rt.as_str().parse::<ResourceType>().unwrap(), *rt);
        }
    }

    #[test]
    fn test_resource_type_aliases() {
        assert_eq!(
            "targetservers".parse::<ResourceType>().unwrap(),
            ResourceType::TargetServer
        );
        assert_eq!("apis".parse::<ResourceType>().unwrap(), ResourceType::ApiProxy);
        assert_eq!(
            "sharedflows".parse::<ResourceType>().unwrap(),
            ResourceType::SharedFlow
        );
        assert!("gateway".parse::<ResourceType>().is_err());
    }

    #[test]
    fn test_verdict_precedence_is_total() {
        let all = [
            Verdict::Compatible,
            Verdict::ConditionallyCompatible,
            Verdict::NeedsManualIntervention,
            Verdict::ValidationFailed,
            Verdict::Incompatible,
            Verdict::Unknown,
        ];
        for a in &all {
            for b in &all {
                if a != b {
                    assert_ne!(a.precedence(), b.precedence());
                }
            }
        }
        assert!(Verdict::Incompatible.precedence() > Verdict::ValidationFailed.precedence());
        assert!(
            Verdict::ValidationFailed.precedence() > Verdict::NeedsManualIntervention.precedence()
        );
        assert!(
            Verdict::NeedsManualIntervention.precedence()
                > Verdict::ConditionallyCompatible.precedence()
        );
        assert!(Verdict::ConditionallyCompatible.precedence() > Verdict::Compatible.precedence());
        assert!(Verdict::Compatible.precedence() > Verdict::Unknown.precedence());
    }

    #[test]
    fn test_dominant_over_empty_is_unknown() {
        assert_eq!(Verdict::dominant([]), Verdict::Unknown);
    }

    #[test]
    fn test_dominant_picks_highest() {
        let reasons = vec![
            Reason::new(Verdict::Compatible, ReasonOrigin::StaticRule, "ok"),
            Reason::new(Verdict::Incompatible, ReasonOrigin::StaticRule, "bad policy"),
            Reason::new(
                Verdict::NeedsManualIntervention,
                ReasonOrigin::DanglingReference,
                "missing target server",
            ),
        ];
        assert_eq!(Verdict::dominant(&reasons), Verdict::Incompatible);
    }

    #[test]
    fn test_identity_display() {
        let id = ResourceIdentity {
            resource_type: ResourceType::ApiProxy,
            scope: Scope::Organization,
            name: "orders-v1".to_string(),
        };
        assert_eq!(id.to_string(), "api-proxy | organization | orders-v1");
    }
}
