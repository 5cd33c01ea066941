//! Qualification engine
//!
//! Walks every record in the dependency graph, consults the rule matrix
//! for the run's (flavor, tier) pair, and folds dangling dependency
//! edges in as manual-intervention contributors. Produces exactly one
//! assessment per record, in identity order.

use super::{Flavor, RuleTable, Tier};
use crate::graph::DependencyGraph;
use crate::models::{Assessment, Reason, ReasonOrigin, ResourceRecord, Verdict};
use std::sync::Arc;

/// Rule-driven qualification of a dependency graph
pub struct QualificationEngine {
    table: Arc<RuleTable>,
    flavor: Flavor,
    tier: Tier,
}

impl QualificationEngine {
    pub fn new(table: Arc<RuleTable>, flavor: Flavor, tier: Tier) -> Self {
        Self {
            table,
            flavor,
            tier,
        }
    }

    /// Assess every record in the graph
    ///
    /// Output order follows the graph's identity order, so two runs over
    /// the same export produce the same collection.
    pub fn evaluate(&self, graph: &DependencyGraph) -> Vec<Assessment> {
        let assessments: Vec<Assessment> = graph
            .records()
            .map(|record| self.evaluate_record(record, graph))
            .collect();

        let unknown = assessments
            .iter()
            .filter(|a| a.verdict == Verdict::Unknown)
            .count();
        if unknown > 0 {
            tracing::warn!(
                "{} record(s) matched no rule for {}/{} and default to 'unknown'",
                unknown,
                self.flavor,
                self.tier
            );
        }
        assessments
    }

    /// Assess a single record against the rule matrix and its edges
    fn evaluate_record(&self, record: &ResourceRecord, graph: &DependencyGraph) -> Assessment {
        let identity = record.identity();
        let mut assessment = Assessment::new(identity.clone());

        // Attribute-level rules, in matrix order. Every match is retained
        // as a reason even though only the top one becomes the verdict.
        for rule in self
            .table
            .for_record(record.resource_type, self.flavor, self.tier)
        {
            if rule.attribute.matches(&record.raw) {
                assessment.push_reason(Reason::new(
                    rule.verdict,
                    ReasonOrigin::StaticRule,
                    rule.message.clone(),
                ));
            }
        }

        // An unresolved reference cannot be validated, independent of any
        // attribute-level outcome.
        for edge in graph.edges_from(&identity) {
            if graph.is_dangling(edge) {
                assessment.push_reason(Reason::new(
                    Verdict::NeedsManualIntervention,
                    ReasonOrigin::DanglingReference,
                    format!(
                        "References {} via '{}' but it is absent from the export",
                        edge.to, edge.relation
                    ),
                ));
            }
        }

        if assessment.reasons.is_empty() {
            tracing::debug!("No rule matched {}; verdict stays unknown", identity);
        }
        assessment
    }
}
