//! Assessment pipeline
//!
//! Orchestrates one run: export per resource type (in parallel, failures
//! isolated), dependency graph construction, rule evaluation, the
//! optional live validation merge, and the optional snapshot diff. Every
//! record that enters exits as exactly one assessment.

use crate::compare;
use crate::config::RunConfig;
use crate::export::{Exporter, TargetClient, TransportError};
use crate::graph::{DependencyGraph, builder};
use crate::models::{Assessment, DiffEntry, ResourceRecord, ResourceType, Scope};
use crate::rules::{RuleTable, engine::QualificationEngine};
use crate::validate::{RetryPolicy, merge_target_validation};
use futures::future::join_all;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Everything one run produces, handed to the report generator and the
/// visualizer
#[derive(Debug)]
pub struct AssessmentReport {
    /// One entry per exported source record, in identity order
    pub assessments: Vec<Assessment>,
    /// The dependency graph, for the topology rendering
    pub graph: DependencyGraph,
    /// Records present only on the target (informational)
    pub target_only: Vec<DiffEntry>,
    /// Non-fatal problems encountered during the run
    pub warnings: Vec<String>,
}

/// One fully configured assessment run
pub struct AssessmentPipeline {
    config: Arc<RunConfig>,
    rules: Arc<RuleTable>,
    source: Arc<dyn Exporter>,
    target_exporter: Option<Arc<dyn Exporter>>,
    target_client: Option<Arc<dyn TargetClient>>,
}

impl AssessmentPipeline {
    pub fn new(
        config: Arc<RunConfig>,
        rules: Arc<RuleTable>,
        source: Arc<dyn Exporter>,
        target_exporter: Option<Arc<dyn Exporter>>,
        target_client: Option<Arc<dyn TargetClient>>,
    ) -> Self {
        Self {
            config,
            rules,
            source,
            target_exporter,
            target_client,
        }
    }

    /// Execute the run
    ///
    /// The shutdown signal stops new validation calls from being issued;
    /// everything before the validation merge is local computation and
    /// runs to completion.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> AssessmentReport {
        let mut warnings = Vec::new();

        // Export, one task per resource type. A failing type is isolated:
        // its records are absent and the failure becomes a warning.
        let (records, mut export_warnings) =
            export_all(Arc::clone(&self.source), &self.config).await;
        warnings.append(&mut export_warnings);

        let graph = builder::build(records);
        let source_records: Vec<ResourceRecord> = graph.records().cloned().collect();

        let engine =
            QualificationEngine::new(Arc::clone(&self.rules), self.config.flavor, self.config.tier);
        let mut assessments = engine.evaluate(&graph);
        debug_assert_eq!(assessments.len(), graph.len());

        // Live validation merge, proxies and shared flows only.
        if self.config.validate_target {
            if let Some(client) = &self.target_client {
                let policy = RetryPolicy {
                    max_attempts: self.config.validation.max_attempts,
                    initial_backoff: Duration::from_millis(self.config.validation.initial_backoff_ms),
                    backoff_factor: self.config.validation.backoff_factor,
                    call_timeout: Duration::from_secs(self.config.validation.call_timeout_secs),
                };
                let summary = merge_target_validation(
                    &mut assessments,
                    source_records.clone(),
                    Arc::clone(client),
                    policy,
                    self.config.validation.concurrency,
                    shutdown.clone(),
                )
                .await;
                warnings.extend(summary.warnings);
            }
        } else {
            tracing::info!("Target validation skipped; verdicts derive from static rules only");
        }

        // Snapshot diff against the target export.
        let mut target_only = Vec::new();
        if self.config.compare_target {
            if let Some(target_exporter) = &self.target_exporter {
                let (target_records, compared_types, mut compare_warnings) =
                    export_target_snapshot(Arc::clone(target_exporter), &self.config).await;
                warnings.append(&mut compare_warnings);

                // Only types whose target export succeeded are compared;
                // a failed type must not make everything look new.
                let comparable: Vec<ResourceRecord> = source_records
                    .iter()
                    .filter(|r| compared_types.contains(&r.resource_type))
                    .cloned()
                    .collect();
                target_only =
                    compare::merge_comparison(&mut assessments, &comparable, &target_records);
            }
        }

        for warning in &warnings {
            tracing::warn!("{}", warning);
        }
        AssessmentReport {
            assessments,
            graph,
            target_only,
            warnings,
        }
    }
}

/// Scopes a resource type is exported from
fn scopes_for(resource_type: ResourceType, config: &RunConfig) -> Vec<Scope> {
    if resource_type.is_env_scoped() {
        config
            .environments
            .iter()
            .map(|env| Scope::Environment(env.clone()))
            .collect()
    } else {
        vec![Scope::Organization]
    }
}

/// Export every selected type from the source, one task per type
async fn export_all(
    exporter: Arc<dyn Exporter>,
    config: &RunConfig,
) -> (Vec<ResourceRecord>, Vec<String>) {
    let mut tasks = Vec::new();
    for resource_type in config.selected_resources() {
        let exporter = Arc::clone(&exporter);
        let scopes = scopes_for(resource_type, config);
        tasks.push(tokio::spawn(async move {
            (resource_type, export_type(&*exporter, resource_type, scopes).await)
        }));
    }

    let mut records = Vec::new();
    let mut warnings = Vec::new();
    for task in join_all(tasks).await {
        match task {
            Ok((_, Ok(mut type_records))) => records.append(&mut type_records),
            Ok((resource_type, Err(err))) => warnings.push(format!(
                "Export of {} failed ({}); its records are missing from this assessment",
                resource_type, err
            )),
            Err(join_err) => warnings.push(format!("Export task panicked: {}", join_err)),
        }
    }
    (records, warnings)
}

/// Export one type across all of its scopes; the first scope failure
/// fails the whole type
async fn export_type(
    exporter: &dyn Exporter,
    resource_type: ResourceType,
    scopes: Vec<Scope>,
) -> Result<Vec<ResourceRecord>, TransportError> {
    let mut records = Vec::new();
    for scope in &scopes {
        records.extend(exporter.export(resource_type, scope).await?);
    }
    Ok(records)
}

/// Export the target snapshot for comparison; failing types are skipped
async fn export_target_snapshot(
    exporter: Arc<dyn Exporter>,
    config: &RunConfig,
) -> (Vec<ResourceRecord>, BTreeSet<ResourceType>, Vec<String>) {
    let mut records = Vec::new();
    let mut compared_types = BTreeSet::new();
    let mut warnings = Vec::new();

    for resource_type in config.selected_resources() {
        match export_type(&*exporter, resource_type, scopes_for(resource_type, config)).await {
            Ok(mut type_records) => {
                compared_types.insert(resource_type);
                records.append(&mut type_records);
            }
            Err(err) => warnings.push(format!(
                "Target export of {} failed ({}); comparison skipped for this type",
                resource_type, err
            )),
        }
    }
    (records, compared_types, warnings)
}
