//! Report and graph document output
//!
//! Writes the two JSON documents a run produces: the assessment report
//! (per-object verdicts with reasons, diff entries, and a verdict tally)
//! and the dependency graph (nodes and edges) for the topology
//! visualizer.

use crate::assess::AssessmentReport;
use crate::graph::{DependencyEdge, DependencyGraph};
use crate::models::{Assessment, DiffEntry, ResourceIdentity};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Top-level shape of `assessments.json`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AssessmentDocument<'a> {
    /// Count of records per verdict, verdict name as key
    summary: BTreeMap<&'static str, usize>,
    assessments: &'a [Assessment],
    /// Objects present only on the target, informational
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    target_only: &'a [DiffEntry],
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    warnings: &'a [String],
}

/// Top-level shape of `graph.json`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphDocument<'a> {
    nodes: Vec<ResourceIdentity>,
    edges: &'a [DependencyEdge],
}

/// Writes the run's output documents into one directory
pub struct OutputWriter {
    dir: PathBuf,
}

impl OutputWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Write both documents; returns their paths for the final summary
    pub fn write_all(&self, report: &AssessmentReport) -> Result<(PathBuf, PathBuf)> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create output directory {}", self.dir.display()))?;

        let assessments_path = self.dir.join("assessments.json");
        write_json(
            &assessments_path,
            &AssessmentDocument {
                summary: verdict_tally(&report.assessments),
                assessments: &report.assessments,
                target_only: &report.target_only,
                warnings: &report.warnings,
            },
        )?;

        let graph_path = self.dir.join("graph.json");
        write_json(&graph_path, &graph_document(&report.graph))?;

        Ok((assessments_path, graph_path))
    }
}

fn write_json<T: Serialize>(path: &Path, document: &T) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), document)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Count records per verdict for the report header
fn verdict_tally(assessments: &[Assessment]) -> BTreeMap<&'static str, usize> {
    let mut tally = BTreeMap::new();
    for assessment in assessments {
        *tally.entry(assessment.verdict.as_str()).or_insert(0) += 1;
    }
    tally
}

fn graph_document(graph: &DependencyGraph) -> GraphDocument<'_> {
    GraphDocument {
        nodes: graph.records().map(|r| r.identity()).collect(),
        edges: graph.edges(),
    }
}
