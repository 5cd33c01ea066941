//! apiqual - migration qualification for API gateway configuration exports
//!
//! Exports the source organization, evaluates the compatibility rule
//! matrix, optionally dry-runs bundles against the live target, and
//! writes the assessment report and dependency graph documents.

use anyhow::{Context, Result};
use apiqual::assess::AssessmentPipeline;
use apiqual::cli::{Args, logging};
use apiqual::config::{ConfigLoader, RunConfig, loader::Overrides};
use apiqual::export::{Exporter, ManagementClient, TargetClient};
use apiqual::output::OutputWriter;
use apiqual::rules::RuleTable;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init_logging(args.debug);

    let config = ConfigLoader::load(
        &args.config,
        Overrides {
            flavor: args.flavor,
            tier: args.tier,
            resources: args.resources,
            skip_target_validation: args.skip_target_validation,
            no_target_compare: args.no_target_compare,
            output_dir: args.output_dir,
        },
    )
    .with_context(|| format!("Failed to load configuration from {}", args.config.display()))?;

    // The rule matrix must cover the requested flavor/tier pair before a
    // single record is exported.
    let rules = match &args.rules {
        Some(path) => RuleTable::from_file(path)
            .with_context(|| format!("Failed to load rule matrix from {}", path.display()))?,
        None => RuleTable::load_default().context("Built-in rule matrix is invalid")?,
    };
    rules
        .require_coverage(config.flavor, config.tier)
        .context("Rule matrix does not cover the requested target")?;

    let source = source_client(&config)?;
    let (target_exporter, target_client) = target_clients(&config)?;

    // Ctrl-C flips the shutdown signal; in-flight validation calls drain
    // and the report is still written from whatever completed.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received; finishing in-flight work");
            let _ = shutdown_tx.send(true);
        }
    });

    tracing::info!(
        "Assessing org '{}' for {}/{}",
        config.source.org,
        config.flavor,
        config.tier
    );

    let config = Arc::new(config);
    let pipeline = AssessmentPipeline::new(
        Arc::clone(&config),
        Arc::new(rules),
        source,
        target_exporter,
        target_client,
    );
    let report = pipeline.run(shutdown_rx).await;

    let (assessments_path, graph_path) = OutputWriter::new(&config.output_dir)
        .write_all(&report)
        .context("Failed to write output documents")?;

    println!(
        "Assessed {} object(s); {} warning(s)",
        report.assessments.len(),
        report.warnings.len()
    );
    println!("Report: {}", assessments_path.display());
    println!("Graph:  {}", graph_path.display());
    Ok(())
}

/// Build the source management API client
fn source_client(config: &RunConfig) -> Result<Arc<dyn Exporter>> {
    let token = ConfigLoader::resolve_token(&config.source.token_env)?;
    let client = ManagementClient::new(
        &config.source.base_url,
        &config.source.org,
        token,
        Duration::from_secs(config.source.request_timeout_secs),
    )?;
    Ok(Arc::new(client))
}

/// Build the target clients when validation or comparison needs them
#[allow(clippy::type_complexity)]
fn target_clients(
    config: &RunConfig,
) -> Result<(Option<Arc<dyn Exporter>>, Option<Arc<dyn TargetClient>>)> {
    if !config.validate_target && !config.compare_target {
        return Ok((None, None));
    }
    // The loader guarantees the endpoint is present when either toggle is on.
    let endpoint = config
        .target
        .as_ref()
        .context("Target endpoint missing despite validation or comparison being enabled")?;
    let token = ConfigLoader::resolve_token(&endpoint.token_env)?;
    let client = Arc::new(ManagementClient::new(
        &endpoint.base_url,
        &endpoint.org,
        token,
        Duration::from_secs(endpoint.request_timeout_secs),
    )?);

    let exporter: Option<Arc<dyn Exporter>> = config
        .compare_target
        .then(|| Arc::clone(&client) as Arc<dyn Exporter>);
    let validator: Option<Arc<dyn TargetClient>> = config
        .validate_target
        .then(|| client as Arc<dyn TargetClient>);
    Ok((exporter, validator))
}
