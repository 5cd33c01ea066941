//! Command line interface

pub mod logging;

use crate::models::ResourceType;
use crate::rules::{Flavor, Tier};
use clap::Parser;
use std::path::PathBuf;

/// Assess whether an API gateway configuration export can be migrated to
/// a newer platform generation
#[derive(Parser, Debug)]
#[command(name = "apiqual")]
#[command(about = "Migration qualification for API gateway configuration exports", long_about = None)]
pub struct Args {
    /// Run configuration file
    #[arg(long, short = 'c', default_value = "apiqual.yaml")]
    pub config: PathBuf,

    /// Comma-separated resource types to assess (default: all)
    #[arg(long, value_delimiter = ',')]
    pub resources: Option<Vec<ResourceType>>,

    /// Target platform generation (overrides the config file)
    #[arg(long)]
    pub flavor: Option<Flavor>,

    /// Target environment capability tier (overrides the config file)
    #[arg(long)]
    pub tier: Option<Tier>,

    /// Rule matrix file (default: the built-in matrix)
    #[arg(long)]
    pub rules: Option<PathBuf>,

    /// Skip live dry-run validation against the target
    #[arg(long)]
    pub skip_target_validation: bool,

    /// Skip the snapshot comparison against the target
    #[arg(long)]
    pub no_target_compare: bool,

    /// Directory the output documents are written to
    #[arg(long, short = 'o')]
    pub output_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short = 'd')]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_list_parses_comma_separated() {
        let args = Args::parse_from([
            "apiqual",
            "--resources",
            "apis,targetservers",
            "--flavor",
            "hybrid",
        ]);
        assert_eq!(
            args.resources,
            Some(vec![ResourceType::ApiProxy, ResourceType::TargetServer])
        );
        assert_eq!(args.flavor, Some(Flavor::Hybrid));
        assert!(!args.skip_target_validation);
    }

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["apiqual"]);
        assert_eq!(args.config, PathBuf::from("apiqual.yaml"));
        assert!(args.resources.is_none());
        assert!(!args.debug);
    }
}
