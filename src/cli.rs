//! Command-line interface definitions and argument parsing

use std::path::PathBuf;

use chrono::{NaiveDateTime, Utc};
use clap::{Parser, Subcommand};

use crate::config::{AnalysisConfig, MiningParams, SegmentationParams};
use crate::data::parse_timestamp;
use crate::error::AnalysisError;

/// Market basket analysis and RFM customer segmentation for promotion planning
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// TOML file with mining and segmentation defaults
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print summary counts of a transaction file
    Stats {
        /// Path to the input CSV file
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Mine association rules between products
    Rules(RulesArgs),
    /// Segment customers by RFM clustering
    Segment(SegmentArgs),
    /// Build a promotion plan from published rules and segments
    Recommend {
        /// Result store directory
        #[arg(long)]
        store: PathBuf,
    },
    /// Delete published rules and segments
    Clear {
        /// Result store directory
        #[arg(long)]
        store: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
pub struct RulesArgs {
    /// Path to the input CSV file
    #[arg(short, long)]
    pub input: PathBuf,

    /// Minimum support in (0, 1]
    #[arg(long)]
    pub min_support: Option<f64>,

    /// Minimum confidence in [0, 1]
    #[arg(long)]
    pub min_confidence: Option<f64>,

    /// Number of rules to print
    #[arg(long, default_value = "20")]
    pub top: usize,

    /// Publish the rules to this result store directory
    #[arg(long)]
    pub store: Option<PathBuf>,
}

impl RulesArgs {
    /// Flags override the configured values
    pub fn mining_params(&self, base: MiningParams) -> MiningParams {
        MiningParams {
            min_support: self.min_support.unwrap_or(base.min_support),
            min_confidence: self.min_confidence.unwrap_or(base.min_confidence),
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct SegmentArgs {
    /// Path to the input CSV file
    #[arg(short, long)]
    pub input: PathBuf,

    /// Number of clusters for K-Means
    #[arg(short = 'k', long)]
    pub clusters: Option<usize>,

    /// Reference date for recency, e.g. 2011-12-09 (default: now, in UTC)
    #[arg(long)]
    pub reference_date: Option<String>,

    /// Seed for centroid initialisation
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of K-Means restarts
    #[arg(long)]
    pub n_init: Option<usize>,

    /// Maximum iterations for K-Means algorithm
    #[arg(long)]
    pub max_iters: Option<u64>,

    /// Tolerance for K-Means convergence
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Publish the segments to this result store directory
    #[arg(long)]
    pub store: Option<PathBuf>,
}

impl SegmentArgs {
    /// Flags override the configured values
    pub fn segmentation_params(&self, base: SegmentationParams) -> SegmentationParams {
        SegmentationParams {
            clusters: self.clusters.unwrap_or(base.clusters),
            seed: self.seed.unwrap_or(base.seed),
            n_init: self.n_init.unwrap_or(base.n_init),
            max_iters: self.max_iters.unwrap_or(base.max_iters),
            tolerance: self.tolerance.unwrap_or(base.tolerance),
        }
    }

    /// Parse the reference date, defaulting to the current time.
    /// Both sides are naive UTC, matching how offsets in the input are read.
    pub fn reference_date(&self) -> crate::Result<NaiveDateTime> {
        match self.reference_date.as_deref() {
            Some(raw) => parse_timestamp(raw).ok_or_else(|| AnalysisError::InvalidParameter {
                name: "reference_date",
                reason: format!("unrecognised timestamp {raw:?}"),
            }),
            None => Ok(Utc::now().naive_utc()),
        }
    }
}

impl Args {
    /// Load the configuration file if one was given
    pub fn load_config(&self) -> crate::Result<AnalysisConfig> {
        match &self.config {
            Some(path) => AnalysisConfig::from_file(path),
            None => Ok(AnalysisConfig::default()),
        }
    }
}
