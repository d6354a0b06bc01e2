//! BasketForge CLI entrypoint
//!
//! Orchestrates data loading, the two analysis pipelines, publishing to the
//! result store and console reporting.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use basketforge::cli::{Command, RulesArgs, SegmentArgs};
use basketforge::{
    analyze_transactions, dataset_stats, load_transactions, plan_promotions, report,
    segment_customers, Args, JsonFileStore, ResultStore,
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = args.load_config().context("failed to load configuration")?;

    match &args.command {
        Command::Stats { input } => run_stats(input),
        Command::Rules(rules) => run_rules(rules, config.mining),
        Command::Segment(segment) => run_segment(segment, config.segmentation),
        Command::Recommend { store } => run_recommend(store),
        Command::Clear { store } => {
            JsonFileStore::open(store)?.clear()?;
            println!("Cleared published rules and segments in {}", store.display());
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load(input: &Path) -> Result<Vec<basketforge::TransactionLine>> {
    load_transactions(input).with_context(|| format!("failed to load {}", input.display()))
}

fn run_stats(input: &Path) -> Result<()> {
    let lines = load(input)?;
    let mut out = String::new();
    report::render_dataset_stats(&mut out, &dataset_stats(&lines))?;
    print!("{out}");
    Ok(())
}

/// Run the market basket pipeline
fn run_rules(args: &RulesArgs, base: basketforge::MiningParams) -> Result<()> {
    let params = args.mining_params(base);
    let start_time = Instant::now();

    let lines = load(&args.input)?;
    let result = analyze_transactions(&lines, &params).context("market basket analysis failed")?;
    tracing::info!(elapsed_ms = start_time.elapsed().as_millis() as u64, "rules mined");

    let mut out = String::new();
    report::render_rules(&mut out, &result, args.top)?;
    print!("{out}");

    if let Some(dir) = &args.store {
        if result.status.is_empty() {
            tracing::warn!("no rules to publish; keeping the previous snapshot");
        } else {
            let snapshot = JsonFileStore::open(dir)?.publish_rules(result.records())?;
            println!(
                "\nPublished {} rules as version {} to {}",
                snapshot.records.len(),
                snapshot.version,
                dir.display()
            );
        }
    }

    Ok(())
}

/// Run the RFM + clustering pipeline
fn run_segment(args: &SegmentArgs, base: basketforge::SegmentationParams) -> Result<()> {
    let params = args.segmentation_params(base);
    let reference_date = args.reference_date()?;
    let start_time = Instant::now();

    let lines = load(&args.input)?;
    let result = segment_customers(&lines, reference_date, &params)
        .context("customer segmentation failed")?;
    tracing::info!(elapsed_ms = start_time.elapsed().as_millis() as u64, "customers segmented");

    let mut out = String::new();
    report::render_segmentation(&mut out, &result)?;
    print!("{out}");

    if let Some(dir) = &args.store {
        if result.status.is_empty() {
            tracing::warn!("no segments to publish; keeping the previous snapshot");
        } else {
            let snapshot = JsonFileStore::open(dir)?.publish_segments(result.segments)?;
            println!(
                "\nPublished {} segments as version {} to {}",
                snapshot.records.len(),
                snapshot.version,
                dir.display()
            );
        }
    }

    Ok(())
}

fn run_recommend(dir: &Path) -> Result<()> {
    let store = JsonFileStore::open(dir)?;
    let rules = store.latest_rules()?.map(|s| s.records).unwrap_or_default();
    let segments = store.latest_segments()?.map(|s| s.records).unwrap_or_default();

    let mut out = String::new();
    report::render_plan(&mut out, &plan_promotions(&rules, &segments))?;
    print!("{out}");
    Ok(())
}
