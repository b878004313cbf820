#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for building road and address point alt-names tables.
//!
//! Uses `indicatif-log-bridge` (via [`altnames_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal.

use std::path::{Path, PathBuf};
use std::time::Instant;

use altnames_cli_utils::{IndicatifProgress, MultiProgress};
use altnames_grinder::{
    AddressPointsSummary, GrindConfig, GrindError, LogSink, RoadsSummary, grind_address_points,
    grind_roads,
};
use altnames_store::{DuckDbAddressPointSource, DuckDbRoadSource, DuckDbWorkspace};
use clap::{Parser, ValueEnum};

#[derive(Parser)]
#[command(
    name = "altnames",
    about = "Build alternate-name tables for road and address point geocoding"
)]
struct Cli {
    /// Roads source database (overrides `[source] path`)
    #[arg(short = 'c', long)]
    connection: Option<PathBuf>,

    /// Output workspace database (overrides `[output] path`)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Which tables to build
    #[arg(short = 't', long = "type", value_enum, default_value_t = RunType::All)]
    run_type: RunType,

    /// Address points source database (overrides `[address_points] path`)
    #[arg(short, long)]
    address_points: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log at debug level unless `RUST_LOG` says otherwise
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RunType {
    /// Geocode, scratch, and road alt-names tables
    AlternateNames,
    /// Address point alt-names table
    AddressPoints,
    /// Both
    All,
}

impl RunType {
    const fn roads(self) -> bool {
        matches!(self, Self::AlternateNames | Self::All)
    }

    const fn address_points(self) -> bool {
        matches!(self, Self::AddressPoints | Self::All)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let multi = altnames_cli_utils::init_logger(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => GrindConfig::load(path)?,
        None => GrindConfig::default(),
    };
    if let Some(path) = cli.connection {
        config.source.path = path;
    }
    if let Some(path) = cli.output {
        config.output.path = path;
    }
    if let Some(path) = cli.address_points {
        config.address_points.path = path;
    }

    let start = Instant::now();
    if let Err(e) = run(cli.run_type, &config, &multi) {
        log::error!("Run failed after {:.1}s: {e}", start.elapsed().as_secs_f64());
        return Err(e.into());
    }
    log::info!("Run finished in {:.1}s", start.elapsed().as_secs_f64());

    Ok(())
}

fn run(run_type: RunType, config: &GrindConfig, multi: &MultiProgress) -> Result<(), GrindError> {
    if run_type.roads() {
        require_file("Roads source", &config.source.path)?;
    }
    if run_type.address_points() {
        require_file("Address points source", &config.address_points.path)?;
    }

    let mut workspace = DuckDbWorkspace::open(&config.output.path)?;
    log::info!("Writing to {}", config.output.path.display());

    let mut sink = LogSink;

    if run_type.roads() {
        let source = DuckDbRoadSource::open(&config.source.path, &config.source.roads_table)?;
        let progress = IndicatifProgress::records_bar(multi, "Reading road segments");
        let summary = grind_roads(
            &source,
            &mut workspace,
            &config.roads_options(),
            &mut sink,
            progress.as_ref(),
        )?;
        print_roads_summary(&summary);
    }

    if run_type.address_points() {
        let source = DuckDbAddressPointSource::open(
            &config.address_points.path,
            &config.address_points.table,
        )?;
        let progress = IndicatifProgress::records_bar(multi, "Cross-checking address points");
        let summary = grind_address_points(&source, &mut workspace, &mut sink, progress.as_ref())?;
        print_address_points_summary(&summary);
    }

    Ok(())
}

fn require_file(label: &str, path: &Path) -> Result<(), GrindError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(GrindError::Precondition {
            message: format!("{label} {} does not exist", path.display()),
        })
    }
}

fn print_roads_summary(summary: &RoadsSummary) {
    println!();
    println!("Road alternate names");
    println!("{}", "-".repeat(40));
    println!("{:<28} {:>10}", "Segments read", summary.segments_read);
    println!("{:<28} {:>10}", "Segments skipped", summary.segments_skipped);
    println!("{:<28} {:>10}", "Records failed", summary.records_failed);
    println!("{:<28} {:>10}", "Geocode records", summary.geocode_written);
    println!("{:<28} {:>10}", "Scratch records", summary.scratch_written);
    println!("{:<28} {:>10}", "Candidates evaluated", summary.candidates_evaluated);
    println!("{:<28} {:>10}", "Alt names written", summary.kept);
    println!("{:<28} {:>10}", "Duplicates suppressed", summary.suppressed);
    println!("{:<28} {:>10}", "Alt names failed", summary.alt_names_failed);
}

fn print_address_points_summary(summary: &AddressPointsSummary) {
    println!();
    println!("Address point alternate names");
    println!("{}", "-".repeat(40));
    println!("{:<28} {:>10}", "Candidates", summary.candidates);
    println!("{:<28} {:>10}", "Written", summary.written);
    println!("{:<28} {:>10}", "Failed", summary.failed);
}
