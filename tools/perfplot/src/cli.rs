//! Command-line interface definitions for perfplot.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::ImageFormat;

/// Benchmark log aggregation and report rendering.
#[derive(Parser)]
#[command(name = "perfplot", version, about)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (defaults to `perfplot.toml` if present).
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Show only warnings, errors and the final summary.
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Enable verbose output with stage timings and bundle checksums.
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Command {
    /// Decode a benchmark log and render the full report.
    Report(ReportArgs),
    /// Compare mean speedups of several platforms.
    Compare(CompareArgs),
    /// Remove the output directory and its archive.
    Clean(CleanArgs),
}

/// Arguments for the `report` subcommand.
#[derive(Parser, Debug, Default)]
pub struct ReportArgs {
    /// Log to decode (overrides `input`).
    #[arg(long, short = 'i')]
    pub input: Option<PathBuf>,

    /// Output directory (overrides `output_dir`).
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Platform name used in titles and file names.
    #[arg(long)]
    pub platform: Option<String>,

    /// Image format of rendered figures.
    #[arg(long, value_enum)]
    pub format: Option<ImageFormat>,

    /// Skip writing `<output>.tar.gz`.
    #[arg(long)]
    pub no_archive: bool,
}

/// Arguments for the `compare` subcommand.
#[derive(Parser, Debug)]
pub struct CompareArgs {
    /// `PLATFORM=PATH` pairs naming an `average_speedup.log` or a report's
    /// `summary.json` per platform.
    #[arg(long = "log", value_name = "PLATFORM=PATH", required = true, value_parser = parse_platform_log)]
    pub logs: Vec<(String, PathBuf)>,

    /// Output directory (overrides `output_dir`).
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Image format of rendered figures.
    #[arg(long, value_enum)]
    pub format: Option<ImageFormat>,
}

/// Arguments for the `clean` subcommand.
#[derive(Parser, Debug)]
pub struct CleanArgs {
    /// Output directory (overrides `output_dir`).
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

fn parse_platform_log(arg: &str) -> Result<(String, PathBuf), String> {
    let (platform, path) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected PLATFORM=PATH, got `{arg}`"))?;
    if platform.is_empty() || path.is_empty() {
        return Err(format!("expected PLATFORM=PATH, got `{arg}`"));
    }
    Ok((platform.to_string(), PathBuf::from(path)))
}
