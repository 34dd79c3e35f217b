//! Benchmark report generator.
//!
//! Turns the tab-delimited logs of the optimization test harness into
//! heatmaps, grouped bar charts, a JSON summary and a reproducible archive.
//!
//! Pipeline: read log → decode fixed-stride records → build tensors and
//!           aggregates → render figures → bundle the output directory.

mod aggregate;
mod bundle;
mod cli;
mod config;
mod error;
mod layout;
mod log_reader;
mod output;
mod render;
mod report_cmd;
mod stride;
mod tensor;
mod verbose;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    verbose::init(cli.quiet, cli.verbose);

    let config = config::ReportConfig::load(cli.config.as_deref())?;

    match cli.command {
        cli::Command::Report(ref args) => report_cmd::cmd_report(config, args),
        cli::Command::Compare(ref args) => report_cmd::cmd_compare(config, args),
        cli::Command::Clean(ref args) => report_cmd::cmd_clean(config, args),
    }
}
