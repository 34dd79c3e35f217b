//! CLI entry points for `perfplot report`, `compare` and `clean`.
//!
//! Bridges the pipeline stages (log reader, stride indexer, tensor builder,
//! aggregator, renderer, bundler) to the command-line interface. Stages run
//! sequentially; the output directory is prepared before the first render
//! and finished after the last.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use crate::aggregate::{self, AggregateResult, Summary};
use crate::bundle::{self, Bundle};
use crate::cli::{CleanArgs, CompareArgs, ReportArgs};
use crate::config::ReportConfig;
use crate::error::ReportError;
use crate::layout::{RecordLayout, SampleKind};
use crate::log_reader;
use crate::output;
use crate::render::Artifact;
use crate::render::bar::{render_metric_bars, render_platform_comparison};
use crate::render::heatmap::{HeatmapSpec, render_heatmap};
use crate::stride::{self, DecodedLog};
use crate::tensor::MetricTensor;
use crate::verbose::{Timer, dprintln, vprintln};

/// File name of the serialized aggregate table inside the output directory.
pub const SUMMARY_FILE: &str = "summary.json";

/// Everything a finished report run produced.
#[derive(Debug)]
pub struct ReportOutcome {
    /// Figures in render order.
    pub artifacts: Vec<Artifact>,
    /// Mean speedups, empty when the log carries no speedup rows.
    pub aggregates: Vec<AggregateResult>,
    /// The finished output directory.
    pub bundle: Bundle,
}

/// `perfplot report`: apply overrides, run the pipeline, print the summary.
pub fn cmd_report(mut config: ReportConfig, args: &ReportArgs) -> Result<()> {
    apply_overrides(&mut config, args);
    let outcome = run_report(&config)
        .with_context(|| format!("reporting on {}", config.input.display()))?;

    if !outcome.aggregates.is_empty() {
        output::print_aggregate_table(&config.y_labels, &outcome.aggregates);
    }
    println!(
        "{} figure(s) and {} log(s) written to {}",
        outcome.artifacts.len(),
        outcome.bundle.logs.len(),
        outcome.bundle.dir.display()
    );
    if let Some(archive) = &outcome.bundle.archive {
        println!("archive: {}", archive.display());
    }
    Ok(())
}

fn apply_overrides(config: &mut ReportConfig, args: &ReportArgs) {
    if let Some(input) = &args.input {
        config.input.clone_from(input);
    }
    if let Some(output) = &args.output {
        config.output_dir.clone_from(output);
    }
    if let Some(platform) = &args.platform {
        config.platform.clone_from(platform);
    }
    if let Some(format) = args.format {
        config.format = format;
    }
    if args.no_archive {
        config.archive = false;
    }
}

/// Run the full pipeline for `config`.
pub fn run_report(config: &ReportConfig) -> crate::error::Result<ReportOutcome> {
    let _t = Timer::start("report");
    config.validate()?;

    let layout = config.record_layout();
    let rows = log_reader::read_log(&config.input)?;
    let decoded = {
        let _t = Timer::start(format!("decoding {}", config.input.display()));
        stride::decode(&rows, &layout)?
    };
    let names: Vec<String> = decoded
        .test_cases
        .iter()
        .map(|raw| config.display_name(raw).to_string())
        .collect();

    let logs = bundle_logs(config)?;
    bundle::prepare_output_dir(&config.output_dir, &logs)?;
    dprintln!("Rendering into {}...", config.output_dir.display());

    let mut artifacts = Vec::new();
    if layout.has_kind(SampleKind::Baseline) && layout.has_kind(SampleKind::Optimized) {
        let _t = Timer::start("bar charts");
        artifacts.extend(render_bars(config, &decoded, &names)?);
    }

    let mut aggregates = Vec::new();
    if layout.has_kind(SampleKind::SpeedupPct) {
        {
            let _t = Timer::start("heatmaps");
            artifacts.extend(render_heatmaps(config, &decoded, &names)?);
        }
        aggregates = aggregate::aggregate(&decoded, &layout, &names)?;
        let summary = Summary {
            platform: config.platform.clone(),
            metrics: config.y_labels.clone(),
            results: aggregates.clone(),
        };
        aggregate::save_summary(&summary, &config.output_dir.join(SUMMARY_FILE))?;
    }

    let bundle = bundle::finish(&config.output_dir, &logs, config.archive)?;
    Ok(ReportOutcome {
        artifacts,
        aggregates,
        bundle,
    })
}

/// Logs to copy into the output directory: the decoded input followed by
/// the configured list.
///
/// Every log must exist. A log listed twice is copied once; two different
/// logs with the same file name are a conflict.
fn bundle_logs(config: &ReportConfig) -> crate::error::Result<Vec<PathBuf>> {
    let mut logs: Vec<PathBuf> = Vec::new();
    for log in std::iter::once(&config.input).chain(&config.bundle_logs) {
        let canonical =
            std::fs::canonicalize(log).map_err(|e| ReportError::io("copying", log, e))?;
        match logs.iter().find(|l| l.file_name() == log.file_name()) {
            Some(seen) if std::fs::canonicalize(seen).is_ok_and(|p| p == canonical) => {}
            Some(seen) => {
                return Err(ReportError::Config(format!(
                    "bundle logs `{}` and `{}` share a file name",
                    seen.display(),
                    log.display()
                )));
            }
            None => logs.push(log.clone()),
        }
    }
    Ok(logs)
}

fn render_bars(
    config: &ReportConfig,
    decoded: &DecodedLog,
    names: &[String],
) -> crate::error::Result<Vec<Artifact>> {
    let shape = config.record_layout().shape();
    let mut artifacts = Vec::with_capacity(config.merit_num);
    for m in 0..config.merit_num {
        let baseline = MetricTensor::build(&decoded.samples, SampleKind::Baseline, m, shape)?;
        let optimized = MetricTensor::build(&decoded.samples, SampleKind::Optimized, m, shape)?;
        let means = |tensor: &MetricTensor| {
            (0..shape[0])
                .map(|t| tensor.plane_mean(t))
                .collect::<Vec<_>>()
        };
        let artifact = render_metric_bars(
            &config.output_dir,
            &config.platform,
            &config.metric(m),
            names,
            &means(&baseline),
            &means(&optimized),
            config.format,
        )?;
        dprintln!("  wrote {}", artifact.path.display());
        artifacts.push(artifact);
    }
    Ok(artifacts)
}

fn render_heatmaps(
    config: &ReportConfig,
    decoded: &DecodedLog,
    names: &[String],
) -> crate::error::Result<Vec<Artifact>> {
    let shape = config.record_layout().shape();
    let range_labels = config.range_labels();
    let mut artifacts = Vec::with_capacity(config.merit_num * names.len());
    for m in 0..config.merit_num {
        let speedup = MetricTensor::build(&decoded.samples, SampleKind::SpeedupPct, m, shape)?;
        vprintln!(
            "  {} tensor of metric {}: {:?}",
            speedup.kind().as_str(),
            speedup.metric(),
            speedup.shape()
        );
        for (t, name) in names.iter().enumerate() {
            let spec = HeatmapSpec {
                platform: &config.platform,
                test_case: name,
                metric_label: &config.y_labels[speedup.metric()],
                range_labels: &range_labels,
                param_labels: &decoded.params,
                transpose: config.transpose_heatmap,
            };
            let artifact =
                render_heatmap(&config.output_dir, &spec, &speedup.plane(t), config.format)?;
            vprintln!("  wrote {}", artifact.path.display());
            artifacts.push(artifact);
        }
    }
    dprintln!("  wrote {} heatmap(s)", artifacts.len());
    Ok(artifacts)
}

/// `perfplot compare`: one grouped bar chart per metric with every
/// platform's mean speedups side by side.
pub fn cmd_compare(mut config: ReportConfig, args: &CompareArgs) -> Result<()> {
    if let Some(output) = &args.output {
        config.output_dir.clone_from(output);
    }
    if let Some(format) = args.format {
        config.format = format;
    }
    if args.logs.len() < 2 {
        bail!("compare needs at least two --log PLATFORM=PATH pairs");
    }
    config.validate()?;

    let artifacts = run_compare(&config, &args.logs)?;
    println!(
        "{} comparison figure(s) written to {}",
        artifacts.len(),
        config.output_dir.display()
    );
    Ok(())
}

/// Aggregate each platform's speedups and render comparisons.
///
/// Figures are added to the output directory, which is created if needed.
pub fn run_compare(config: &ReportConfig, logs: &[(String, PathBuf)]) -> Result<Vec<Artifact>> {
    let layout = config.summary_layout();
    let mut names: Option<Vec<String>> = None;
    let mut per_platform: Vec<(String, Vec<AggregateResult>)> = Vec::with_capacity(logs.len());

    for (platform, path) in logs {
        let results = platform_results(config, &layout, path)
            .with_context(|| format!("loading {platform} speedups"))?;
        let display: Vec<String> = results.iter().map(|r| r.test_case.clone()).collect();
        let expected = names.get_or_insert_with(|| display.clone());
        if *expected != display {
            bail!(
                "{} lists test cases {display:?}, expected {expected:?}",
                path.display()
            );
        }
        per_platform.push((platform.clone(), results));
    }
    let names = names.unwrap_or_default();

    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("creating {}", config.output_dir.display()))?;

    let mut artifacts = Vec::with_capacity(config.merit_num);
    for m in 0..config.merit_num {
        let series: Vec<(String, Vec<f64>)> = per_platform
            .iter()
            .map(|(platform, results)| {
                (platform.clone(), results.iter().map(|r| r.mean_pct[m]).collect())
            })
            .collect();
        let artifact = render_platform_comparison(
            &config.output_dir,
            &config.y_labels[m],
            &names,
            &series,
            config.format,
        )?;
        dprintln!("  wrote {}", artifact.path.display());
        artifacts.push(artifact);
    }
    Ok(artifacts)
}

/// Mean speedups of one platform, from its `average_speedup.log` or from a
/// `summary.json` written by an earlier report.
fn platform_results(
    config: &ReportConfig,
    layout: &RecordLayout,
    path: &Path,
) -> crate::error::Result<Vec<AggregateResult>> {
    if path.extension().is_some_and(|ext| ext == "json") {
        let summary = aggregate::load_summary(path)?;
        if let Some(row) = summary.results.iter().find(|r| r.mean_pct.len() != config.merit_num) {
            return Err(ReportError::Config(format!(
                "{}: `{}` has {} metrics, merit_num is {}",
                path.display(),
                row.test_case,
                row.mean_pct.len(),
                config.merit_num
            )));
        }
        return Ok(summary.results);
    }
    let rows = log_reader::read_log(path)?;
    let decoded = stride::decode(&rows, layout)?;
    let names: Vec<String> = decoded
        .test_cases
        .iter()
        .map(|raw| config.display_name(raw).to_string())
        .collect();
    aggregate::aggregate(&decoded, layout, &names)
}

/// `perfplot clean`: remove the output directory and its archive.
pub fn cmd_clean(mut config: ReportConfig, args: &CleanArgs) -> Result<()> {
    if let Some(output) = &args.output {
        config.output_dir.clone_from(output);
    }
    let keep: Vec<PathBuf> = std::iter::once(&config.input)
        .chain(&config.bundle_logs)
        .cloned()
        .collect();
    if bundle::clean(&config.output_dir, &keep)? {
        println!("Removed {}", config.output_dir.display());
    } else {
        dprintln!("Nothing to clean at {}", config.output_dir.display());
    }
    Ok(())
}
