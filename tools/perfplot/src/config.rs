//! Report configuration loaded from `perfplot.toml`.
//!
//! Defaults match the layout the Newton `auto_test` harness writes: ten test
//! cases, six range-extension levels, ten parameter intervals and four
//! metrics per row. Every stage receives the resolved [`ReportConfig`]
//! explicitly.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{ReportError, Result};
use crate::layout::{RecordLayout, SampleKind};

/// Configuration file looked up in the working directory when `--config`
/// is not given.
pub const DEFAULT_CONFIG_FILE: &str = "perfplot.toml";

/// Image encoding of rendered figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Raster PNG.
    #[default]
    Png,
    /// Vector SVG.
    Svg,
}

impl ImageFormat {
    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Svg => "svg",
        }
    }
}

/// Built-in layouts of the logs the harness writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutPreset {
    /// `perf.log`: baseline, optimized and speedup rows per parameter.
    PerfLog,
    /// `average_speedup.log`: one speedup row per range level.
    AverageSpeedupLog,
    /// `result.log`: a baseline/optimized pair per test case.
    ResultLog,
}

/// Positional layout of the input log.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutConfig {
    /// Start from a built-in layout; the positional keys below are ignored.
    pub preset: Option<LayoutPreset>,
    /// Row kinds of one record group, in file order.
    pub rows: Vec<SampleKind>,
    /// Column holding the test case name.
    pub name_column: usize,
    /// Column holding the parameter label.
    pub param_column: Option<usize>,
    /// Column of the first metric.
    pub first_metric_column: usize,
    /// Leading header rows.
    pub header_rows: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            preset: None,
            rows: vec![
                SampleKind::Baseline,
                SampleKind::Optimized,
                SampleKind::SpeedupPct,
            ],
            name_column: 0,
            param_column: Some(1),
            first_metric_column: 2,
            header_rows: 1,
        }
    }
}

/// Display settings of one metric.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSpec<'a> {
    /// Axis label, also used in file names.
    pub label: &'a str,
    /// Divisor applied to raw values before plotting.
    pub unit: f64,
    /// Fixed bar chart Y bounds, if configured.
    pub range: Option<(f64, f64)>,
}

/// Resolved configuration of one report run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    /// Hardware target the logs were produced on.
    pub platform: String,
    /// Directory receiving figures and log copies.
    pub output_dir: PathBuf,
    /// Log decoded into tensors.
    pub input: PathBuf,
    /// Logs copied into the output directory.
    pub bundle_logs: Vec<PathBuf>,
    /// Whether to write `<output_dir>.tar.gz`.
    pub archive: bool,
    /// Figure encoding.
    pub format: ImageFormat,
    /// Draw heatmaps as `[param, range_extend]` instead of
    /// `[range_extend, param]`.
    pub transpose_heatmap: bool,
    /// Prefix stripped from harness test case names for display.
    pub test_case_prefix: String,
    /// Number of parameter intervals.
    pub params_num: usize,
    /// Number of test cases.
    pub test_case_num: usize,
    /// Number of range-extension levels.
    pub range_extend_num: usize,
    /// Number of metrics per row.
    pub merit_num: usize,
    /// Range-extension multipliers, in sweep order.
    pub range_extend: Vec<f64>,
    /// Per-metric divisor applied before plotting.
    pub y_units: Vec<f64>,
    /// Per-metric axis label.
    pub y_labels: Vec<String>,
    /// Per-metric bar chart bounds; empty means automatic.
    pub y_ranges: Vec<[f64; 2]>,
    /// Positional layout of `input`.
    pub layout: LayoutConfig,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            platform: std::env::consts::ARCH.to_string(),
            output_dir: PathBuf::from("fig"),
            input: PathBuf::from("perf.log"),
            bundle_logs: vec![
                PathBuf::from("perf.log"),
                PathBuf::from("average_speedup.log"),
            ],
            archive: true,
            format: ImageFormat::Png,
            transpose_heatmap: false,
            test_case_prefix: "perf_".to_string(),
            params_num: 10,
            test_case_num: 10,
            range_extend_num: 6,
            merit_num: 4,
            range_extend: vec![1.0, 10.0, 100.0, 1000.0, 10000.0, 100_000.0],
            y_units: vec![1.0, 1.0, 1.0, 1.0],
            y_labels: vec![
                "instruction count".to_string(),
                "time (s)".to_string(),
                "IR lines".to_string(),
                "library size (bytes)".to_string(),
            ],
            y_ranges: Vec::new(),
            layout: LayoutConfig::default(),
        }
    }
}

impl ReportConfig {
    /// Load configuration from `path`, or from [`DEFAULT_CONFIG_FILE`] in the
    /// working directory if it exists, or fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };
        let content =
            std::fs::read_to_string(&path).map_err(|e| ReportError::io("reading", &path, e))?;
        Self::from_toml(&content)
            .map_err(|e| ReportError::Config(format!("{}: {e}", path.display())))
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ReportError::Config(e.to_string()))
    }

    /// Check cross-field consistency.
    pub fn validate(&self) -> Result<()> {
        self.record_layout().validate()?;

        if self.range_extend.len() != self.range_extend_num {
            return Err(ReportError::Config(format!(
                "range_extend lists {} levels but range_extend_num is {}",
                self.range_extend.len(),
                self.range_extend_num
            )));
        }
        if self.y_labels.len() != self.merit_num {
            return Err(ReportError::Config(format!(
                "y_labels has {} entries but merit_num is {}",
                self.y_labels.len(),
                self.merit_num
            )));
        }
        if self.y_units.len() != self.merit_num {
            return Err(ReportError::Config(format!(
                "y_units has {} entries but merit_num is {}",
                self.y_units.len(),
                self.merit_num
            )));
        }
        if let Some(idx) = self.y_units.iter().position(|&u| u == 0.0 || !u.is_finite()) {
            return Err(ReportError::Config(format!(
                "y_units[{idx}] must be a finite non-zero divisor"
            )));
        }
        if !self.y_ranges.is_empty() && self.y_ranges.len() != self.merit_num {
            return Err(ReportError::Config(format!(
                "y_ranges has {} entries but merit_num is {}",
                self.y_ranges.len(),
                self.merit_num
            )));
        }
        if let Some(idx) = self.y_ranges.iter().position(|[lo, hi]| lo >= hi) {
            return Err(ReportError::Config(format!(
                "y_ranges[{idx}] must have min < max"
            )));
        }
        if self.platform.trim().is_empty() {
            return Err(ReportError::Config("platform must not be empty".into()));
        }
        Ok(())
    }

    /// Record layout of `input`.
    pub fn record_layout(&self) -> RecordLayout {
        if let Some(preset) = self.layout.preset {
            let base = match preset {
                LayoutPreset::PerfLog => RecordLayout::perf_log(
                    self.test_case_num,
                    self.range_extend_num,
                    self.params_num,
                ),
                LayoutPreset::AverageSpeedupLog => {
                    RecordLayout::average_speedup_log(self.test_case_num, self.range_extend_num)
                }
                LayoutPreset::ResultLog => RecordLayout::result_log(self.test_case_num),
            };
            return RecordLayout {
                merit_num: self.merit_num,
                ..base
            };
        }
        RecordLayout {
            test_case_num: self.test_case_num,
            range_extend_num: self.range_extend_num,
            params_num: self.params_num,
            merit_num: self.merit_num,
            group: self.layout.rows.clone(),
            name_column: self.layout.name_column,
            param_column: self.layout.param_column,
            first_metric_column: self.layout.first_metric_column,
            header_rows: self.layout.header_rows,
        }
    }

    /// Record layout of an `average_speedup.log` produced by the same sweep.
    pub fn summary_layout(&self) -> RecordLayout {
        RecordLayout {
            merit_num: self.merit_num,
            ..RecordLayout::average_speedup_log(self.test_case_num, self.range_extend_num)
        }
    }

    /// Display settings of metric `m`.
    pub fn metric(&self, m: usize) -> MetricSpec<'_> {
        MetricSpec {
            label: &self.y_labels[m],
            unit: self.y_units[m],
            range: self.y_ranges.get(m).map(|[lo, hi]| (*lo, *hi)),
        }
    }

    /// Test case name as shown in figures.
    pub fn display_name<'a>(&self, raw: &'a str) -> &'a str {
        if self.test_case_prefix.is_empty() {
            return raw;
        }
        raw.strip_prefix(self.test_case_prefix.as_str())
            .filter(|rest| !rest.is_empty())
            .unwrap_or(raw)
    }

    /// Tick labels of the range-extension axis.
    pub fn range_labels(&self) -> Vec<String> {
        self.range_extend.iter().map(|v| format!("{v}")).collect()
    }
}
