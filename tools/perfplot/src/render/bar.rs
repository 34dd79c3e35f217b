//! Grouped bar charts.
//!
//! One group of bars per category (test case), one bar per series, in input
//! order. Used for baseline vs. optimized measurements of a metric and for
//! cross-platform speedup comparisons.

use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;

use super::{
    Artifact, CAPTION_FONT, DrawResult, Figure, LABEL_FONT, category_label, render_figure,
};
use crate::config::{ImageFormat, MetricSpec};
use crate::error::{ReportError, Result};

/// Baseline bar color.
pub const BASELINE_COLOR: RGBColor = RGBColor(0xfd, 0xb8, 0x63);
/// Optimized bar color.
pub const OPTIMIZED_COLOR: RGBColor = RGBColor(0xe6, 0x61, 0x01);

/// Colors cycled through for per-platform series.
const PLATFORM_COLORS: [RGBColor; 4] = [
    RGBColor(0xe6, 0x61, 0x01),
    RGBColor(0x7b, 0x32, 0x94),
    RGBColor(0x1b, 0x78, 0x37),
    RGBColor(0x21, 0x66, 0xac),
];

/// Fraction of a category slot covered by its bars.
const GROUP_WIDTH: f64 = 0.7;

/// One series of a grouped bar chart.
#[derive(Debug, Clone)]
pub struct BarSeries {
    /// Legend label.
    pub label: String,
    /// Fill color.
    pub color: RGBColor,
    /// One value per category.
    pub values: Vec<f64>,
}

/// A grouped bar chart.
#[derive(Debug, Clone)]
pub struct BarChart {
    /// Caption.
    pub title: String,
    /// Y axis description.
    pub y_label: String,
    /// Category labels along X, in input order.
    pub categories: Vec<String>,
    /// Series, drawn left to right inside each group.
    pub series: Vec<BarSeries>,
    /// Fixed Y bounds; computed from the data when absent.
    pub y_range: Option<(f64, f64)>,
    /// Values are percentages (axis formatted with `%`).
    pub percentage: bool,
}

impl BarChart {
    fn check_shape(&self) -> Result<()> {
        if self.categories.is_empty() || self.series.is_empty() {
            return Err(ReportError::ShapeMismatch {
                what: self.title.clone(),
                detail: "bar chart needs at least one category and one series".into(),
            });
        }
        for series in &self.series {
            if series.values.len() != self.categories.len() {
                return Err(ReportError::ShapeMismatch {
                    what: self.title.clone(),
                    detail: format!(
                        "series `{}` has {} values for {} categories",
                        series.label,
                        series.values.len(),
                        self.categories.len()
                    ),
                });
            }
        }
        Ok(())
    }

    /// Y bounds: the configured range, or padded data extremes.
    fn bounds(&self) -> (f64, f64) {
        if let Some(range) = self.y_range {
            return range;
        }
        let values = self
            .series
            .iter()
            .flat_map(|s| s.values.iter().copied())
            .filter(|v| v.is_finite());
        let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        if !min.is_finite() {
            return (0.0, 1.0);
        }
        let (lo, hi) = if self.percentage {
            ((min * 1.1).min(-5.0), (max * 1.1).max(5.0))
        } else {
            let lo = if min >= 0.0 { min * 0.8 } else { min * 1.1 };
            let hi = if max > 0.0 { max * 1.1 } else { max * 0.9 };
            (lo, hi)
        };
        if hi > lo { (lo, hi) } else { (lo, lo + 1.0) }
    }
}

impl Figure for BarChart {
    fn size(&self) -> (u32, u32) {
        let width = 240 + 90 * self.categories.len() as u32 * self.series.len().max(2) as u32 / 2;
        (width.clamp(640, 2400), 600)
    }

    fn draw<DB>(&self, root: &DrawingArea<DB, Shift>, text: bool) -> DrawResult
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        root.fill(&WHITE)?;

        let n = self.categories.len();
        let (lo, hi) = self.bounds();
        let base = 0.0f64.clamp(lo, hi);

        let mut builder = ChartBuilder::on(root);
        builder.margin(16);
        if text {
            builder
                .caption(&self.title, CAPTION_FONT)
                .x_label_area_size(60)
                .y_label_area_size(80);
        }
        let mut chart = builder.build_cartesian_2d(-0.5f64..n as f64 - 0.5, lo..hi)?;

        if text {
            let categories = &self.categories;
            let percentage = self.percentage;
            chart
                .configure_mesh()
                .disable_x_mesh()
                .y_desc(self.y_label.as_str())
                .label_style(LABEL_FONT)
                // n + 1 keeps the tick step at one category.
                .x_labels(n + 1)
                .x_label_formatter(&|x| category_label(categories, *x))
                .y_label_formatter(&|y| {
                    if percentage {
                        format!("{y:.0}%")
                    } else {
                        format!("{y}")
                    }
                })
                .draw()?;
        }

        let k = self.series.len();
        let width = GROUP_WIDTH / k as f64;
        for (s, series) in self.series.iter().enumerate() {
            let offset = (s as f64 - (k as f64 - 1.0) / 2.0) * width;
            let color = series.color;
            let bars = series.values.iter().enumerate().map(|(i, &v)| {
                let center = i as f64 + offset;
                let top = if v.is_finite() { v.clamp(lo, hi) } else { base };
                Rectangle::new(
                    [(center - width / 2.0, base), (center + width / 2.0, top)],
                    color.filled(),
                )
            });
            let anno = chart.draw_series(bars)?;
            if text {
                anno.label(series.label.as_str()).legend(move |(x, y)| {
                    Rectangle::new([(x, y - 5), (x + 14, y + 5)], color.filled())
                });
            }
        }

        if text {
            chart
                .configure_series_labels()
                .label_font(LABEL_FONT)
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .position(SeriesLabelPosition::UpperRight)
                .draw()?;
        }
        Ok(())
    }
}

/// Render the baseline vs. optimized chart of one metric.
///
/// `baseline[i]` and `optimized[i]` belong to `names[i]`; raw values are
/// divided by the metric's unit before plotting.
pub fn render_metric_bars(
    dir: &Path,
    platform: &str,
    metric: &MetricSpec<'_>,
    names: &[String],
    baseline: &[f64],
    optimized: &[f64],
    format: ImageFormat,
) -> Result<Artifact> {
    let scale = |values: &[f64]| values.iter().map(|v| v / metric.unit).collect::<Vec<_>>();
    let chart = BarChart {
        title: format!("{platform}-{}", metric.label),
        y_label: metric.label.to_string(),
        categories: names.to_vec(),
        series: vec![
            BarSeries {
                label: "basic performance".into(),
                color: BASELINE_COLOR,
                values: scale(baseline),
            },
            BarSeries {
                label: "optimized performance".into(),
                color: OPTIMIZED_COLOR,
                values: scale(optimized),
            },
        ],
        y_range: metric.range,
        percentage: false,
    };
    chart.check_shape()?;

    let path = dir.join(super::bar_chart_file_name(platform, metric.label, format));
    render_figure(&chart, &path, format)?;
    Ok(Artifact {
        path,
        title: chart.title,
        data: chart.series.into_iter().map(|s| s.values).collect(),
    })
}

/// Render mean speedups of several platforms side by side for one metric.
///
/// `platforms` pairs a platform name with one percentage per test case.
pub fn render_platform_comparison(
    dir: &Path,
    metric_label: &str,
    names: &[String],
    platforms: &[(String, Vec<f64>)],
    format: ImageFormat,
) -> Result<Artifact> {
    let chart = BarChart {
        title: format!("speedup comparison: {metric_label}"),
        y_label: format!("{metric_label} speedup"),
        categories: names.to_vec(),
        series: platforms
            .iter()
            .enumerate()
            .map(|(i, (platform, values))| BarSeries {
                label: platform.clone(),
                color: PLATFORM_COLORS[i % PLATFORM_COLORS.len()],
                values: values.clone(),
            })
            .collect(),
        y_range: None,
        percentage: true,
    };
    chart.check_shape()?;

    let path = dir.join(super::comparison_file_name(metric_label, format));
    render_figure(&chart, &path, format)?;
    Ok(Artifact {
        path,
        title: chart.title,
        data: chart.series.into_iter().map(|s| s.values).collect(),
    })
}
