//! Annotated speedup heatmaps.
//!
//! A heatmap shows one `[range_extend, param]` plane of a speedup tensor.
//! Cells are colored on a diverging scale centered at zero (regressions red,
//! improvements blue) and annotated with their percentage.

use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use super::{
    Artifact, CAPTION_FONT, DrawResult, Figure, LABEL_FONT, category_label, render_figure,
};
use crate::config::ImageFormat;
use crate::error::{ReportError, Result};
use crate::tensor::transpose;

const NEGATIVE: RGBColor = RGBColor(178, 24, 43);
const POSITIVE: RGBColor = RGBColor(33, 102, 172);

/// Width reserved for the color legend.
const LEGEND_WIDTH: u32 = 140;
/// Gradient steps of the color legend.
const LEGEND_STEPS: usize = 100;

/// Labels and placement of one heatmap.
#[derive(Debug, Clone, Copy)]
pub struct HeatmapSpec<'a> {
    /// Platform the log was produced on.
    pub platform: &'a str,
    /// Test case display name.
    pub test_case: &'a str,
    /// Metric label.
    pub metric_label: &'a str,
    /// Range-extension tick labels.
    pub range_labels: &'a [String],
    /// Parameter tick labels.
    pub param_labels: &'a [String],
    /// Draw `[param, range_extend]` instead of `[range_extend, param]`.
    pub transpose: bool,
}

/// A grid of fractional speedups, row 0 drawn at the top.
#[derive(Debug, Clone)]
pub struct Heatmap {
    /// Caption.
    pub title: String,
    /// Row tick labels.
    pub row_labels: Vec<String>,
    /// Column tick labels.
    pub col_labels: Vec<String>,
    /// Y axis description.
    pub row_desc: String,
    /// X axis description.
    pub col_desc: String,
    /// Values as fractions (0.25 is 25%), indexed `[row][col]`.
    pub cells: Vec<Vec<f64>>,
}

impl Heatmap {
    fn rows(&self) -> usize {
        self.cells.len()
    }

    fn cols(&self) -> usize {
        self.cells.first().map_or(0, Vec::len)
    }

    /// Largest finite magnitude, floored so an all-zero plane still scales.
    fn scale(&self) -> f64 {
        self.cells
            .iter()
            .flatten()
            .filter(|v| v.is_finite())
            .fold(1e-6, |acc: f64, v| acc.max(v.abs()))
    }
}

/// Map `value` in `[-scale, scale]` onto the diverging palette.
pub fn diverging_color(value: f64, scale: f64) -> RGBColor {
    if !value.is_finite() || scale <= 0.0 {
        return RGBColor(200, 200, 200);
    }
    let t = (value / scale).clamp(-1.0, 1.0);
    let target = if t < 0.0 { NEGATIVE } else { POSITIVE };
    let w = t.abs();
    let blend = |end: u8| (255.0 + (f64::from(end) - 255.0) * w).round() as u8;
    RGBColor(blend(target.0), blend(target.1), blend(target.2))
}

impl Figure for Heatmap {
    fn size(&self) -> (u32, u32) {
        let width = 160 + 70 * self.cols() as u32 + LEGEND_WIDTH;
        let height = 140 + 48 * self.rows() as u32;
        (width.clamp(480, 2400), height.clamp(320, 1800))
    }

    fn draw<DB>(&self, root: &DrawingArea<DB, Shift>, text: bool) -> DrawResult
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        root.fill(&WHITE)?;
        let (width, _) = root.dim_in_pixel();
        let (grid_area, legend_area) =
            root.split_horizontally(width.saturating_sub(LEGEND_WIDTH) as i32);

        let rows = self.rows();
        let cols = self.cols();
        let scale = self.scale();

        let mut builder = ChartBuilder::on(&grid_area);
        builder.margin(12);
        if text {
            builder
                .caption(&self.title, CAPTION_FONT)
                .x_label_area_size(50)
                .y_label_area_size(80);
        }
        // Cell (r, c) is centered on integer coordinates so ticks land on labels.
        let mut chart =
            builder.build_cartesian_2d(-0.5f64..cols as f64 - 0.5, -0.5f64..rows as f64 - 0.5)?;

        // Row 0 is drawn at the top.
        let flip = |r: usize| (rows - 1 - r) as f64;
        let row_labels: Vec<String> = self.row_labels.iter().rev().cloned().collect();

        if text {
            chart
                .configure_mesh()
                .disable_mesh()
                .x_desc(self.col_desc.as_str())
                .y_desc(self.row_desc.as_str())
                .label_style(LABEL_FONT)
                .x_labels(cols + 1)
                .y_labels(rows + 1)
                .x_label_formatter(&|x| category_label(&self.col_labels, *x))
                .y_label_formatter(&|y| category_label(&row_labels, *y))
                .draw()?;
        }

        for (r, row) in self.cells.iter().enumerate() {
            let y = flip(r);
            chart.draw_series(row.iter().enumerate().map(|(c, &v)| {
                let x = c as f64;
                Rectangle::new(
                    [(x - 0.5, y - 0.5), (x + 0.5, y + 0.5)],
                    diverging_color(v, scale).filled(),
                )
            }))?;
        }

        if text {
            let style = LABEL_FONT
                .into_font()
                .color(&BLACK)
                .pos(Pos::new(HPos::Center, VPos::Center));
            for (r, row) in self.cells.iter().enumerate() {
                let y = flip(r);
                chart.draw_series(row.iter().enumerate().map(|(c, &v)| {
                    Text::new(format!("{:.1}%", v * 100.0), (c as f64, y), style.clone())
                }))?;
            }
        }

        let pct = scale * 100.0;
        let mut legend_builder = ChartBuilder::on(&legend_area);
        legend_builder
            .margin_top(60)
            .margin_bottom(60)
            .margin_left(16)
            .margin_right(16);
        if text {
            legend_builder.y_label_area_size(56);
        }
        let mut legend = legend_builder.build_cartesian_2d(0f64..1.0, -pct..pct)?;
        if text {
            legend
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .disable_x_axis()
                .label_style(LABEL_FONT)
                .y_label_formatter(&|y| format!("{y:.0}%"))
                .draw()?;
        }
        let step = 2.0 * pct / LEGEND_STEPS as f64;
        legend.draw_series((0..LEGEND_STEPS).map(|i| {
            let y0 = -pct + step * i as f64;
            let color = diverging_color((y0 + step / 2.0) / 100.0, scale);
            Rectangle::new([(0.0, y0), (1.0, y0 + step)], color.filled())
        }))?;
        Ok(())
    }
}

/// Render one heatmap of `plane` (indexed `[range_extend][param]`) into `dir`.
pub fn render_heatmap(
    dir: &Path,
    spec: &HeatmapSpec<'_>,
    plane: &[Vec<f64>],
    format: ImageFormat,
) -> Result<Artifact> {
    let title = super::heatmap_title(spec.platform, spec.test_case, spec.metric_label);
    let ragged = plane.iter().any(|row| row.len() != spec.param_labels.len());
    if plane.len() != spec.range_labels.len() || ragged || plane.is_empty() {
        return Err(ReportError::ShapeMismatch {
            what: title,
            detail: format!(
                "heatmap plane is {}x{}, labels are {}x{}",
                plane.len(),
                plane.first().map_or(0, Vec::len),
                spec.range_labels.len(),
                spec.param_labels.len()
            ),
        });
    }

    let heatmap = if spec.transpose {
        Heatmap {
            title,
            row_labels: spec.param_labels.to_vec(),
            col_labels: spec.range_labels.to_vec(),
            row_desc: "params".into(),
            col_desc: "range extend".into(),
            cells: transpose(plane),
        }
    } else {
        Heatmap {
            title,
            row_labels: spec.range_labels.to_vec(),
            col_labels: spec.param_labels.to_vec(),
            row_desc: "range extend".into(),
            col_desc: "params".into(),
            cells: plane.to_vec(),
        }
    };

    let path = dir.join(super::heatmap_file_name(
        spec.platform,
        spec.test_case,
        spec.metric_label,
        format,
    ));
    render_figure(&heatmap, &path, format)?;
    Ok(Artifact {
        path,
        title: heatmap.title,
        data: heatmap.cells,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{prefix}{i}")).collect()
    }

    fn plane(rows: usize, cols: usize) -> Vec<Vec<f64>> {
        (0..rows)
            .map(|r| (0..cols).map(|c| (r * cols + c) as f64 / 100.0 - 0.05).collect())
            .collect()
    }

    #[test]
    fn renders_named_file() {
        let dir = tempfile::tempdir().unwrap();
        let ranges = labels("", 3);
        let params = labels("p", 4);
        let spec = HeatmapSpec {
            platform: "x86_64",
            test_case: "rem_pio2",
            metric_label: "time (s)",
            range_labels: &ranges,
            param_labels: &params,
            transpose: false,
        };
        let artifact = render_heatmap(dir.path(), &spec, &plane(3, 4), ImageFormat::Png).unwrap();
        assert_eq!(artifact.path, dir.path().join("x86_64-rem_pio2-time_(s).png"));
        assert_eq!(artifact.title, "x86_64-rem_pio2-time (s)");
        assert!(artifact.path.is_file());
    }

    #[test]
    fn svg_cells_are_annotated() {
        let dir = tempfile::tempdir().unwrap();
        let ranges = labels("", 2);
        let params = labels("p", 2);
        let spec = HeatmapSpec {
            platform: "aarch64",
            test_case: "exp",
            metric_label: "IR lines",
            range_labels: &ranges,
            param_labels: &params,
            transpose: false,
        };
        let cells = vec![vec![0.425, -0.1], vec![0.0, 0.2]];
        let artifact = render_heatmap(dir.path(), &spec, &cells, ImageFormat::Svg).unwrap();
        let svg = std::fs::read_to_string(&artifact.path).unwrap();
        assert!(svg.contains("42.5%"));
        assert!(svg.contains("-10.0%"));
        assert!(svg.contains("aarch64-exp-IR lines"));
    }

    #[test]
    fn svg_ticks_name_each_row_and_column_once() {
        let dir = tempfile::tempdir().unwrap();
        let ranges = labels("extend", 3);
        let params = labels("param", 4);
        let spec = HeatmapSpec {
            platform: "x86_64",
            test_case: "exp",
            metric_label: "time",
            range_labels: &ranges,
            param_labels: &params,
            transpose: false,
        };
        let artifact = render_heatmap(dir.path(), &spec, &plane(3, 4), ImageFormat::Svg).unwrap();
        let svg = std::fs::read_to_string(&artifact.path).unwrap();
        for label in ranges.iter().chain(&params) {
            assert_eq!(svg.matches(label.as_str()).count(), 1, "tick {label}");
        }
    }

    #[test]
    fn default_format_draws_titles() {
        let dir = tempfile::tempdir().unwrap();
        let ranges = labels("", 2);
        let params = labels("p", 2);
        let format = ImageFormat::default();
        let render = |platform: &str| {
            let spec = HeatmapSpec {
                platform,
                test_case: "exp",
                metric_label: "time",
                range_labels: &ranges,
                param_labels: &params,
                transpose: false,
            };
            let artifact = render_heatmap(dir.path(), &spec, &plane(2, 2), format).unwrap();
            std::fs::read(artifact.path).unwrap()
        };
        assert_ne!(render("x86_64"), render("aarch64"));
    }

    #[test]
    fn transpose_swaps_axes() {
        let dir = tempfile::tempdir().unwrap();
        let ranges = labels("", 2);
        let params = labels("p", 3);
        let spec = HeatmapSpec {
            platform: "x86_64",
            test_case: "exp",
            metric_label: "time",
            range_labels: &ranges,
            param_labels: &params,
            transpose: true,
        };
        let artifact = render_heatmap(dir.path(), &spec, &plane(2, 3), ImageFormat::Png).unwrap();
        assert_eq!(artifact.data.len(), 3);
        assert_eq!(artifact.data[0].len(), 2);
    }

    #[test]
    fn label_mismatch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let ranges = labels("", 6);
        let params = labels("p", 10);
        let spec = HeatmapSpec {
            platform: "x86_64",
            test_case: "exp",
            metric_label: "time",
            range_labels: &ranges,
            param_labels: &params,
            transpose: false,
        };
        let err = render_heatmap(dir.path(), &spec, &plane(5, 10), ImageFormat::Png).unwrap_err();
        assert!(matches!(err, ReportError::ShapeMismatch { .. }));
    }

    #[test]
    fn existing_heatmap_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let ranges = labels("", 1);
        let params = labels("p", 1);
        let spec = HeatmapSpec {
            platform: "x86_64",
            test_case: "exp",
            metric_label: "time",
            range_labels: &ranges,
            param_labels: &params,
            transpose: false,
        };
        render_heatmap(dir.path(), &spec, &[vec![0.1]], ImageFormat::Png).unwrap();
        let err = render_heatmap(dir.path(), &spec, &[vec![0.1]], ImageFormat::Png).unwrap_err();
        assert!(matches!(err, ReportError::ArtifactExists(_)));
    }

    #[test]
    fn palette_diverges_from_white() {
        assert_eq!(diverging_color(0.0, 1.0), RGBColor(255, 255, 255));
        assert_eq!(diverging_color(1.0, 1.0), POSITIVE);
        assert_eq!(diverging_color(-2.0, 1.0), NEGATIVE);
    }
}
