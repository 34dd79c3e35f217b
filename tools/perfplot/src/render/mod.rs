//! Figure rendering: grouped bar charts and annotated heatmaps.
//!
//! Every render call is a pure function from data to one new file. Figures
//! implement [`Figure`] once, generically over the plotting backend, and
//! [`render_figure`] picks the backend from the configured [`ImageFormat`].

pub mod bar;
pub mod heatmap;

use std::error::Error;
use std::path::{Path, PathBuf};

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::config::ImageFormat;
use crate::error::{ReportError, Result};

/// Result of drawing onto a backend.
pub type DrawResult = std::result::Result<(), Box<dyn Error>>;

/// A written figure.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    /// Image path.
    pub path: PathBuf,
    /// Figure title.
    pub title: String,
    /// The data the figure was drawn from, one row per plotted row/series.
    pub data: Vec<Vec<f64>>,
}

/// Something that can be drawn onto any plotters backend.
pub trait Figure {
    /// Canvas size in pixels.
    fn size(&self) -> (u32, u32);

    /// Draw onto `root`. `text` is false when the backend cannot render
    /// glyphs, in which case captions, tick labels and legends are skipped.
    fn draw<DB>(&self, root: &DrawingArea<DB, Shift>, text: bool) -> DrawResult
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static;
}

/// Whether figures of `format` can carry text in this build.
///
/// SVG text is emitted as markup; PNG text needs the `ttf` feature (on by
/// default) to rasterize glyphs from system fonts.
pub fn text_enabled(format: ImageFormat) -> bool {
    match format {
        ImageFormat::Svg => true,
        ImageFormat::Png => cfg!(feature = "ttf"),
    }
}

/// Render `figure` into a new file at `path`.
///
/// Fails with [`ReportError::ArtifactExists`] rather than overwrite.
pub fn render_figure(figure: &impl Figure, path: &Path, format: ImageFormat) -> Result<()> {
    if path.exists() {
        return Err(ReportError::ArtifactExists(path.to_path_buf()));
    }
    let text = text_enabled(format);
    let drawn = match format {
        ImageFormat::Png => {
            let root = BitMapBackend::new(path, figure.size()).into_drawing_area();
            figure
                .draw(&root, text)
                .and_then(|()| root.present().map_err(Into::into))
        }
        ImageFormat::Svg => {
            let root = SVGBackend::new(path, figure.size()).into_drawing_area();
            figure
                .draw(&root, text)
                .and_then(|()| root.present().map_err(Into::into))
        }
    };
    drawn.map_err(|e| ReportError::Render {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Join name parts with `-` and make the result filesystem-safe by turning
/// spaces into underscores. No other character is altered.
pub fn artifact_stem(parts: &[&str]) -> String {
    parts.join("-").replace(' ', "_")
}

/// Title of the heatmap of one (test case, metric).
pub fn heatmap_title(platform: &str, test_case: &str, metric_label: &str) -> String {
    format!("{platform}-{test_case}-{metric_label}")
}

/// File name of the heatmap of one (test case, metric).
pub fn heatmap_file_name(
    platform: &str,
    test_case: &str,
    metric_label: &str,
    format: ImageFormat,
) -> String {
    format!(
        "{}.{}",
        artifact_stem(&[platform, test_case, metric_label]),
        format.extension()
    )
}

/// File name of the baseline/optimized bar chart of one metric.
pub fn bar_chart_file_name(platform: &str, metric_label: &str, format: ImageFormat) -> String {
    format!(
        "{}.{}",
        artifact_stem(&[platform, "bars", metric_label]),
        format.extension()
    )
}

/// File name of the cross-platform comparison chart of one metric.
pub fn comparison_file_name(metric_label: &str, format: ImageFormat) -> String {
    format!(
        "{}.{}",
        artifact_stem(&["compare", metric_label]),
        format.extension()
    )
}

/// Label of the category centered on tick `x`.
///
/// Categories sit at integer positions; ticks between them stay blank.
pub(crate) fn category_label(labels: &[String], x: f64) -> String {
    let idx = x.round();
    if idx < 0.0 || (x - idx).abs() > 1e-6 {
        return String::new();
    }
    labels.get(idx as usize).cloned().unwrap_or_default()
}

/// Caption font used by every figure.
pub(crate) const CAPTION_FONT: (&str, u32) = ("sans-serif", 22);

/// Tick label and annotation font.
pub(crate) const LABEL_FONT: (&str, u32) = ("sans-serif", 14);
