//! Record layout: how flat log rows map to logical coordinates.
//!
//! The harness writes one row per measurement in nested loop order
//! (test case → range extension → parameter), and within each loop body a
//! fixed group of rows such as baseline, optimized and speedup. The layout
//! names every offset involved so decoding never relies on magic numbers.

use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};

/// What a row within a record group measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleKind {
    /// Unoptimized build.
    Baseline,
    /// Optimized build.
    Optimized,
    /// Percentage change between the two, stored as a fraction.
    #[serde(alias = "speedup")]
    SpeedupPct,
}

impl SampleKind {
    /// Short lowercase name for diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Baseline => "baseline",
            Self::Optimized => "optimized",
            Self::SpeedupPct => "speedup",
        }
    }

    /// Whether fields of this kind carry a trailing `%`.
    pub fn is_percentage(self) -> bool {
        matches!(self, Self::SpeedupPct)
    }
}

/// Positional description of a benchmark log.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordLayout {
    /// Number of test cases (outermost loop).
    pub test_case_num: usize,
    /// Number of range-extension levels.
    pub range_extend_num: usize,
    /// Number of parameter intervals per level (innermost loop).
    pub params_num: usize,
    /// Number of metric columns per row.
    pub merit_num: usize,
    /// Row kinds of one record group, in file order.
    pub group: Vec<SampleKind>,
    /// Column holding the test case name.
    pub name_column: usize,
    /// Column holding the parameter label, if any.
    pub param_column: Option<usize>,
    /// Column of the first metric.
    pub first_metric_column: usize,
    /// Leading rows to skip (column headers).
    pub header_rows: usize,
}

impl RecordLayout {
    /// Layout of `perf.log`: baseline, optimized and speedup rows for every
    /// (test case, range level, parameter).
    pub fn perf_log(test_case_num: usize, range_extend_num: usize, params_num: usize) -> Self {
        Self {
            test_case_num,
            range_extend_num,
            params_num,
            merit_num: 4,
            group: vec![
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

    /// Layout of `average_speedup.log`: one speedup row per
    /// (test case, range level), the level in the second column.
    pub fn average_speedup_log(test_case_num: usize, range_extend_num: usize) -> Self {
        Self {
            test_case_num,
            range_extend_num,
            params_num: 1,
            merit_num: 4,
            group: vec![SampleKind::SpeedupPct],
            name_column: 0,
            param_column: Some(1),
            first_metric_column: 2,
            header_rows: 1,
        }
    }

    /// Layout of `result.log`: a baseline/optimized row pair per test case.
    pub fn result_log(test_case_num: usize) -> Self {
        Self {
            test_case_num,
            range_extend_num: 1,
            params_num: 1,
            merit_num: 4,
            group: vec![SampleKind::Baseline, SampleKind::Optimized],
            name_column: 0,
            param_column: None,
            first_metric_column: 1,
            header_rows: 1,
        }
    }

    /// Rows per record group (the stride).
    pub fn records_per_group(&self) -> usize {
        self.group.len()
    }

    /// Number of record groups the log must contain.
    pub fn group_count(&self) -> usize {
        self.test_case_num * self.range_extend_num * self.params_num
    }

    /// Number of data rows (headers excluded) the log must contain.
    pub fn expected_rows(&self) -> usize {
        self.group_count() * self.records_per_group()
    }

    /// Minimum number of fields every data row must have.
    pub fn required_fields(&self) -> usize {
        let metric_end = self.first_metric_column + self.merit_num;
        let label_end = self.name_column.max(self.param_column.unwrap_or(0)) + 1;
        metric_end.max(label_end)
    }

    /// Tensor shape `(test_case, range_extend, param)`.
    pub fn shape(&self) -> [usize; 3] {
        [self.test_case_num, self.range_extend_num, self.params_num]
    }

    /// Coordinates of record group `group` in row-major order.
    pub fn coords_of_group(&self, group: usize) -> (usize, usize, usize) {
        let per_case = self.range_extend_num * self.params_num;
        (
            group / per_case,
            (group / self.params_num) % self.range_extend_num,
            group % self.params_num,
        )
    }

    /// Whether any row of a group has this kind.
    pub fn has_kind(&self, kind: SampleKind) -> bool {
        self.group.contains(&kind)
    }

    /// Check the layout is usable before touching any log.
    pub fn validate(&self) -> Result<()> {
        let axes = [
            ("test_case_num", self.test_case_num),
            ("range_extend_num", self.range_extend_num),
            ("params_num", self.params_num),
            ("merit_num", self.merit_num),
        ];
        for (name, value) in axes {
            if value == 0 {
                return Err(ReportError::Config(format!("{name} must be at least 1")));
            }
        }
        if self.group.is_empty() {
            return Err(ReportError::Config(
                "layout.rows must name at least one row kind".into(),
            ));
        }
        for (i, kind) in self.group.iter().enumerate() {
            if self.group[..i].contains(kind) {
                return Err(ReportError::Config(format!(
                    "layout.rows lists `{}` more than once",
                    kind.as_str()
                )));
            }
        }
        let metric_columns = self.first_metric_column..self.first_metric_column + self.merit_num;
        if metric_columns.contains(&self.name_column)
            || self.param_column.is_some_and(|c| metric_columns.contains(&c))
        {
            return Err(ReportError::Config(
                "name/param columns overlap the metric columns".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perf_log_stride_is_three_rows() {
        let layout = RecordLayout::perf_log(10, 6, 10);
        assert_eq!(layout.records_per_group(), 3);
        assert_eq!(layout.expected_rows(), 10 * 6 * 10 * 3);
        assert_eq!(layout.required_fields(), 6);
        layout.validate().unwrap();
    }

    #[test]
    fn group_coordinates_are_row_major() {
        let layout = RecordLayout::perf_log(2, 3, 4);
        assert_eq!(layout.coords_of_group(0), (0, 0, 0));
        assert_eq!(layout.coords_of_group(3), (0, 0, 3));
        assert_eq!(layout.coords_of_group(4), (0, 1, 0));
        assert_eq!(layout.coords_of_group(11), (0, 2, 3));
        assert_eq!(layout.coords_of_group(12), (1, 0, 0));
        assert_eq!(layout.coords_of_group(23), (1, 2, 3));
    }

    #[test]
    fn zero_axis_is_rejected() {
        let layout = RecordLayout::perf_log(0, 6, 10);
        let err = layout.validate().unwrap_err();
        assert!(err.to_string().contains("test_case_num"), "unexpected: {err}");
    }

    #[test]
    fn duplicate_row_kind_is_rejected() {
        let mut layout = RecordLayout::result_log(5);
        layout.group.push(SampleKind::Baseline);
        assert!(layout.validate().is_err());
    }

    #[test]
    fn overlapping_columns_are_rejected() {
        let mut layout = RecordLayout::perf_log(1, 1, 1);
        layout.param_column = Some(3);
        assert!(layout.validate().is_err());
    }

    #[test]
    fn kinds_deserialize_from_config_names() {
        #[derive(Deserialize)]
        struct Rows {
            rows: Vec<SampleKind>,
        }
        let rows: Rows = toml::from_str(r#"rows = ["baseline", "optimized", "speedup"]"#).unwrap();
        assert_eq!(
            rows.rows,
            vec![SampleKind::Baseline, SampleKind::Optimized, SampleKind::SpeedupPct]
        );
    }
}
