//! Stride indexer: decodes flat log rows into addressed samples.
//!
//! Rows are consumed in groups of [`RecordLayout::records_per_group`]. The
//! position of a row inside its group gives its [`SampleKind`]; the ordinal
//! of the group gives its `(test_case, range_extend, param)` coordinate; the
//! column of a field gives its metric. Any deviation from the layout aborts
//! decoding, since every later stage trusts positions blindly.

use std::path::{Path, PathBuf};

use crate::error::{ReportError, Result};
use crate::layout::{RecordLayout, SampleKind};
use crate::log_reader::{LogRows, RawRow};
use crate::verbose::vprintln;

/// Logical position of a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coord {
    /// Test case index.
    pub test_case: usize,
    /// Range-extension level index.
    pub range_extend: usize,
    /// Parameter interval index.
    pub param: usize,
}

/// One decoded measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Where the measurement sits in the sweep.
    pub coord: Coord,
    /// Metric index (column offset from the first metric column).
    pub metric: usize,
    /// Which row of the group it came from.
    pub kind: SampleKind,
    /// Raw value, or a fraction for percentage rows.
    pub value: f64,
}

/// Everything decoded from one log.
#[derive(Debug, Clone)]
pub struct DecodedLog {
    /// Log the samples were decoded from.
    pub source: PathBuf,
    /// Samples in decode order (row-major over the layout).
    pub samples: Vec<Sample>,
    /// Test case names, in log order.
    pub test_cases: Vec<String>,
    /// Parameter labels of the first test case's first range level.
    pub params: Vec<String>,
}

/// Decode `log` according to `layout`.
pub fn decode(log: &LogRows, layout: &RecordLayout) -> Result<DecodedLog> {
    let file = &log.path;

    if log.rows.len() < layout.header_rows {
        return Err(ReportError::malformed(
            file,
            0,
            format!(
                "expected {} header row(s), log has only {} row(s)",
                layout.header_rows,
                log.rows.len()
            ),
        ));
    }
    let data = &log.rows[layout.header_rows..];
    check_row_count(log, layout, data.len())?;

    let stride = layout.records_per_group();
    let required = layout.required_fields();
    let mut samples = Vec::with_capacity(data.len() * layout.merit_num);
    let mut test_cases = Vec::with_capacity(layout.test_case_num);
    let mut params = Vec::with_capacity(layout.params_num);

    for (group_idx, group) in data.chunks_exact(stride).enumerate() {
        let (test_case, range_extend, param) = layout.coords_of_group(group_idx);
        let coord = Coord {
            test_case,
            range_extend,
            param,
        };

        for row in group {
            if row.fields.len() < required {
                return Err(ReportError::malformed(
                    file,
                    row.line,
                    format!(
                        "expected at least {required} fields, found {}",
                        row.fields.len()
                    ),
                ));
            }
        }

        let lead = &group[0];
        let name = lead.field(layout.name_column).unwrap_or_default().trim();
        if range_extend == 0 && param == 0 {
            test_cases.push(name.to_string());
        } else if name != test_cases[test_case] {
            return Err(ReportError::malformed(
                file,
                lead.line,
                format!(
                    "expected a row of test case `{}`, found `{name}` (stride misaligned?)",
                    test_cases[test_case]
                ),
            ));
        }
        if test_case == 0 && range_extend == 0 {
            params.push(
                layout
                    .param_column
                    .and_then(|c| lead.field(c))
                    .map_or_else(|| format!("p{param}"), |f| f.trim().to_string()),
            );
        }

        for (row, &kind) in group.iter().zip(&layout.group) {
            decode_row(file, row, layout, coord, kind, &mut samples)?;
        }
    }

    vprintln!(
        "  decoded {} samples from {} ({} test cases)",
        samples.len(),
        file.display(),
        test_cases.len()
    );

    Ok(DecodedLog {
        source: file.clone(),
        samples,
        test_cases,
        params,
    })
}

fn check_row_count(log: &LogRows, layout: &RecordLayout, found: usize) -> Result<()> {
    let stride = layout.records_per_group();
    let expected = layout.expected_rows();
    if found % stride != 0 {
        return Err(ReportError::malformed(
            &log.path,
            0,
            format!("{found} data rows is not a multiple of the record group size {stride}"),
        ));
    }
    if found != expected {
        return Err(ReportError::malformed(
            &log.path,
            0,
            format!(
                "expected {expected} data rows ({} test cases x {} range levels x {} params x {stride}), found {found}",
                layout.test_case_num, layout.range_extend_num, layout.params_num
            ),
        ));
    }
    Ok(())
}

fn decode_row(
    file: &Path,
    row: &RawRow,
    layout: &RecordLayout,
    coord: Coord,
    kind: SampleKind,
    out: &mut Vec<Sample>,
) -> Result<()> {
    for metric in 0..layout.merit_num {
        let column = layout.first_metric_column + metric;
        let field = row.field(column).unwrap_or_default();
        let decoded = if kind.is_percentage() {
            decode_percentage(field)
        } else {
            decode_number(field)
        };
        let value = decoded.map_err(|why| {
            ReportError::malformed(
                file,
                row.line,
                format!("column {} ({} row): {why}", column + 1, kind.as_str()),
            )
        })?;
        out.push(Sample {
            coord,
            metric,
            kind,
            value,
        });
    }
    Ok(())
}

/// Decode a `%`-suffixed field into a fraction: `"42.5%"` → `0.425`.
///
/// A field without the suffix is rejected rather than guessed at, and so
/// is `nan%` or `inf%`.
pub fn decode_percentage(field: &str) -> std::result::Result<f64, String> {
    let trimmed = field.trim();
    let Some(number) = trimmed.strip_suffix('%') else {
        return Err(format!("percentage field `{trimmed}` lacks a trailing `%`"));
    };
    let value: f64 = number
        .trim()
        .parse()
        .map_err(|_| format!("`{trimmed}` is not a percentage"))?;
    if !value.is_finite() {
        return Err(format!("`{trimmed}` is not a finite percentage"));
    }
    Ok(value / 100.0)
}

/// Decode a plain, finite numeric field.
pub fn decode_number(field: &str) -> std::result::Result<f64, String> {
    let trimmed = field.trim();
    if trimmed.ends_with('%') {
        return Err(format!("unexpected percentage `{trimmed}` in a measurement row"));
    }
    let value: f64 = trimmed
        .parse()
        .map_err(|_| format!("`{trimmed}` is not a number"))?;
    if !value.is_finite() {
        return Err(format!("`{trimmed}` is not a finite number"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_reader::parse_rows;

    const HEADER: &str = "test case\tparam\tinstruction count\ttime consumption\tir lines\tlibrary size\n";

    /// Render a perf.log with `t` test cases, `r` levels and `p` params.
    fn perf_log_text(t: usize, r: usize, p: usize) -> String {
        let mut text = String::from(HEADER);
        for case in 0..t {
            for level in 0..r {
                for param in 0..p {
                    let base = (case * 100 + level * 10 + param) as f64;
                    text.push_str(&format!(
                        "perf_case{case}\t{param}.0 {level}.0 \t{}\t{}\t{}\t{}\n",
                        base + 4.0,
                        base + 3.0,
                        base + 2.0,
                        base + 1.0
                    ));
                    text.push_str(&format!(
                        "perf_case{case}_opt\t{param}.0 {level}.0 \t{base}\t{base}\t{base}\t{base}\n"
                    ));
                    text.push_str(&format!(
                        "speed up after optimization\t{param}.0 {level}.0 \t{level}%\t{param}%\t5%\t-2%\n"
                    ));
                }
            }
        }
        text
    }

    fn decode_text(text: &str, layout: &RecordLayout) -> Result<DecodedLog> {
        decode(&parse_rows(Path::new("perf.log"), text), layout)
    }

    #[test]
    fn percentage_with_suffix_decodes_to_fraction() {
        assert_eq!(decode_percentage("42.5%").unwrap(), 0.425);
        assert_eq!(decode_percentage(" -3% ").unwrap(), -0.03);
    }

    #[test]
    fn percentage_without_suffix_is_rejected() {
        let err = decode_percentage("42.5").unwrap_err();
        assert!(err.contains("lacks a trailing `%`"), "unexpected: {err}");
    }

    #[test]
    fn non_finite_values_are_rejected() {
        for field in ["nan%", "inf%", "-inf%", "NaN %"] {
            let err = decode_percentage(field).unwrap_err();
            assert!(err.contains("not a finite percentage"), "{field}: {err}");
        }
        assert!(decode_number("inf").is_err());
        assert!(decode_number("NaN").is_err());
    }

    #[test]
    fn nan_speedup_names_its_line() {
        let text = perf_log_text(1, 1, 1).replace("\t5%\t", "\tnan%\t");
        let err = decode_text(&text, &RecordLayout::perf_log(1, 1, 1)).unwrap_err();
        match err {
            ReportError::MalformedLog { line, detail, .. } => {
                assert_eq!(line, 4);
                assert!(detail.contains("not a finite percentage"), "unexpected: {detail}");
            }
            other => panic!("expected MalformedLog, got {other}"),
        }
    }

    #[test]
    fn unsuffixed_speedup_field_fails_the_whole_log() {
        let text = perf_log_text(1, 1, 1).replace("\t5%\t", "\t5\t");
        let err = decode_text(&text, &RecordLayout::perf_log(1, 1, 1)).unwrap_err();
        match err {
            ReportError::MalformedLog { line, detail, .. } => {
                assert_eq!(line, 4);
                assert!(detail.contains("column 5"), "unexpected: {detail}");
            }
            other => panic!("expected MalformedLog, got {other}"),
        }
    }

    #[test]
    fn sample_count_matches_layout() {
        let layout = RecordLayout::perf_log(2, 3, 4);
        let decoded = decode_text(&perf_log_text(2, 3, 4), &layout).unwrap();
        assert_eq!(
            decoded.samples.len(),
            layout.expected_rows() * layout.merit_num
        );
        assert_eq!(decoded.test_cases, vec!["perf_case0", "perf_case1"]);
        assert_eq!(decoded.params.len(), 4);
        assert_eq!(decoded.params[2], "2.0 0.0");
    }

    #[test]
    fn kinds_and_coordinates_follow_the_stride() {
        let layout = RecordLayout::perf_log(2, 3, 4);
        let decoded = decode_text(&perf_log_text(2, 3, 4), &layout).unwrap();

        let find = |kind, metric, t, r, p| {
            decoded
                .samples
                .iter()
                .find(|s| {
                    s.kind == kind
                        && s.metric == metric
                        && s.coord
                            == Coord {
                                test_case: t,
                                range_extend: r,
                                param: p,
                            }
                })
                .map(|s| s.value)
                .unwrap()
        };

        assert_eq!(find(SampleKind::Baseline, 0, 1, 2, 3), 127.0);
        assert_eq!(find(SampleKind::Optimized, 3, 1, 2, 3), 123.0);
        assert_eq!(find(SampleKind::SpeedupPct, 0, 1, 2, 3), 0.02);
        assert_eq!(find(SampleKind::SpeedupPct, 1, 0, 1, 3), 0.03);
        assert_eq!(find(SampleKind::SpeedupPct, 3, 0, 0, 0), -0.02);
    }

    #[test]
    fn short_row_names_line_and_field_counts() {
        let mut text = perf_log_text(1, 1, 2);
        text = text.replacen("\t5%\t-2%", "", 1);
        let err = decode_text(&text, &RecordLayout::perf_log(1, 1, 2)).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("perf.log:4"), "unexpected: {msg}");
        assert!(msg.contains("expected at least 6 fields, found 4"), "unexpected: {msg}");
    }

    #[test]
    fn partial_group_is_rejected() {
        let mut text = perf_log_text(1, 1, 2);
        text.push_str("perf_case0\t9 9\t1\t1\t1\t1\n");
        let err = decode_text(&text, &RecordLayout::perf_log(1, 1, 2)).unwrap_err();
        assert!(
            err.to_string().contains("not a multiple of the record group size 3"),
            "unexpected: {err}"
        );
    }

    #[test]
    fn wrong_group_count_is_rejected() {
        let err = decode_text(&perf_log_text(1, 2, 2), &RecordLayout::perf_log(1, 3, 2))
            .unwrap_err();
        assert!(err.to_string().contains("expected 18 data rows"), "unexpected: {err}");
    }

    #[test]
    fn misaligned_test_case_name_is_rejected() {
        let text = perf_log_text(1, 1, 2).replacen("perf_case0\t1.0", "perf_other\t1.0", 1);
        let err = decode_text(&text, &RecordLayout::perf_log(1, 1, 2)).unwrap_err();
        assert!(err.to_string().contains("perf_other"), "unexpected: {err}");
    }

    #[test]
    fn percentage_in_measurement_row_is_rejected() {
        let text = perf_log_text(1, 1, 1).replacen("\t4\t3\t2\t1", "\t4%\t3\t2\t1", 1);
        assert!(decode_text(&text, &RecordLayout::perf_log(1, 1, 1)).is_err());
    }

    #[test]
    fn result_log_pairs_decode_without_param_column() {
        let text = "name\tinst\tir\ttime\tbytes\n\
                    perf_exp\t100\t10\t0.5\t4000\n\
                    perf_exp_opt\t80\t8\t0.4\t3000\n";
        let layout = RecordLayout::result_log(1);
        let decoded = decode_text(text, &layout).unwrap();
        assert_eq!(decoded.samples.len(), 8);
        assert_eq!(decoded.params, vec!["p0"]);
        assert_eq!(decoded.samples[4].kind, SampleKind::Optimized);
        assert_eq!(decoded.samples[4].value, 80.0);
    }
}
