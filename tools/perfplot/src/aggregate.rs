//! Mean speedup and size reduction across the range-extension sweep.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};
use crate::layout::{RecordLayout, SampleKind};
use crate::stride::{DecodedLog, Sample};

/// Mean speedups of one test case, one entry per metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    /// Test case display name.
    pub test_case: String,
    /// Mean speedup or reduction per metric, in percent.
    pub mean_pct: Vec<f64>,
}

/// Aggregate table of a whole run, as written to `summary.json`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Summary {
    /// Platform the logs were produced on.
    pub platform: String,
    /// Metric labels, in column order.
    pub metrics: Vec<String>,
    /// One row per test case, in log order.
    pub results: Vec<AggregateResult>,
}

/// Mean speedup (in percent) of `metric` for test case `test_case`.
///
/// Each range-extension level contributes the mean over its parameters, and
/// the levels are then averaged unweighted. Every level must be present with
/// all of its parameters exactly once.
pub fn mean_speedup(
    file: &Path,
    samples: &[Sample],
    layout: &RecordLayout,
    test_case: usize,
    metric: usize,
) -> Result<f64> {
    let levels = layout.range_extend_num;
    let mut sums = vec![0.0f64; levels];
    let mut seen = vec![vec![false; layout.params_num]; levels];

    let relevant = samples.iter().filter(|s| {
        s.kind == SampleKind::SpeedupPct && s.metric == metric && s.coord.test_case == test_case
    });
    for sample in relevant {
        let c = sample.coord;
        let slot = seen
            .get_mut(c.range_extend)
            .and_then(|params| params.get_mut(c.param))
            .ok_or_else(|| {
                ReportError::malformed(
                    file,
                    0,
                    format!(
                        "test case {test_case}: speedup sample at level {} param {} is outside the sweep",
                        c.range_extend, c.param
                    ),
                )
            })?;
        if std::mem::replace(slot, true) {
            return Err(ReportError::malformed(
                file,
                0,
                format!(
                    "test case {test_case}: range-extension level {} param {} appears twice",
                    c.range_extend, c.param
                ),
            ));
        }
        sums[c.range_extend] += sample.value;
    }

    for (level, params) in seen.iter().enumerate() {
        if let Some(missing) = params.iter().position(|&present| !present) {
            return Err(ReportError::malformed(
                file,
                0,
                format!(
                    "test case {test_case}, metric {metric}: range-extension level {level} is missing param {missing}"
                ),
            ));
        }
    }

    let per_level = sums.iter().map(|sum| sum / layout.params_num as f64);
    Ok(per_level.sum::<f64>() / levels as f64 * 100.0)
}

/// Aggregate every (test case, metric) pair of a decoded log.
///
/// `names` supplies the display name of each test case, in log order.
pub fn aggregate(
    log: &DecodedLog,
    layout: &RecordLayout,
    names: &[String],
) -> Result<Vec<AggregateResult>> {
    names
        .iter()
        .enumerate()
        .map(|(t, name)| {
            let mean_pct = (0..layout.merit_num)
                .map(|m| mean_speedup(&log.source, &log.samples, layout, t, m))
                .collect::<Result<Vec<_>>>()?;
            Ok(AggregateResult {
                test_case: name.clone(),
                mean_pct,
            })
        })
        .collect()
}

/// Save the aggregate table as pretty-printed JSON.
pub fn save_summary(summary: &Summary, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(summary)
        .map_err(|e| ReportError::io("serializing", path, e.into()))?;
    std::fs::write(path, json).map_err(|e| ReportError::io("writing", path, e))
}

/// Load a summary previously written by [`save_summary`].
pub fn load_summary(path: &Path) -> Result<Summary> {
    let json = std::fs::read_to_string(path).map_err(|e| ReportError::io("reading", path, e))?;
    serde_json::from_str(&json).map_err(|e| ReportError::io("parsing", path, e.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stride::Coord;

    fn speedup(t: usize, r: usize, p: usize, metric: usize, pct: f64) -> Sample {
        Sample {
            coord: Coord {
                test_case: t,
                range_extend: r,
                param: p,
            },
            metric,
            kind: SampleKind::SpeedupPct,
            value: pct / 100.0,
        }
    }

    #[test]
    fn mean_over_six_levels() {
        let layout = RecordLayout::average_speedup_log(1, 6);
        let samples: Vec<Sample> = [10.0, 20.0, 30.0, 40.0, 50.0, 60.0]
            .iter()
            .enumerate()
            .map(|(r, &pct)| speedup(0, r, 0, 0, pct))
            .collect();
        let mean = mean_speedup(Path::new("average_speedup.log"), &samples, &layout, 0, 0).unwrap();
        assert!((mean - 35.0).abs() < 1e-9, "mean was {mean}");
    }

    #[test]
    fn levels_are_averaged_over_params_first() {
        let mut layout = RecordLayout::perf_log(1, 2, 2);
        layout.merit_num = 1;
        // Level 0: params 0% and 20% (mean 10); level 1: 30% and 30%.
        let samples = vec![
            speedup(0, 0, 0, 0, 0.0),
            speedup(0, 0, 1, 0, 20.0),
            speedup(0, 1, 0, 0, 30.0),
            speedup(0, 1, 1, 0, 30.0),
        ];
        let mean = mean_speedup(Path::new("average_speedup.log"), &samples, &layout, 0, 0).unwrap();
        assert!((mean - 20.0).abs() < 1e-9, "mean was {mean}");
    }

    #[test]
    fn regressions_stay_negative() {
        let layout = RecordLayout::average_speedup_log(1, 2);
        let samples = vec![speedup(0, 0, 0, 0, -10.0), speedup(0, 1, 0, 0, -30.0)];
        let mean = mean_speedup(Path::new("average_speedup.log"), &samples, &layout, 0, 0).unwrap();
        assert!((mean + 20.0).abs() < 1e-9, "mean was {mean}");
    }

    #[test]
    fn missing_level_is_malformed() {
        let layout = RecordLayout::average_speedup_log(1, 3);
        let samples = vec![speedup(0, 0, 0, 0, 1.0), speedup(0, 2, 0, 0, 1.0)];
        let err = mean_speedup(Path::new("average_speedup.log"), &samples, &layout, 0, 0).unwrap_err();
        assert!(
            err.to_string().contains("range-extension level 1 is missing"),
            "unexpected: {err}"
        );
    }

    #[test]
    fn repeated_level_is_malformed() {
        let layout = RecordLayout::average_speedup_log(1, 2);
        let samples = vec![
            speedup(0, 0, 0, 0, 1.0),
            speedup(0, 0, 0, 0, 1.0),
            speedup(0, 1, 0, 0, 1.0),
        ];
        assert!(mean_speedup(Path::new("average_speedup.log"), &samples, &layout, 0, 0).is_err());
    }

    #[test]
    fn aggregate_covers_every_test_case_and_metric() {
        let mut layout = RecordLayout::average_speedup_log(2, 1);
        layout.merit_num = 2;
        let samples = vec![
            speedup(0, 0, 0, 0, 5.0),
            speedup(0, 0, 0, 1, 6.0),
            speedup(1, 0, 0, 0, 7.0),
            speedup(1, 0, 0, 1, 8.0),
        ];
        let names = vec!["exp".to_string(), "log".to_string()];
        let log = DecodedLog {
            source: "average_speedup.log".into(),
            samples,
            test_cases: names.clone(),
            params: vec!["1".into()],
        };
        let results = aggregate(&log, &layout, &names).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].test_case, "log");
        assert!((results[1].mean_pct[1] - 8.0).abs() < 1e-9);
    }

    #[test]
    fn summary_round_trips_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        let summary = Summary {
            platform: "x86_64".into(),
            metrics: vec!["time (s)".into()],
            results: vec![AggregateResult {
                test_case: "rem_pio2".into(),
                mean_pct: vec![12.5],
            }],
        };
        save_summary(&summary, &path).unwrap();
        let loaded = load_summary(&path).unwrap();
        assert_eq!(loaded.results, summary.results);
        assert_eq!(loaded.platform, "x86_64");
    }
}
