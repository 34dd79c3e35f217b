//! Dense `[test_case, range_extend, param]` tensors built from samples.

use crate::error::{ReportError, Result};
use crate::layout::SampleKind;
use crate::stride::Sample;

/// A dense 3-axis array of one (kind, metric) pair. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricTensor {
    kind: SampleKind,
    metric: usize,
    shape: [usize; 3],
    data: Vec<f64>,
}

impl MetricTensor {
    /// Reshape every sample of `kind` and `metric` into a tensor of `shape`.
    ///
    /// Each coordinate must be populated exactly once.
    pub fn build(
        samples: &[Sample],
        kind: SampleKind,
        metric: usize,
        shape: [usize; 3],
    ) -> Result<Self> {
        let what = format!("{}/metric {metric}", kind.as_str());
        let [t_num, r_num, p_num] = shape;
        let len = t_num * r_num * p_num;

        let selected: Vec<&Sample> = samples
            .iter()
            .filter(|s| s.kind == kind && s.metric == metric)
            .collect();
        if selected.len() != len {
            return Err(ReportError::ShapeMismatch {
                what,
                detail: format!(
                    "{} samples cannot fill shape ({t_num}, {r_num}, {p_num}) = {len} cells",
                    selected.len()
                ),
            });
        }

        let mut cells: Vec<Option<f64>> = vec![None; len];
        for sample in selected {
            let c = sample.coord;
            if c.test_case >= t_num || c.range_extend >= r_num || c.param >= p_num {
                return Err(ReportError::ShapeMismatch {
                    what,
                    detail: format!(
                        "coordinate ({}, {}, {}) outside shape ({t_num}, {r_num}, {p_num})",
                        c.test_case, c.range_extend, c.param
                    ),
                });
            }
            let idx = (c.test_case * r_num + c.range_extend) * p_num + c.param;
            if cells[idx].replace(sample.value).is_some() {
                return Err(ReportError::ShapeMismatch {
                    what,
                    detail: format!(
                        "duplicate sample at ({}, {}, {})",
                        c.test_case, c.range_extend, c.param
                    ),
                });
            }
        }

        let mut data = Vec::with_capacity(len);
        for (idx, cell) in cells.into_iter().enumerate() {
            match cell {
                Some(v) => data.push(v),
                None => {
                    return Err(ReportError::ShapeMismatch {
                        what,
                        detail: format!(
                            "no sample at ({}, {}, {})",
                            idx / (r_num * p_num),
                            (idx / p_num) % r_num,
                            idx % p_num
                        ),
                    });
                }
            }
        }

        Ok(Self {
            kind,
            metric,
            shape,
            data,
        })
    }

    /// Sample kind the tensor holds.
    pub fn kind(&self) -> SampleKind {
        self.kind
    }

    /// Metric index the tensor holds.
    pub fn metric(&self) -> usize {
        self.metric
    }

    /// `(test_case, range_extend, param)` sizes.
    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    /// Row-major backing storage.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Element `[t, r, p]`.
    pub fn get(&self, t: usize, r: usize, p: usize) -> f64 {
        let [_, r_num, p_num] = self.shape;
        self.data[(t * r_num + r) * p_num + p]
    }

    /// The `[range_extend, param]` plane of test case `t`.
    pub fn plane(&self, t: usize) -> Vec<Vec<f64>> {
        let [_, r_num, p_num] = self.shape;
        (0..r_num)
            .map(|r| (0..p_num).map(|p| self.get(t, r, p)).collect())
            .collect()
    }

    /// Mean over the whole plane of test case `t`.
    pub fn plane_mean(&self, t: usize) -> f64 {
        let [_, r_num, p_num] = self.shape;
        let start = t * r_num * p_num;
        let plane = &self.as_slice()[start..start + r_num * p_num];
        plane.iter().sum::<f64>() / plane.len() as f64
    }
}

/// Transpose a rectangular grid.
pub fn transpose(grid: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let cols = grid.first().map_or(0, Vec::len);
    (0..cols)
        .map(|c| grid.iter().map(|row| row[c]).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stride::Coord;

    fn sample(t: usize, r: usize, p: usize, value: f64) -> Sample {
        Sample {
            coord: Coord {
                test_case: t,
                range_extend: r,
                param: p,
            },
            metric: 1,
            kind: SampleKind::SpeedupPct,
            value,
        }
    }

    fn full_grid(shape: [usize; 3]) -> Vec<Sample> {
        let mut out = Vec::new();
        for t in 0..shape[0] {
            for r in 0..shape[1] {
                for p in 0..shape[2] {
                    out.push(sample(t, r, p, (t * 100 + r * 10 + p) as f64));
                }
            }
        }
        out
    }

    #[test]
    fn elements_land_at_their_coordinates() {
        let tensor =
            MetricTensor::build(&full_grid([2, 3, 4]), SampleKind::SpeedupPct, 1, [2, 3, 4])
                .unwrap();
        assert_eq!(tensor.get(0, 0, 0), 0.0);
        assert_eq!(tensor.get(1, 2, 3), 123.0);
        assert_eq!(tensor.get(0, 1, 2), 12.0);
        assert_eq!(tensor.plane(1)[2], vec![120.0, 121.0, 122.0, 123.0]);
    }

    #[test]
    fn building_twice_is_bit_identical() {
        let samples = full_grid([3, 6, 10]);
        let a = MetricTensor::build(&samples, SampleKind::SpeedupPct, 1, [3, 6, 10]).unwrap();
        let b = MetricTensor::build(&samples, SampleKind::SpeedupPct, 1, [3, 6, 10]).unwrap();
        let bits = |t: &MetricTensor| t.as_slice().iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&a), bits(&b));
    }

    #[test]
    fn samples_of_other_kinds_and_metrics_are_ignored() {
        let mut samples = full_grid([1, 2, 2]);
        let mut other = samples[0];
        other.metric = 0;
        samples.push(other);
        other.metric = 1;
        other.kind = SampleKind::Baseline;
        samples.push(other);
        MetricTensor::build(&samples, SampleKind::SpeedupPct, 1, [1, 2, 2]).unwrap();
    }

    #[test]
    fn wrong_count_is_shape_mismatch() {
        let samples = full_grid([1, 2, 2]);
        let err =
            MetricTensor::build(&samples[..3], SampleKind::SpeedupPct, 1, [1, 2, 2]).unwrap_err();
        assert!(matches!(err, ReportError::ShapeMismatch { .. }));
    }

    #[test]
    fn duplicate_is_shape_mismatch() {
        let mut samples = full_grid([1, 2, 2]);
        samples[3] = samples[0];
        let err = MetricTensor::build(&samples, SampleKind::SpeedupPct, 1, [1, 2, 2]).unwrap_err();
        assert!(err.to_string().contains("duplicate sample at (0, 0, 0)"), "unexpected: {err}");
    }

    #[test]
    fn out_of_range_coordinate_is_shape_mismatch() {
        let mut samples = full_grid([1, 2, 2]);
        samples[3] = sample(0, 2, 0, 1.0);
        let err = MetricTensor::build(&samples, SampleKind::SpeedupPct, 1, [1, 2, 2]).unwrap_err();
        assert!(err.to_string().contains("outside shape"), "unexpected: {err}");
    }

    #[test]
    fn plane_mean_and_transpose() {
        let tensor =
            MetricTensor::build(&full_grid([2, 2, 2]), SampleKind::SpeedupPct, 1, [2, 2, 2])
                .unwrap();
        assert_eq!(tensor.plane_mean(1), 105.5);
        let t = transpose(&tensor.plane(0));
        assert_eq!(t, vec![vec![0.0, 10.0], vec![1.0, 11.0]]);
    }
}
