use crate::MalformedGridError;
use crate::grid::Grid;

/// Separable Gaussian pre-smoothing, one sigma per axis in grid-index units.
///
/// A sigma of zero leaves that axis untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Smoothing {
    sigma: Vec<f64>,
}

impl Smoothing {
    pub fn new(sigma: Vec<f64>) -> Self {
        Self { sigma }
    }

    /// Same sigma on every axis.
    pub fn uniform(dimension: usize, sigma: f64) -> Self {
        Self {
            sigma: vec![sigma; dimension],
        }
    }

    pub fn sigma(&self) -> &[f64] {
        &self.sigma
    }

    pub(crate) fn apply(&self, grid: &Grid) -> Result<Grid, MalformedGridError> {
        if self.sigma.len() != grid.dimension()
            || self.sigma.iter().any(|s| !s.is_finite() || *s < 0.0)
        {
            return Err(MalformedGridError::InvalidSmoothing {
                expected: grid.dimension(),
                found: self.sigma.clone(),
            });
        }

        let mut values = grid.values().to_vec();
        for (axis_index, sigma) in self.sigma.iter().enumerate() {
            if *sigma == 0.0 || grid.axes()[axis_index].len() < 2 {
                continue;
            }
            values = smooth_axis(grid, &values, axis_index, *sigma);
        }
        Ok(grid.with_values(values))
    }
}

fn kernel(sigma: f64) -> Vec<f64> {
    let radius = (3.0 * sigma).ceil() as i64;
    let mut weights: Vec<f64> = (-radius..=radius)
        .map(|j| (-((j * j) as f64) / (2.0 * sigma * sigma)).exp())
        .collect();
    let total: f64 = weights.iter().sum();
    for w in &mut weights {
        *w /= total;
    }
    weights
}

fn smooth_axis(grid: &Grid, values: &[f64], axis_index: usize, sigma: f64) -> Vec<f64> {
    let weights = kernel(sigma);
    let radius = (weights.len() / 2) as i64;
    let channels = grid.channels();
    let len = grid.axes()[axis_index].len();
    let stride = grid.strides()[axis_index];
    let mut out = vec![0.0; values.len()];
    let mut line = vec![0.0; len];

    for start in 0..grid.node_count() {
        if (start / stride) % len != 0 {
            continue;
        }
        for channel in 0..channels {
            for (i, slot) in line.iter_mut().enumerate() {
                *slot = values[(start + i * stride) * channels + channel];
            }
            for i in 0..len {
                let mut acc = 0.0;
                for (k, w) in weights.iter().enumerate() {
                    let j = (i as i64 + k as i64 - radius).clamp(0, len as i64 - 1) as usize;
                    acc += w * line[j];
                }
                out[(start + i * stride) * channels + channel] = acc;
            }
        }
    }
    out
}
