/// Relative finite-difference step for a variable of magnitude `x`.
pub(crate) fn step(x: f64) -> f64 {
    1e-6 * x.abs().max(1.0)
}

/// Gradient of `f` at `x` by central differences.
pub fn central_difference_gradient<F>(f: F, x: &[f64]) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64,
{
    let mut point = x.to_vec();
    let mut gradient = vec![0.0; x.len()];
    for (i, slot) in gradient.iter_mut().enumerate() {
        let h = step(x[i]);
        point[i] = x[i] + h;
        let plus = f(&point);
        point[i] = x[i] - h;
        let minus = f(&point);
        point[i] = x[i];
        *slot = (plus - minus) / (2.0 * h);
    }
    gradient
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JacobianEntry {
    pub row: usize,
    pub col: usize,
    pub value: f64,
}

/// Coordinate-format Jacobian. Duplicate entries are summed.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseJacobian {
    rows: usize,
    cols: usize,
    entries: Vec<JacobianEntry>,
}

impl SparseJacobian {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            entries: Vec::new(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn entries(&self) -> &[JacobianEntry] {
        &self.entries
    }

    pub fn push(&mut self, row: usize, col: usize, value: f64) {
        debug_assert!(row < self.rows && col < self.cols);
        self.entries.push(JacobianEntry { row, col, value });
    }

    /// `Jᵀ·w`.
    pub fn transpose_mul(&self, weights: &[f64]) -> Vec<f64> {
        debug_assert_eq!(weights.len(), self.rows);
        let mut out = vec![0.0; self.cols];
        for entry in &self.entries {
            out[entry.col] += entry.value * weights[entry.row];
        }
        out
    }

    /// Dense row-major copy.
    pub fn to_dense(&self) -> Vec<Vec<f64>> {
        let mut dense = vec![vec![0.0; self.cols]; self.rows];
        for entry in &self.entries {
            dense[entry.row][entry.col] += entry.value;
        }
        dense
    }
}
