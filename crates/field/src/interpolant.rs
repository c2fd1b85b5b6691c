use crate::MalformedGridError;
use crate::grid::{AxisKind, Cell, Grid};
use crate::smoothing::Smoothing;

/// Named query coordinates; each grid picks the components matching its axes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FieldPoint {
    pub longitude: f64,
    pub latitude: f64,
    pub height_m: f64,
    /// Seconds since the grid's time origin.
    pub time_s: f64,
}

impl FieldPoint {
    pub fn new(longitude: f64, latitude: f64, height_m: f64, time_s: f64) -> Self {
        Self {
            longitude,
            latitude,
            height_m,
            time_s,
        }
    }

    fn component(&self, kind: AxisKind) -> f64 {
        match kind {
            AxisKind::Longitude => self.longitude,
            AxisKind::Latitude => self.latitude,
            AxisKind::Height => self.height_m,
            AxisKind::Time => self.time_s,
        }
    }
}

/// Multilinear interpolant over a [`Grid`].
///
/// Queries outside the lattice are clamped to the boundary, never
/// extrapolated: solvers probe slightly outside the declared ranges during
/// line searches and must see a finite, continuous value there.
#[derive(Debug, Clone)]
pub struct Interpolant {
    grid: Grid,
}

impl Interpolant {
    pub fn new(grid: Grid) -> Self {
        Self { grid }
    }

    /// Build the interpolant over a Gaussian-smoothed copy of `grid`.
    pub fn smoothed(grid: Grid, smoothing: &Smoothing) -> Result<Self, MalformedGridError> {
        Ok(Self {
            grid: smoothing.apply(&grid)?,
        })
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn dimension(&self) -> usize {
        self.grid.dimension()
    }

    pub fn channels(&self) -> usize {
        self.grid.channels()
    }

    /// Whether the grid has a time axis.
    pub fn is_temporal(&self) -> bool {
        self.grid.axis(AxisKind::Time).is_some()
    }

    /// First channel at `point`.
    ///
    /// `point` holds one coordinate per axis, in axis order. Every grid has
    /// at least one channel.
    pub fn evaluate(&self, point: &[f64]) -> f64 {
        self.blend_channel(point, 0)
    }

    /// Channel `channel` at `point`, or `None` if the grid has no such channel.
    pub fn evaluate_channel(&self, point: &[f64], channel: usize) -> Option<f64> {
        (channel < self.grid.channels()).then(|| self.blend_channel(point, channel))
    }

    /// Channels at `point`, written into `out`.
    ///
    /// Writes `min(out.len(), channels)` values; slots past the last channel
    /// are left untouched.
    pub fn evaluate_into(&self, point: &[f64], out: &mut [f64]) {
        let channels = self.grid.channels();
        debug_assert_eq!(out.len(), channels, "output buffer should hold every channel");
        let written = out.len().min(channels);
        let out = &mut out[..written];
        out.iter_mut().for_each(|v| *v = 0.0);
        let values = self.grid.values();
        self.blend(point, |node, weight| {
            for (c, slot) in out.iter_mut().enumerate() {
                *slot += weight * values[node * channels + c];
            }
        });
    }

    fn blend_channel(&self, point: &[f64], channel: usize) -> f64 {
        let channels = self.grid.channels();
        let values = self.grid.values();
        let mut acc = 0.0;
        self.blend(point, |node, weight| {
            acc += weight * values[node * channels + channel];
        });
        acc
    }

    /// First channel at a named point.
    pub fn sample(&self, at: &FieldPoint) -> f64 {
        let coords = self.coordinates(at);
        self.evaluate(&coords[..self.dimension()])
    }

    /// All channels at a named point.
    pub fn sample_into(&self, at: &FieldPoint, out: &mut [f64]) {
        let coords = self.coordinates(at);
        self.evaluate_into(&coords[..self.dimension()], out);
    }

    /// Partial derivatives of `channel` with respect to each axis coordinate.
    ///
    /// Axes where the query is clamped contribute zero (the interpolant is
    /// flat there). On a knot the derivative of the upper cell is returned.
    /// A channel the grid does not have has a zero gradient.
    pub fn gradient(&self, point: &[f64], channel: usize) -> Vec<f64> {
        let cells = self.locate(point);
        let dims = cells.len();
        let channels = self.grid.channels();
        if channel >= channels {
            return vec![0.0; dims];
        }
        let values = self.grid.values();
        let strides = self.grid.strides();
        let axes = self.grid.axes();
        let mut gradient = vec![0.0; dims];

        for (a, cell) in cells.iter().enumerate() {
            if cell.clamped || axes[a].len() < 2 {
                continue;
            }
            let spacing = axes[a].spacing(cell.index);
            let mut derivative = 0.0;
            for corner in 0..(1usize << dims) {
                let mut weight = 1.0;
                let mut node = 0;
                let mut skip = false;
                for (i, c) in cells.iter().enumerate() {
                    let upper = (corner >> i) & 1 == 1;
                    if upper && axes[i].len() < 2 {
                        skip = true;
                        break;
                    }
                    node += (c.index + usize::from(upper)) * strides[i];
                    if i == a {
                        weight *= if upper { 1.0 } else { -1.0 };
                    } else {
                        weight *= if upper { c.fraction } else { 1.0 - c.fraction };
                    }
                }
                if !skip {
                    derivative += weight * values[node * channels + channel];
                }
            }
            gradient[a] = derivative / spacing;
        }
        gradient
    }

    /// Gradient of the first channel at a named point, in axis order.
    pub fn sample_gradient(&self, at: &FieldPoint) -> Vec<f64> {
        let coords = self.coordinates(at);
        self.gradient(&coords[..self.dimension()], 0)
    }

    fn coordinates(&self, at: &FieldPoint) -> [f64; 4] {
        let mut coords = [0.0; 4];
        for (slot, axis) in coords.iter_mut().zip(self.grid.axes()) {
            *slot = at.component(axis.kind());
        }
        coords
    }

    /// Cells containing `point`. Axes without a coordinate are located at
    /// their first knot; surplus coordinates are ignored.
    fn locate(&self, point: &[f64]) -> Vec<Cell> {
        debug_assert_eq!(
            point.len(),
            self.grid.dimension(),
            "query has {} coordinates, grid has {} axes",
            point.len(),
            self.grid.dimension()
        );
        self.grid
            .axes()
            .iter()
            .enumerate()
            .map(|(a, axis)| axis.locate(point.get(a).copied().unwrap_or(f64::NEG_INFINITY)))
            .collect()
    }

    fn blend(&self, point: &[f64], mut visit: impl FnMut(usize, f64)) {
        let cells = self.locate(point);
        let dims = cells.len();
        let strides = self.grid.strides();
        let axes = self.grid.axes();
        for corner in 0..(1usize << dims) {
            let mut weight = 1.0;
            let mut node = 0;
            let mut skip = false;
            for (i, c) in cells.iter().enumerate() {
                let upper = (corner >> i) & 1 == 1;
                if upper && axes[i].len() < 2 {
                    skip = true;
                    break;
                }
                weight *= if upper { c.fraction } else { 1.0 - c.fraction };
                node += (c.index + usize::from(upper)) * strides[i];
            }
            if !skip && weight != 0.0 {
                visit(node, weight);
            }
        }
    }
}
