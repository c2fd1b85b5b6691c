use tracing::warn;

use crate::MalformedGridError;

/// Heights above this value almost always mean the table was written in feet.
pub const MAX_PLAUSIBLE_HEIGHT_M: f64 = 20_000.0;

/// Physical meaning of a grid axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisKind {
    Longitude,
    Latitude,
    Height,
    Time,
}

impl AxisKind {
    pub fn label(self) -> &'static str {
        match self {
            AxisKind::Longitude => "longitude",
            AxisKind::Latitude => "latitude",
            AxisKind::Height => "height",
            AxisKind::Time => "time",
        }
    }
}

/// Strictly increasing coordinate values along one grid dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    kind: AxisKind,
    values: Vec<f64>,
}

/// Location of a coordinate inside an axis: lower knot plus the fraction
/// towards the next knot.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Cell {
    pub index: usize,
    pub fraction: f64,
    pub clamped: bool,
}

impl Axis {
    pub fn new(kind: AxisKind, values: Vec<f64>) -> Result<Self, MalformedGridError> {
        if values.is_empty() {
            return Err(MalformedGridError::EmptyAxis { axis: kind.label() });
        }
        if let Some(row) = values.iter().position(|v| !v.is_finite()) {
            return Err(MalformedGridError::NonFiniteValue {
                column: kind.label().to_string(),
                row,
            });
        }
        if let Some(position) = values.windows(2).position(|pair| pair[1] <= pair[0]) {
            return Err(MalformedGridError::NonMonotonicAxis {
                axis: kind.label(),
                position: position + 1,
            });
        }
        Ok(Self { kind, values })
    }

    pub fn kind(&self) -> AxisKind {
        self.kind
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn min(&self) -> f64 {
        self.values[0]
    }

    pub fn max(&self) -> f64 {
        self.values[self.values.len() - 1]
    }

    pub(crate) fn locate(&self, coordinate: f64) -> Cell {
        let n = self.values.len();
        let clamped = !(coordinate >= self.min() && coordinate <= self.max());
        if n == 1 {
            return Cell {
                index: 0,
                fraction: 0.0,
                clamped,
            };
        }
        let c = if coordinate.is_nan() {
            self.min()
        } else {
            coordinate.clamp(self.min(), self.max())
        };
        let upper = self.values.partition_point(|v| *v <= c);
        let index = upper.saturating_sub(1).min(n - 2);
        let span = self.values[index + 1] - self.values[index];
        let fraction = ((c - self.values[index]) / span).clamp(0.0, 1.0);
        Cell {
            index,
            fraction,
            clamped,
        }
    }

    pub(crate) fn spacing(&self, index: usize) -> f64 {
        self.values[index + 1] - self.values[index]
    }
}

/// Non-fatal findings recorded while building a grid.
#[derive(Debug, Clone, PartialEq)]
pub enum GridWarning {
    /// Maximum height exceeds [`MAX_PLAUSIBLE_HEIGHT_M`]; the source likely used feet.
    ImplausibleHeight { max_height_m: f64 },
}

/// Immutable rectilinear lattice with one or more value channels per node.
///
/// Values are stored row-major in axis order with the channel index innermost.
#[derive(Debug, Clone)]
pub struct Grid {
    axes: Vec<Axis>,
    channels: usize,
    values: Vec<f64>,
    strides: Vec<usize>,
    warnings: Vec<GridWarning>,
}

impl Grid {
    pub fn new(
        axes: Vec<Axis>,
        channels: usize,
        values: Vec<f64>,
    ) -> Result<Self, MalformedGridError> {
        if axes.is_empty() || axes.len() > 4 {
            return Err(MalformedGridError::UnsupportedDimension(axes.len()));
        }
        for (i, axis) in axes.iter().enumerate() {
            if axes[..i].iter().any(|other| other.kind == axis.kind) {
                return Err(MalformedGridError::DuplicateAxis {
                    axis: axis.kind.label(),
                });
            }
        }
        if channels == 0 {
            return Err(MalformedGridError::NoChannels);
        }
        let nodes: usize = axes.iter().map(Axis::len).product();
        if values.len() != nodes * channels {
            return Err(MalformedGridError::ValueCount {
                expected: nodes * channels,
                found: values.len(),
            });
        }
        if let Some(row) = values.iter().position(|v| !v.is_finite()) {
            return Err(MalformedGridError::NonFiniteValue {
                column: "value".to_string(),
                row: row / channels,
            });
        }

        let mut strides = vec![1; axes.len()];
        for i in (0..axes.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * axes[i + 1].len();
        }

        let mut warnings = Vec::new();
        if let Some(height) = axes.iter().find(|axis| axis.kind == AxisKind::Height) {
            if height.max() > MAX_PLAUSIBLE_HEIGHT_M {
                warn!(
                    max_height_m = height.max(),
                    "grid height exceeds {MAX_PLAUSIBLE_HEIGHT_M} m; check for feet/metre confusion"
                );
                warnings.push(GridWarning::ImplausibleHeight {
                    max_height_m: height.max(),
                });
            }
        }

        Ok(Self {
            axes,
            channels,
            values,
            strides,
            warnings,
        })
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    pub fn axis(&self, kind: AxisKind) -> Option<&Axis> {
        self.axes.iter().find(|axis| axis.kind == kind)
    }

    pub fn dimension(&self) -> usize {
        self.axes.len()
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn warnings(&self) -> &[GridWarning] {
        &self.warnings
    }

    /// Number of lattice nodes (not counting channels).
    pub fn node_count(&self) -> usize {
        self.values.len() / self.channels
    }

    /// Value stored at the node with the given per-axis indices.
    pub fn value_at(&self, indices: &[usize], channel: usize) -> Option<f64> {
        if indices.len() != self.axes.len() || channel >= self.channels {
            return None;
        }
        let mut flat = 0;
        for ((index, axis), stride) in indices.iter().zip(&self.axes).zip(&self.strides) {
            if *index >= axis.len() {
                return None;
            }
            flat += index * stride;
        }
        self.values.get(flat * self.channels + channel).copied()
    }

    pub(crate) fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub(crate) fn with_values(&self, values: Vec<f64>) -> Self {
        Self {
            axes: self.axes.clone(),
            channels: self.channels,
            values,
            strides: self.strides.clone(),
            warnings: self.warnings.clone(),
        }
    }
}
