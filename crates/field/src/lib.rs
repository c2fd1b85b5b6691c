//! Gridded scalar and vector fields (cost grids, wind) and the interpolants
//! the optimizer queries while solving.
//!
//! Grids are validated once, at construction, and are read-only afterwards, so
//! an [`Interpolant`] can be shared across threads behind an `Arc`.

mod grid;
mod interpolant;
mod smoothing;
mod table;
mod wind;

pub use grid::{Axis, AxisKind, Grid, GridWarning, MAX_PLAUSIBLE_HEIGHT_M};
pub use interpolant::{FieldPoint, Interpolant};
pub use smoothing::Smoothing;
pub use table::{AxisColumn, ColumnTable, GridSchema};
pub use wind::WindField;

use thiserror::Error;

/// Structural problems detected while building a grid.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MalformedGridError {
    #[error("required column `{column}` is missing")]
    MissingColumn { column: String },
    #[error("column `{column}` has {found} rows, expected {expected}")]
    ColumnLength {
        column: String,
        expected: usize,
        found: usize,
    },
    #[error("grid table has no rows")]
    EmptyTable,
    #[error("axis `{axis}` has no values")]
    EmptyAxis { axis: &'static str },
    #[error("axis `{axis}` is not strictly increasing at position {position}")]
    NonMonotonicAxis {
        axis: &'static str,
        position: usize,
    },
    #[error("axis `{axis}` appears more than once")]
    DuplicateAxis { axis: &'static str },
    #[error("grids must have between 1 and 4 axes, got {0}")]
    UnsupportedDimension(usize),
    #[error("grid needs at least one value channel")]
    NoChannels,
    #[error("expected {expected} grid values, got {found}")]
    ValueCount { expected: usize, found: usize },
    #[error("non-finite value in `{column}` at row {row}")]
    NonFiniteValue { column: String, row: usize },
    #[error("duplicate lattice point at row {row}")]
    DuplicatePoint { row: usize },
    #[error("rows do not cover the lattice: expected {expected} points, found {found}")]
    IncompleteLattice { expected: usize, found: usize },
    #[error("smoothing needs {expected} non-negative sigmas, got {found:?}")]
    InvalidSmoothing { expected: usize, found: Vec<f64> },
    #[error("wind fields need 2 channels (u, v), got {0}")]
    WindChannels(usize),
}
