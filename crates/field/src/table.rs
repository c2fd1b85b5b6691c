use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::MalformedGridError;
use crate::grid::{Axis, AxisKind, Grid};

/// Column-oriented numeric table, the loosely typed form grids arrive in.
#[derive(Debug, Clone, Default)]
pub struct ColumnTable {
    columns: BTreeMap<String, Vec<f64>>,
}

impl ColumnTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_column(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.insert(name, values);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.columns.insert(name.into(), values);
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn row_count(&self) -> usize {
        self.columns.values().map(Vec::len).max().unwrap_or(0)
    }
}

/// Column bound to a grid axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisColumn {
    pub kind: AxisKind,
    pub column: &'static str,
    pub required: bool,
}

/// Expected layout of a grid table.
///
/// Columns are matched by exact name; nothing is inferred from position or
/// from look-alike names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridSchema {
    pub axes: Vec<AxisColumn>,
    pub values: Vec<&'static str>,
    /// Drop the time axis when it carries a single timestamp.
    pub collapse_single_time: bool,
}

impl GridSchema {
    /// Cost grid: `longitude, latitude, height, cost`, plus `ts` for 4D grids.
    pub fn cost() -> Self {
        Self {
            axes: vec![
                AxisColumn {
                    kind: AxisKind::Longitude,
                    column: "longitude",
                    required: true,
                },
                AxisColumn {
                    kind: AxisKind::Latitude,
                    column: "latitude",
                    required: true,
                },
                AxisColumn {
                    kind: AxisKind::Height,
                    column: "height",
                    required: true,
                },
                AxisColumn {
                    kind: AxisKind::Time,
                    column: "ts",
                    required: false,
                },
            ],
            values: vec!["cost"],
            collapse_single_time: false,
        }
    }

    /// Cost grid that must carry a time axis.
    pub fn cost_4d() -> Self {
        let mut schema = Self::cost();
        if let Some(time) = schema.axes.iter_mut().find(|a| a.kind == AxisKind::Time) {
            time.required = true;
        }
        schema
    }

    /// Wind table: `ts, latitude, longitude, h, u, v` (m/s components).
    pub fn wind() -> Self {
        Self {
            axes: vec![
                AxisColumn {
                    kind: AxisKind::Longitude,
                    column: "longitude",
                    required: true,
                },
                AxisColumn {
                    kind: AxisKind::Latitude,
                    column: "latitude",
                    required: true,
                },
                AxisColumn {
                    kind: AxisKind::Height,
                    column: "h",
                    required: true,
                },
                AxisColumn {
                    kind: AxisKind::Time,
                    column: "ts",
                    required: true,
                },
            ],
            values: vec!["u", "v"],
            collapse_single_time: true,
        }
    }
}

impl Grid {
    /// Validate a column table against `schema` and build the lattice.
    ///
    /// Every combination of axis values must appear exactly once.
    pub fn from_table(table: &ColumnTable, schema: &GridSchema) -> Result<Grid, MalformedGridError> {
        let mut axis_columns: Vec<(AxisKind, &[f64])> = Vec::new();
        for axis in &schema.axes {
            match table.column(axis.column) {
                Some(values) => axis_columns.push((axis.kind, values)),
                None if axis.required => {
                    return Err(MalformedGridError::MissingColumn {
                        column: axis.column.to_string(),
                    });
                }
                None => {}
            }
        }
        let mut value_columns: Vec<&[f64]> = Vec::new();
        for name in &schema.values {
            let values = table
                .column(name)
                .ok_or_else(|| MalformedGridError::MissingColumn {
                    column: (*name).to_string(),
                })?;
            value_columns.push(values);
        }

        let rows = axis_columns.first().map(|(_, c)| c.len()).unwrap_or(0);
        if rows == 0 {
            return Err(MalformedGridError::EmptyTable);
        }
        let named = schema
            .axes
            .iter()
            .filter(|a| table.column(a.column).is_some())
            .map(|a| a.column)
            .chain(schema.values.iter().copied());
        for name in named {
            let column = table.column(name).unwrap_or_default();
            if column.len() != rows {
                return Err(MalformedGridError::ColumnLength {
                    column: name.to_string(),
                    expected: rows,
                    found: column.len(),
                });
            }
            if let Some(row) = column.iter().position(|v| !v.is_finite()) {
                return Err(MalformedGridError::NonFiniteValue {
                    column: name.to_string(),
                    row,
                });
            }
        }

        let mut axes = Vec::new();
        let mut used_columns: Vec<&[f64]> = Vec::new();
        for (kind, column) in axis_columns {
            let unique = unique_sorted(column);
            if kind == AxisKind::Time && schema.collapse_single_time && unique.len() == 1 {
                continue;
            }
            axes.push(Axis::new(kind, unique)?);
            used_columns.push(column);
        }

        let expected: usize = axes.iter().map(Axis::len).product();
        let mut strides = vec![1usize; axes.len()];
        for i in (0..axes.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * axes[i + 1].len();
        }

        let channels = value_columns.len();
        let mut values = vec![0.0; expected * channels];
        let mut seen = vec![false; expected];
        for row in 0..rows {
            let mut flat = 0;
            for ((axis, column), stride) in axes.iter().zip(&used_columns).zip(&strides) {
                let index = axis
                    .values()
                    .binary_search_by(|v| v.partial_cmp(&column[row]).unwrap_or(Ordering::Less))
                    .map_err(|_| MalformedGridError::IncompleteLattice {
                        expected,
                        found: rows,
                    })?;
                flat += index * stride;
            }
            if seen[flat] {
                return Err(MalformedGridError::DuplicatePoint { row });
            }
            seen[flat] = true;
            for (channel, column) in value_columns.iter().enumerate() {
                values[flat * channels + channel] = column[row];
            }
        }
        if seen.iter().any(|filled| !filled) {
            return Err(MalformedGridError::IncompleteLattice {
                expected,
                found: rows,
            });
        }

        Grid::new(axes, channels, values)
    }
}

fn unique_sorted(values: &[f64]) -> Vec<f64> {
    let mut unique = values.to_vec();
    unique.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    unique.dedup();
    unique
}
