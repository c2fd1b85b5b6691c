//! CSV import of cost grids and wind tables.
//!
//! Only the columns a schema names are parsed; other columns (labels, notes)
//! are ignored. Structural validation is left to `flight_field`.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use flight_field::{ColumnTable, Grid, GridSchema, Interpolant, MalformedGridError, Smoothing, WindField};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("column `{column}` row {row}: `{value}` is not a number")]
    Parse {
        column: String,
        row: usize,
        value: String,
    },
    #[error("malformed grid: {0}")]
    Grid(#[from] MalformedGridError),
}

/// Read the named numeric columns from a CSV stream with a header row.
pub fn read_table<R: Read>(reader: R, columns: &[&str]) -> Result<ColumnTable, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let positions: Vec<(usize, &str)> = columns
        .iter()
        .filter_map(|name| headers.iter().position(|h| h == *name).map(|i| (i, *name)))
        .collect();

    let mut data: Vec<Vec<f64>> = vec![Vec::new(); positions.len()];
    for (row, record) in csv_reader.records().enumerate() {
        let record = record?;
        for ((index, name), values) in positions.iter().zip(data.iter_mut()) {
            let raw = record.get(*index).unwrap_or("");
            let value = raw.parse::<f64>().map_err(|_| ImportError::Parse {
                column: (*name).to_string(),
                row,
                value: raw.to_string(),
            })?;
            values.push(value);
        }
    }

    let mut table = ColumnTable::new();
    for ((_, name), values) in positions.into_iter().zip(data) {
        table.insert(name, values);
    }
    debug!(rows = table.row_count(), "read CSV table");
    Ok(table)
}

/// Build a grid from a CSV stream using `schema`.
pub fn read_grid<R: Read>(reader: R, schema: &GridSchema) -> Result<Grid, ImportError> {
    let mut wanted: Vec<&str> = schema.axes.iter().map(|a| a.column).collect();
    wanted.extend(schema.values.iter().copied());
    let table = read_table(reader, &wanted)?;
    Ok(Grid::from_table(&table, schema)?)
}

/// Load a 3D or 4D cost grid (`longitude, latitude, height, cost[, ts]`).
pub fn load_cost_grid<P: AsRef<Path>>(
    path: P,
    smoothing: Option<&Smoothing>,
) -> Result<Interpolant, ImportError> {
    let path = path.as_ref();
    let grid = read_grid(File::open(path)?, &GridSchema::cost())?;
    info!(
        path = %path.display(),
        dimension = grid.dimension(),
        nodes = grid.node_count(),
        "loaded cost grid"
    );
    match smoothing {
        Some(smoothing) => Ok(Interpolant::smoothed(grid, smoothing)?),
        None => Ok(Interpolant::new(grid)),
    }
}

/// Load a wind table (`ts, latitude, longitude, h, u, v`).
pub fn load_wind<P: AsRef<Path>>(path: P) -> Result<WindField, ImportError> {
    let path = path.as_ref();
    let grid = read_grid(File::open(path)?, &GridSchema::wind())?;
    info!(
        path = %path.display(),
        dimension = grid.dimension(),
        nodes = grid.node_count(),
        "loaded wind field"
    );
    Ok(WindField::from_grid(grid)?)
}
