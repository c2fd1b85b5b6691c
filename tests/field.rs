use std::io::Write;

use flight_optimizer::field::{
    Axis, AxisKind, ColumnTable, FieldPoint, Grid, GridSchema, GridWarning, Interpolant,
    MalformedGridError, Smoothing, WindField,
};
use flight_optimizer::importer::{self, ImportError};
use tempfile::NamedTempFile;

fn plane_grid() -> Interpolant {
    // f(lon, lat) = 2·lon + 3·lat on a 3×3 lattice.
    let lon = [0.0, 1.0, 2.0];
    let lat = [10.0, 11.0, 12.0];
    let values = lon
        .iter()
        .flat_map(|x| lat.iter().map(move |y| 2.0 * x + 3.0 * y))
        .collect();
    let grid = Grid::new(
        vec![
            Axis::new(AxisKind::Longitude, lon.to_vec()).expect("lon axis"),
            Axis::new(AxisKind::Latitude, lat.to_vec()).expect("lat axis"),
        ],
        1,
        values,
    )
    .expect("grid");
    Interpolant::new(grid)
}

fn cost_table(heights: &[f64]) -> ColumnTable {
    let mut lon = Vec::new();
    let mut lat = Vec::new();
    let mut height = Vec::new();
    let mut cost = Vec::new();
    for x in [4.0, 5.0] {
        for y in [50.0, 51.0] {
            for h in heights {
                lon.push(x);
                lat.push(y);
                height.push(*h);
                cost.push(x + y + h / 1000.0);
            }
        }
    }
    ColumnTable::new()
        .with_column("longitude", lon)
        .with_column("latitude", lat)
        .with_column("height", height)
        .with_column("cost", cost)
}

#[test]
fn interpolant_reproduces_knots_and_linear_fields() {
    let field = plane_grid();
    for x in [0.0, 1.0, 2.0] {
        for y in [10.0, 11.0, 12.0] {
            let value = field.evaluate(&[x, y]);
            assert!((value - (2.0 * x + 3.0 * y)).abs() < 1e-12, "knot ({x}, {y}) gave {value}");
        }
    }
    let inside = field.evaluate(&[0.25, 11.5]);
    assert!((inside - (0.5 + 34.5)).abs() < 1e-12, "bilinear interior value {inside}");
}

#[test]
fn interpolant_clamps_outside_the_lattice() {
    let field = plane_grid();
    let below = field.evaluate(&[-5.0, 10.0]);
    let edge = field.evaluate(&[0.0, 10.0]);
    assert_eq!(below, edge, "queries left of the grid clamp to the edge");
    let above = field.evaluate(&[7.0, 40.0]);
    assert!((above - (4.0 + 36.0)).abs() < 1e-12);
    assert!(above.is_finite());
}

#[test]
fn gradient_is_exact_inside_and_zero_on_clamped_axes() {
    let field = plane_grid();
    let gradient = field.gradient(&[0.5, 10.5], 0);
    assert!((gradient[0] - 2.0).abs() < 1e-12, "d/dlon = {}", gradient[0]);
    assert!((gradient[1] - 3.0).abs() < 1e-12, "d/dlat = {}", gradient[1]);

    let clamped = field.gradient(&[5.0, 10.5], 0);
    assert_eq!(clamped[0], 0.0, "clamped longitude has no slope");
    assert!((clamped[1] - 3.0).abs() < 1e-12);
}

#[test]
fn named_samples_pick_matching_axes() {
    let field = plane_grid();
    let point = FieldPoint::new(1.5, 11.0, 9_000.0, 3_600.0);
    assert!((field.sample(&point) - (3.0 + 33.0)).abs() < 1e-12);
    assert_eq!(field.sample_gradient(&point).len(), 2);
}

#[test]
fn axes_must_increase_strictly() {
    let err = Axis::new(AxisKind::Height, vec![0.0, 1000.0, 1000.0]).expect_err("repeated knot");
    assert!(matches!(err, MalformedGridError::NonMonotonicAxis { axis: "height", .. }));
    let err = Axis::new(AxisKind::Height, Vec::new()).expect_err("empty axis");
    assert!(matches!(err, MalformedGridError::EmptyAxis { .. }));
}

#[test]
fn grid_rejects_wrong_value_count_and_duplicate_axes() {
    let lon = Axis::new(AxisKind::Longitude, vec![0.0, 1.0]).expect("axis");
    let err = Grid::new(vec![lon.clone()], 1, vec![1.0]).expect_err("short values");
    assert_eq!(err, MalformedGridError::ValueCount { expected: 2, found: 1 });

    let err = Grid::new(vec![lon.clone(), lon], 1, vec![0.0; 4]).expect_err("duplicate axis");
    assert!(matches!(err, MalformedGridError::DuplicateAxis { .. }));
}

#[test]
fn cost_schema_builds_a_three_dimensional_grid() {
    let grid = Grid::from_table(&cost_table(&[9_000.0, 11_000.0]), &GridSchema::cost())
        .expect("3D cost grid");
    assert_eq!(grid.dimension(), 3);
    assert_eq!(grid.node_count(), 8);
    assert!(grid.warnings().is_empty());

    let field = Interpolant::new(grid);
    let value = field.sample(&FieldPoint::new(4.5, 50.5, 10_000.0, 0.0));
    assert!((value - (4.5 + 50.5 + 10.0)).abs() < 1e-9, "trilinear value {value}");
}

#[test]
fn cost_4d_schema_builds_a_temporal_grid() {
    let mut columns: [Vec<f64>; 5] = Default::default();
    for x in [4.0, 5.0] {
        for y in [50.0, 51.0] {
            for h in [9_000.0, 11_000.0] {
                for t in [0.0, 3_600.0] {
                    columns[0].push(x);
                    columns[1].push(y);
                    columns[2].push(h);
                    columns[3].push(t);
                    columns[4].push((x - 4.0) + (y - 50.0) + (h - 9_000.0) / 2_000.0 + t / 3_600.0);
                }
            }
        }
    }
    let [lon, lat, height, ts, cost] = columns;
    let table = ColumnTable::new()
        .with_column("longitude", lon)
        .with_column("latitude", lat)
        .with_column("height", height)
        .with_column("ts", ts)
        .with_column("cost", cost);
    let grid = Grid::from_table(&table, &GridSchema::cost_4d()).expect("4D cost grid");
    assert_eq!(grid.dimension(), 4);
    assert_eq!(grid.node_count(), 16);

    let field = Interpolant::new(grid);
    assert!(field.is_temporal());
    let centre = field.sample(&FieldPoint::new(4.5, 50.5, 10_000.0, 1_800.0));
    assert!((centre - 2.0).abs() < 1e-12, "quadrilinear centre {centre}");
    let skewed = field.sample(&FieldPoint::new(4.25, 50.75, 9_500.0, 900.0));
    assert!((skewed - 1.5).abs() < 1e-12, "quadrilinear interior {skewed}");

    let late = field.sample(&FieldPoint::new(5.0, 51.0, 11_000.0, 7_200.0));
    assert!((late - 4.0).abs() < 1e-12, "time clamps to the last slice, got {late}");
    let early = field.sample(&FieldPoint::new(5.0, 51.0, 11_000.0, -600.0));
    assert!((early - 3.0).abs() < 1e-12, "time clamps to the first slice, got {early}");
}

#[test]
fn missing_channels_are_reported_not_panicked() {
    let field = plane_grid();
    assert_eq!(field.evaluate_channel(&[1.0, 11.0], 0), Some(35.0));
    assert_eq!(field.evaluate_channel(&[1.0, 11.0], 1), None);
    assert_eq!(field.gradient(&[0.5, 10.5], 3), vec![0.0, 0.0]);

    let mut out = [0.0];
    field.evaluate_into(&[0.25, 11.5], &mut out);
    assert!((out[0] - 35.0).abs() < 1e-12);
}

#[test]
fn heights_in_feet_raise_a_warning_not_an_error() {
    let grid = Grid::from_table(&cost_table(&[30_000.0, 36_000.0]), &GridSchema::cost())
        .expect("grid still builds");
    assert!(matches!(
        grid.warnings(),
        [GridWarning::ImplausibleHeight { max_height_m }] if *max_height_m == 36_000.0
    ));
}

#[test]
fn missing_and_incomplete_tables_are_rejected() {
    let table = cost_table(&[9_000.0, 11_000.0]);
    let err = Grid::from_table(&table, &GridSchema::cost_4d()).expect_err("ts is required");
    assert_eq!(err, MalformedGridError::MissingColumn { column: "ts".into() });

    let sparse = ColumnTable::new()
        .with_column("longitude", vec![4.0, 5.0, 4.0])
        .with_column("latitude", vec![50.0, 50.0, 51.0])
        .with_column("height", vec![9_000.0; 3])
        .with_column("cost", vec![1.0; 3]);
    let err = Grid::from_table(&sparse, &GridSchema::cost()).expect_err("missing corner");
    assert!(matches!(err, MalformedGridError::IncompleteLattice { expected: 4, found: 3 }));

    let doubled = ColumnTable::new()
        .with_column("longitude", vec![4.0, 4.0])
        .with_column("latitude", vec![50.0, 50.0])
        .with_column("height", vec![9_000.0, 9_000.0])
        .with_column("cost", vec![1.0, 2.0]);
    let err = Grid::from_table(&doubled, &GridSchema::cost()).expect_err("duplicate row");
    assert_eq!(err, MalformedGridError::DuplicatePoint { row: 1 });
}

#[test]
fn smoothing_preserves_constant_fields_and_checks_dimension() {
    let table = ColumnTable::new()
        .with_column("longitude", vec![0.0, 0.0, 1.0, 1.0, 2.0, 2.0])
        .with_column("latitude", vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0])
        .with_column("height", vec![10_000.0; 6])
        .with_column("cost", vec![7.0; 6]);
    let grid = Grid::from_table(&table, &GridSchema::cost()).expect("grid");

    let smoothed = Interpolant::smoothed(grid.clone(), &Smoothing::uniform(3, 1.0))
        .expect("valid smoothing");
    assert!((smoothed.evaluate(&[1.0, 0.5, 10_000.0]) - 7.0).abs() < 1e-9);

    let err = Interpolant::smoothed(grid, &Smoothing::uniform(4, 1.0)).expect_err("4 sigmas on 3 axes");
    assert!(matches!(err, MalformedGridError::InvalidSmoothing { expected: 3, .. }));
}

#[test]
fn wind_csv_with_single_timestamp_collapses_to_3d() {
    let mut file = NamedTempFile::new().expect("temp file");
    writeln!(file, "ts,latitude,longitude,h,u,v").expect("header");
    for lat in [50.0, 52.0] {
        for lon in [3.0, 6.0] {
            for h in [8_000.0, 12_000.0] {
                writeln!(file, "0,{lat},{lon},{h},{},-5", h / 1000.0).expect("row");
            }
        }
    }
    file.flush().expect("flush");

    let wind = importer::load_wind(file.path()).expect("wind field");
    assert_eq!(wind.interpolant().dimension(), 3);
    let (u, v) = wind.at(&FieldPoint::new(4.5, 51.0, 10_000.0, 7_200.0));
    assert!((u - 10.0).abs() < 1e-9, "u = {u}");
    assert!((v + 5.0).abs() < 1e-9, "v = {v}");

    let calm = WindField::uniform(0.0, 0.0).expect("uniform wind");
    assert_eq!(calm.at(&FieldPoint::default()), (0.0, 0.0));
}

#[test]
fn cost_csv_reports_unparseable_cells() {
    let mut file = NamedTempFile::new().expect("temp file");
    writeln!(file, "longitude,latitude,height,cost,label").expect("header");
    writeln!(file, "4,50,9000,1.0,a").expect("row");
    writeln!(file, "4,50,11000,n/a,b").expect("row");
    file.flush().expect("flush");

    match importer::load_cost_grid(file.path(), None) {
        Err(ImportError::Parse { column, row, .. }) => {
            assert_eq!(column, "cost");
            assert_eq!(row, 1);
        }
        other => panic!("expected a parse error, got {other:?}"),
    }
}
