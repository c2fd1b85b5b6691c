use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use flight_optimizer::importer;
use flight_optimizer::planner::phase::{AltitudeBoundary, Boundary, PhaseSegment};
use flight_optimizer::planner::sweep::{self, SweepOutcome};
use flight_optimizer::planner::{
    CostNormalization, FlightPhase, InitialMass, PlannerError, PhaseKind, ScalingFactors,
    SolveMode, Trajectory, solve,
};
use flight_optimizer::report::{summarize, write_trajectory};
use flight_optimizer::scenario::{
    Catalogs, ObjectiveRequest, ScenarioError, ScenarioRequest, build_problem, load_catalogs,
};

fn catalogs() -> Catalogs {
    load_catalogs("configs").expect("catalogs under configs/")
}

fn small_request(from: &str, to: &str, phase: FlightPhase) -> ScenarioRequest {
    let mut request = ScenarioRequest::new(from, to);
    request.aircraft = Some("A320".into());
    request.phase = phase;
    request.nodes = Some(5);
    request.max_iterations = Some(400);
    request
}

/// Cost grid with a Gaussian hot spot over central Europe above 10.5 km.
fn write_bump_grid(path: &Path) {
    let mut out = BufWriter::new(File::create(path).expect("grid file"));
    writeln!(out, "longitude,latitude,height,cost").expect("header");
    for lon in 0..=16 {
        for lat in 38..=56 {
            for height in [8_000.0, 9_000.0, 10_000.0, 10_500.0, 11_000.0, 12_000.0, 13_000.0] {
                let (dx, dy) = (lon as f64 - 8.5, lat as f64 - 47.0);
                let bump = 3.0 * (-(dx * dx + dy * dy) / (2.0 * 1.5 * 1.5)).exp();
                let cost = if height >= 10_500.0 { bump } else { 0.0 };
                writeln!(out, "{lon},{lat},{height},{cost:.6}").expect("row");
            }
        }
    }
    out.flush().expect("flush grid");
}

/// Cost grid holding the same value everywhere.
fn write_flat_grid(path: &Path, value: f64) {
    let mut out = BufWriter::new(File::create(path).expect("grid file"));
    writeln!(out, "longitude,latitude,height,cost").expect("header");
    for lon in [0.0, 10.0] {
        for lat in [45.0, 55.0] {
            for height in [8_000.0, 13_000.0] {
                writeln!(out, "{lon},{lat},{height},{value}").expect("row");
            }
        }
    }
    out.flush().expect("flush grid");
}

fn exposure(trajectory: &Trajectory, grid: &Path) -> f64 {
    let field = importer::load_cost_grid(grid, None).expect("grid reloads");
    let sample = |p: &flight_optimizer::planner::TrajectoryPoint| {
        field.evaluate(&[p.longitude, p.latitude, p.altitude_m])
    };
    trajectory
        .points()
        .windows(2)
        .map(|pair| 0.5 * (sample(&pair[0]) + sample(&pair[1])) * (pair[1].time_s - pair[0].time_s))
        .sum()
}

#[test]
fn unresolved_inputs_fail_before_solving() {
    let catalogs = catalogs();

    let err = build_problem(&catalogs, &ScenarioRequest::new("EHAM", "ZZZZ")).expect_err("unknown");
    assert!(
        matches!(err, ScenarioError::Planner(PlannerError::UnknownAirport(ref code)) if code == "ZZZZ"),
        "unexpected error: {err}"
    );

    let mut heavy = ScenarioRequest::new("EHAM", "LFPG");
    heavy.initial_mass = InitialMass::FractionOfMtow(1.2);
    assert!(matches!(
        build_problem(&catalogs, &heavy),
        Err(ScenarioError::Planner(PlannerError::InitialMass { .. }))
    ));

    let mut inverted = ScenarioRequest::new("EHAM", "LFPG");
    inverted.min_altitude_ft = Some(38_000.0);
    inverted.max_altitude_ft = Some(30_000.0);
    assert!(matches!(
        build_problem(&catalogs, &inverted),
        Err(ScenarioError::Planner(PlannerError::AltitudeBounds { .. }))
    ));

    let mut missing_grid = ScenarioRequest::new("EHAM", "LFPG");
    missing_grid.objective = ObjectiveRequest::Grid {
        path: "does/not/exist.csv".into(),
        normalization: CostNormalization::PerSecond,
        smoothing_sigma: None,
        fuel_weight: 0.0,
    };
    assert!(matches!(
        build_problem(&catalogs, &missing_grid),
        Err(ScenarioError::Import(_))
    ));
}

#[test]
fn cruise_band_above_the_ceiling_is_rejected_structurally() {
    let catalogs = catalogs();
    let mut request = small_request("EHAM", "LFPG", FlightPhase::Cruise);
    request.max_altitude_ft = Some(20_000.0);
    let spec = build_problem(&catalogs, &request).expect("spec builds");
    assert!(matches!(solve(&spec), Err(PlannerError::InfeasibleBounds { .. })));
}

#[test]
fn low_ceiling_returns_failed_iterate_only_when_asked() {
    let catalogs = catalogs();
    let ceiling_ft = 20_000.0;
    let mut request = small_request("EHAM", "LFPG", FlightPhase::Complete);
    request.max_altitude_ft = Some(ceiling_ft);
    request.max_iterations = Some(300);

    let spec = build_problem(&catalogs, &request).expect("spec builds");
    match solve(&spec) {
        Err(PlannerError::ConvergenceFailure(failure)) => {
            assert!(!failure.status.is_converged());
            assert!(failure.diagnostics.constraint_violation > 1.0);
        }
        other => panic!("expected a convergence failure, got {:?}", other.map(|t| t.status())),
    }

    request.return_failed = true;
    let spec = build_problem(&catalogs, &request).expect("spec builds");
    let trajectory = solve(&spec).expect("failed iterate returned");
    assert!(!trajectory.is_converged());
    let ceiling_m = ceiling_ft * 0.3048;
    assert!(
        trajectory.max_altitude_m() <= ceiling_m + 1e-6,
        "altitude {} above the ceiling",
        trajectory.max_altitude_m()
    );
    assert_eq!(trajectory.points().len(), 15);
}

#[test]
fn sequential_segments_join_exactly() {
    let catalogs = catalogs();
    let mut request = small_request("EHAM", "LFPG", FlightPhase::Complete);
    request.mode = SolveMode::Sequential;
    request.return_failed = true;
    let spec = build_problem(&catalogs, &request).expect("spec builds");
    let trajectory = solve(&spec).expect("sequential solve");

    let points = trajectory.points();
    assert_eq!(points.len(), 15);
    let first = &points[0];
    assert!(first.time_s.abs() < 1e-9);
    assert!((first.mass_kg - spec.initial_mass_kg()).abs() < 1e-6);
    assert!((first.longitude - spec.route().origin.position.longitude).abs() < 1e-9);
    assert!((first.latitude - spec.route().origin.position.latitude).abs() < 1e-9);

    for boundary in [5, 10] {
        let (end, start) = (&points[boundary - 1], &points[boundary]);
        assert_ne!(end.segment, start.segment);
        assert!((end.time_s - start.time_s).abs() < 1e-6, "time jump at {boundary}");
        assert!((end.altitude_m - start.altitude_m).abs() < 1e-6, "altitude jump at {boundary}");
        assert!((end.mass_kg - start.mass_kg).abs() < 1e-6, "mass jump at {boundary}");
        assert!((end.longitude - start.longitude).abs() < 1e-8);
        assert!((end.latitude - start.latitude).abs() < 1e-8);
    }

    let phases: Vec<PhaseKind> = trajectory.phase_outcomes().iter().map(|o| o.phase).collect();
    assert_eq!(phases, [PhaseKind::Climb, PhaseKind::Cruise, PhaseKind::Descent]);

    let last = points.last().expect("points");
    assert!((last.altitude_m - spec.route().destination.elevation_m).abs() < 1e-6);
    assert!(trajectory.fuel_burned_kg() > 0.0);
    for pair in points.windows(2) {
        assert!(pair[1].mass_kg <= pair[0].mass_kg + 1e-6, "mass rises at t={}", pair[1].time_s);
    }
}

#[test]
fn joint_flight_is_monotone_and_continuous_across_phases() {
    let catalogs = catalogs();
    let mut request = small_request("EHAM", "LFPG", FlightPhase::Complete);
    request.nodes = Some(8);
    request.max_iterations = None;
    request.return_failed = true;
    let spec = build_problem(&catalogs, &request).expect("spec builds");
    let trajectory = solve(&spec).expect("joint solve");
    assert!(trajectory.is_converged(), "joint solve ended {}", trajectory.status().as_str());

    let points = trajectory.points();
    assert_eq!(points.len(), 24);
    for pair in points.windows(2) {
        let (before, after) = (&pair[0], &pair[1]);
        assert!(
            after.mass_kg <= before.mass_kg,
            "mass rises from {} to {} at t={}",
            before.mass_kg,
            after.mass_kg,
            after.time_s
        );
        assert!(
            after.time_s >= before.time_s,
            "time steps back from {} to {}",
            before.time_s,
            after.time_s
        );
    }

    for boundary in [8, 16] {
        let (end, start) = (&points[boundary - 1], &points[boundary]);
        assert_ne!(end.phase, start.phase);
        assert_eq!(end.altitude_m, start.altitude_m, "altitude jump at {boundary}");
        assert_eq!(end.mass_kg, start.mass_kg, "mass jump at {boundary}");
        assert_eq!(end.time_s, start.time_s, "time jump at {boundary}");
        assert_eq!((end.longitude, end.latitude), (start.longitude, start.latitude));
        assert!((end.mach - start.mach).abs() < 1e-3, "Mach jump at {boundary}");
        assert!(
            (end.tas_m_s - start.tas_m_s).abs() < 0.5,
            "airspeed jump at {boundary}: {} vs {}",
            end.tas_m_s,
            start.tas_m_s
        );
    }
}

#[test]
fn flat_grid_leaves_a_fixed_time_flight_unchanged() {
    let dir = tempfile::tempdir().expect("temp dir");
    let grid = dir.path().join("flat.csv");
    write_flat_grid(&grid, 0.5);

    let catalogs = catalogs();
    let mut request = small_request("EHAM", "LFPG", FlightPhase::Cruise);
    let reference = build_problem(&catalogs, &request).expect("spec builds");
    let route = reference.route();
    let band = &reference.aircraft().cruise;
    let altitude = AltitudeBoundary::Between(band.min_altitude_m, band.max_altitude_m);
    let arrival_s = 1_800.0;
    let segment = PhaseSegment::new(PhaseKind::Cruise, 6)
        .with_start(Boundary::at(route.origin.position).with_altitude(altitude))
        .with_end(
            Boundary::at(route.destination.position)
                .with_altitude(altitude)
                .with_time(arrival_s),
        );
    request.phase = FlightPhase::Custom(vec![segment]);
    request.max_iterations = Some(1_500);
    request.return_failed = true;

    let fuel_only = build_problem(&catalogs, &request).expect("fuel spec");
    request.objective = ObjectiveRequest::Grid {
        path: grid,
        normalization: CostNormalization::PerSecond,
        smoothing_sigma: None,
        fuel_weight: 1.0,
    };
    let with_grid = build_problem(&catalogs, &request).expect("grid spec");

    let a = solve(&fuel_only).expect("fuel-only solve");
    let b = solve(&with_grid).expect("flat-grid solve");
    assert!(a.is_converged() && b.is_converged(), "both fixed-time solves converge");

    for trajectory in [&a, &b] {
        let last = trajectory.points().last().expect("points");
        assert!((last.time_s - arrival_s).abs() < 1e-6, "arrival at {}", last.time_s);
    }
    let (fa, fb) = (a.fuel_burned_kg(), b.fuel_burned_kg());
    assert!((fa - fb).abs() <= 5e-3 * fa, "fuel {fa:.2} vs {fb:.2}");
    for (p, q) in a.points().iter().zip(b.points()) {
        assert!(
            (p.altitude_m - q.altitude_m).abs() < 150.0,
            "altitude {} vs {} at node t={}",
            p.altitude_m,
            q.altitude_m,
            p.time_s
        );
    }
}

#[test]
fn climb_ends_at_the_requested_floor() {
    let catalogs = catalogs();
    let mut request = small_request("EHAM", "LFPG", FlightPhase::Climb);
    request.min_altitude_ft = Some(33_000.0);
    let spec = build_problem(&catalogs, &request).expect("spec builds");
    let segments = spec.segments();
    assert_eq!(
        segments[0].end.altitude,
        AltitudeBoundary::AtLeast(33_000.0 * 0.3048)
    );
}

#[test]
fn report_writes_one_row_per_point() {
    let catalogs = catalogs();
    let mut request = small_request("EHAM", "LFPG", FlightPhase::Cruise);
    request.return_failed = true;
    let spec = build_problem(&catalogs, &request).expect("spec builds");
    let trajectory = solve(&spec).expect("cruise solve");

    let mut buffer = Vec::new();
    write_trajectory(&trajectory, &mut buffer).expect("write CSV");
    let mut reader = csv::Reader::from_reader(buffer.as_slice());
    let headers = reader.headers().expect("header row").clone();
    assert_eq!(&headers[0], "phase");
    assert_eq!(&headers[headers.len() - 1], "flags");
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.expect("row")).collect();
    assert_eq!(rows.len(), trajectory.points().len());
    assert!(rows.iter().all(|r| &r[0] == "cruise" && r.len() == headers.len()));

    let summary = summarize(&trajectory);
    assert_eq!(summary.phases.len(), 1);
    assert_eq!(summary.status, trajectory.status().as_str());
    assert!((summary.fuel_burned_kg - summary.phases[0].fuel_burned_kg).abs() < 1e-6);

    let resampled = trajectory.resample(60.0);
    let last = resampled.points().last().expect("resampled points");
    let original_end = trajectory.points().last().expect("points").time_s;
    assert!((last.time_s - original_end).abs() < 1e-9);
    assert_eq!(resampled.status(), trajectory.status());
}

#[test]
fn scaling_grid_is_contrail_major() {
    let cases = sweep::scaling_grid(&[0.0, 1.0], &[1.0, 2.0]).expect("valid factors");
    let pairs: Vec<(f64, f64)> = cases.iter().map(|s| (s.contrail(), s.co2())).collect();
    assert_eq!(pairs, [(0.0, 1.0), (0.0, 2.0), (1.0, 1.0), (1.0, 2.0)]);
    assert!(sweep::scaling_grid(&[-1.0], &[1.0]).is_err());
}

#[test]
fn contrail_scaling_trades_fuel_for_exposure() {
    let dir = tempfile::tempdir().expect("temp dir");
    let grid = dir.path().join("bump.csv");
    write_bump_grid(&grid);

    let catalogs = catalogs();
    let mut request = small_request("EHAM", "LIRF", FlightPhase::Cruise);
    request.nodes = Some(8);
    request.max_iterations = Some(1_500);
    request.return_failed = true;
    request.objective = ObjectiveRequest::Grid {
        path: grid.clone(),
        normalization: CostNormalization::PerSecond,
        smoothing_sigma: None,
        fuel_weight: 1.0,
    };
    let spec = build_problem(&catalogs, &request).expect("spec builds");
    let cases = [
        ScalingFactors::new(0.0, 1.0).expect("scaling"),
        ScalingFactors::new(20.0, 1.0).expect("scaling"),
    ];
    let outcomes = sweep::run_warm_started(&spec, &cases);
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].scaling, cases[0]);
    assert_eq!(outcomes[1].scaling, cases[1]);

    let solved: Vec<&Trajectory> = outcomes
        .iter()
        .map(|SweepOutcome { result, .. }| result.as_ref().expect("return_failed keeps iterates"))
        .collect();
    for (case, trajectory) in cases.iter().zip(&solved) {
        assert!(
            trajectory.is_converged(),
            "contrail scale {} ended {}",
            case.contrail(),
            trajectory.status().as_str()
        );
    }

    let (fuel_only, scaled) = (solved[0], solved[1]);
    let (g0, g1) = (exposure(fuel_only, &grid), exposure(scaled, &grid));
    assert!(g1 < g0, "scaled case should see less exposure: {g1:.2} vs {g0:.2}");
    assert!(
        scaled.fuel_burned_kg() > fuel_only.fuel_burned_kg() + 1.0,
        "avoiding the grid should cost fuel: {:.1} vs {:.1}",
        fuel_only.fuel_burned_kg(),
        scaled.fuel_burned_kg()
    );
}
