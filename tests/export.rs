use std::fs;
use std::io::Write;
use std::path::Path;

use flight_optimizer::export::summary::{self, Metadata, PhaseSummary, RunSummary};
use flight_optimizer::export::trajectory::{HEADER, Record, write_header};
use flight_optimizer::export::writer_for_path;

fn run_summary() -> RunSummary {
    RunSummary {
        status: "converged".into(),
        converged: true,
        objective: 1234.5,
        iterations: 87,
        outer_iterations: 4,
        constraint_violation: 2e-7,
        wall_time_s: 0.8,
        flight_time_s: 3_000.0,
        fuel_burned_kg: 1_850.0,
        distance_m: 398_000.0,
        max_altitude_m: 10_668.0,
        flagged_points: 0,
        phases: vec![PhaseSummary {
            phase: "cruise".into(),
            status: "converged".into(),
            iterations: 87,
            constraint_violation: 2e-7,
            duration_s: 3_000.0,
            fuel_burned_kg: 1_850.0,
            distance_m: 398_000.0,
        }],
    }
}

#[test]
fn record_matches_header_columns() {
    let mut buffer = Vec::new();
    write_header(&mut buffer).expect("header");
    Record {
        phase: "climb",
        time_s: 12.5,
        longitude: 4.76,
        latitude: 52.31,
        altitude_m: 1_500.0,
        mass_kg: 70_000.0,
        mach: 0.45,
        tas_m_s: 150.0,
        vertical_rate_m_s: 10.0,
        fuel_burned_kg: 12.25,
        distance_m: 1_875.0,
        flags: &["mach_above_mmo", "cas_below_minimum"],
    }
    .write_to(&mut buffer)
    .expect("record");

    let text = String::from_utf8(buffer).expect("utf8");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], HEADER);
    let fields: Vec<&str> = lines[1].split(',').collect();
    assert_eq!(fields.len(), HEADER.split(',').count());
    assert_eq!(fields[0], "climb");
    assert_eq!(fields[1], "12.500");
    assert_eq!(fields[4], "1500.00");
    assert_eq!(fields[11], "mach_above_mmo|cas_below_minimum");
}

#[test]
fn record_without_flags_ends_with_empty_column() {
    let mut buffer = Vec::new();
    Record {
        phase: "cruise",
        time_s: 0.0,
        longitude: 0.0,
        latitude: 0.0,
        altitude_m: 0.0,
        mass_kg: 0.0,
        mach: 0.0,
        tas_m_s: 0.0,
        vertical_rate_m_s: 0.0,
        fuel_burned_kg: 0.0,
        distance_m: 0.0,
        flags: &[],
    }
    .write_to(&mut buffer)
    .expect("record");
    let line = String::from_utf8(buffer).expect("utf8");
    assert!(line.trim_end().ends_with(','), "line: {line}");
}

#[test]
fn writer_creates_missing_directories() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("a").join("b").join("out.csv");
    {
        let mut writer = writer_for_path(&path).expect("writer");
        writeln!(writer, "hello").expect("write");
        writer.flush().expect("flush");
    }
    assert_eq!(fs::read_to_string(&path).expect("read back"), "hello\n");
}

#[test]
fn sidecar_sits_next_to_the_output() {
    assert_eq!(
        summary::sidecar_path(Path::new("runs/eham_lfpg.csv")),
        Path::new("runs/eham_lfpg_summary.json")
    );
    assert_eq!(
        summary::sidecar_path(Path::new("traj.csv")),
        Path::new("traj_summary.json")
    );
}

#[test]
fn sidecar_carries_metadata_and_totals() {
    let dir = tempfile::tempdir().expect("temp dir");
    let output = dir.path().join("nested").join("traj.csv");
    let meta = Metadata {
        aircraft: "A320",
        origin: "EHAM",
        destination: "LFPG",
        objective: "fuel",
        contrail_scale: 0.0,
        co2_scale: 1.0,
    };
    let path = summary::write_sidecar(&output, &meta, &run_summary()).expect("sidecar");
    assert_eq!(path, dir.path().join("nested").join("traj_summary.json"));

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("json");
    assert!(json["generated_utc"].as_str().is_some_and(|s| s.ends_with('Z')));
    assert_eq!(json["aircraft"], "A320");
    assert_eq!(json["destination"], "LFPG");
    assert_eq!(json["status"], "converged");
    assert_eq!(json["iterations"], 87);
    assert_eq!(json["phases"][0]["phase"], "cruise");
}
