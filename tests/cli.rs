use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn binaries_print_help() {
    for bin in ["optimize", "sweep"] {
        Command::cargo_bin(bin)
            .expect("binary builds")
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("--from"));
    }
}

#[test]
fn unknown_airport_is_reported() {
    Command::cargo_bin("optimize")
        .expect("optimize bin")
        .args(["--from", "EHAM", "--to", "ZZZZ"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown airport 'ZZZZ'"));
}

#[test]
fn grid_objective_requires_a_grid() {
    Command::cargo_bin("optimize")
        .expect("optimize bin")
        .args(["--from", "EHAM", "--to", "LFPG", "--objective", "grid"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--grid"));
}

#[test]
fn optimize_writes_trajectory_and_summary() {
    let dir = tempfile::tempdir().expect("temp dir");
    let output = dir.path().join("out").join("traj.csv");

    Command::cargo_bin("optimize")
        .expect("optimize bin")
        .args([
            "--from",
            "EHAM",
            "--to",
            "LFPG",
            "--aircraft",
            "A320",
            "--phase",
            "cruise",
            "--nodes",
            "5",
            "--max-iterations",
            "200",
            "--return-failed",
            "--output",
        ])
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("status="));

    let csv = fs::read_to_string(&output).expect("trajectory CSV");
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some(flight_optimizer::export::trajectory::HEADER)
    );
    assert_eq!(lines.filter(|l| l.starts_with("cruise,")).count(), 5);

    let sidecar = dir.path().join("out").join("traj_summary.json");
    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&sidecar).expect("summary sidecar"))
            .expect("valid JSON");
    assert!(json["generated_utc"].as_str().is_some());
    assert_eq!(json["aircraft"], "A320");
    assert_eq!(json["origin"], "EHAM");
    assert_eq!(json["objective"], "fuel");
    assert!(json["status"].as_str().is_some());
    assert_eq!(json["phases"].as_array().map(Vec::len), Some(1));
}

#[test]
fn sweep_writes_one_row_per_case() {
    let dir = tempfile::tempdir().expect("temp dir");
    let summary = dir.path().join("sweep.csv");

    Command::cargo_bin("sweep")
        .expect("sweep bin")
        .args([
            "--from",
            "EHAM",
            "--to",
            "LFPG",
            "--phase",
            "cruise",
            "--nodes",
            "4",
            "--max-iterations",
            "100",
            "--return-failed",
            "--contrail",
            "0,1",
            "--summary",
        ])
        .arg(&summary)
        .assert()
        .success();

    let mut reader = csv::Reader::from_path(&summary).expect("summary table");
    let headers = reader.headers().expect("headers").clone();
    assert_eq!(&headers[0], "contrail_scale");
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.expect("row")).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][0], "0");
    assert_eq!(&rows[1][0], "1");
}
