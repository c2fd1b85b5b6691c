//! Export helpers for CSV and JSON artifacts.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Create a writer for the target path, handling stdout (`-`) by convention.
pub fn writer_for_path(path: &Path) -> io::Result<Box<dyn Write>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufWriter::new(io::stdout())));
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    Ok(Box::new(BufWriter::new(file)))
}

pub mod trajectory {
    use std::io::{self, Write};

    pub const HEADER: &str = "phase,time_s,longitude,latitude,altitude_m,mass_kg,mach,tas_m_s,vertical_rate_m_s,fuel_burned_kg,distance_m,flags";

    /// Write the trajectory CSV header.
    pub fn write_header(writer: &mut dyn Write) -> io::Result<()> {
        writeln!(writer, "{}", HEADER)
    }

    /// One trajectory sample as written to CSV. `flags` are joined with `|`.
    #[derive(Debug, Clone)]
    pub struct Record<'a> {
        pub phase: &'a str,
        pub time_s: f64,
        pub longitude: f64,
        pub latitude: f64,
        pub altitude_m: f64,
        pub mass_kg: f64,
        pub mach: f64,
        pub tas_m_s: f64,
        pub vertical_rate_m_s: f64,
        pub fuel_burned_kg: f64,
        pub distance_m: f64,
        pub flags: &'a [&'a str],
    }

    impl Record<'_> {
        /// Serialize the record to CSV, matching the header ordering.
        pub fn write_to(&self, writer: &mut dyn Write) -> io::Result<()> {
            writeln!(
                writer,
                "{},{:.3},{:.6},{:.6},{:.2},{:.3},{:.4},{:.3},{:.4},{:.4},{:.2},{}",
                self.phase,
                self.time_s,
                self.longitude,
                self.latitude,
                self.altitude_m,
                self.mass_kg,
                self.mach,
                self.tas_m_s,
                self.vertical_rate_m_s,
                self.fuel_burned_kg,
                self.distance_m,
                self.flags.join("|"),
            )
        }
    }
}

pub mod summary {
    use std::fs::{self, File};
    use std::io;
    use std::path::{Path, PathBuf};

    use chrono::{SecondsFormat, Utc};
    use serde::Serialize;
    use serde_json::to_writer_pretty;

    /// Per-phase totals included in the sidecar.
    #[derive(Debug, Clone, Serialize)]
    pub struct PhaseSummary {
        pub phase: String,
        pub status: String,
        pub iterations: u64,
        pub constraint_violation: f64,
        pub duration_s: f64,
        pub fuel_burned_kg: f64,
        pub distance_m: f64,
    }

    /// Headline numbers of one optimization run.
    #[derive(Debug, Clone, Serialize)]
    pub struct RunSummary {
        pub status: String,
        pub converged: bool,
        pub objective: f64,
        pub iterations: u64,
        pub outer_iterations: u64,
        pub constraint_violation: f64,
        pub wall_time_s: f64,
        pub flight_time_s: f64,
        pub fuel_burned_kg: f64,
        pub distance_m: f64,
        pub max_altitude_m: f64,
        pub flagged_points: usize,
        pub phases: Vec<PhaseSummary>,
    }

    /// Metadata describing the run.
    #[derive(Debug)]
    pub struct Metadata<'a> {
        pub aircraft: &'a str,
        pub origin: &'a str,
        pub destination: &'a str,
        pub objective: &'a str,
        pub contrail_scale: f64,
        pub co2_scale: f64,
    }

    #[derive(Serialize)]
    struct Sidecar<'a> {
        generated_utc: String,
        aircraft: &'a str,
        origin: &'a str,
        destination: &'a str,
        objective: &'a str,
        contrail_scale: f64,
        co2_scale: f64,
        #[serde(flatten)]
        summary: &'a RunSummary,
    }

    /// `<stem>_summary.json` next to `output`.
    pub fn sidecar_path(output: &Path) -> PathBuf {
        let parent = output.parent().unwrap_or_else(|| Path::new("."));
        let stem = output
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("trajectory");
        parent.join(format!("{}_summary.json", stem))
    }

    /// Write the JSON summary sidecar for `output`, returning its path.
    pub fn write_sidecar(
        output: &Path,
        meta: &Metadata<'_>,
        summary: &RunSummary,
    ) -> io::Result<PathBuf> {
        let path = sidecar_path(output);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let sidecar = Sidecar {
            generated_utc: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            aircraft: meta.aircraft,
            origin: meta.origin,
            destination: meta.destination,
            objective: meta.objective,
            contrail_scale: meta.contrail_scale,
            co2_scale: meta.co2_scale,
            summary,
        };
        to_writer_pretty(File::create(&path)?, &sidecar)?;
        Ok(path)
    }
}
