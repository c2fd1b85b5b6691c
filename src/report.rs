//! Trajectory to CSV rows and JSON summaries.

use std::io::{self, Write};

use flight_export::summary::{PhaseSummary, RunSummary};
use flight_export::trajectory::{Record, write_header};
use flight_planner::Trajectory;

/// Write every trajectory point as one CSV row, header first.
pub fn write_trajectory(trajectory: &Trajectory, writer: &mut dyn Write) -> io::Result<()> {
    write_header(writer)?;
    for point in trajectory.points() {
        let flags: Vec<&str> = point.flags.iter().map(|f| f.as_str()).collect();
        Record {
            phase: point.phase.label(),
            time_s: point.time_s,
            longitude: point.longitude,
            latitude: point.latitude,
            altitude_m: point.altitude_m,
            mass_kg: point.mass_kg,
            mach: point.mach,
            tas_m_s: point.tas_m_s,
            vertical_rate_m_s: point.vertical_rate_m_s,
            fuel_burned_kg: point.fuel_burned_kg,
            distance_m: point.distance_m,
            flags: &flags,
        }
        .write_to(writer)?;
    }
    writer.flush()
}

/// Headline numbers and per-phase totals of a trajectory.
pub fn summarize(trajectory: &Trajectory) -> RunSummary {
    let diagnostics = trajectory.diagnostics();
    let phases = trajectory
        .phase_outcomes()
        .iter()
        .map(|outcome| {
            let points: Vec<_> = trajectory
                .points()
                .iter()
                .filter(|p| p.segment == outcome.segment)
                .collect();
            let (duration_s, distance_m) = match (points.first(), points.last()) {
                (Some(first), Some(last)) => {
                    (last.time_s - first.time_s, last.distance_m - first.distance_m)
                }
                _ => (0.0, 0.0),
            };
            PhaseSummary {
                phase: outcome.phase.label().to_string(),
                status: outcome.status.as_str().to_string(),
                iterations: outcome.iterations,
                constraint_violation: outcome.constraint_violation,
                duration_s,
                fuel_burned_kg: points.iter().map(|p| p.fuel_burned_kg).sum(),
                distance_m,
            }
        })
        .collect();

    RunSummary {
        status: trajectory.status().as_str().to_string(),
        converged: trajectory.is_converged(),
        objective: diagnostics.objective,
        iterations: diagnostics.iterations,
        outer_iterations: diagnostics.outer_iterations,
        constraint_violation: diagnostics.constraint_violation,
        wall_time_s: diagnostics.wall_time_s,
        flight_time_s: trajectory.flight_time_s(),
        fuel_burned_kg: trajectory.fuel_burned_kg(),
        distance_m: trajectory.distance_m(),
        max_altitude_m: trajectory.max_altitude_m(),
        flagged_points: trajectory.flagged_points(),
        phases,
    }
}
