//! Solver output to labelled time series.
//!
//! Derived quantities are recomputed with the same [`DynamicsModel`] the
//! transcription used, so the assembled trajectory agrees with the
//! constraints it was solved under. Values are never clipped: anything
//! outside the envelope is passed through and flagged.

use flight_core::geo::{GeoPoint, haversine_m};
use flight_core::math::lerp;
use flight_dynamics::State;
use flight_nlp::SolveStatus;
use flight_performance::EnvelopeFlag;

use crate::collocation::Transcription;
use crate::phase::PhaseKind;

/// One trajectory sample.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryPoint {
    /// Index of the phase segment this node belongs to.
    pub segment: usize,
    pub phase: PhaseKind,
    pub time_s: f64,
    pub longitude: f64,
    pub latitude: f64,
    pub altitude_m: f64,
    pub mass_kg: f64,
    pub mach: f64,
    pub tas_m_s: f64,
    pub cas_m_s: f64,
    pub vertical_rate_m_s: f64,
    pub heading_rad: f64,
    pub fuel_flow_kg_s: f64,
    /// Fuel burned since the previous sample.
    pub fuel_burned_kg: f64,
    /// Cumulative great-circle ground distance.
    pub distance_m: f64,
    pub flags: Vec<EnvelopeFlag>,
}

/// Solver statistics attached to every trajectory.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Diagnostics {
    pub iterations: u64,
    pub outer_iterations: u64,
    pub constraint_violation: f64,
    pub objective: f64,
    pub wall_time_s: f64,
}

/// Solve result of one phase segment.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseOutcome {
    pub segment: usize,
    pub phase: PhaseKind,
    pub status: SolveStatus,
    pub iterations: u64,
    pub constraint_violation: f64,
}

/// Immutable optimization result.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    points: Vec<TrajectoryPoint>,
    status: SolveStatus,
    diagnostics: Diagnostics,
    phase_outcomes: Vec<PhaseOutcome>,
}

impl Trajectory {
    pub(crate) fn new(
        mut points: Vec<TrajectoryPoint>,
        status: SolveStatus,
        diagnostics: Diagnostics,
        phase_outcomes: Vec<PhaseOutcome>,
    ) -> Self {
        accumulate_distance(&mut points);
        Self {
            points,
            status,
            diagnostics,
            phase_outcomes,
        }
    }

    pub fn points(&self) -> &[TrajectoryPoint] {
        &self.points
    }

    pub fn status(&self) -> SolveStatus {
        self.status
    }

    pub fn is_converged(&self) -> bool {
        self.status.is_converged()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn phase_outcomes(&self) -> &[PhaseOutcome] {
        &self.phase_outcomes
    }

    pub fn fuel_burned_kg(&self) -> f64 {
        self.points.iter().map(|p| p.fuel_burned_kg).sum()
    }

    pub fn flight_time_s(&self) -> f64 {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => last.time_s - first.time_s,
            _ => 0.0,
        }
    }

    pub fn distance_m(&self) -> f64 {
        self.points.last().map_or(0.0, |p| p.distance_m)
    }

    pub fn max_altitude_m(&self) -> f64 {
        self.points
            .iter()
            .map(|p| p.altitude_m)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn phase_points(&self, phase: PhaseKind) -> impl Iterator<Item = &TrajectoryPoint> {
        self.points.iter().filter(move |p| p.phase == phase)
    }

    /// Samples that carry at least one envelope flag.
    pub fn flagged_points(&self) -> usize {
        self.points.iter().filter(|p| !p.flags.is_empty()).count()
    }

    /// Same trajectory sampled every `cadence_s` seconds (plus the final node).
    ///
    /// Positions, altitude, mass and airspeeds are interpolated linearly;
    /// controls are piecewise constant and taken from the earlier node.
    pub fn resample(&self, cadence_s: f64) -> Trajectory {
        if cadence_s.is_nan() || cadence_s <= 0.0 || self.points.len() < 2 {
            return self.clone();
        }
        let start = self.points[0].time_s;
        let end = self.points[self.points.len() - 1].time_s;
        let mut times = Vec::new();
        let mut t = start;
        while t < end {
            times.push(t);
            t += cadence_s;
        }
        times.push(end);

        let mut points: Vec<TrajectoryPoint> = times
            .iter()
            .map(|t| interpolate(&self.points, *t))
            .collect();
        let mut previous_mass = points[0].mass_kg;
        for point in &mut points {
            point.fuel_burned_kg = (previous_mass - point.mass_kg).max(0.0);
            previous_mass = point.mass_kg;
        }
        Trajectory::new(
            points,
            self.status,
            self.diagnostics.clone(),
            self.phase_outcomes.clone(),
        )
    }
}

/// Sample at time `t`, clamped to the trajectory's time span.
pub(crate) fn interpolate(points: &[TrajectoryPoint], t: f64) -> TrajectoryPoint {
    let after = points.partition_point(|p| p.time_s <= t);
    if after == 0 {
        return points[0].clone();
    }
    if after == points.len() {
        return points[points.len() - 1].clone();
    }
    let a = &points[after - 1];
    let b = &points[after];
    let f = (t - a.time_s) / (b.time_s - a.time_s);
    TrajectoryPoint {
        time_s: t,
        longitude: lerp(a.longitude, b.longitude, f),
        latitude: lerp(a.latitude, b.latitude, f),
        altitude_m: lerp(a.altitude_m, b.altitude_m, f),
        mass_kg: lerp(a.mass_kg, b.mass_kg, f),
        tas_m_s: lerp(a.tas_m_s, b.tas_m_s, f),
        cas_m_s: lerp(a.cas_m_s, b.cas_m_s, f),
        fuel_flow_kg_s: lerp(a.fuel_flow_kg_s, b.fuel_flow_kg_s, f),
        distance_m: lerp(a.distance_m, b.distance_m, f),
        ..a.clone()
    }
}

fn accumulate_distance(points: &mut [TrajectoryPoint]) {
    let mut total = 0.0;
    let mut previous: Option<GeoPoint> = None;
    for point in points.iter_mut() {
        let here = GeoPoint::new(point.longitude, point.latitude);
        if let Some(before) = previous {
            total += haversine_m(before, here);
        }
        point.distance_m = total;
        previous = Some(here);
    }
}

/// Points of every segment in `transcription`, labelled from `first_segment` on.
pub(crate) fn points(
    transcription: &Transcription,
    z: &[f64],
    first_segment: usize,
) -> Vec<TrajectoryPoint> {
    let layout = transcription.layout();
    let dynamics = transcription.dynamics();
    let mut points = Vec::new();
    // Linked segments share their boundary node; both copies are written
    // from the earlier segment's end so mass and time stay monotone.
    let mut boundary: Option<State> = None;

    for (p, phase) in layout.phases().iter().enumerate() {
        let dt = layout.duration(z, p) / phase.intervals() as f64;
        let mut previous_flow: Option<f64> = None;
        for node in 0..phase.nodes {
            let state = match boundary.take() {
                Some(end) if node == 0 => end,
                _ => layout.state(z, p, node),
            };
            // The last node keeps the control of the final interval.
            let control = layout.control(z, p, node.min(phase.intervals() - 1));
            let evaluation = dynamics.evaluate(&state, &control);
            let flags = dynamics.envelope_flags(&state, &control, &evaluation);

            // Node k closes interval k − 1, flown with control k − 1.
            let fuel_burned_kg = match previous_flow {
                Some(start_flow) => {
                    let interval_control = layout.control(z, p, node - 1);
                    let end_flow = dynamics.evaluate(&state, &interval_control).fuel_flow_kg_s;
                    0.5 * (start_flow + end_flow) * dt
                }
                None => 0.0,
            };
            previous_flow = Some(evaluation.fuel_flow_kg_s);

            points.push(TrajectoryPoint {
                segment: first_segment + p,
                phase: phase.kind,
                time_s: state.time_s,
                longitude: evaluation.position.longitude,
                latitude: evaluation.position.latitude,
                altitude_m: state.altitude_m,
                mass_kg: state.mass_kg,
                mach: control.mach,
                tas_m_s: evaluation.tas_m_s,
                cas_m_s: evaluation.cas_m_s,
                vertical_rate_m_s: control.vertical_rate_m_s,
                heading_rad: control.heading_rad,
                fuel_flow_kg_s: evaluation.fuel_flow_kg_s,
                fuel_burned_kg,
                distance_m: 0.0,
                flags,
            });
        }
        boundary = Some(layout.state(z, p, phase.nodes - 1));
    }
    points
}
