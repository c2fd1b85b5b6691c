//! Initial decision vectors for the collocation solver.
//!
//! The straight-line seed flies the great-circle track at a constant
//! heading, climbs and descends linearly, and integrates fuel burn with the
//! same dynamics the solver uses. A prior trajectory (for warm starts) is
//! resampled onto the new node grid instead.

use std::collections::BTreeMap;
use std::sync::Arc;

use flight_core::atmosphere;
use flight_core::geo::GeoPoint;
use flight_core::math::lerp;
use flight_core::units::kt_to_ms;
use flight_dynamics::{Control, DynamicsModel, State};
use flight_performance::Aircraft;
use tracing::warn;

use crate::assemble::{Trajectory, TrajectoryPoint, interpolate};
use crate::collocation::{MIN_DURATION_S, PhaseValues};
use crate::navigation::Route;
use crate::phase::{PhaseKind, PhaseSegment};
use crate::problem::AltitudeBounds;

const TERMINAL_CAS_KT: f64 = 280.0;
const CAS_MARGIN_KT: f64 = 10.0;
const MMO_MARGIN: f64 = 0.01;
const MIN_SEED_MACH: f64 = 0.2;
/// Share of the maximum vertical rate the seed climbs and descends at.
const RATE_FRACTION: f64 = 0.6;
const MIN_CRUISE_SHARE: f64 = 0.1;

/// Where the solver starts from.
#[derive(Debug, Clone, Default)]
pub enum InitialGuess {
    #[default]
    StraightLine,
    /// Warm start from an earlier solution with the same segment layout.
    Prior(Arc<Trajectory>),
}

/// Everything the seeding functions need besides the segments.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SeedContext<'a> {
    pub aircraft: &'a Aircraft,
    pub dynamics: &'a DynamicsModel,
    pub route: &'a Route,
    pub altitude: AltitudeBounds,
    pub initial_mass_kg: f64,
}

impl SeedContext<'_> {
    /// Cruise altitude the seed aims for: middle of the band, inside the caller's limits.
    fn cruise_altitude_m(&self) -> f64 {
        let band = &self.aircraft.cruise;
        let mut altitude = 0.5 * (band.min_altitude_m + band.max_altitude_m);
        if let Some(floor) = self.altitude.min_m() {
            altitude = altitude.max(floor);
        }
        let ceiling = self
            .altitude
            .max_m()
            .map_or(self.aircraft.envelope().ceiling_m, |h| {
                h.min(self.aircraft.envelope().ceiling_m)
            });
        altitude.min(ceiling)
    }

    fn mach_for_cas(&self, cas_m_s: f64, altitude_m: f64) -> f64 {
        let isa = self.dynamics.isa_deviation_k();
        let tas = atmosphere::cas_to_tas(cas_m_s, altitude_m, isa);
        atmosphere::tas_to_mach(tas, altitude_m, isa)
    }

    /// Seed Mach for a segment flown around `altitude_m`.
    fn mach(&self, kind: PhaseKind, altitude_m: f64) -> f64 {
        let envelope = self.aircraft.envelope();
        let vmo_cas = envelope.vmo_m_s - kt_to_ms(CAS_MARGIN_KT);
        let target_cas = match kind {
            PhaseKind::Cruise => vmo_cas,
            PhaseKind::Climb | PhaseKind::Descent => kt_to_ms(TERMINAL_CAS_KT)
                .clamp(envelope.min_cas_m_s + kt_to_ms(CAS_MARGIN_KT), vmo_cas.max(0.0)),
        };
        self.mach_for_cas(target_cas, altitude_m)
            .min(self.aircraft.cruise.mach)
            .min(envelope.mmo - MMO_MARGIN)
            .max(MIN_SEED_MACH)
    }
}

/// Per-segment plan before node values are laid out.
struct SegmentPlan {
    start_altitude_m: f64,
    end_altitude_m: f64,
    mach: f64,
    tas_m_s: f64,
    distance_m: f64,
    duration_s: f64,
}

/// Constant-heading seed from the first segment's start to the last segment's end.
pub(crate) fn straight_line(segments: &[PhaseSegment], context: &SeedContext<'_>) -> Vec<PhaseValues> {
    let projection = context.dynamics.projection();
    let (Some(first), Some(last)) = (segments.first(), segments.last()) else {
        return Vec::new();
    };
    let origin = first.start.position.unwrap_or(context.route.origin.position);
    let destination = last.end.position.unwrap_or(context.route.destination.position);
    let (x0, y0) = projection.project(origin);
    let (x1, y1) = projection.project(destination);
    let (dx, dy) = (x1 - x0, y1 - y0);
    let route_m = dx.hypot(dy);
    let (ux, uy) = if route_m > 1.0 {
        (dx / route_m, dy / route_m)
    } else {
        (0.0, 1.0)
    };
    let heading = ux.atan2(uy);

    let mut plans = plan_segments(segments, context, route_m);
    if last.end.position.is_some() {
        let total: f64 = plans.iter().map(|p| p.distance_m).sum();
        if total > 1.0 && route_m > 1.0 {
            let factor = route_m / total;
            for plan in &mut plans {
                plan.distance_m *= factor;
                plan.duration_s = (plan.distance_m / plan.tas_m_s).max(MIN_DURATION_S);
            }
        }
    }

    let mut along_m = 0.0;
    let mut mass_kg = first.start.mass_kg.unwrap_or(context.initial_mass_kg);
    let mut time_s = first.start.time_s.unwrap_or(0.0);
    let mut values = Vec::with_capacity(segments.len());

    for (segment, plan) in segments.iter().zip(&plans) {
        let intervals = segment.nodes - 1;
        let dt = plan.duration_s / intervals as f64;
        let (rate_lo, rate_hi) = segment.kind.vertical_rate_bounds(context.aircraft);
        let vertical_rate = ((plan.end_altitude_m - plan.start_altitude_m) / plan.duration_s)
            .clamp(rate_lo, rate_hi);
        if let Some(mass) = segment.start.mass_kg {
            mass_kg = mass;
        }
        if let Some(time) = segment.start.time_s {
            time_s = time;
        }

        let mut controls: Vec<Control> = (0..intervals)
            .map(|_| Control {
                mach: plan.mach,
                vertical_rate_m_s: vertical_rate,
                heading_rad: heading,
            })
            .collect();
        if let Some(mach) = segment.start.mach {
            controls[0].mach = mach;
        }
        if let Some(mach) = segment.end.mach {
            controls[intervals - 1].mach = mach;
        }

        let node_state = |j: usize, mass_kg: f64| {
            let f = j as f64 / intervals as f64;
            let s = along_m + f * plan.distance_m;
            State {
                x_m: x0 + s * ux,
                y_m: y0 + s * uy,
                altitude_m: lerp(plan.start_altitude_m, plan.end_altitude_m, f),
                mass_kg,
                time_s: time_s + f * plan.duration_s,
            }
        };

        let mut states = Vec::with_capacity(segment.nodes);
        states.push(node_state(0, mass_kg));
        for (j, control) in controls.iter().enumerate() {
            let here = states[j];
            let start_flow = context.dynamics.evaluate(&here, control).fuel_flow_kg_s;
            let predicted = node_state(j + 1, here.mass_kg - start_flow * dt);
            let end_flow = context.dynamics.evaluate(&predicted, control).fuel_flow_kg_s;
            let mass = (here.mass_kg - 0.5 * dt * (start_flow + end_flow))
                .max(context.aircraft.oew_kg());
            states.push(node_state(j + 1, mass));
        }

        along_m += plan.distance_m;
        mass_kg = states[intervals].mass_kg;
        time_s += plan.duration_s;
        values.push(PhaseValues {
            states,
            controls,
            duration_s: plan.duration_s,
        });
    }
    values
}

fn plan_segments(
    segments: &[PhaseSegment],
    context: &SeedContext<'_>,
    route_m: f64,
) -> Vec<SegmentPlan> {
    let cruise_altitude = context.cruise_altitude_m();
    let envelope = context.aircraft.envelope();
    let isa = context.dynamics.isa_deviation_k();
    let mut previous_end: Option<f64> = None;

    let mut plans: Vec<SegmentPlan> = segments
        .iter()
        .map(|segment| {
            let default_start = previous_end.unwrap_or(match segment.kind {
                PhaseKind::Climb => context.route.origin.elevation_m,
                PhaseKind::Cruise | PhaseKind::Descent => cruise_altitude,
            });
            let start_altitude_m = segment.start.altitude.resolve(default_start);
            let default_end = match segment.kind {
                PhaseKind::Climb | PhaseKind::Cruise => cruise_altitude,
                PhaseKind::Descent => context.route.destination.elevation_m,
            };
            let end_altitude_m = match segment.kind {
                PhaseKind::Climb => segment.end.altitude.resolve(default_end.max(start_altitude_m)),
                PhaseKind::Descent => segment.end.altitude.resolve(default_end.min(start_altitude_m)),
                PhaseKind::Cruise => segment.end.altitude.resolve(start_altitude_m),
            };
            previous_end = Some(end_altitude_m);

            let mid_altitude = 0.5 * (start_altitude_m + end_altitude_m);
            let mach = context.mach(segment.kind, mid_altitude);
            let tas_m_s = atmosphere::mach_to_tas(mach, mid_altitude, isa);
            let climb_rate = match segment.kind {
                PhaseKind::Climb => envelope.max_climb_m_s,
                PhaseKind::Descent => envelope.max_descent_m_s,
                PhaseKind::Cruise => context.aircraft.cruise.max_vertical_rate_m_s,
            };
            let duration_s = ((end_altitude_m - start_altitude_m).abs()
                / (RATE_FRACTION * climb_rate).max(f64::EPSILON))
            .max(MIN_DURATION_S);
            SegmentPlan {
                start_altitude_m,
                end_altitude_m,
                mach,
                tas_m_s,
                distance_m: tas_m_s * duration_s,
                duration_s,
            }
        })
        .collect();

    // Cruise segments share whatever distance climb and descent leave over.
    let cruise_count = segments.iter().filter(|s| s.kind == PhaseKind::Cruise).count();
    if cruise_count > 0 {
        let others: f64 = segments
            .iter()
            .zip(&plans)
            .filter(|(s, _)| s.kind != PhaseKind::Cruise)
            .map(|(_, p)| p.distance_m)
            .sum();
        let share = (route_m - others).max(MIN_CRUISE_SHARE * route_m) / cruise_count as f64;
        for (segment, plan) in segments.iter().zip(&mut plans) {
            if segment.kind == PhaseKind::Cruise {
                plan.distance_m = share;
                plan.duration_s = (share / plan.tas_m_s).max(MIN_DURATION_S);
            }
        }
    }
    plans
}

/// Resample a prior solution onto `segments`; falls back to the straight-line
/// seed when the segment layout differs.
pub(crate) fn from_prior(
    prior: &Trajectory,
    segments: &[PhaseSegment],
    context: &SeedContext<'_>,
) -> Vec<PhaseValues> {
    let mut groups: BTreeMap<usize, Vec<TrajectoryPoint>> = BTreeMap::new();
    for point in prior.points() {
        groups.entry(point.segment).or_default().push(point.clone());
    }
    let matches = groups.len() == segments.len()
        && groups
            .values()
            .zip(segments)
            .all(|(points, segment)| points.len() >= 2 && points[0].phase == segment.kind);
    if !matches {
        warn!(
            prior_segments = groups.len(),
            segments = segments.len(),
            "prior trajectory does not match the segment layout; using straight-line seed"
        );
        return straight_line(segments, context);
    }

    let projection = context.dynamics.projection();
    groups
        .values()
        .zip(segments)
        .map(|(points, segment)| {
            let intervals = segment.nodes - 1;
            let t0 = points[0].time_s;
            let span = points[points.len() - 1].time_s - t0;
            let duration_s = span.max(MIN_DURATION_S);
            let dt = span / intervals as f64;

            let states: Vec<State> = (0..segment.nodes)
                .map(|j| {
                    let sample = interpolate(points, t0 + j as f64 * dt);
                    let (x_m, y_m) =
                        projection.project(GeoPoint::new(sample.longitude, sample.latitude));
                    State {
                        x_m,
                        y_m,
                        altitude_m: sample.altitude_m,
                        mass_kg: sample.mass_kg,
                        time_s: t0 + j as f64 * duration_s / intervals as f64,
                    }
                })
                .collect();

            let (rate_lo, rate_hi) = segment.kind.vertical_rate_bounds(context.aircraft);
            let node_dt = duration_s / intervals as f64;
            let controls = (0..intervals)
                .map(|j| {
                    let sample = interpolate(points, t0 + (j as f64 + 0.5) * dt);
                    let climb = (states[j + 1].altitude_m - states[j].altitude_m) / node_dt;
                    Control {
                        mach: sample.mach,
                        vertical_rate_m_s: climb.clamp(rate_lo, rate_hi),
                        heading_rad: sample.heading_rad,
                    }
                })
                .collect();

            PhaseValues {
                states,
                controls,
                duration_s,
            }
        })
        .collect()
}

/// Move a seeded segment so it begins exactly at `start`.
///
/// Position, time and mass are shifted rigidly; the altitude offset fades out
/// towards the last node so the segment's end altitude is kept.
pub(crate) fn anchor(values: &mut PhaseValues, start: &State) {
    let Some(first) = values.states.first().copied() else {
        return;
    };
    let last = values.states.len().saturating_sub(1).max(1) as f64;
    let altitude_offset = start.altitude_m - first.altitude_m;
    for (j, state) in values.states.iter_mut().enumerate() {
        state.x_m += start.x_m - first.x_m;
        state.y_m += start.y_m - first.y_m;
        state.mass_kg += start.mass_kg - first.mass_kg;
        state.time_s += start.time_s - first.time_s;
        state.altitude_m += altitude_offset * (1.0 - j as f64 / last);
    }
}
