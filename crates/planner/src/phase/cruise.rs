use flight_performance::{Aircraft, CruiseBand};

use super::{Boundary, PhaseContext, PhaseKind, PhaseSegment};

pub(super) fn vertical_rate_bounds(aircraft: &Aircraft) -> (f64, f64) {
    let rate = aircraft.cruise.max_vertical_rate_m_s;
    (-rate, rate)
}

/// Lowest altitude cruise nodes may fly at; a caller floor replaces the aircraft's.
pub fn altitude_floor(kind: PhaseKind, band: &CruiseBand, user_min_m: Option<f64>) -> Option<f64> {
    match kind {
        PhaseKind::Cruise => Some(user_min_m.unwrap_or(band.min_altitude_m)),
        PhaseKind::Climb | PhaseKind::Descent => None,
    }
}

/// Origin to destination entirely inside the cruise band.
pub(super) fn standalone(context: &PhaseContext) -> PhaseSegment {
    let band = context.cruise_band();
    PhaseSegment::new(PhaseKind::Cruise, context.nodes.cruise)
        .with_start(
            Boundary::at(context.origin.position)
                .with_altitude(band)
                .with_mass(context.initial_mass_kg)
                .with_time(0.0),
        )
        .with_end(Boundary::at(context.destination.position).with_altitude(band))
}

/// Middle segment of a complete flight; both ends float.
pub(super) fn chained(context: &PhaseContext) -> PhaseSegment {
    PhaseSegment::new(PhaseKind::Cruise, context.nodes.cruise)
}
