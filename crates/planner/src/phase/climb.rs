use flight_performance::Aircraft;

use super::{AltitudeBoundary, Boundary, PhaseContext, PhaseKind, PhaseSegment};

pub(super) fn vertical_rate_bounds(aircraft: &Aircraft) -> (f64, f64) {
    (0.0, aircraft.envelope().max_climb_m_s)
}

/// Climb on its own: from the origin runway up to at least the altitude floor.
pub(super) fn standalone(context: &PhaseContext) -> PhaseSegment {
    PhaseSegment::new(PhaseKind::Climb, context.nodes.climb)
        .with_start(context.departure())
        .with_end(Boundary::free().with_altitude(AltitudeBoundary::AtLeast(context.floor_m())))
}

/// First segment of a complete flight; top of climb is left to the optimizer.
pub(super) fn leading(context: &PhaseContext) -> PhaseSegment {
    PhaseSegment::new(PhaseKind::Climb, context.nodes.climb).with_start(context.departure())
}
