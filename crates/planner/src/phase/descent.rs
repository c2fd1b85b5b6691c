use flight_performance::Aircraft;

use super::{Boundary, PhaseContext, PhaseKind, PhaseSegment};

pub(super) fn vertical_rate_bounds(aircraft: &Aircraft) -> (f64, f64) {
    (-aircraft.envelope().max_descent_m_s, 0.0)
}

/// Descent on its own: from the cruise band over the origin down to the destination runway.
pub(super) fn standalone(context: &PhaseContext) -> PhaseSegment {
    PhaseSegment::new(PhaseKind::Descent, context.nodes.descent)
        .with_start(
            Boundary::at(context.origin.position)
                .with_altitude(context.cruise_band())
                .with_mass(context.initial_mass_kg)
                .with_time(0.0),
        )
        .with_end(Boundary::ground(&context.destination))
}

/// Last segment of a complete flight; top of descent is left to the optimizer.
pub(super) fn trailing(context: &PhaseContext) -> PhaseSegment {
    PhaseSegment::new(PhaseKind::Descent, context.nodes.descent)
        .with_end(Boundary::ground(&context.destination))
}
