//! Re-exported APIs for consumers of the planner crate.

pub use crate::assemble::{Diagnostics, PhaseOutcome, Trajectory, TrajectoryPoint};
pub use crate::guess::InitialGuess;
pub use crate::navigation::{Airport, AirportCatalog, Navigation, Route};
pub use crate::objective::{
    ClimateMetric, CostNormalization, GridCostTerm, NodeContext, NodeCost, ObjectiveBuilder,
    ObjectiveError, ObjectiveTerm, ScaleChannel, ScalingFactors,
};
pub use crate::phase::{
    AltitudeBoundary, Boundary, FlightPhase, NodeCounts, PhaseKind, PhaseSegment,
    SegmentContinuityError, SolveMode, validate_continuity,
};
pub use crate::problem::{
    AltitudeBounds, ConvergenceFailure, InitialMass, PlannerError, ProblemSpec,
    ProblemSpecBuilder, solve,
};
pub use flight_nlp::{SolveStatus, SolverOptions};
pub use flight_performance::{Aircraft, EnvelopeFlag};

pub mod options {
    use std::time::Duration;

    use flight_config::OptimizerConfig;
    use flight_nlp::SolverOptions;

    use crate::phase::NodeCounts;

    /// Solver options from the optimizer defaults file.
    pub fn solver_options(config: &OptimizerConfig) -> SolverOptions {
        SolverOptions {
            max_iterations: config.max_iterations as u64,
            max_outer_iterations: config.max_outer_iterations as u64,
            tolerance: config.tolerance,
            max_wall_time: config
                .max_wall_time_s
                .filter(|s| s.is_finite() && *s > 0.0)
                .map(Duration::from_secs_f64),
            return_failed: config.return_failed,
        }
    }

    pub fn node_counts(config: &OptimizerConfig) -> NodeCounts {
        NodeCounts {
            climb: config.climb_nodes,
            cruise: config.cruise_nodes,
            descent: config.descent_nodes,
        }
    }
}
