//! Problem definition and the stateless solve entry point.
//!
//! A [`ProblemSpec`] is immutable once built and only holds read-only
//! collaborators behind `Arc`s, so one spec can be shared by many
//! concurrent [`solve`] calls.

use std::sync::Arc;
use std::time::Instant;

use flight_core::geo::LocalProjection;
use flight_dynamics::{DynamicsModel, State};
use flight_field::WindField;
use flight_nlp::{AugmentedLagrangian, NlpError, NlpSolver, SolveStatus, SolverOptions};
use flight_performance::Aircraft;
use thiserror::Error;
use tracing::{info, warn};

use crate::assemble::{self, Diagnostics, PhaseOutcome, Trajectory, TrajectoryPoint};
use crate::collocation::{PhaseValues, Transcription, TranscriptionSetup};
use crate::guess::{self, InitialGuess, SeedContext};
use crate::navigation::Route;
use crate::objective::{ObjectiveError, ObjectiveTerm, ScalingFactors};
use crate::phase::{
    AltitudeBoundary, Boundary, FlightPhase, NodeCounts, PhaseContext, PhaseSegment,
    SegmentContinuityError, SolveMode, validate_continuity,
};

/// Solver gave up before meeting the tolerance and the caller did not ask
/// for failed iterates.
#[derive(Debug, Clone, PartialEq, Error)]
#[error(
    "optimization stopped with status {} (constraint violation {:.3e})",
    .status.as_str(),
    .diagnostics.constraint_violation
)]
pub struct ConvergenceFailure {
    pub status: SolveStatus,
    pub diagnostics: Diagnostics,
    pub phase_outcomes: Vec<PhaseOutcome>,
}

/// Top-level planning error.
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("phase segments are inconsistent: {0}")]
    Continuity(#[from] SegmentContinuityError),
    #[error("invalid objective: {0}")]
    Objective(#[from] ObjectiveError),
    #[error("no feasible value for {variable}: lower bound {lower} exceeds upper bound {upper}")]
    InfeasibleBounds {
        variable: String,
        lower: f64,
        upper: f64,
    },
    #[error("unknown airport '{0}'")]
    UnknownAirport(String),
    #[error("initial mass {mass_kg:.0} kg outside [{oew_kg:.0}, {mtow_kg:.0}] kg")]
    InitialMass {
        mass_kg: f64,
        oew_kg: f64,
        mtow_kg: f64,
    },
    #[error("altitude floor {min_m} m lies above altitude ceiling {max_m} m")]
    AltitudeBounds { min_m: f64, max_m: f64 },
    #[error("solver rejected the problem: {0}")]
    Solver(#[from] NlpError),
    #[error("{0}")]
    ConvergenceFailure(Box<ConvergenceFailure>),
}

/// Take-off mass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InitialMass {
    Absolute(f64),
    FractionOfMtow(f64),
}

impl Default for InitialMass {
    fn default() -> Self {
        InitialMass::FractionOfMtow(0.9)
    }
}

impl InitialMass {
    /// Mass in kg, checked against the aircraft's OEW and MTOW.
    pub fn resolve(&self, aircraft: &Aircraft) -> Result<f64, PlannerError> {
        let mass_kg = match *self {
            InitialMass::Absolute(mass) => mass,
            InitialMass::FractionOfMtow(fraction) => fraction * aircraft.mtow_kg(),
        };
        let (oew_kg, mtow_kg) = (aircraft.oew_kg(), aircraft.mtow_kg());
        if !mass_kg.is_finite() || mass_kg < oew_kg || mass_kg > mtow_kg {
            return Err(PlannerError::InitialMass {
                mass_kg,
                oew_kg,
                mtow_kg,
            });
        }
        Ok(mass_kg)
    }
}

/// Caller altitude limits. The floor applies to cruise nodes; the ceiling to every node.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AltitudeBounds {
    min_m: Option<f64>,
    max_m: Option<f64>,
}

impl AltitudeBounds {
    pub fn new(min_m: Option<f64>, max_m: Option<f64>) -> Result<Self, PlannerError> {
        if let (Some(min_m), Some(max_m)) = (min_m, max_m) {
            if min_m > max_m {
                return Err(PlannerError::AltitudeBounds { min_m, max_m });
            }
        }
        Ok(Self { min_m, max_m })
    }

    pub fn min_m(&self) -> Option<f64> {
        self.min_m
    }

    pub fn max_m(&self) -> Option<f64> {
        self.max_m
    }
}

/// Immutable description of one optimization run.
#[derive(Debug, Clone)]
pub struct ProblemSpec {
    aircraft: Aircraft,
    route: Route,
    initial_mass_kg: f64,
    phase: FlightPhase,
    mode: SolveMode,
    objective: ObjectiveTerm,
    scaling: ScalingFactors,
    wind: Option<Arc<WindField>>,
    altitude: AltitudeBounds,
    nodes: NodeCounts,
    options: SolverOptions,
    guess: InitialGuess,
    isa_deviation_k: f64,
}

impl ProblemSpec {
    pub fn builder(aircraft: Aircraft, route: Route) -> ProblemSpecBuilder {
        ProblemSpecBuilder {
            aircraft,
            route,
            initial_mass: InitialMass::default(),
            phase: FlightPhase::default(),
            mode: SolveMode::default(),
            objective: ObjectiveTerm::Fuel,
            scaling: ScalingFactors::default(),
            wind: None,
            altitude: AltitudeBounds::default(),
            nodes: NodeCounts::default(),
            options: SolverOptions::default(),
            guess: InitialGuess::default(),
            isa_deviation_k: 0.0,
        }
    }

    /// Same problem under different scaling factors.
    pub fn with_scaling(&self, scaling: ScalingFactors) -> Self {
        Self {
            scaling,
            ..self.clone()
        }
    }

    /// Same problem started from a different initial guess.
    pub fn with_guess(&self, guess: InitialGuess) -> Self {
        Self {
            guess,
            ..self.clone()
        }
    }

    pub fn aircraft(&self) -> &Aircraft {
        &self.aircraft
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn initial_mass_kg(&self) -> f64 {
        self.initial_mass_kg
    }

    pub fn phase(&self) -> &FlightPhase {
        &self.phase
    }

    pub fn mode(&self) -> SolveMode {
        self.mode
    }

    pub fn objective(&self) -> &ObjectiveTerm {
        &self.objective
    }

    pub fn scaling(&self) -> ScalingFactors {
        self.scaling
    }

    pub fn altitude(&self) -> AltitudeBounds {
        self.altitude
    }

    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    /// Phase segments to transcribe, with a custom sequence anchored at
    /// time zero and the take-off mass unless it says otherwise.
    pub fn segments(&self) -> Vec<PhaseSegment> {
        let context = PhaseContext {
            origin: self.route.origin.clone(),
            destination: self.route.destination.clone(),
            initial_mass_kg: self.initial_mass_kg,
            cruise: self.aircraft.cruise.clone(),
            min_altitude_m: self.altitude.min_m(),
            nodes: self.nodes,
        };
        let mut segments = self.phase.segments(&context);
        if let (FlightPhase::Custom(_), Some(first)) = (&self.phase, segments.first_mut()) {
            first.start.time_s.get_or_insert(0.0);
            first.start.mass_kg.get_or_insert(self.initial_mass_kg);
        }
        segments
    }
}

pub struct ProblemSpecBuilder {
    aircraft: Aircraft,
    route: Route,
    initial_mass: InitialMass,
    phase: FlightPhase,
    mode: SolveMode,
    objective: ObjectiveTerm,
    scaling: ScalingFactors,
    wind: Option<Arc<WindField>>,
    altitude: AltitudeBounds,
    nodes: NodeCounts,
    options: SolverOptions,
    guess: InitialGuess,
    isa_deviation_k: f64,
}

impl ProblemSpecBuilder {
    pub fn initial_mass(mut self, initial_mass: InitialMass) -> Self {
        self.initial_mass = initial_mass;
        self
    }

    pub fn phase(mut self, phase: FlightPhase) -> Self {
        self.phase = phase;
        self
    }

    pub fn mode(mut self, mode: SolveMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn objective(mut self, objective: ObjectiveTerm) -> Self {
        self.objective = objective;
        self
    }

    pub fn scaling(mut self, scaling: ScalingFactors) -> Self {
        self.scaling = scaling;
        self
    }

    pub fn wind(mut self, wind: Option<Arc<WindField>>) -> Self {
        self.wind = wind;
        self
    }

    pub fn altitude(mut self, altitude: AltitudeBounds) -> Self {
        self.altitude = altitude;
        self
    }

    pub fn nodes(mut self, nodes: NodeCounts) -> Self {
        self.nodes = nodes;
        self
    }

    pub fn options(mut self, options: SolverOptions) -> Self {
        self.options = options;
        self
    }

    pub fn guess(mut self, guess: InitialGuess) -> Self {
        self.guess = guess;
        self
    }

    pub fn isa_deviation(mut self, isa_deviation_k: f64) -> Self {
        self.isa_deviation_k = isa_deviation_k;
        self
    }

    pub fn build(self) -> Result<ProblemSpec, PlannerError> {
        let initial_mass_kg = self.initial_mass.resolve(&self.aircraft)?;
        Ok(ProblemSpec {
            aircraft: self.aircraft,
            route: self.route,
            initial_mass_kg,
            phase: self.phase,
            mode: self.mode,
            objective: self.objective,
            scaling: self.scaling,
            wind: self.wind,
            altitude: self.altitude,
            nodes: self.nodes,
            options: self.options,
            guess: self.guess,
            isa_deviation_k: self.isa_deviation_k,
        })
    }
}

/// Collected result of one or more NLP solves.
struct Solved {
    points: Vec<TrajectoryPoint>,
    status: SolveStatus,
    diagnostics: Diagnostics,
    outcomes: Vec<PhaseOutcome>,
}

/// Optimize the trajectory described by `spec`.
///
/// Structural problems (inconsistent segments, empty variable bounds) fail
/// before the solver runs. A non-converged solve is an error unless the
/// spec's options set `return_failed`, in which case the best iterate is
/// returned with its status.
pub fn solve(spec: &ProblemSpec) -> Result<Trajectory, PlannerError> {
    let started = Instant::now();
    let segments = spec.segments();
    validate_continuity(&segments)?;

    let projection = LocalProjection::for_route(
        spec.route.origin.position,
        spec.route.destination.position,
    );
    let dynamics = DynamicsModel::new(spec.aircraft.performance.clone(), projection)
        .with_wind(spec.wind.clone())
        .with_isa_deviation(spec.isa_deviation_k);

    info!(
        aircraft = %spec.aircraft.type_code,
        origin = %spec.route.origin.code,
        destination = %spec.route.destination.code,
        phase = spec.phase.label(),
        mode = ?spec.mode,
        objective = spec.objective.label(),
        segments = segments.len(),
        "starting trajectory optimization"
    );

    let mut solved = match spec.mode {
        SolveMode::Joint => solve_joint(spec, &segments, &dynamics)?,
        SolveMode::Sequential => solve_sequential(spec, &segments, &dynamics)?,
    };
    solved.diagnostics.wall_time_s = started.elapsed().as_secs_f64();

    info!(
        status = solved.status.as_str(),
        iterations = solved.diagnostics.iterations,
        violation = solved.diagnostics.constraint_violation,
        objective = solved.diagnostics.objective,
        wall_time_s = solved.diagnostics.wall_time_s,
        "trajectory optimization finished"
    );

    if !solved.status.is_converged() {
        if !spec.options.return_failed {
            return Err(PlannerError::ConvergenceFailure(Box::new(ConvergenceFailure {
                status: solved.status,
                diagnostics: solved.diagnostics,
                phase_outcomes: solved.outcomes,
            })));
        }
        warn!(status = solved.status.as_str(), "returning non-converged trajectory");
    }
    Ok(Trajectory::new(
        solved.points,
        solved.status,
        solved.diagnostics,
        solved.outcomes,
    ))
}

fn setup<'a>(
    spec: &'a ProblemSpec,
    dynamics: &'a DynamicsModel,
) -> TranscriptionSetup<'a> {
    TranscriptionSetup {
        aircraft: &spec.aircraft,
        dynamics,
        objective: &spec.objective,
        scaling: spec.scaling,
        altitude: spec.altitude,
        initial_mass_kg: spec.initial_mass_kg,
    }
}

fn seed(spec: &ProblemSpec, segments: &[PhaseSegment], dynamics: &DynamicsModel) -> Vec<PhaseValues> {
    let context = SeedContext {
        aircraft: &spec.aircraft,
        dynamics,
        route: &spec.route,
        altitude: spec.altitude,
        initial_mass_kg: spec.initial_mass_kg,
    };
    match &spec.guess {
        InitialGuess::StraightLine => guess::straight_line(segments, &context),
        InitialGuess::Prior(prior) => guess::from_prior(prior, segments, &context),
    }
}

/// Encode the seed, normalize the objective by its value and run the solver.
fn run(
    transcription: &mut Transcription,
    seed: &[PhaseValues],
    options: &SolverOptions,
) -> Result<flight_nlp::NlpSolution, PlannerError> {
    let initial = transcription.layout().encode(seed);
    let reference = transcription.physical_objective(&initial);
    transcription.set_objective_reference(reference);
    Ok(AugmentedLagrangian::default().solve(&*transcription, &initial, options)?)
}

fn solve_joint(
    spec: &ProblemSpec,
    segments: &[PhaseSegment],
    dynamics: &DynamicsModel,
) -> Result<Solved, PlannerError> {
    let mut transcription = Transcription::new(segments, &setup(spec, dynamics))?;
    let seed = seed(spec, segments, dynamics);
    let solution = run(&mut transcription, &seed, &spec.options)?;

    let outcomes = segments
        .iter()
        .enumerate()
        .map(|(segment, phase)| PhaseOutcome {
            segment,
            phase: phase.kind,
            status: solution.status,
            iterations: solution.iterations,
            constraint_violation: solution.constraint_violation,
        })
        .collect();
    Ok(Solved {
        points: assemble::points(&transcription, &solution.x, 0),
        status: solution.status,
        diagnostics: Diagnostics {
            iterations: solution.iterations,
            outer_iterations: solution.outer_iterations,
            constraint_violation: solution.constraint_violation,
            objective: transcription.physical_objective(&solution.x),
            wall_time_s: 0.0,
        },
        outcomes,
    })
}

/// One NLP per segment. Each segment starts exactly where the previous one
/// ended; free intermediate end conditions are pinned to the seed so every
/// sub-problem is well posed on its own.
fn solve_sequential(
    spec: &ProblemSpec,
    segments: &[PhaseSegment],
    dynamics: &DynamicsModel,
) -> Result<Solved, PlannerError> {
    let projection = dynamics.projection();
    let full_seed = seed(spec, segments, dynamics);
    let mut solved = Solved {
        points: Vec::new(),
        status: SolveStatus::Converged,
        diagnostics: Diagnostics::default(),
        outcomes: Vec::with_capacity(segments.len()),
    };
    let mut previous_end: Option<(State, f64)> = None;

    for (index, (segment, seed_values)) in segments.iter().zip(full_seed).enumerate() {
        let mut local = segment.clone();
        let mut seed_values = seed_values;
        if let Some((state, mach)) = previous_end {
            local.start = Boundary::at(projection.unproject(state.x_m, state.y_m))
                .with_altitude(AltitudeBoundary::Fixed(state.altitude_m))
                .with_mass(state.mass_kg)
                .with_time(state.time_s)
                .with_mach(mach);
            guess::anchor(&mut seed_values, &state);
        }
        if index + 1 < segments.len() {
            if let Some(end) = seed_values.states.last() {
                if local.end.position.is_none() {
                    local.end.position = Some(projection.unproject(end.x_m, end.y_m));
                }
                if local.end.altitude == AltitudeBoundary::Free {
                    local.end.altitude = AltitudeBoundary::Fixed(end.altitude_m);
                }
            }
        }

        let local = [local];
        let mut transcription = Transcription::new(&local, &setup(spec, dynamics))?;
        let solution = run(&mut transcription, std::slice::from_ref(&seed_values), &spec.options)?;

        solved.points.extend(assemble::points(&transcription, &solution.x, index));
        solved.outcomes.push(PhaseOutcome {
            segment: index,
            phase: segment.kind,
            status: solution.status,
            iterations: solution.iterations,
            constraint_violation: solution.constraint_violation,
        });
        let diagnostics = &mut solved.diagnostics;
        diagnostics.iterations += solution.iterations;
        diagnostics.outer_iterations += solution.outer_iterations;
        diagnostics.constraint_violation =
            diagnostics.constraint_violation.max(solution.constraint_violation);
        diagnostics.objective += transcription.physical_objective(&solution.x);

        if !solution.status.is_converged() {
            if solved.status.is_converged() {
                solved.status = solution.status;
            }
            if !spec.options.return_failed {
                warn!(
                    segment = index,
                    phase = %segment.kind,
                    status = solution.status.as_str(),
                    "segment did not converge; stopping sequential solve"
                );
                return Ok(solved);
            }
        }

        let layout = &transcription.layout().phases()[0];
        previous_end = Some((
            transcription.layout().state(&solution.x, 0, layout.nodes - 1),
            transcription.layout().control(&solution.x, 0, layout.intervals() - 1).mach,
        ));
    }
    Ok(solved)
}
