//! Trapezoidal collocation of the multi-segment optimal-control problem.
//!
//! Decision variables, per segment and in this order: the state at every
//! node, the control of every interval (held constant over the interval),
//! and the segment duration `T` (`dt = T / (N − 1)`). All variables are
//! scaled to order one; constraints are scaled by physical tolerances.
//!
//! Constraint rows:
//! * equalities: 5 defects per interval, then 6 linkage rows (5 states and
//!   Mach) between consecutive segments;
//! * inequalities per interval: thrust margin and CAS limits at both nodes,
//!   Mach ≤ MMO, mass monotonicity, and for cruise the altitude floor at
//!   both nodes.
//!
//! Boundary conditions and the caller's `h_max` are variable bounds.

use std::f64::consts::TAU;

use flight_core::geo::GeoPoint;
use flight_dynamics::{Control, DynamicsModel, NodeEvaluation, State};
use flight_nlp::{Evaluation, NlpProblem, SparseJacobian};
use flight_performance::Aircraft;

use crate::objective::{NodeContext, ObjectiveTerm, ScalingFactors};
use crate::phase::{PhaseKind, PhaseSegment, altitude_floor};
use crate::problem::AltitudeBounds;
use crate::PlannerError;

pub const STATE_COUNT: usize = 5;
pub const CONTROL_COUNT: usize = 3;
const LINKAGE_ROWS: usize = STATE_COUNT + 1;
const LOCAL_VARIABLES: usize = 2 * STATE_COUNT + CONTROL_COUNT + 1;

/// Variable scales: x, y, altitude, mass, time.
const STATE_SCALES: [f64; STATE_COUNT] = [1e5, 1e5, 1e3, 1e4, 1e3];
/// Variable scales: Mach, vertical rate, heading.
const CONTROL_SCALES: [f64; CONTROL_COUNT] = [1.0, 10.0, 1.0];
const DURATION_SCALE: f64 = 1e3;

/// Residual scales of the defect and linkage rows (x, y, altitude, mass, time).
const DEFECT_SCALES: [f64; STATE_COUNT] = [1e3, 1e3, 1e2, 1e1, 1e1];
const MACH_LINK_SCALE: f64 = 1e-2;
const THRUST_SCALE_N: f64 = 1e4;
const CAS_SCALE_M_S: f64 = 10.0;
const MACH_SCALE: f64 = 0.1;
const MASS_STEP_SCALE_KG: f64 = 1e2;
const ALTITUDE_SCALE_M: f64 = 1e2;

const POSITION_LIMIT_M: f64 = 2e7;
const LOWEST_ALTITUDE_M: f64 = -500.0;
const MAX_TIME_S: f64 = 172_800.0;
pub const MIN_DURATION_S: f64 = 60.0;
const MAX_DURATION_S: f64 = 86_400.0;
const MIN_MACH: f64 = 0.1;
const MAX_MACH: f64 = 1.0;
const BOUND_TOLERANCE: f64 = 1e-9;

/// Physical values of one segment: node states, interval controls, duration.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseValues {
    pub states: Vec<State>,
    pub controls: Vec<Control>,
    pub duration_s: f64,
}

/// Position of one segment's variables in the decision vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseLayout {
    pub kind: PhaseKind,
    pub nodes: usize,
    offset: usize,
}

impl PhaseLayout {
    pub fn intervals(&self) -> usize {
        self.nodes - 1
    }

    pub fn state_index(&self, node: usize, component: usize) -> usize {
        self.offset + node * STATE_COUNT + component
    }

    pub fn control_index(&self, interval: usize, component: usize) -> usize {
        self.offset + self.nodes * STATE_COUNT + interval * CONTROL_COUNT + component
    }

    pub fn duration_index(&self) -> usize {
        self.offset + self.nodes * STATE_COUNT + self.intervals() * CONTROL_COUNT
    }

    pub fn len(&self) -> usize {
        self.nodes * STATE_COUNT + self.intervals() * CONTROL_COUNT + 1
    }

    pub fn is_empty(&self) -> bool {
        self.nodes == 0
    }

    /// Variables an interval's residuals depend on.
    fn interval_variables(&self, interval: usize) -> [usize; LOCAL_VARIABLES] {
        let mut indices = [0; LOCAL_VARIABLES];
        for c in 0..STATE_COUNT {
            indices[c] = self.state_index(interval, c);
            indices[STATE_COUNT + c] = self.state_index(interval + 1, c);
        }
        for c in 0..CONTROL_COUNT {
            indices[2 * STATE_COUNT + c] = self.control_index(interval, c);
        }
        indices[LOCAL_VARIABLES - 1] = self.duration_index();
        indices
    }
}

/// Layout of the whole decision vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableLayout {
    phases: Vec<PhaseLayout>,
    len: usize,
}

impl VariableLayout {
    pub fn new(segments: &[PhaseSegment]) -> Self {
        let mut offset = 0;
        let phases = segments
            .iter()
            .map(|segment| {
                let layout = PhaseLayout {
                    kind: segment.kind,
                    nodes: segment.nodes,
                    offset,
                };
                offset += layout.len();
                layout
            })
            .collect();
        Self { phases, len: offset }
    }

    pub fn phases(&self) -> &[PhaseLayout] {
        &self.phases
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn state(&self, z: &[f64], phase: usize, node: usize) -> State {
        let layout = &self.phases[phase];
        let value = |c: usize| z[layout.state_index(node, c)] * STATE_SCALES[c];
        State {
            x_m: value(0),
            y_m: value(1),
            altitude_m: value(2),
            mass_kg: value(3),
            time_s: value(4),
        }
    }

    pub fn control(&self, z: &[f64], phase: usize, interval: usize) -> Control {
        let layout = &self.phases[phase];
        let value = |c: usize| z[layout.control_index(interval, c)] * CONTROL_SCALES[c];
        Control {
            mach: value(0),
            vertical_rate_m_s: value(1),
            heading_rad: value(2),
        }
    }

    pub fn duration(&self, z: &[f64], phase: usize) -> f64 {
        z[self.phases[phase].duration_index()] * DURATION_SCALE
    }

    /// Scaled decision vector from physical segment values.
    pub fn encode(&self, values: &[PhaseValues]) -> Vec<f64> {
        let mut z = vec![0.0; self.len];
        for (layout, phase) in self.phases.iter().zip(values) {
            for (node, state) in phase.states.iter().enumerate().take(layout.nodes) {
                let physical = [
                    state.x_m,
                    state.y_m,
                    state.altitude_m,
                    state.mass_kg,
                    state.time_s,
                ];
                for c in 0..STATE_COUNT {
                    z[layout.state_index(node, c)] = physical[c] / STATE_SCALES[c];
                }
            }
            for (interval, control) in phase.controls.iter().enumerate().take(layout.intervals()) {
                let physical = [control.mach, control.vertical_rate_m_s, control.heading_rad];
                for c in 0..CONTROL_COUNT {
                    z[layout.control_index(interval, c)] = physical[c] / CONTROL_SCALES[c];
                }
            }
            z[layout.duration_index()] = phase.duration_s / DURATION_SCALE;
        }
        z
    }

    /// Physical segment values from a scaled decision vector.
    pub fn decode(&self, z: &[f64]) -> Vec<PhaseValues> {
        self.phases
            .iter()
            .enumerate()
            .map(|(p, layout)| PhaseValues {
                states: (0..layout.nodes).map(|k| self.state(z, p, k)).collect(),
                controls: (0..layout.intervals()).map(|k| self.control(z, p, k)).collect(),
                duration_s: self.duration(z, p),
            })
            .collect()
    }
}

/// Collaborators and limits shared by every segment of one transcription.
#[derive(Debug, Clone)]
pub struct TranscriptionSetup<'a> {
    pub aircraft: &'a Aircraft,
    pub dynamics: &'a DynamicsModel,
    pub objective: &'a ObjectiveTerm,
    pub scaling: ScalingFactors,
    pub altitude: AltitudeBounds,
    pub initial_mass_kg: f64,
}

#[derive(Debug, Clone)]
struct PhaseRows {
    floor_m: Option<f64>,
    equality_offset: usize,
    inequality_offset: usize,
    inequalities_per_interval: usize,
}

/// Scratch output of one interval evaluation.
struct IntervalResiduals {
    equality: [f64; STATE_COUNT],
    inequality: [f64; 10],
    inequality_count: usize,
    cost: f64,
}

/// The discretized problem handed to the NLP solver.
#[derive(Debug, Clone)]
pub struct Transcription {
    layout: VariableLayout,
    rows: Vec<PhaseRows>,
    dynamics: DynamicsModel,
    objective: ObjectiveTerm,
    scaling: ScalingFactors,
    nox_index: f64,
    mmo: f64,
    vmo_m_s: f64,
    min_cas_m_s: f64,
    lower: Vec<f64>,
    upper: Vec<f64>,
    equality_count: usize,
    inequality_count: usize,
    linkage_offset: usize,
    objective_reference: f64,
}

impl Transcription {
    /// Lay out variables and rows and derive the variable bounds.
    ///
    /// Fails with [`PlannerError::InfeasibleBounds`] when a boundary condition
    /// or altitude limit leaves a variable with an empty range.
    pub fn new(segments: &[PhaseSegment], setup: &TranscriptionSetup<'_>) -> Result<Self, PlannerError> {
        let layout = VariableLayout::new(segments);
        let envelope = setup.aircraft.envelope();

        let mut rows = Vec::with_capacity(segments.len());
        let mut equality_count = 0;
        let mut inequality_count = 0;
        for (segment, phase) in segments.iter().zip(layout.phases()) {
            let floor_m = altitude_floor(segment.kind, &setup.aircraft.cruise, setup.altitude.min_m());
            let inequalities_per_interval = 8 + if floor_m.is_some() { 2 } else { 0 };
            rows.push(PhaseRows {
                floor_m,
                equality_offset: equality_count,
                inequality_offset: inequality_count,
                inequalities_per_interval,
            });
            equality_count += phase.intervals() * STATE_COUNT;
            inequality_count += phase.intervals() * inequalities_per_interval;
        }
        let linkage_offset = equality_count;
        equality_count += segments.len().saturating_sub(1) * LINKAGE_ROWS;

        let mut transcription = Self {
            layout,
            rows,
            dynamics: setup.dynamics.clone(),
            objective: setup.objective.clone(),
            scaling: setup.scaling,
            nox_index: setup.dynamics.performance().nox_emission_index(),
            mmo: envelope.mmo,
            vmo_m_s: envelope.vmo_m_s,
            min_cas_m_s: envelope.min_cas_m_s,
            lower: Vec::new(),
            upper: Vec::new(),
            equality_count,
            inequality_count,
            linkage_offset,
            objective_reference: 1.0,
        };
        transcription.derive_bounds(segments, setup)?;
        Ok(transcription)
    }

    fn derive_bounds(
        &mut self,
        segments: &[PhaseSegment],
        setup: &TranscriptionSetup<'_>,
    ) -> Result<(), PlannerError> {
        let envelope = setup.aircraft.envelope();
        let projection = *self.dynamics.projection();
        let altitude_ceiling = setup
            .altitude
            .max_m()
            .map_or(envelope.ceiling_m, |h| h.min(envelope.ceiling_m));

        let n = self.layout.len();
        let mut lower = vec![0.0; n];
        let mut upper = vec![0.0; n];

        for (p, (segment, layout)) in segments.iter().zip(self.layout.phases()).enumerate() {
            let (rate_lo, rate_hi) = segment.kind.vertical_rate_bounds(setup.aircraft);
            let mut node_bounds: Vec<[(f64, f64); STATE_COUNT]> = vec![
                [
                    (-POSITION_LIMIT_M, POSITION_LIMIT_M),
                    (-POSITION_LIMIT_M, POSITION_LIMIT_M),
                    (LOWEST_ALTITUDE_M, altitude_ceiling),
                    (envelope.oew_kg, setup.initial_mass_kg),
                    (0.0, MAX_TIME_S),
                ];
                layout.nodes
            ];
            let mut control_bounds: Vec<[(f64, f64); CONTROL_COUNT]> = vec![
                [(MIN_MACH, MAX_MACH), (rate_lo, rate_hi), (-TAU, TAU)];
                layout.intervals()
            ];

            for (boundary, node, interval) in [
                (&segment.start, 0, 0),
                (&segment.end, layout.nodes - 1, layout.intervals() - 1),
            ] {
                let bounds = &mut node_bounds[node];
                if let Some(position) = boundary.position {
                    let (x, y) = projection.project(position);
                    bounds[0] = intersect(bounds[0], (x, x));
                    bounds[1] = intersect(bounds[1], (y, y));
                }
                bounds[2] = intersect(bounds[2], boundary.altitude.interval());
                if let Some(mass) = boundary.mass_kg {
                    bounds[3] = intersect(bounds[3], (mass, mass));
                }
                if let Some(time) = boundary.time_s {
                    bounds[4] = intersect(bounds[4], (time, time));
                }
                if let Some(mach) = boundary.mach {
                    control_bounds[interval][0] = intersect(control_bounds[interval][0], (mach, mach));
                }
            }

            const STATE_NAMES: [&str; STATE_COUNT] = ["x", "y", "altitude", "mass", "time"];
            const CONTROL_NAMES: [&str; CONTROL_COUNT] = ["mach", "vertical rate", "heading"];
            for (node, bounds) in node_bounds.iter().enumerate() {
                for (c, (lo, hi)) in bounds.iter().enumerate() {
                    check_bounds(*lo, *hi, || {
                        format!("segment {p} ({}) node {node} {}", segment.kind, STATE_NAMES[c])
                    })?;
                    let index = layout.state_index(node, c);
                    lower[index] = lo / STATE_SCALES[c];
                    upper[index] = hi / STATE_SCALES[c];
                }
            }
            for (interval, bounds) in control_bounds.iter().enumerate() {
                for (c, (lo, hi)) in bounds.iter().enumerate() {
                    check_bounds(*lo, *hi, || {
                        format!(
                            "segment {p} ({}) interval {interval} {}",
                            segment.kind, CONTROL_NAMES[c]
                        )
                    })?;
                    let index = layout.control_index(interval, c);
                    lower[index] = lo / CONTROL_SCALES[c];
                    upper[index] = hi / CONTROL_SCALES[c];
                }
            }
            lower[layout.duration_index()] = MIN_DURATION_S / DURATION_SCALE;
            upper[layout.duration_index()] = MAX_DURATION_S / DURATION_SCALE;
        }

        self.lower = lower;
        self.upper = upper;
        Ok(())
    }

    pub fn layout(&self) -> &VariableLayout {
        &self.layout
    }

    pub fn dynamics(&self) -> &DynamicsModel {
        &self.dynamics
    }

    /// Divide the objective by `reference` so the solver sees values of order one.
    pub fn set_objective_reference(&mut self, reference: f64) {
        self.objective_reference = if reference.is_finite() && reference.abs() > 1e-9 {
            reference.abs()
        } else {
            1.0
        };
    }

    /// Unscaled objective value.
    pub fn physical_objective(&self, z: &[f64]) -> f64 {
        let mut total = 0.0;
        for (p, layout) in self.layout.phases().iter().enumerate() {
            for k in 0..layout.intervals() {
                total += self.interval(p, k, z).cost;
            }
        }
        total
    }

    /// Physical (unscaled) defects of every interval: x, y, altitude, mass, time.
    pub fn defects(&self, z: &[f64]) -> Vec<f64> {
        let mut defects = Vec::new();
        for (p, layout) in self.layout.phases().iter().enumerate() {
            for k in 0..layout.intervals() {
                let residuals = self.interval(p, k, z);
                defects.extend(
                    residuals
                        .equality
                        .iter()
                        .zip(DEFECT_SCALES)
                        .map(|(r, scale)| r * scale),
                );
            }
        }
        defects
    }

    /// Ground position of a node, for diagnostics and seeding.
    pub fn position(&self, z: &[f64], phase: usize, node: usize) -> GeoPoint {
        let state = self.layout.state(z, phase, node);
        self.dynamics.projection().unproject(state.x_m, state.y_m)
    }

    fn node_context<'a>(
        &self,
        phase: PhaseKind,
        state: &'a State,
        control: &'a Control,
        evaluation: &'a NodeEvaluation,
    ) -> NodeContext<'a> {
        NodeContext {
            phase,
            state,
            control,
            evaluation,
            nox_index: self.nox_index,
        }
    }

    fn node_inequalities(&self, evaluation: &NodeEvaluation, out: &mut [f64]) {
        out[0] = (evaluation.thrust_required_n - evaluation.thrust_max_n) / THRUST_SCALE_N;
        out[1] = (evaluation.cas_m_s - self.vmo_m_s) / CAS_SCALE_M_S;
        out[2] = (self.min_cas_m_s - evaluation.cas_m_s) / CAS_SCALE_M_S;
    }

    fn interval(&self, p: usize, k: usize, z: &[f64]) -> IntervalResiduals {
        let layout = &self.layout.phases()[p];
        let rows = &self.rows[p];
        let start = self.layout.state(z, p, k);
        let end = self.layout.state(z, p, k + 1);
        let control = self.layout.control(z, p, k);
        let dt = self.layout.duration(z, p) / layout.intervals() as f64;

        let start_eval = self.dynamics.evaluate(&start, &control);
        let end_eval = self.dynamics.evaluate(&end, &control);
        let start_rate = start_eval.rate.as_array();
        let end_rate = end_eval.rate.as_array();
        let start_values = [start.x_m, start.y_m, start.altitude_m, start.mass_kg, start.time_s];
        let end_values = [end.x_m, end.y_m, end.altitude_m, end.mass_kg, end.time_s];

        let mut equality = [0.0; STATE_COUNT];
        for c in 0..STATE_COUNT - 1 {
            let predicted = 0.5 * dt * (start_rate[c] + end_rate[c]);
            equality[c] = (end_values[c] - start_values[c] - predicted) / DEFECT_SCALES[c];
        }
        equality[STATE_COUNT - 1] = (end.time_s - start.time_s - dt) / DEFECT_SCALES[STATE_COUNT - 1];

        let mut inequality = [0.0; 10];
        self.node_inequalities(&start_eval, &mut inequality[0..3]);
        self.node_inequalities(&end_eval, &mut inequality[3..6]);
        inequality[6] = (control.mach - self.mmo) / MACH_SCALE;
        inequality[7] = (end.mass_kg - start.mass_kg) / MASS_STEP_SCALE_KG;
        if let Some(floor) = rows.floor_m {
            inequality[8] = (floor - start.altitude_m) / ALTITUDE_SCALE_M;
            inequality[9] = (floor - end.altitude_m) / ALTITUDE_SCALE_M;
        }

        let start_node = self.node_context(layout.kind, &start, &control, &start_eval);
        let end_node = self.node_context(layout.kind, &end, &control, &end_eval);
        let cost = self
            .objective
            .interval_cost(&start_node, &end_node, dt, &self.scaling);

        IntervalResiduals {
            equality,
            inequality,
            inequality_count: rows.inequalities_per_interval,
            cost,
        }
    }

    fn linkage(&self, z: &[f64], equality: &mut [f64]) {
        for (link, pair) in self.layout.phases().windows(2).enumerate() {
            let (before, after) = (&pair[0], &pair[1]);
            let row = self.linkage_offset + link * LINKAGE_ROWS;
            for c in 0..STATE_COUNT {
                let a = z[before.state_index(before.nodes - 1, c)];
                let b = z[after.state_index(0, c)];
                equality[row + c] = (b - a) * STATE_SCALES[c] / DEFECT_SCALES[c];
            }
            let a = z[before.control_index(before.intervals() - 1, 0)];
            let b = z[after.control_index(0, 0)];
            equality[row + STATE_COUNT] = (b - a) * CONTROL_SCALES[0] / MACH_LINK_SCALE;
        }
    }

    fn linkage_jacobian(&self, jacobian: &mut SparseJacobian) {
        for (link, pair) in self.layout.phases().windows(2).enumerate() {
            let (before, after) = (&pair[0], &pair[1]);
            let row = self.linkage_offset + link * LINKAGE_ROWS;
            for c in 0..STATE_COUNT {
                let weight = STATE_SCALES[c] / DEFECT_SCALES[c];
                jacobian.push(row + c, after.state_index(0, c), weight);
                jacobian.push(row + c, before.state_index(before.nodes - 1, c), -weight);
            }
            let weight = CONTROL_SCALES[0] / MACH_LINK_SCALE;
            jacobian.push(row + STATE_COUNT, after.control_index(0, 0), weight);
            jacobian.push(
                row + STATE_COUNT,
                before.control_index(before.intervals() - 1, 0),
                -weight,
            );
        }
    }

    fn fill(&self, z: &[f64], equality: &mut [f64], inequality: &mut [f64]) -> f64 {
        let mut cost = 0.0;
        for (p, layout) in self.layout.phases().iter().enumerate() {
            let rows = &self.rows[p];
            for k in 0..layout.intervals() {
                let residuals = self.interval(p, k, z);
                let eq_row = rows.equality_offset + k * STATE_COUNT;
                equality[eq_row..eq_row + STATE_COUNT].copy_from_slice(&residuals.equality);
                let count = residuals.inequality_count;
                let ineq_row = rows.inequality_offset + k * count;
                inequality[ineq_row..ineq_row + count]
                    .copy_from_slice(&residuals.inequality[..count]);
                cost += residuals.cost;
            }
        }
        self.linkage(z, equality);
        cost
    }
}

fn intersect(a: (f64, f64), b: (f64, f64)) -> (f64, f64) {
    (a.0.max(b.0), a.1.min(b.1))
}

fn check_bounds(
    lower: f64,
    upper: f64,
    variable: impl FnOnce() -> String,
) -> Result<(), PlannerError> {
    if lower > upper + BOUND_TOLERANCE {
        return Err(PlannerError::InfeasibleBounds {
            variable: variable(),
            lower,
            upper,
        });
    }
    Ok(())
}

fn step(value: f64) -> f64 {
    1e-6 * value.abs().max(1.0)
}

impl NlpProblem for Transcription {
    fn dimension(&self) -> usize {
        self.layout.len()
    }

    fn lower_bounds(&self) -> Vec<f64> {
        self.lower.clone()
    }

    fn upper_bounds(&self) -> Vec<f64> {
        self.upper.clone()
    }

    fn equality_count(&self) -> usize {
        self.equality_count
    }

    fn inequality_count(&self) -> usize {
        self.inequality_count
    }

    fn objective(&self, z: &[f64]) -> f64 {
        self.physical_objective(z) / self.objective_reference
    }

    fn constraints(&self, z: &[f64], equality: &mut [f64], inequality: &mut [f64]) {
        self.fill(z, equality, inequality);
    }

    fn evaluate(&self, z: &[f64]) -> Evaluation {
        let mut equality = vec![0.0; self.equality_count];
        let mut inequality = vec![0.0; self.inequality_count];
        let cost = self.fill(z, &mut equality, &mut inequality);
        Evaluation {
            objective: cost / self.objective_reference,
            equality,
            inequality,
        }
    }

    fn objective_gradient(&self, z: &[f64]) -> Vec<f64> {
        self.derivatives(z).0
    }

    fn jacobian(&self, z: &[f64]) -> SparseJacobian {
        self.derivatives(z).1
    }

    /// Central differences block by block: each interval only touches its
    /// two node states, its control and the segment duration.
    fn derivatives(&self, z: &[f64]) -> (Vec<f64>, SparseJacobian) {
        let mut gradient = vec![0.0; z.len()];
        let mut jacobian = SparseJacobian::new(self.equality_count + self.inequality_count, z.len());
        let mut point = z.to_vec();

        for (p, layout) in self.layout.phases().iter().enumerate() {
            let rows = &self.rows[p];
            for k in 0..layout.intervals() {
                let eq_row = rows.equality_offset + k * STATE_COUNT;
                let ineq_row =
                    self.equality_count + rows.inequality_offset + k * rows.inequalities_per_interval;
                for index in layout.interval_variables(k) {
                    let h = step(z[index]);
                    point[index] = z[index] + h;
                    let plus = self.interval(p, k, &point);
                    point[index] = z[index] - h;
                    let minus = self.interval(p, k, &point);
                    point[index] = z[index];

                    let scale = 1.0 / (2.0 * h);
                    gradient[index] += (plus.cost - minus.cost) * scale / self.objective_reference;
                    for (r, (a, b)) in plus.equality.iter().zip(&minus.equality).enumerate() {
                        let d = (a - b) * scale;
                        if d != 0.0 {
                            jacobian.push(eq_row + r, index, d);
                        }
                    }
                    let count = plus.inequality_count;
                    for (r, (a, b)) in plus.inequality[..count]
                        .iter()
                        .zip(&minus.inequality[..count])
                        .enumerate()
                    {
                        let d = (a - b) * scale;
                        if d != 0.0 {
                            jacobian.push(ineq_row + r, index, d);
                        }
                    }
                }
            }
        }
        self.linkage_jacobian(&mut jacobian);
        (gradient, jacobian)
    }
}
