//! Scenario sweeps over scaling factors.
//!
//! Every case is an independent solve of a shared [`ProblemSpec`], so cases
//! run in parallel on the rayon pool.

use std::sync::Arc;

use rayon::prelude::*;
use tracing::info;

use crate::assemble::Trajectory;
use crate::guess::InitialGuess;
use crate::objective::{ObjectiveError, ScalingFactors};
use crate::problem::{PlannerError, ProblemSpec, solve};

/// Result of one sweep case.
#[derive(Debug)]
pub struct SweepOutcome {
    pub scaling: ScalingFactors,
    pub result: Result<Trajectory, PlannerError>,
}

/// Cartesian product of contrail and CO2 scaling factors, contrail-major.
pub fn scaling_grid(contrail: &[f64], co2: &[f64]) -> Result<Vec<ScalingFactors>, ObjectiveError> {
    contrail
        .iter()
        .flat_map(|c| co2.iter().map(move |k| ScalingFactors::new(*c, *k)))
        .collect()
}

/// Solve `spec` once per scaling case, in parallel. Outcomes keep the input order.
pub fn run(spec: &ProblemSpec, cases: &[ScalingFactors]) -> Vec<SweepOutcome> {
    info!(cases = cases.len(), "running scaling sweep");
    cases
        .par_iter()
        .map(|scaling| SweepOutcome {
            scaling: *scaling,
            result: solve(&spec.with_scaling(*scaling)),
        })
        .collect()
}

/// Solve the first case from scratch, then start every other case from its
/// solution. Falls back to the problem's own guess when the first case fails.
pub fn run_warm_started(spec: &ProblemSpec, cases: &[ScalingFactors]) -> Vec<SweepOutcome> {
    let Some((first, rest)) = cases.split_first() else {
        return Vec::new();
    };
    let anchor = SweepOutcome {
        scaling: *first,
        result: solve(&spec.with_scaling(*first)),
    };
    let warm = match &anchor.result {
        Ok(trajectory) => spec.with_guess(InitialGuess::Prior(Arc::new(trajectory.clone()))),
        Err(_) => spec.clone(),
    };

    let mut outcomes = Vec::with_capacity(cases.len());
    outcomes.push(anchor);
    outcomes.extend(run(&warm, rest));
    outcomes
}
