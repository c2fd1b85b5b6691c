use std::cell::{Cell, RefCell};
use std::time::Instant;

use argmin::core::{CostFunction, Error as ArgminError, Executor, Gradient, State};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use tracing::{debug, warn};

use crate::{Evaluation, NlpError, NlpProblem, NlpSolution, NlpSolver, SolveStatus, SolverOptions};

const INITIAL_PENALTY: f64 = 10.0;
const MAX_PENALTY: f64 = 1e9;
const PENALTY_GROWTH: f64 = 10.0;
/// Required violation reduction per outer iteration before the penalty grows.
const VIOLATION_REDUCTION: f64 = 0.25;
const MIN_BOUND_PENALTY: f64 = 1e4;
const STALL_LIMIT: u32 = 3;

/// Augmented-Lagrangian outer loop around an L-BFGS inner solver.
///
/// Each outer iteration minimizes
/// `f + λᵀc + ρ/2‖c‖² + 1/(2ρ)·Σ(max(0, μ + ρg)² − μ²)` over the box, then
/// updates `λ ← λ + ρc`, `μ ← max(0, μ + ρg)`. Bounds are handled by
/// projection with a quadratic penalty on the distance to the box, so the
/// unconstrained L-BFGS from argmin can drive the subproblem.
#[derive(Debug, Clone)]
pub struct AugmentedLagrangian {
    /// L-BFGS history length.
    pub memory: usize,
    /// Inner iteration cap per outer iteration.
    pub inner_iterations: u64,
    pub inner_gradient_tolerance: f64,
}

impl Default for AugmentedLagrangian {
    fn default() -> Self {
        Self {
            memory: 8,
            inner_iterations: 250,
            inner_gradient_tolerance: 1e-6,
        }
    }
}

struct BoxBounds {
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl BoxBounds {
    fn project(&self, z: &[f64]) -> Vec<f64> {
        z.iter()
            .zip(self.lower.iter().zip(&self.upper))
            .map(|(v, (lo, hi))| v.clamp(*lo, *hi))
            .collect()
    }
}

/// Inner subproblem handed to argmin.
struct Subproblem<'a, P: ?Sized> {
    problem: &'a P,
    bounds: &'a BoxBounds,
    lambda: &'a [f64],
    mu: &'a [f64],
    penalty: f64,
    bound_penalty: f64,
    evaluations: &'a Cell<u64>,
    best: &'a RefCell<Option<(f64, Vec<f64>)>>,
}

impl<P: NlpProblem + ?Sized> Subproblem<'_, P> {
    fn merit(&self, evaluation: &Evaluation) -> f64 {
        let rho = self.penalty;
        let equality: f64 = evaluation
            .equality
            .iter()
            .zip(self.lambda)
            .map(|(c, l)| l * c + 0.5 * rho * c * c)
            .sum();
        let inequality: f64 = evaluation
            .inequality
            .iter()
            .zip(self.mu)
            .map(|(g, m)| {
                let shifted = (m + rho * g).max(0.0);
                (shifted * shifted - m * m) / (2.0 * rho)
            })
            .sum();
        evaluation.objective + equality + inequality
    }

    fn outside_distance(&self, z: &[f64], projected: &[f64]) -> f64 {
        z.iter()
            .zip(projected)
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
    }

    fn record(&self, cost: f64, z: &[f64]) {
        self.evaluations.set(self.evaluations.get() + 1);
        let mut best = self.best.borrow_mut();
        let improved = match best.as_ref() {
            Some((value, _)) => cost < *value,
            None => true,
        };
        if improved {
            *best = Some((cost, z.to_vec()));
        }
    }
}

impl<P: NlpProblem + ?Sized> CostFunction for Subproblem<'_, P> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, z: &Self::Param) -> Result<Self::Output, ArgminError> {
        let projected = self.bounds.project(z);
        let evaluation = self.problem.evaluate(&projected);
        let cost = self.merit(&evaluation)
            + 0.5 * self.bound_penalty * self.outside_distance(z, &projected);
        if !cost.is_finite() {
            return Err(ArgminError::msg("augmented Lagrangian is not finite"));
        }
        self.record(cost, z);
        Ok(cost)
    }
}

impl<P: NlpProblem + ?Sized> Gradient for Subproblem<'_, P> {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(&self, z: &Self::Param) -> Result<Self::Gradient, ArgminError> {
        let projected = self.bounds.project(z);
        let evaluation = self.problem.evaluate(&projected);
        let rho = self.penalty;
        let weights: Vec<f64> = evaluation
            .equality
            .iter()
            .zip(self.lambda)
            .map(|(c, l)| l + rho * c)
            .chain(
                evaluation
                    .inequality
                    .iter()
                    .zip(self.mu)
                    .map(|(g, m)| (m + rho * g).max(0.0)),
            )
            .collect();

        let (mut gradient, jacobian) = self.problem.derivatives(&projected);
        let constraint_part = jacobian.transpose_mul(&weights);
        for (i, slot) in gradient.iter_mut().enumerate() {
            if z[i] != projected[i] {
                *slot = self.bound_penalty * (z[i] - projected[i]);
            } else {
                *slot += constraint_part[i];
            }
        }
        if gradient.iter().any(|g| !g.is_finite()) {
            return Err(ArgminError::msg("augmented Lagrangian gradient is not finite"));
        }
        Ok(gradient)
    }
}

struct InnerOutcome {
    z: Vec<f64>,
    iterations: u64,
}

/// Multipliers and penalty of one outer iteration.
struct OuterState<'a> {
    lambda: &'a [f64],
    mu: &'a [f64],
    penalty: f64,
}

impl AugmentedLagrangian {
    fn minimize<P: NlpProblem + ?Sized>(
        &self,
        problem: &P,
        bounds: &BoxBounds,
        outer: OuterState<'_>,
        start: &[f64],
        budget: u64,
    ) -> InnerOutcome {
        let evaluations = Cell::new(0);
        let best = RefCell::new(None);
        let subproblem = Subproblem {
            problem,
            bounds,
            lambda: outer.lambda,
            mu: outer.mu,
            penalty: outer.penalty,
            bound_penalty: (PENALTY_GROWTH * outer.penalty).max(MIN_BOUND_PENALTY),
            evaluations: &evaluations,
            best: &best,
        };

        match self.run_lbfgs(subproblem, start.to_vec(), budget) {
            Ok((z, iterations)) => InnerOutcome {
                z,
                iterations: iterations.max(1),
            },
            Err(err) => {
                // Keep the best point the line search reached before failing.
                debug!(error = %err, "inner solve stopped early");
                let z = best
                    .into_inner()
                    .map(|(_, z)| z)
                    .unwrap_or_else(|| start.to_vec());
                InnerOutcome {
                    z,
                    iterations: evaluations.get().clamp(1, budget.max(1)),
                }
            }
        }
    }

    fn run_lbfgs<P: NlpProblem + ?Sized>(
        &self,
        subproblem: Subproblem<'_, P>,
        start: Vec<f64>,
        budget: u64,
    ) -> Result<(Vec<f64>, u64), ArgminError> {
        let linesearch = MoreThuenteLineSearch::new();
        let solver = LBFGS::new(linesearch, self.memory)
            .with_tolerance_grad(self.inner_gradient_tolerance)?
            .with_tolerance_cost(1e-12)?;
        let fallback = start.clone();
        let result = Executor::new(subproblem, solver)
            .configure(|state| state.param(start).max_iters(budget))
            .run()?;
        let state = result.state();
        let z = state.get_best_param().cloned().unwrap_or(fallback);
        Ok((z, state.get_iter()))
    }
}

fn validate<P: NlpProblem + ?Sized>(problem: &P, initial: &[f64]) -> Result<BoxBounds, NlpError> {
    let expected = problem.dimension();
    if initial.len() != expected {
        return Err(NlpError::DimensionMismatch {
            expected,
            found: initial.len(),
        });
    }
    if let Some(index) = initial.iter().position(|v| !v.is_finite()) {
        return Err(NlpError::NonFiniteStart { index });
    }
    let lower = problem.lower_bounds();
    let upper = problem.upper_bounds();
    for (index, (lo, hi)) in lower.iter().zip(&upper).enumerate() {
        if lo > hi {
            return Err(NlpError::InvalidBounds {
                index,
                lower: *lo,
                upper: *hi,
            });
        }
    }
    Ok(BoxBounds { lower, upper })
}

impl NlpSolver for AugmentedLagrangian {
    fn solve<P: NlpProblem + ?Sized>(
        &self,
        problem: &P,
        initial: &[f64],
        options: &SolverOptions,
    ) -> Result<NlpSolution, NlpError> {
        let bounds = validate(problem, initial)?;
        let started = Instant::now();

        let mut x = bounds.project(initial);
        let mut evaluation = problem.evaluate(&x);
        let mut lambda = vec![0.0; problem.equality_count()];
        let mut mu = vec![0.0; problem.inequality_count()];
        let mut penalty = INITIAL_PENALTY;
        let mut previous_violation = evaluation.violation();
        let mut previous_objective: Option<f64> = None;
        let mut iterations = 0_u64;
        let mut outer_iterations = 0_u64;
        let mut stalls = 0_u32;
        let mut status = SolveStatus::IterationLimit;

        while outer_iterations < options.max_outer_iterations {
            if options
                .max_wall_time
                .is_some_and(|limit| started.elapsed() >= limit)
            {
                status = SolveStatus::WallClockLimit;
                break;
            }
            let remaining = options.max_iterations.saturating_sub(iterations);
            if remaining == 0 {
                status = SolveStatus::IterationLimit;
                break;
            }

            let outer = OuterState {
                lambda: &lambda,
                mu: &mu,
                penalty,
            };
            let outcome = self.minimize(
                problem,
                &bounds,
                outer,
                &x,
                remaining.min(self.inner_iterations),
            );
            iterations += outcome.iterations;
            outer_iterations += 1;

            x = bounds.project(&outcome.z);
            evaluation = problem.evaluate(&x);
            let violation = evaluation.violation();

            for (l, c) in lambda.iter_mut().zip(&evaluation.equality) {
                *l += penalty * c;
            }
            for (m, g) in mu.iter_mut().zip(&evaluation.inequality) {
                *m = (*m + penalty * g).max(0.0);
            }

            debug!(
                outer = outer_iterations,
                inner = iterations,
                objective = evaluation.objective,
                violation,
                penalty,
                "augmented Lagrangian iteration"
            );

            let settled = previous_objective.is_some_and(|prev| {
                (evaluation.objective - prev).abs()
                    <= options.tolerance * evaluation.objective.abs().max(1.0)
            });
            if violation <= options.tolerance && settled {
                status = SolveStatus::Converged;
                break;
            }

            if violation > VIOLATION_REDUCTION * previous_violation && violation > options.tolerance {
                if penalty >= MAX_PENALTY {
                    stalls += 1;
                    if stalls >= STALL_LIMIT {
                        status = SolveStatus::Stalled;
                        break;
                    }
                }
                penalty = (penalty * PENALTY_GROWTH).min(MAX_PENALTY);
            }
            previous_violation = violation;
            previous_objective = Some(evaluation.objective);
        }

        let constraint_violation = evaluation.violation();
        if !status.is_converged() {
            warn!(
                status = status.as_str(),
                constraint_violation, iterations, "solver stopped without converging"
            );
        }
        Ok(NlpSolution {
            x,
            objective: evaluation.objective,
            status,
            iterations,
            outer_iterations,
            constraint_violation,
        })
    }
}
