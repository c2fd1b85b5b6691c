//! Boundary between problem construction and numerical optimization.
//!
//! Problems describe themselves through [`NlpProblem`]; solvers implement
//! [`NlpSolver`]. Inequalities follow the `g(x) ≤ 0` convention.

mod augmented;
mod jacobian;

use std::time::Duration;

use thiserror::Error;

pub use augmented::AugmentedLagrangian;
pub use jacobian::{JacobianEntry, SparseJacobian, central_difference_gradient};

/// Objective and constraint values at one point.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub objective: f64,
    pub equality: Vec<f64>,
    pub inequality: Vec<f64>,
}

impl Evaluation {
    /// Infinity norm of equality residuals and positive inequality parts.
    pub fn violation(&self) -> f64 {
        let eq = self.equality.iter().fold(0.0_f64, |acc, c| acc.max(c.abs()));
        self.inequality.iter().fold(eq, |acc, g| acc.max(*g))
    }
}

/// Smooth constrained problem `min f(x)` s.t. `c(x) = 0`, `g(x) ≤ 0`, `lower ≤ x ≤ upper`.
pub trait NlpProblem {
    fn dimension(&self) -> usize;
    fn lower_bounds(&self) -> Vec<f64>;
    fn upper_bounds(&self) -> Vec<f64>;
    fn equality_count(&self) -> usize;
    fn inequality_count(&self) -> usize;

    fn objective(&self, x: &[f64]) -> f64;

    /// Write `c(x)` into `equality` and `g(x)` into `inequality`.
    fn constraints(&self, x: &[f64], equality: &mut [f64], inequality: &mut [f64]);

    fn evaluate(&self, x: &[f64]) -> Evaluation {
        let mut equality = vec![0.0; self.equality_count()];
        let mut inequality = vec![0.0; self.inequality_count()];
        self.constraints(x, &mut equality, &mut inequality);
        Evaluation {
            objective: self.objective(x),
            equality,
            inequality,
        }
    }

    /// Objective gradient; central differences over every variable unless overridden.
    fn objective_gradient(&self, x: &[f64]) -> Vec<f64> {
        central_difference_gradient(|p| self.objective(p), x)
    }

    /// Constraint Jacobian, equality rows first; dense central differences unless overridden.
    fn jacobian(&self, x: &[f64]) -> SparseJacobian {
        let n_eq = self.equality_count();
        let n_ineq = self.inequality_count();
        let rows = n_eq + n_ineq;
        let mut jacobian = SparseJacobian::new(rows, x.len());
        let mut point = x.to_vec();
        let mut plus_eq = vec![0.0; n_eq];
        let mut plus_ineq = vec![0.0; n_ineq];
        let mut minus_eq = vec![0.0; n_eq];
        let mut minus_ineq = vec![0.0; n_ineq];
        for col in 0..x.len() {
            let h = jacobian::step(x[col]);
            point[col] = x[col] + h;
            self.constraints(&point, &mut plus_eq, &mut plus_ineq);
            point[col] = x[col] - h;
            self.constraints(&point, &mut minus_eq, &mut minus_ineq);
            point[col] = x[col];
            let plus = plus_eq.iter().chain(&plus_ineq);
            let minus = minus_eq.iter().chain(&minus_ineq);
            for (row, (p, m)) in plus.zip(minus).enumerate() {
                let derivative = (p - m) / (2.0 * h);
                if derivative != 0.0 {
                    jacobian.push(row, col, derivative);
                }
            }
        }
        jacobian
    }

    /// Objective gradient and constraint Jacobian at the same point.
    ///
    /// Override when both can share work (e.g. per-block finite differences).
    fn derivatives(&self, x: &[f64]) -> (Vec<f64>, SparseJacobian) {
        (self.objective_gradient(x), self.jacobian(x))
    }
}

/// Termination reason reported with every solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    Converged,
    IterationLimit,
    WallClockLimit,
    /// Penalty growth stopped reducing the constraint violation.
    Stalled,
}

impl SolveStatus {
    pub fn is_converged(self) -> bool {
        matches!(self, SolveStatus::Converged)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SolveStatus::Converged => "converged",
            SolveStatus::IterationLimit => "iteration_limit",
            SolveStatus::WallClockLimit => "wall_clock_limit",
            SolveStatus::Stalled => "stalled",
        }
    }
}

/// Pass-through solver configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverOptions {
    /// Total inner (quasi-Newton) iterations across all outer iterations.
    pub max_iterations: u64,
    pub max_outer_iterations: u64,
    /// Feasibility and relative objective-change tolerance.
    pub tolerance: f64,
    pub max_wall_time: Option<Duration>,
    /// Hand back the last iterate instead of failing when not converged.
    pub return_failed: bool,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_iterations: 4_000,
            max_outer_iterations: 25,
            tolerance: 1e-3,
            max_wall_time: None,
            return_failed: false,
        }
    }
}

/// Solver output: always the last iterate, whatever the status.
#[derive(Debug, Clone, PartialEq)]
pub struct NlpSolution {
    pub x: Vec<f64>,
    pub objective: f64,
    pub status: SolveStatus,
    pub iterations: u64,
    pub outer_iterations: u64,
    pub constraint_violation: f64,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum NlpError {
    #[error("initial guess has {found} entries, problem has {expected} variables")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("variable {index}: lower bound {lower} exceeds upper bound {upper}")]
    InvalidBounds { index: usize, lower: f64, upper: f64 },
    #[error("initial guess entry {index} is not finite")]
    NonFiniteStart { index: usize },
}

/// A constrained NLP solver.
pub trait NlpSolver {
    fn solve<P: NlpProblem + ?Sized>(
        &self,
        problem: &P,
        initial: &[f64],
        options: &SolverOptions,
    ) -> Result<NlpSolution, NlpError>;
}
