use std::time::Duration;

use flight_optimizer::planner::nlp::{
    AugmentedLagrangian, NlpError, NlpProblem, NlpSolver, SolveStatus, SolverOptions,
    SparseJacobian,
};

/// `min (x − a)² + (y − b)²` with optional linear rows.
struct Quadratic {
    target: [f64; 2],
    lower: [f64; 2],
    upper: [f64; 2],
    /// `x + y − c = 0`
    sum_equals: Option<f64>,
    /// `c − x − y ≤ 0`
    sum_at_least: Option<f64>,
}

impl Quadratic {
    fn unconstrained(target: [f64; 2]) -> Self {
        Self {
            target,
            lower: [-10.0, -10.0],
            upper: [10.0, 10.0],
            sum_equals: None,
            sum_at_least: None,
        }
    }
}

impl NlpProblem for Quadratic {
    fn dimension(&self) -> usize {
        2
    }

    fn lower_bounds(&self) -> Vec<f64> {
        self.lower.to_vec()
    }

    fn upper_bounds(&self) -> Vec<f64> {
        self.upper.to_vec()
    }

    fn equality_count(&self) -> usize {
        usize::from(self.sum_equals.is_some())
    }

    fn inequality_count(&self) -> usize {
        usize::from(self.sum_at_least.is_some())
    }

    fn objective(&self, x: &[f64]) -> f64 {
        (x[0] - self.target[0]).powi(2) + (x[1] - self.target[1]).powi(2)
    }

    fn constraints(&self, x: &[f64], equality: &mut [f64], inequality: &mut [f64]) {
        if let Some(c) = self.sum_equals {
            equality[0] = x[0] + x[1] - c;
        }
        if let Some(c) = self.sum_at_least {
            inequality[0] = c - x[0] - x[1];
        }
    }
}

fn options() -> SolverOptions {
    SolverOptions {
        max_iterations: 2_000,
        max_outer_iterations: 30,
        tolerance: 1e-6,
        max_wall_time: None,
        return_failed: false,
    }
}

fn close(actual: &[f64], expected: [f64; 2], tol: f64) -> bool {
    actual.iter().zip(expected).all(|(a, e)| (a - e).abs() < tol)
}

#[test]
fn unconstrained_minimum_is_found() {
    let problem = Quadratic::unconstrained([1.0, -2.0]);
    let solution = AugmentedLagrangian::default()
        .solve(&problem, &[0.0, 0.0], &options())
        .expect("solve");
    assert_eq!(solution.status, SolveStatus::Converged);
    assert!(close(&solution.x, [1.0, -2.0], 1e-4), "x = {:?}", solution.x);
    assert!(solution.objective < 1e-8);
}

#[test]
fn equality_constraint_projects_the_minimum() {
    let problem = Quadratic {
        sum_equals: Some(1.0),
        ..Quadratic::unconstrained([1.0, 2.0])
    };
    let solution = AugmentedLagrangian::default()
        .solve(&problem, &[0.0, 0.0], &options())
        .expect("solve");
    assert!(solution.status.is_converged(), "status {:?}", solution.status);
    assert!(close(&solution.x, [0.0, 1.0], 1e-3), "x = {:?}", solution.x);
    assert!(solution.constraint_violation <= 1e-6);
}

#[test]
fn active_inequality_and_inactive_inequality() {
    let active = Quadratic {
        sum_at_least: Some(1.0),
        ..Quadratic::unconstrained([0.0, 0.0])
    };
    let solution = AugmentedLagrangian::default()
        .solve(&active, &[2.0, -1.5], &options())
        .expect("solve");
    assert!(solution.status.is_converged());
    assert!(close(&solution.x, [0.5, 0.5], 1e-3), "x = {:?}", solution.x);

    let inactive = Quadratic {
        sum_at_least: Some(-5.0),
        ..Quadratic::unconstrained([1.0, 1.0])
    };
    let solution = AugmentedLagrangian::default()
        .solve(&inactive, &[0.0, 0.0], &options())
        .expect("solve");
    assert!(close(&solution.x, [1.0, 1.0], 1e-3), "x = {:?}", solution.x);
}

#[test]
fn bounds_are_always_respected() {
    let problem = Quadratic {
        lower: [0.0, 0.0],
        upper: [2.0, 2.0],
        ..Quadratic::unconstrained([3.0, -1.0])
    };
    // Start outside the box: the solver projects before iterating.
    let solution = AugmentedLagrangian::default()
        .solve(&problem, &[5.0, 5.0], &options())
        .expect("solve");
    assert!(solution.x[0] <= 2.0 && solution.x[0] >= 0.0);
    assert!(solution.x[1] <= 2.0 && solution.x[1] >= 0.0);
    assert!(close(&solution.x, [2.0, 0.0], 1e-3), "x = {:?}", solution.x);
}

#[test]
fn infeasible_problem_reports_non_convergence() {
    // x + y = 10 cannot hold inside [0, 1]².
    let problem = Quadratic {
        lower: [0.0, 0.0],
        upper: [1.0, 1.0],
        sum_equals: Some(10.0),
        ..Quadratic::unconstrained([0.0, 0.0])
    };
    let solution = AugmentedLagrangian::default()
        .solve(&problem, &[0.5, 0.5], &options())
        .expect("solver returns a status, not an error");
    assert!(!solution.status.is_converged());
    assert!(solution.constraint_violation >= 7.9);
    assert!(solution.x.iter().all(|v| (0.0..=1.0).contains(v)));
}

#[test]
fn budgets_stop_the_solver() {
    let problem = Quadratic {
        sum_equals: Some(1.0),
        ..Quadratic::unconstrained([1.0, 2.0])
    };
    let tight = SolverOptions {
        max_iterations: 1,
        ..options()
    };
    let solution = AugmentedLagrangian::default()
        .solve(&problem, &[0.0, 0.0], &tight)
        .expect("solve");
    assert!(solution.iterations <= 1);

    let no_time = SolverOptions {
        max_wall_time: Some(Duration::ZERO),
        ..options()
    };
    let solution = AugmentedLagrangian::default()
        .solve(&problem, &[0.0, 0.0], &no_time)
        .expect("solve");
    assert_eq!(solution.status, SolveStatus::WallClockLimit);
    assert_eq!(solution.outer_iterations, 0);
}

#[test]
fn malformed_inputs_are_errors() {
    let problem = Quadratic::unconstrained([0.0, 0.0]);
    let solver = AugmentedLagrangian::default();
    assert!(matches!(
        solver.solve(&problem, &[0.0], &options()),
        Err(NlpError::DimensionMismatch { expected: 2, found: 1 })
    ));
    assert!(matches!(
        solver.solve(&problem, &[f64::NAN, 0.0], &options()),
        Err(NlpError::NonFiniteStart { index: 0 })
    ));
    let inverted = Quadratic {
        lower: [1.0, 0.0],
        upper: [0.0, 1.0],
        ..Quadratic::unconstrained([0.0, 0.0])
    };
    assert!(matches!(
        solver.solve(&inverted, &[0.0, 0.0], &options()),
        Err(NlpError::InvalidBounds { index: 0, .. })
    ));
}

#[test]
fn default_jacobian_matches_linear_rows() {
    let problem = Quadratic {
        sum_equals: Some(1.0),
        sum_at_least: Some(0.0),
        ..Quadratic::unconstrained([0.0, 0.0])
    };
    let jacobian: SparseJacobian = problem.jacobian(&[0.3, 0.7]);
    let mut dense = [[0.0; 2]; 2];
    for entry in jacobian.entries() {
        dense[entry.row][entry.col] += entry.value;
    }
    assert!((dense[0][0] - 1.0).abs() < 1e-6 && (dense[0][1] - 1.0).abs() < 1e-6);
    assert!((dense[1][0] + 1.0).abs() < 1e-6 && (dense[1][1] + 1.0).abs() < 1e-6);

    let gradient = problem.objective_gradient(&[0.3, 0.7]);
    assert!((gradient[0] - 0.6).abs() < 1e-6 && (gradient[1] - 1.4).abs() < 1e-6);
}
