//! Sequential quadratic programming for a smooth objective under equality constraints.
//!
//! Every iteration solves the KKT system of the local quadratic model
//!
//! ```text
//! | B  Aᵀ | | d |   | -∇f |
//! | A  0  | | λ | = | -c  |
//! ```
//!
//! where `B` approximates the Hessian of the Lagrangian (damped BFGS), `A` is the constraint
//! Jacobian and `c` the constraint values. The step `d` is then shortened by backtracking until
//! the L1 penalty merit function `f + Σ μᵢ|cᵢ|` decreases.
//!
//! If the line search finds no acceptable step, the iteration instead takes a
//! Levenberg-Marquardt step that only reduces `½‖c‖²`. When even that is not possible, the
//! constraints cannot be satisfied and the solver stops at the point closest to satisfying them.
//!
//! The solver never fails: if it cannot converge, the best iterate found is returned together
//! with the exit status.

extern crate nalgebra as na;

use na::{DMatrix, DVector, SMatrix, SVector};
use tracing::{debug, trace};

/// Step used for forward finite differences, square root of the machine epsilon.
pub const FD_EPSILON: f64 = 1.4901161193847656e-8;

/// Sufficient decrease coefficient of the merit function.
const ARMIJO: f64 = 0.1;

/// The line search halves the step at most this many times.
const MAX_BACKTRACKS: usize = 40;

/// Singular values of the KKT matrix below this fraction of the largest are treated as zero.
const SINGULAR_EPSILON: f64 = 1e-12;

/// Longest step (Euclidean norm) taken in one iteration.
const MAX_STEP: f64 = 1.0;

/// While constraints are violated, a step the line search shortened below this fraction
/// counts as failed.
const MIN_STEP_FRACTION: f64 = 1e-3;

/// Sufficient decrease coefficient of the restoration step.
const RESTORATION_ARMIJO: f64 = 1e-4;

/// Levenberg-Marquardt damping: initial value and lower bound.
const INITIAL_DAMPING: f64 = 1e-3;
const MIN_DAMPING: f64 = 1e-12;

/// Objective and equality constraints of a problem with `N` variables and `M` constraints.
///
/// Gradients default to forward finite differences. Problems that know their derivatives
/// should override `objective_gradient` and `constraint_jacobian`.
pub trait ConstrainedProblem<const N: usize, const M: usize> {
    /// Value to minimize.
    fn objective(&self, x: &SVector<f64, N>) -> f64;

    /// Values that must be driven to zero.
    fn constraints(&self, x: &SVector<f64, N>) -> SVector<f64, M>;

    fn objective_gradient(&self, x: &SVector<f64, N>) -> SVector<f64, N> {
        let f0 = self.objective(x);
        SVector::<f64, N>::from_fn(|i, _| {
            let mut shifted = *x;
            shifted[i] += FD_EPSILON;
            (self.objective(&shifted) - f0) / FD_EPSILON
        })
    }

    /// Row `i` is the gradient of the constraint `i`.
    fn constraint_jacobian(&self, x: &SVector<f64, N>) -> SMatrix<f64, M, N> {
        let c0 = self.constraints(x);
        let mut jacobian = SMatrix::<f64, M, N>::zeros();
        for j in 0..N {
            let mut shifted = *x;
            shifted[j] += FD_EPSILON;
            let column = (self.constraints(&shifted) - c0) / FD_EPSILON;
            jacobian.set_column(j, &column);
        }
        jacobian
    }
}

/// Configuration for the SQP solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig {
    /// Convergence tolerance, both for the constraint violation (sum of absolute
    /// constraint values) and for the change of the objective between iterations.
    pub tolerance: f64,
    /// Maximum number of iterations.
    pub max_iterations: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-6,
            max_iterations: 100,
        }
    }
}

/// Why the solver stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Constraints are satisfied and the objective no longer changes.
    Converged,
    /// Iteration limit reached before convergence.
    IterationLimit,
    /// No step along the search direction decreases the merit function.
    LineSearchFailed,
    /// Constraints cannot be satisfied. The point returned minimizes their violation.
    Infeasible,
}

/// Result of the solve.
#[derive(Debug, Clone, Copy)]
pub struct SolverReport<const N: usize> {
    /// Best point found.
    pub x: [f64; N],
    /// Objective at `x`.
    pub objective: f64,
    /// Sum of absolute constraint values at `x`.
    pub constraint_violation: f64,
    /// Number of iterations used.
    pub iterations: usize,
    pub status: ExitStatus,
}

impl<const N: usize> SolverReport<N> {
    pub fn converged(&self) -> bool {
        self.status == ExitStatus::Converged
    }
}

/// Values of the problem at one point, kept as dynamic vectors for the linear algebra.
struct Evaluation {
    f: f64,
    c: DVector<f64>,
}

impl Evaluation {
    fn at<P, const N: usize, const M: usize>(problem: &P, x: &DVector<f64>) -> Self
    where
        P: ConstrainedProblem<N, M> + ?Sized,
    {
        let sx = SVector::<f64, N>::from_column_slice(x.as_slice());
        Evaluation {
            f: problem.objective(&sx),
            c: DVector::from_column_slice(problem.constraints(&sx).as_slice()),
        }
    }

    fn violation(&self) -> f64 {
        self.c.lp_norm(1)
    }

    fn merit(&self, mu: &DVector<f64>) -> f64 {
        self.f + mu.dot(&self.c.abs())
    }
}

fn derivatives<P, const N: usize, const M: usize>(problem: &P, x: &DVector<f64>) -> (DVector<f64>, DMatrix<f64>)
where
    P: ConstrainedProblem<N, M> + ?Sized,
{
    let sx = SVector::<f64, N>::from_column_slice(x.as_slice());
    let g = problem.objective_gradient(&sx);
    let a = problem.constraint_jacobian(&sx);
    (
        DVector::from_column_slice(g.as_slice()),
        DMatrix::from_column_slice(M, N, a.as_slice()),
    )
}

/// Minimize the objective of the problem subject to its equality constraints,
/// starting from `x0`.
pub fn minimize<P, const N: usize, const M: usize>(problem: &P, x0: &[f64; N], config: &SolverConfig) -> SolverReport<N>
where
    P: ConstrainedProblem<N, M> + ?Sized,
{
    let tolerance = config.tolerance;
    let mut x = DVector::from_column_slice(x0);
    let mut current = Evaluation::at::<P, N, M>(problem, &x);
    let (mut g, mut a) = derivatives::<P, N, M>(problem, &x);
    let mut b = DMatrix::<f64>::identity(N, N);
    let mut mu = DVector::<f64>::zeros(M);

    let mut status = ExitStatus::IterationLimit;
    let mut iterations = 0;
    let mut damping = INITIAL_DAMPING;

    while iterations < config.max_iterations {
        iterations += 1;
        let violation = current.violation();

        let mut accepted = None;
        if let Some((mut d, lambda)) = solve_kkt(&b, &a, &g, &current.c) {
            if d.norm() <= tolerance && violation <= tolerance {
                status = ExitStatus::Converged;
                break;
            }

            for i in 0..M {
                let l = lambda[i].abs();
                mu[i] = l.max(0.5 * (mu[i] + l));
            }

            let scale = limit_step(&mut d);
            let merit0 = current.merit(&mu);
            let slope = (g.dot(&d) - scale * mu.dot(&current.c.abs())).min(0.0);
            let rounding = 1e-14 * merit0.abs().max(1.0);

            let mut alpha = 1.0;
            let mut found = None;
            for _ in 0..MAX_BACKTRACKS {
                let x_trial = &x + &d * alpha;
                let trial = Evaluation::at::<P, N, M>(problem, &x_trial);
                let merit = trial.merit(&mu);
                if merit.is_finite() && merit <= merit0 + ARMIJO * alpha * slope + rounding {
                    if alpha >= MIN_STEP_FRACTION || violation <= tolerance {
                        found = Some((x_trial, trial));
                    }
                    break;
                }
                alpha *= 0.5;
            }

            if found.is_none() && violation <= tolerance && d.norm() <= tolerance.sqrt() {
                status = ExitStatus::Converged;
                break;
            }
            trace!(iterations, alpha, "sqp line search");
            accepted = found.map(|(x_new, next)| (x_new, next, lambda));
        }

        let Some((x_new, next, lambda)) = accepted else {
            match restoration_step::<P, N, M>(problem, &x, &current, &a, &mut damping, tolerance) {
                Some((x_new, next)) => {
                    x = x_new;
                    current = next;
                    (g, a) = derivatives::<P, N, M>(problem, &x);
                    b.fill_with_identity();
                    trace!(iterations, damping, violation = current.violation(), "restoration step");
                    continue;
                }
                None => {
                    status = if violation <= tolerance {
                        ExitStatus::LineSearchFailed
                    } else {
                        ExitStatus::Infeasible
                    };
                    break;
                }
            }
        };

        let (g_new, a_new) = derivatives::<P, N, M>(problem, &x_new);
        let s = &x_new - &x;
        let y = (&g_new + a_new.transpose() * &lambda) - (&g + a.transpose() * &lambda);
        damped_bfgs_update(&mut b, &s, &y);

        let f_change = (next.f - current.f).abs();
        x = x_new;
        current = next;
        g = g_new;
        a = a_new;

        let violation = current.violation();
        trace!(iterations, objective = current.f, violation, "sqp step");

        if violation <= tolerance && (f_change <= tolerance || s.norm() <= tolerance) {
            status = ExitStatus::Converged;
            break;
        }
    }

    let report = SolverReport {
        x: std::array::from_fn(|i| x[i]),
        objective: current.f,
        constraint_violation: current.violation(),
        iterations,
        status,
    };
    debug!(
        status = ?report.status,
        iterations = report.iterations,
        objective = report.objective,
        violation = report.constraint_violation,
        "sqp finished"
    );
    report
}

/// Solve the KKT system of the quadratic subproblem for the step and the multipliers.
/// Falls back to the least squares solution when the system is singular, as happens
/// when constraint gradients become linearly dependent.
fn solve_kkt(b: &DMatrix<f64>, a: &DMatrix<f64>, g: &DVector<f64>, c: &DVector<f64>)
             -> Option<(DVector<f64>, DVector<f64>)> {
    let n = g.len();
    let m = c.len();

    let mut kkt = DMatrix::<f64>::zeros(n + m, n + m);
    kkt.view_mut((0, 0), (n, n)).copy_from(b);
    kkt.view_mut((n, 0), (m, n)).copy_from(a);
    kkt.view_mut((0, n), (n, m)).copy_from(&a.transpose());

    let mut rhs = DVector::<f64>::zeros(n + m);
    rhs.rows_mut(0, n).copy_from(&(-g));
    rhs.rows_mut(n, m).copy_from(&(-c));

    let solution = match kkt.clone().lu().solve(&rhs) {
        Some(solution) if solution.iter().all(|v| v.is_finite()) => solution,
        _ => {
            let svd = kkt.svd(true, true);
            let eps = SINGULAR_EPSILON * svd.singular_values.max();
            svd.solve(&rhs, eps).ok()?
        }
    };

    if !solution.iter().all(|v| v.is_finite()) {
        return None;
    }
    Some((solution.rows(0, n).into_owned(), solution.rows(n, m).into_owned()))
}

/// Shortens `d` to at most `MAX_STEP`, returns the factor applied.
fn limit_step(d: &mut DVector<f64>) -> f64 {
    let length = d.norm();
    if length > MAX_STEP {
        let scale = MAX_STEP / length;
        *d *= scale;
        scale
    } else {
        1.0
    }
}

/// Levenberg-Marquardt step on `½‖c‖²` alone, ignoring the objective. The damping is raised
/// until the step decreases the violation and lowered again after success.
/// `None` at a stationary point of the violation, or if no step decreases it.
fn restoration_step<P, const N: usize, const M: usize>(
    problem: &P,
    x: &DVector<f64>,
    current: &Evaluation,
    a: &DMatrix<f64>,
    damping: &mut f64,
    tolerance: f64,
) -> Option<(DVector<f64>, Evaluation)>
where
    P: ConstrainedProblem<N, M> + ?Sized,
{
    let gradient = a.transpose() * &current.c;
    if gradient.norm() <= tolerance * current.c.norm().max(1.0) {
        return None;
    }
    let phi = 0.5 * current.c.norm_squared();
    let normal = a.transpose() * a;

    for _ in 0..MAX_BACKTRACKS {
        let damped = &normal + DMatrix::<f64>::identity(N, N) * *damping;
        if let Some(cholesky) = damped.cholesky() {
            let mut d = cholesky.solve(&(-&gradient));
            limit_step(&mut d);
            let x_trial = x + &d;
            let trial = Evaluation::at::<P, N, M>(problem, &x_trial);
            let phi_trial = 0.5 * trial.c.norm_squared();
            if phi_trial.is_finite() && phi_trial <= phi + RESTORATION_ARMIJO * gradient.dot(&d) {
                *damping = (*damping / 3.0).max(MIN_DAMPING);
                return Some((x_trial, trial));
            }
        }
        *damping *= 4.0;
    }
    None
}

/// Powell-damped BFGS update, keeps `b` positive definite.
fn damped_bfgs_update(b: &mut DMatrix<f64>, s: &DVector<f64>, y: &DVector<f64>) {
    let bs = &*b * s;
    let sbs = s.dot(&bs);
    if !(sbs > 0.0 && sbs.is_finite()) {
        return;
    }
    let sy = s.dot(y);
    let theta = if sy >= 0.2 * sbs { 1.0 } else { 0.8 * sbs / (sbs - sy) };
    let r = y * theta + &bs * (1.0 - theta);
    let sr = s.dot(&r);
    if !(sr > 0.0 && sr.is_finite()) {
        return;
    }
    let updated = &*b + &r * r.transpose() / sr - &bs * bs.transpose() / sbs;
    if updated.iter().all(|v| v.is_finite()) {
        *b = updated;
    } else {
        b.fill_with_identity();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// Closest point of the unit circle to (2, 1), derivatives by finite differences.
    struct ClosestOnCircle;

    impl ConstrainedProblem<2, 1> for ClosestOnCircle {
        fn objective(&self, x: &SVector<f64, 2>) -> f64 {
            (x[0] - 2.0).powi(2) + (x[1] - 1.0).powi(2)
        }

        fn constraints(&self, x: &SVector<f64, 2>) -> SVector<f64, 1> {
            SVector::<f64, 1>::new(x[0] * x[0] + x[1] * x[1] - 1.0)
        }
    }

    /// Minimize x + y on the circle of radius sqrt(2), analytic derivatives.
    struct LinearOnCircle;

    impl ConstrainedProblem<2, 1> for LinearOnCircle {
        fn objective(&self, x: &SVector<f64, 2>) -> f64 {
            x[0] + x[1]
        }

        fn constraints(&self, x: &SVector<f64, 2>) -> SVector<f64, 1> {
            SVector::<f64, 1>::new(x[0] * x[0] + x[1] * x[1] - 2.0)
        }

        fn objective_gradient(&self, _x: &SVector<f64, 2>) -> SVector<f64, 2> {
            SVector::<f64, 2>::new(1.0, 1.0)
        }

        fn constraint_jacobian(&self, x: &SVector<f64, 2>) -> SMatrix<f64, 1, 2> {
            SMatrix::<f64, 1, 2>::new(2.0 * x[0], 2.0 * x[1])
        }
    }

    /// x² + 1 = 0 has no real solution.
    struct Infeasible;

    impl ConstrainedProblem<1, 1> for Infeasible {
        fn objective(&self, x: &SVector<f64, 1>) -> f64 {
            x[0] * x[0]
        }

        fn constraints(&self, x: &SVector<f64, 1>) -> SVector<f64, 1> {
            SVector::<f64, 1>::new(x[0] * x[0] + 1.0)
        }
    }

    #[test]
    fn test_closest_point_on_circle() {
        let report = minimize::<_, 2, 1>(&ClosestOnCircle, &[0.0, 1.0], &SolverConfig::default());
        assert!(report.converged(), "status {:?}", report.status);
        let norm = 5.0_f64.sqrt();
        assert_abs_diff_eq!(report.x[0], 2.0 / norm, epsilon = 1e-4);
        assert_abs_diff_eq!(report.x[1], 1.0 / norm, epsilon = 1e-4);
        assert!(report.constraint_violation <= 1e-6);
    }

    #[test]
    fn test_linear_objective_on_circle() {
        let report = minimize::<_, 2, 1>(&LinearOnCircle, &[-0.5, -1.5], &SolverConfig::default());
        assert!(report.converged(), "status {:?}", report.status);
        assert_abs_diff_eq!(report.x[0], -1.0, epsilon = 1e-4);
        assert_abs_diff_eq!(report.x[1], -1.0, epsilon = 1e-4);
        assert_abs_diff_eq!(report.objective, -2.0, epsilon = 1e-4);
    }

    #[test]
    fn test_starting_at_optimum() {
        let report = minimize::<_, 2, 1>(&LinearOnCircle, &[-1.0, -1.0], &SolverConfig::default());
        assert!(report.converged());
        assert_eq!(report.x, [-1.0, -1.0]);
    }

    #[test]
    fn test_infeasible_terminates() {
        let config = SolverConfig { tolerance: 1e-6, max_iterations: 25 };
        let report = minimize::<_, 1, 1>(&Infeasible, &[1.0], &config);
        assert_eq!(report.status, ExitStatus::Infeasible);
        assert!(report.iterations <= 25);
        // x = 0 is where x² + 1 comes closest to zero
        assert_abs_diff_eq!(report.x[0], 0.0, epsilon = 1e-3);
        assert_abs_diff_eq!(report.constraint_violation, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_steps_are_limited() {
        // The first step towards the distant circle would be far longer without the limit
        let config = SolverConfig { tolerance: 1e-6, max_iterations: 1 };
        let report = minimize::<_, 2, 1>(&ClosestOnCircle, &[0.0, 30.0], &config);
        let moved = (report.x[0].powi(2) + (report.x[1] - 30.0).powi(2)).sqrt();
        assert!(moved <= MAX_STEP + 1e-12, "moved by {}", moved);
    }

    #[test]
    fn test_iteration_cap_respected() {
        let config = SolverConfig { tolerance: 1e-6, max_iterations: 1 };
        let report = minimize::<_, 2, 1>(&ClosestOnCircle, &[0.0, 3.0], &config);
        assert_eq!(report.iterations, 1);
        assert_eq!(report.status, ExitStatus::IterationLimit);
    }

    #[test]
    fn test_finite_difference_gradients() {
        let x = SVector::<f64, 2>::new(0.3, -0.4);
        let g = ClosestOnCircle.objective_gradient(&x);
        assert_abs_diff_eq!(g[0], 2.0 * (0.3 - 2.0), epsilon = 1e-6);
        assert_abs_diff_eq!(g[1], 2.0 * (-0.4 - 1.0), epsilon = 1e-6);
        let a = ClosestOnCircle.constraint_jacobian(&x);
        assert_abs_diff_eq!(a[(0, 0)], 0.6, epsilon = 1e-6);
        assert_abs_diff_eq!(a[(0, 1)], -0.8, epsilon = 1e-6);
    }
}
