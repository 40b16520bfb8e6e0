//! Damped Newton iteration over an abstract nonlinear system.

use nalgebra::{DMatrix, DVector};
use tc_core::Tolerances;
use tracing::{debug, warn};

use crate::error::{SolverError, SolverResult};
use crate::linear::DirectSolver;
use crate::linesearch::Globalization;

/// The residual/Jacobian interface the driver iterates on.
///
/// Implementations must be deterministic: the same `x` yields the same
/// residual every time.
pub trait NonlinearSystem {
    /// Number of unknowns (and residual entries).
    fn n(&self) -> usize;

    /// Residual at `x`.
    fn residual(&self, x: &DVector<f64>) -> SolverResult<DVector<f64>>;

    /// Jacobian of the residual at `x`.
    fn jacobian(&self, x: &DVector<f64>) -> SolverResult<DMatrix<f64>>;
}

/// Newton iteration limits and convergence tolerances.
#[derive(Debug, Clone, Copy)]
pub struct NewtonConfig {
    pub max_iterations: usize,
    pub tolerances: Tolerances,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            tolerances: Tolerances::default(),
        }
    }
}

/// Terminal state of one Newton solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveOutcome {
    /// Residual norm dropped below tolerance.
    Converged,
    /// Iteration budget spent without convergence.
    MaxIterationsExceeded,
    /// The Jacobian was numerically singular.
    LinearSolveFailed,
    /// No step fraction improved the residual.
    LineSearchStalled,
}

/// Per-iteration diagnostics, recorded after the step is accepted.
#[derive(Debug, Clone, Copy)]
pub struct IterationRecord {
    pub iteration: usize,
    /// Residual norm after this iteration's step.
    pub residual_norm: f64,
    /// Accepted step fraction.
    pub alpha: f64,
    /// Pivot-ratio condition estimate of this iteration's Jacobian.
    pub condition: f64,
}

/// Everything a caller needs to inspect a finished (or abandoned) solve.
///
/// The final iterate is retained for every outcome, converged or not, so a
/// failed solve can still be inspected or restarted.
#[derive(Debug, Clone)]
pub struct NewtonReport {
    pub outcome: SolveOutcome,
    pub x: DVector<f64>,
    pub residual_norm: f64,
    pub iterations: usize,
    pub records: Vec<IterationRecord>,
}

impl NewtonReport {
    pub fn is_converged(&self) -> bool {
        self.outcome == SolveOutcome::Converged
    }
}

/// Smallest step fraction the retreat logic will try before giving up.
const MIN_RETREAT_ALPHA: f64 = 1e-10;

/// Damped Newton driver: finite system in, [`NewtonReport`] out.
///
/// Non-convergence is a reported outcome, not an error. `Err` is reserved
/// for conditions that leave no iterate to report: a configuration problem
/// or an evaluation failure at the starting point.
#[derive(Debug, Clone, Copy, Default)]
pub struct NewtonDriver {
    pub config: NewtonConfig,
    pub linear: DirectSolver,
}

impl NewtonDriver {
    pub fn new(config: NewtonConfig, linear: DirectSolver) -> Self {
        Self { config, linear }
    }

    /// Run the iteration from `x0` with the given globalization strategy.
    pub fn solve<S, G>(
        &self,
        system: &S,
        strategy: &G,
        x0: DVector<f64>,
    ) -> SolverResult<NewtonReport>
    where
        S: NonlinearSystem + ?Sized,
        G: Globalization + ?Sized,
    {
        let mut x = x0;
        let r = system.residual(&x)?;
        let mut r_norm = r.norm();
        let r0_norm = r_norm;
        let mut records = Vec::new();

        // Previous accepted step, kept so a failed Jacobian evaluation can
        // retreat along it instead of aborting.
        let mut last_step: Option<(DVector<f64>, DVector<f64>, f64)> = None;

        for iteration in 0..self.config.max_iterations {
            if self.converged(r_norm, r0_norm) {
                debug!(iteration, r_norm, "converged");
                return Ok(self.report(SolveOutcome::Converged, x, r_norm, records));
            }

            let jacobian = match system.jacobian(&x) {
                Ok(j) => j,
                Err(SolverError::Evaluation(e)) => {
                    let Some((base, direction, alpha)) = last_step.as_mut() else {
                        return Err(SolverError::Evaluation(e));
                    };
                    *alpha *= 0.5;
                    if *alpha < MIN_RETREAT_ALPHA {
                        warn!("retreat exhausted after Jacobian evaluation failure");
                        return Ok(self.report(
                            SolveOutcome::LineSearchStalled,
                            x,
                            r_norm,
                            records,
                        ));
                    }
                    warn!(alpha = *alpha, error = %e, "Jacobian evaluation failed, retreating");
                    x = &*base + &*direction * *alpha;
                    r_norm = system.residual(&x)?.norm();
                    continue;
                }
                Err(other) => return Err(other),
            };

            let (direction, condition) = match self.linear.newton_step(&jacobian, &system.residual(&x)?) {
                Ok(v) => v,
                Err(SolverError::SingularMatrix { what }) => {
                    warn!(iteration, %what, "linear solve failed");
                    return Ok(self.report(SolveOutcome::LinearSolveFailed, x, r_norm, records));
                }
                Err(other) => return Err(other),
            };

            let base = x.clone();
            let mut trial = |alpha: f64| -> SolverResult<f64> {
                let candidate = &base + &direction * alpha;
                Ok(system.residual(&candidate)?.norm())
            };
            let outcome = strategy.search(r_norm, &mut trial)?;

            if !outcome.improved {
                warn!(iteration, trials = outcome.trials, "line search stalled");
                return Ok(self.report(SolveOutcome::LineSearchStalled, x, r_norm, records));
            }
            if !outcome.sufficient {
                warn!(
                    iteration,
                    alpha = outcome.alpha,
                    "accepting step without sufficient decrease"
                );
            }

            x = &base + &direction * outcome.alpha;
            r_norm = outcome.norm;
            last_step = Some((base, direction, outcome.alpha));
            debug!(
                iteration,
                r_norm,
                alpha = outcome.alpha,
                condition,
                "newton step accepted"
            );
            records.push(IterationRecord {
                iteration,
                residual_norm: r_norm,
                alpha: outcome.alpha,
                condition,
            });
        }

        if self.converged(r_norm, r0_norm) {
            return Ok(self.report(SolveOutcome::Converged, x, r_norm, records));
        }
        warn!(
            max_iterations = self.config.max_iterations,
            r_norm, "iteration budget exhausted"
        );
        Ok(self.report(SolveOutcome::MaxIterationsExceeded, x, r_norm, records))
    }

    fn converged(&self, r_norm: f64, r0_norm: f64) -> bool {
        let tol = self.config.tolerances;
        r_norm < tol.abs || r_norm < tol.rel * r0_norm
    }

    fn report(
        &self,
        outcome: SolveOutcome,
        x: DVector<f64>,
        residual_norm: f64,
        records: Vec<IterationRecord>,
    ) -> NewtonReport {
        NewtonReport {
            outcome,
            x,
            residual_norm,
            iterations: records.len(),
            records,
        }
    }
}
