//! High-level solve entry point: problem in, solved network out.

use nalgebra::{DMatrix, DVector};
use tc_core::VarId;
use tracing::{debug, info};

use crate::assembler::SystemAssembler;
use crate::error::SolverResult;
use crate::jacobian::JacobianBuilder;
use crate::linear::DirectSolver;
use crate::linesearch::{BacktrackingLineSearch, Globalization};
use crate::newton::{IterationRecord, NewtonConfig, NewtonDriver, NonlinearSystem, SolveOutcome};
use crate::problem::SystemProblem;

/// Knobs for a full solve, all defaulted to sensible values.
#[derive(Debug, Clone, Copy, Default)]
pub struct SolveConfig {
    pub newton: NewtonConfig,
    pub jacobian: JacobianBuilder,
    pub linear: DirectSolver,
}

/// Converged (or last-iterate) values for every variable in the graph.
#[derive(Debug, Clone)]
pub struct Solution {
    values: Vec<f64>,
    residual_norm: f64,
    iterations: usize,
}

impl Solution {
    /// Value of any variable, input, output, or state.
    pub fn value(&self, var: VarId) -> Option<f64> {
        self.values.get(var.slot()).copied()
    }

    pub fn residual_norm(&self) -> f64 {
        self.residual_norm
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }
}

/// Outcome of [`solve`]: terminal state, variable values, and the
/// per-iteration history.
#[derive(Debug, Clone)]
pub struct SolveReport {
    pub outcome: SolveOutcome,
    pub solution: Solution,
    records: Vec<IterationRecord>,
}

impl SolveReport {
    pub fn is_converged(&self) -> bool {
        self.outcome == SolveOutcome::Converged
    }

    /// Iteration history, oldest first.
    pub fn records(&self) -> impl Iterator<Item = &IterationRecord> {
        self.records.iter()
    }
}

/// The assembled network viewed as a plain nonlinear system.
struct AssembledSystem<'a> {
    asm: &'a SystemAssembler<'a>,
    jacobian: JacobianBuilder,
}

impl NonlinearSystem for AssembledSystem<'_> {
    fn n(&self) -> usize {
        self.asm.n_states()
    }

    fn residual(&self, x: &DVector<f64>) -> SolverResult<DVector<f64>> {
        self.asm.residuals(x)
    }

    fn jacobian(&self, x: &DVector<f64>) -> SolverResult<DMatrix<f64>> {
        let values = self.asm.propagate(x)?;
        self.jacobian.build(self.asm, &values)
    }
}

/// Solve a problem with the default backtracking line search.
pub fn solve(problem: &SystemProblem<'_>, config: &SolveConfig) -> SolverResult<SolveReport> {
    solve_with_strategy(problem, config, &BacktrackingLineSearch::default())
}

/// Solve a problem with a caller-chosen globalization strategy.
pub fn solve_with_strategy(
    problem: &SystemProblem<'_>,
    config: &SolveConfig,
    strategy: &dyn Globalization,
) -> SolverResult<SolveReport> {
    let asm = SystemAssembler::new(problem)?;
    let x0 = asm.pack_initial_guess()?;
    info!(
        states = asm.n_states(),
        components = problem.graph.components().len(),
        "starting solve"
    );

    let system = AssembledSystem {
        asm: &asm,
        jacobian: config.jacobian,
    };
    let driver = NewtonDriver::new(config.newton, config.linear);
    let report = driver.solve(&system, strategy, x0)?;

    let values = asm.propagate(&report.x)?;
    debug!(
        outcome = ?report.outcome,
        iterations = report.iterations,
        residual_norm = report.residual_norm,
        "solve finished"
    );

    Ok(SolveReport {
        outcome: report.outcome,
        solution: Solution {
            values,
            residual_norm: report.residual_norm,
            iterations: report.iterations,
        },
        records: report.records,
    })
}
