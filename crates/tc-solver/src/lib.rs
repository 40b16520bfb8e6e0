//! Newton-based equation assembly and solve engine for thermocircuit.
//!
//! This crate turns a validated connection graph plus component models into
//! a global nonlinear system: explicit components are evaluated in dependency
//! order, implicit components contribute residual rows, and a damped Newton
//! iteration (finite-difference Jacobian, direct LU solve, backtracking line
//! search) drives the residual to zero.

pub mod assembler;
pub mod error;
pub mod jacobian;
pub mod linear;
pub mod linesearch;
pub mod newton;
pub mod problem;
pub mod solve;

pub use assembler::SystemAssembler;
pub use error::{SolverError, SolverResult};
pub use jacobian::{Differencing, JacobianBuilder};
pub use linear::DirectSolver;
pub use linesearch::{BacktrackingLineSearch, FullStep, Globalization, LineSearchOutcome};
pub use newton::{
    IterationRecord, NewtonConfig, NewtonDriver, NewtonReport, NonlinearSystem, SolveOutcome,
};
pub use problem::SystemProblem;
pub use solve::{SolveConfig, SolveReport, Solution, solve, solve_with_strategy};
