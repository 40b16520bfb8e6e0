//! Error types for system assembly and solving.

use tc_components::ComponentError;
use tc_graph::GraphError;
use thiserror::Error;

/// Errors that can occur while assembling or solving a system.
#[derive(Error, Debug)]
pub enum SolverError {
    /// Invalid setup: missing model, arity mismatch, unbound boundary value,
    /// missing initial guess, explicit-only cycle. Detected before any solve
    /// attempt; always fatal.
    #[error("Configuration error: {what}")]
    Configuration { what: String },

    /// A component's evaluation function failed at a normal or perturbed
    /// point. The current residual/Jacobian assembly is abandoned; the
    /// Newton driver retreats instead of propagating a corrupted state.
    #[error("Component evaluation error: {0}")]
    Evaluation(#[from] ComponentError),

    /// The assembled Jacobian is numerically singular or ill-conditioned.
    #[error("Singular matrix: {what}")]
    SingularMatrix { what: String },

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Numeric error: {what}")]
    Numeric { what: String },
}

pub type SolverResult<T> = Result<T, SolverError>;
