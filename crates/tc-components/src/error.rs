//! Error types for component evaluation.

use tc_core::error::TcError;
use thiserror::Error;

/// Errors that can occur while constructing or evaluating a component model.
#[derive(Error, Debug, Clone)]
pub enum ComponentError {
    #[error("Non-physical value: {what}")]
    NonPhysical { what: &'static str },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Arity mismatch: expected {expected} {what}, got {got}")]
    ArityMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Evaluation failed: {what}")]
    Evaluation { what: &'static str },
}

pub type ComponentResult<T> = Result<T, ComponentError>;

impl From<TcError> for ComponentError {
    fn from(e: TcError) -> Self {
        match e {
            TcError::NonFinite { what, .. } => ComponentError::Evaluation { what },
            TcError::InvalidArg { what } => ComponentError::InvalidArg { what },
            TcError::IndexOob { what, .. } => ComponentError::InvalidArg { what },
            TcError::Invariant { what } => ComponentError::InvalidArg { what },
        }
    }
}
