//! Shared helpers for component models.

use crate::error::{ComponentError, ComponentResult};

/// Reject non-finite intermediate values during evaluation.
pub fn check_finite(v: f64, what: &'static str) -> ComponentResult<f64> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(ComponentError::Evaluation { what })
    }
}

/// Check a slice length against a model's declared arity.
pub fn check_arity(got: usize, expected: usize, what: &'static str) -> ComponentResult<()> {
    if got == expected {
        Ok(())
    } else {
        Err(ComponentError::ArityMismatch {
            what,
            expected,
            got,
        })
    }
}
