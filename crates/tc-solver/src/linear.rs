//! Direct linear solve of the Newton correction system.

use nalgebra::{DMatrix, DVector};

use crate::error::{SolverError, SolverResult};

/// LU-based direct solver for `J * dx = -r`.
#[derive(Debug, Clone, Copy)]
pub struct DirectSolver {
    /// Pivot magnitudes below this (relative to the largest pivot) are
    /// treated as numerically singular.
    pub pivot_tol: f64,
}

impl Default for DirectSolver {
    fn default() -> Self {
        Self { pivot_tol: 1e-12 }
    }
}

impl DirectSolver {
    /// Solve for the Newton step. Returns the step and a crude condition
    /// estimate (smallest over largest pivot magnitude).
    pub fn newton_step(
        &self,
        jacobian: &DMatrix<f64>,
        residual: &DVector<f64>,
    ) -> SolverResult<(DVector<f64>, f64)> {
        let n = residual.len();
        if jacobian.nrows() != n || jacobian.ncols() != n {
            return Err(SolverError::Configuration {
                what: format!(
                    "jacobian is {}x{} but the residual has length {n}",
                    jacobian.nrows(),
                    jacobian.ncols()
                ),
            });
        }
        if n == 0 {
            return Ok((DVector::zeros(0), 1.0));
        }

        let lu = jacobian.clone().lu();
        let condition = pivot_ratio(lu.u());
        if condition < self.pivot_tol {
            return Err(SolverError::SingularMatrix {
                what: format!("pivot ratio {condition:.3e} below tolerance {:.3e}", self.pivot_tol),
            });
        }

        let step = lu
            .solve(&(-residual))
            .ok_or_else(|| SolverError::SingularMatrix {
                what: "LU back-substitution failed".to_string(),
            })?;
        if step.iter().any(|v| !v.is_finite()) {
            return Err(SolverError::SingularMatrix {
                what: "non-finite Newton step".to_string(),
            });
        }

        Ok((step, condition))
    }
}

/// Smallest over largest |U_ii| of the LU factorization, in [0, 1].
fn pivot_ratio(u: DMatrix<f64>) -> f64 {
    let n = u.nrows().min(u.ncols());
    let mut min = f64::INFINITY;
    let mut max: f64 = 0.0;
    for i in 0..n {
        let p = u[(i, i)].abs();
        min = min.min(p);
        max = max.max(p);
    }
    if max == 0.0 || !min.is_finite() {
        return 0.0;
    }
    min / max
}
