//! Globalization strategies for the Newton iteration.

use tracing::trace;

use crate::error::{SolverError, SolverResult};

/// Result of one globalization pass along a Newton direction.
#[derive(Debug, Clone, Copy)]
pub struct LineSearchOutcome {
    /// Accepted step fraction in (0, 1].
    pub alpha: f64,
    /// Residual norm at the accepted point.
    pub norm: f64,
    /// Whether the sufficient-decrease condition held.
    pub sufficient: bool,
    /// Whether the accepted point at least improved on the current norm.
    pub improved: bool,
    /// Number of candidate points evaluated.
    pub trials: usize,
}

/// A strategy for choosing the step fraction along a Newton direction.
///
/// `trial` evaluates the residual norm at a candidate fraction. A component
/// evaluation failure at a candidate is reported as `Err`; strategies treat
/// it as a rejected candidate rather than aborting the solve.
pub trait Globalization {
    fn search(
        &self,
        current_norm: f64,
        trial: &mut dyn FnMut(f64) -> SolverResult<f64>,
    ) -> SolverResult<LineSearchOutcome>;
}

/// Take the full Newton step unconditionally.
///
/// Appropriate for linear or mildly nonlinear networks where damping only
/// costs extra evaluations.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullStep;

impl Globalization for FullStep {
    fn search(
        &self,
        current_norm: f64,
        trial: &mut dyn FnMut(f64) -> SolverResult<f64>,
    ) -> SolverResult<LineSearchOutcome> {
        let norm = trial(1.0)?;
        Ok(LineSearchOutcome {
            alpha: 1.0,
            norm,
            sufficient: norm < current_norm,
            improved: norm < current_norm,
            trials: 1,
        })
    }
}

/// Backtracking line search with an Armijo sufficient-decrease test.
///
/// Starts at the full step and halves until
/// `norm <= (1 - c * alpha) * current_norm` holds or the backtrack budget is
/// spent. If no candidate satisfies the test, the best merely-improving
/// candidate is returned with `sufficient: false`; with no improving
/// candidate at all the search reports a stall.
#[derive(Debug, Clone, Copy)]
pub struct BacktrackingLineSearch {
    /// Armijo slope parameter.
    pub c: f64,
    /// Multiplicative backoff applied after each rejected candidate.
    pub shrink: f64,
    /// Maximum number of backtracks after the full step.
    pub max_backtracks: usize,
}

impl Default for BacktrackingLineSearch {
    fn default() -> Self {
        Self {
            c: 1e-4,
            shrink: 0.5,
            max_backtracks: 10,
        }
    }
}

impl BacktrackingLineSearch {
    pub fn new(c: f64, shrink: f64, max_backtracks: usize) -> SolverResult<Self> {
        if !(0.0..1.0).contains(&c) {
            return Err(SolverError::Configuration {
                what: format!("Armijo parameter must be in [0, 1), got {c}"),
            });
        }
        if !(shrink > 0.0 && shrink < 1.0) {
            return Err(SolverError::Configuration {
                what: format!("backtrack factor must be in (0, 1), got {shrink}"),
            });
        }
        Ok(Self {
            c,
            shrink,
            max_backtracks,
        })
    }
}

impl Globalization for BacktrackingLineSearch {
    fn search(
        &self,
        current_norm: f64,
        trial: &mut dyn FnMut(f64) -> SolverResult<f64>,
    ) -> SolverResult<LineSearchOutcome> {
        let mut alpha = 1.0;
        let mut best: Option<(f64, f64)> = None;
        let mut trials = 0;

        for _ in 0..=self.max_backtracks {
            trials += 1;
            match trial(alpha) {
                Ok(norm) if norm.is_finite() => {
                    trace!(alpha, norm, current_norm, "line search candidate");
                    if norm <= (1.0 - self.c * alpha) * current_norm {
                        return Ok(LineSearchOutcome {
                            alpha,
                            norm,
                            sufficient: true,
                            improved: true,
                            trials,
                        });
                    }
                    if norm < current_norm && best.map_or(true, |(_, b)| norm < b) {
                        best = Some((alpha, norm));
                    }
                }
                // A failed or non-finite candidate just shortens the step.
                Ok(_) | Err(SolverError::Evaluation(_)) => {
                    trace!(alpha, "line search candidate rejected");
                }
                Err(other) => return Err(other),
            }
            alpha *= self.shrink;
        }

        match best {
            Some((alpha, norm)) => Ok(LineSearchOutcome {
                alpha,
                norm,
                sufficient: false,
                improved: true,
                trials,
            }),
            None => Ok(LineSearchOutcome {
                alpha: 0.0,
                norm: current_norm,
                sufficient: false,
                improved: false,
                trials,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_step_accepts_anything() {
        let out = FullStep
            .search(10.0, &mut |_alpha| Ok(42.0))
            .unwrap();
        assert_eq!(out.alpha, 1.0);
        assert_eq!(out.norm, 42.0);
        assert!(!out.improved);
    }

    #[test]
    fn sufficient_decrease_taken_at_full_step() {
        let ls = BacktrackingLineSearch::default();
        let out = ls.search(10.0, &mut |alpha| Ok(10.0 * (1.0 - alpha))).unwrap();
        assert_eq!(out.alpha, 1.0);
        assert!(out.sufficient);
        assert_eq!(out.trials, 1);
    }

    #[test]
    fn backtracks_past_overshoot() {
        // Full step doubles the norm, half step decreases it.
        let ls = BacktrackingLineSearch::default();
        let out = ls
            .search(10.0, &mut |alpha| {
                Ok(if alpha > 0.75 { 20.0 } else { 10.0 * (1.0 - alpha) })
            })
            .unwrap();
        assert_eq!(out.alpha, 0.5);
        assert!(out.sufficient);
        assert_eq!(out.trials, 2);
    }

    #[test]
    fn merely_improving_step_is_flagged() {
        // Every candidate shaves a fixed sliver off the norm, never enough
        // for the Armijo test at large alpha but below it at small alpha the
        // decrease is too flat.
        let ls = BacktrackingLineSearch {
            c: 0.9,
            ..Default::default()
        };
        let out = ls.search(10.0, &mut |alpha| Ok(10.0 - 0.1 * alpha)).unwrap();
        assert!(out.improved);
        assert!(!out.sufficient);
        assert_eq!(out.alpha, 1.0);
    }

    #[test]
    fn stall_when_nothing_improves() {
        let ls = BacktrackingLineSearch::default();
        let out = ls.search(10.0, &mut |_alpha| Ok(11.0)).unwrap();
        assert!(!out.improved);
        assert_eq!(out.alpha, 0.0);
        assert_eq!(out.norm, 10.0);
        assert_eq!(out.trials, 11);
    }

    #[test]
    fn evaluation_failures_shorten_the_step() {
        use tc_components::ComponentError;
        let ls = BacktrackingLineSearch::default();
        let out = ls
            .search(10.0, &mut |alpha| {
                if alpha > 0.4 {
                    Err(SolverError::Evaluation(ComponentError::Evaluation {
                        what: "blew up",
                    }))
                } else {
                    Ok(10.0 * (1.0 - alpha))
                }
            })
            .unwrap();
        assert_eq!(out.alpha, 0.25);
        assert!(out.sufficient);
    }

    #[test]
    fn configuration_errors_propagate() {
        let ls = BacktrackingLineSearch::default();
        let err = ls
            .search(10.0, &mut |_alpha| {
                Err(SolverError::Configuration {
                    what: "broken".to_string(),
                })
            })
            .unwrap_err();
        assert!(matches!(err, SolverError::Configuration { .. }));
    }

    #[test]
    fn invalid_parameters_rejected() {
        assert!(BacktrackingLineSearch::new(1.0, 0.5, 10).is_err());
        assert!(BacktrackingLineSearch::new(1e-4, 1.0, 10).is_err());
        assert!(BacktrackingLineSearch::new(1e-4, 0.0, 10).is_err());
    }
}
