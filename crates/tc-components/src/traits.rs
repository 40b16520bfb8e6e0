//! Core traits for component models.

use crate::error::ComponentResult;

/// An explicit component: `outputs = f(inputs)`.
///
/// Evaluation must be deterministic and free of side effects: given the same
/// inputs, identical outputs, every time. Models never touch anything outside
/// the slices they are handed, which is what makes per-component evaluations
/// safe to run in parallel.
pub trait ExplicitModel: Send + Sync {
    /// Model name for debugging and identification.
    fn name(&self) -> &str;

    /// Declared number of input values.
    fn n_inputs(&self) -> usize;

    /// Declared number of output values.
    fn n_outputs(&self) -> usize;

    /// Compute outputs from inputs.
    ///
    /// `inputs` has length `n_inputs()`, `outputs` has length `n_outputs()`.
    fn compute(&self, inputs: &[f64], outputs: &mut [f64]) -> ComponentResult<()>;
}

/// An implicit component: `residual = g(inputs, state)`.
///
/// The solver finds `state` such that the residual is zero. The residual is
/// not required to depend on the component's own state at all (a flux balance
/// referencing only input fluxes is legitimate), so a zero diagonal block in
/// the Jacobian is valid.
pub trait ImplicitModel: Send + Sync {
    /// Model name for debugging and identification.
    fn name(&self) -> &str;

    /// Declared number of input values.
    fn n_inputs(&self) -> usize;

    /// Declared number of state unknowns; the residual has the same length.
    fn n_states(&self) -> usize;

    /// Evaluate the residual at the given inputs and state.
    ///
    /// `inputs` has length `n_inputs()`; `state` and `residual` have length
    /// `n_states()`.
    fn apply(&self, inputs: &[f64], state: &[f64], residual: &mut [f64]) -> ComponentResult<()>;
}

/// The closed set of component variants.
pub enum Model {
    Explicit(Box<dyn ExplicitModel>),
    Implicit(Box<dyn ImplicitModel>),
}

impl Model {
    pub fn name(&self) -> &str {
        match self {
            Model::Explicit(m) => m.name(),
            Model::Implicit(m) => m.name(),
        }
    }

    pub fn n_inputs(&self) -> usize {
        match self {
            Model::Explicit(m) => m.n_inputs(),
            Model::Implicit(m) => m.n_inputs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Doubler;

    impl ExplicitModel for Doubler {
        fn name(&self) -> &str {
            "doubler"
        }
        fn n_inputs(&self) -> usize {
            1
        }
        fn n_outputs(&self) -> usize {
            1
        }
        fn compute(&self, inputs: &[f64], outputs: &mut [f64]) -> ComponentResult<()> {
            outputs[0] = 2.0 * inputs[0];
            Ok(())
        }
    }

    #[test]
    fn model_dispatch() {
        let model = Model::Explicit(Box::new(Doubler));
        assert_eq!(model.name(), "doubler");
        assert_eq!(model.n_inputs(), 1);
    }

    #[test]
    fn zero_arity_model_is_valid() {
        struct Nothing;
        impl ImplicitModel for Nothing {
            fn name(&self) -> &str {
                "nothing"
            }
            fn n_inputs(&self) -> usize {
                0
            }
            fn n_states(&self) -> usize {
                0
            }
            fn apply(&self, _: &[f64], _: &[f64], _: &mut [f64]) -> ComponentResult<()> {
                Ok(())
            }
        }

        let mut residual: [f64; 0] = [];
        Nothing.apply(&[], &[], &mut residual).unwrap();
    }
}
