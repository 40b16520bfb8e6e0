//! Flux-balance junction: an implicit node whose temperature is solved for.

use crate::common::check_arity;
use crate::error::{ComponentError, ComponentResult};
use crate::traits::ImplicitModel;

/// Sign a flux input contributes to a balance residual.
///
/// Declared per input at construction. Never inferred from the order inputs
/// happen to be added in; getting that backwards silently flips the physics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// Flux flows into the junction: contributes positively.
    In,
    /// Flux flows out of the junction: contributes negatively.
    Out,
}

impl Polarity {
    fn sign(self) -> f64 {
        match self {
            Polarity::In => 1.0,
            Polarity::Out => -1.0,
        }
    }
}

/// A node in the thermal circuit balancing incoming and outgoing flux.
///
/// Inputs are fluxes in watts, one polarity flag per input. The single state
/// is the node temperature `T` in kelvin. The residual is
/// `sum(in fluxes) - sum(out fluxes)`; it does not reference `T` directly,
/// so this component's partial with respect to its own state is exactly zero.
/// The coupling to `T` happens through the resistors fed by it.
#[derive(Debug, Clone)]
pub struct FluxJunction {
    name: String,
    polarities: Vec<Polarity>,
}

impl FluxJunction {
    /// Create a junction with one declared polarity per flux input.
    pub fn new(name: impl Into<String>, polarities: &[Polarity]) -> Self {
        Self {
            name: name.into(),
            polarities: polarities.to_vec(),
        }
    }

    /// Convenience: `n_in` inputs flowing in followed by `n_out` flowing out.
    pub fn with_counts(name: impl Into<String>, n_in: usize, n_out: usize) -> Self {
        let mut polarities = vec![Polarity::In; n_in];
        polarities.extend(std::iter::repeat(Polarity::Out).take(n_out));
        Self {
            name: name.into(),
            polarities,
        }
    }

    pub fn polarities(&self) -> &[Polarity] {
        &self.polarities
    }
}

impl ImplicitModel for FluxJunction {
    fn name(&self) -> &str {
        &self.name
    }

    fn n_inputs(&self) -> usize {
        self.polarities.len()
    }

    fn n_states(&self) -> usize {
        1
    }

    fn apply(&self, inputs: &[f64], state: &[f64], residual: &mut [f64]) -> ComponentResult<()> {
        check_arity(inputs.len(), self.polarities.len(), "inputs")?;
        check_arity(state.len(), 1, "states")?;
        check_arity(residual.len(), 1, "residuals")?;

        let mut balance = 0.0;
        for (q, polarity) in inputs.iter().zip(&self.polarities) {
            balance += polarity.sign() * q;
        }
        if !balance.is_finite() {
            return Err(ComponentError::Evaluation {
                what: "junction flux balance",
            });
        }
        residual[0] = balance;
        Ok(())
    }
}
