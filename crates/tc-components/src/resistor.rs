//! Thermal resistor computing flux from a temperature difference (Ohm's law).

use crate::common::{check_arity, check_finite};
use crate::error::{ComponentError, ComponentResult};
use crate::traits::ExplicitModel;

/// Thermal resistor: `q = (T_in - T_out) / R`.
///
/// Inputs are `[T_in, T_out]` in kelvin; the single output is the heat flux
/// `q` in watts. Positive flux flows from `T_in` toward `T_out`.
#[derive(Debug, Clone)]
pub struct Resistor {
    name: String,
    /// Thermal resistance in K/W.
    resistance: f64,
}

impl Resistor {
    /// Create a resistor, rejecting non-positive or non-finite resistance.
    pub fn new(name: impl Into<String>, resistance: f64) -> ComponentResult<Self> {
        if !resistance.is_finite() || resistance <= 0.0 {
            return Err(ComponentError::NonPhysical {
                what: "thermal resistance must be finite and positive",
            });
        }
        Ok(Self {
            name: name.into(),
            resistance,
        })
    }

    /// Thermal resistance in K/W.
    pub fn resistance(&self) -> f64 {
        self.resistance
    }
}

impl ExplicitModel for Resistor {
    fn name(&self) -> &str {
        &self.name
    }

    fn n_inputs(&self) -> usize {
        2
    }

    fn n_outputs(&self) -> usize {
        1
    }

    fn compute(&self, inputs: &[f64], outputs: &mut [f64]) -> ComponentResult<()> {
        check_arity(inputs.len(), 2, "inputs")?;
        check_arity(outputs.len(), 1, "outputs")?;

        let delta_t = inputs[0] - inputs[1];
        outputs[0] = check_finite(delta_t / self.resistance, "resistor flux")?;
        Ok(())
    }
}
