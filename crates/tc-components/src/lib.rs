//! tc-components: component models for the thermocircuit engine.
//!
//! A component is a leaf unit of computation. The variant set is closed:
//! explicit components compute outputs directly from inputs, implicit
//! components define a residual the outer solver drives to zero. New
//! component kinds are added as new model types behind these two traits,
//! never as ad-hoc runtime declarations.

pub mod common;
pub mod error;
pub mod junction;
pub mod resistor;
pub mod traits;

pub use error::{ComponentError, ComponentResult};
pub use junction::{FluxJunction, Polarity};
pub use resistor::Resistor;
pub use traits::{ExplicitModel, ImplicitModel, Model};
