//! Problem definition: graph + models + boundary values + initial guesses.

use std::collections::HashMap;

use tc_components::Model;
use tc_core::units::{HeatRate, Temperature, Unit};
use tc_core::{CompId, ExtId, VarId};
use tc_graph::{ComponentKind, SystemGraph, VarRole};

use crate::error::{SolverError, SolverResult};

/// A solvable problem: a connection graph, one model per component
/// declaration, a value for every external boundary slot, and a caller-
/// supplied initial guess for every implicit state entry.
///
/// There is no default-zero guess: degenerate guesses (identical
/// temperatures across a resistor) can make finite-difference Jacobians
/// singular, so every state must be seeded explicitly.
pub struct SystemProblem<'a> {
    /// Network topology and variable bindings.
    pub graph: &'a SystemGraph,

    /// Evaluation models indexed by component ID.
    pub models: HashMap<CompId, Model>,

    /// Boundary values indexed by `ExtId::slot()` (None = not yet supplied).
    pub externals: Vec<Option<f64>>,

    /// Initial guesses per state variable.
    pub initial_guess: HashMap<VarId, f64>,
}

impl<'a> SystemProblem<'a> {
    /// Create an empty problem over a graph.
    pub fn new(graph: &'a SystemGraph) -> Self {
        Self {
            graph,
            models: HashMap::new(),
            externals: vec![None; graph.externals().len()],
            initial_guess: HashMap::new(),
        }
    }

    /// Attach the evaluation model for a component declaration.
    pub fn attach_model(&mut self, comp: CompId, model: Model) -> SolverResult<()> {
        let decl = self
            .graph
            .component(comp)
            .ok_or_else(|| SolverError::Configuration {
                what: format!("unknown component {comp}"),
            })?;
        if self.models.contains_key(&comp) {
            return Err(SolverError::Configuration {
                what: format!("component '{}' already has a model", decl.name),
            });
        }
        self.models.insert(comp, model);
        Ok(())
    }

    /// Supply a raw boundary value for an external slot.
    pub fn set_external(&mut self, ext: ExtId, value: f64) -> SolverResult<()> {
        if ext.slot() >= self.externals.len() {
            return Err(SolverError::Configuration {
                what: format!("unknown external {ext}"),
            });
        }
        self.externals[ext.slot()] = Some(value);
        Ok(())
    }

    /// Supply a boundary temperature; the slot's unit tag must be kelvin.
    pub fn set_boundary_temperature(&mut self, ext: ExtId, t: Temperature) -> SolverResult<()> {
        self.check_unit(ext, Unit::Kelvin)?;
        self.set_external(ext, t.value)
    }

    /// Supply a boundary flux; the slot's unit tag must be watts.
    pub fn set_boundary_flux(&mut self, ext: ExtId, q: HeatRate) -> SolverResult<()> {
        self.check_unit(ext, Unit::Watt)?;
        self.set_external(ext, q.value)
    }

    fn check_unit(&self, ext: ExtId, expected: Unit) -> SolverResult<()> {
        let external = self
            .graph
            .external(ext)
            .ok_or_else(|| SolverError::Configuration {
                what: format!("unknown external {ext}"),
            })?;
        if external.unit != expected {
            return Err(SolverError::Configuration {
                what: format!(
                    "external '{}' is tagged {} but a {} value was supplied",
                    external.name, external.unit, expected
                ),
            });
        }
        Ok(())
    }

    /// Seed the initial guess for one state variable.
    pub fn set_initial_guess(&mut self, var: VarId, value: f64) -> SolverResult<()> {
        let v = self
            .graph
            .registry()
            .get(var)
            .ok_or_else(|| SolverError::Configuration {
                what: format!("unknown variable {var}"),
            })?;
        if v.role != VarRole::State {
            return Err(SolverError::Configuration {
                what: format!(
                    "'{}' is not a state variable",
                    self.graph.qualified_name(var)
                ),
            });
        }
        self.initial_guess.insert(var, value);
        Ok(())
    }

    /// Total number of implicit state entries (the Newton system size).
    pub fn n_states(&self) -> usize {
        self.graph.state_vars().len()
    }

    /// Validate the setup. All violations here are fatal configuration
    /// errors, reported before any solve attempt.
    pub fn validate(&self) -> SolverResult<()> {
        for decl in self.graph.components() {
            let model = self
                .models
                .get(&decl.id)
                .ok_or_else(|| SolverError::Configuration {
                    what: format!("component '{}' has no model attached", decl.name),
                })?;

            match (decl.kind, model) {
                (ComponentKind::Explicit, Model::Explicit(m)) => {
                    self.check_arity(&decl.name, "inputs", decl.inputs.len(), m.n_inputs())?;
                    self.check_arity(&decl.name, "outputs", decl.outputs.len(), m.n_outputs())?;
                }
                (ComponentKind::Implicit, Model::Implicit(m)) => {
                    self.check_arity(&decl.name, "inputs", decl.inputs.len(), m.n_inputs())?;
                    self.check_arity(&decl.name, "states", decl.states.len(), m.n_states())?;
                }
                (ComponentKind::Explicit, Model::Implicit(_)) => {
                    return Err(SolverError::Configuration {
                        what: format!(
                            "component '{}' is declared explicit but has an implicit model",
                            decl.name
                        ),
                    });
                }
                (ComponentKind::Implicit, Model::Explicit(_)) => {
                    return Err(SolverError::Configuration {
                        what: format!(
                            "component '{}' is declared implicit but has an explicit model",
                            decl.name
                        ),
                    });
                }
            }
        }

        for external in self.graph.externals() {
            if self.externals[external.id.slot()].is_none() {
                return Err(SolverError::Configuration {
                    what: format!("external '{}' has no boundary value", external.name),
                });
            }
        }

        for var in self.graph.state_vars() {
            if !self.initial_guess.contains_key(&var) {
                return Err(SolverError::Configuration {
                    what: format!(
                        "state '{}' has no initial guess",
                        self.graph.qualified_name(var)
                    ),
                });
            }
        }

        Ok(())
    }

    fn check_arity(
        &self,
        comp: &str,
        what: &str,
        declared: usize,
        model: usize,
    ) -> SolverResult<()> {
        if declared != model {
            return Err(SolverError::Configuration {
                what: format!(
                    "component '{comp}': declaration has {declared} {what} but model expects {model}"
                ),
            });
        }
        Ok(())
    }
}
