//! Core connection-graph data structures.

use tc_core::{CompId, ExtId, Unit, VarId};

use crate::registry::VariableRegistry;

/// Kind of a component: computes outputs directly, or defines a residual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// `outputs = f(inputs)`, no iteration needed.
    Explicit,
    /// `residual = g(inputs, state)`, driven to zero by the outer solver.
    Implicit,
}

/// Declaration of a component instance: a fixed schema of named variables.
///
/// The schema is decided at construction and never resized. Explicit
/// components own inputs and outputs; implicit components own inputs and
/// states. Zero-arity declarations are valid degenerate pass-throughs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentDecl {
    pub id: CompId,
    pub name: String,
    pub kind: ComponentKind,
    pub inputs: Vec<VarId>,
    pub outputs: Vec<VarId>,
    pub states: Vec<VarId>,
}

/// Where an input variable gets its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Another component's output or state variable.
    Variable(VarId),
    /// A fixed external boundary value.
    External(ExtId),
}

/// A named external boundary value slot.
///
/// The slot is declared here; the actual scalar is supplied at solve time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct External {
    pub id: ExtId,
    pub name: String,
    pub unit: Unit,
}

/// The connection graph: a validated, immutable description of variables,
/// component declarations, externals, and input bindings.
///
/// Every input variable is bound to exactly one [`Source`]. Cycles through
/// implicit states are expected (the Newton solve resolves them); cycles
/// among explicit components alone are rejected later, at assembly time.
#[derive(Debug, Clone)]
pub struct SystemGraph {
    pub(crate) registry: VariableRegistry,
    pub(crate) components: Vec<ComponentDecl>,
    pub(crate) externals: Vec<External>,
    /// Indexed by `VarId::slot()`; `Some` exactly for input variables.
    pub(crate) bindings: Vec<Option<Source>>,
}

impl SystemGraph {
    /// The flat variable table.
    pub fn registry(&self) -> &VariableRegistry {
        &self.registry
    }

    /// All component declarations, in construction order.
    pub fn components(&self) -> &[ComponentDecl] {
        &self.components
    }

    /// All external slots, in construction order.
    pub fn externals(&self) -> &[External] {
        &self.externals
    }

    /// Get a component declaration by ID.
    pub fn component(&self, id: CompId) -> Option<&ComponentDecl> {
        self.components.get(id.slot())
    }

    /// Get an external slot by ID.
    pub fn external(&self, id: ExtId) -> Option<&External> {
        self.externals.get(id.slot())
    }

    /// The source bound to an input variable (None for outputs/states).
    pub fn binding(&self, var: VarId) -> Option<Source> {
        self.bindings.get(var.slot()).copied().flatten()
    }

    /// Total number of variables; value arrays are sized by this.
    pub fn n_vars(&self) -> usize {
        self.registry.len()
    }

    /// `component.variable` display name for diagnostics.
    pub fn qualified_name(&self, var: VarId) -> String {
        match self.registry.get(var) {
            Some(v) => {
                let comp = self
                    .component(v.comp)
                    .map(|c| c.name.as_str())
                    .unwrap_or("?");
                format!("{}.{}", comp, v.name)
            }
            None => format!("var#{var}"),
        }
    }

    /// All state variables in deterministic (construction) order.
    ///
    /// This is the ordering of the global state vector.
    pub fn state_vars(&self) -> Vec<VarId> {
        self.components
            .iter()
            .flat_map(|c| c.states.iter().copied())
            .collect()
    }
}
