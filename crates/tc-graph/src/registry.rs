//! Flat table of named scalar variables with unit metadata.

use std::collections::HashMap;

use tc_core::{CompId, Unit, VarId};

use crate::error::{GraphError, GraphResult};

/// Role a variable plays in its owning component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarRole {
    /// Fed from another variable or an external value before evaluation.
    Input,
    /// Computed directly by an explicit component.
    Output,
    /// Unknown owned by an implicit component; the solver iterates on it.
    State,
}

/// A named scalar variable.
///
/// Identity is `(comp, name)`: the owning component plus the local name.
/// Values live in solver workspaces, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub id: VarId,
    pub comp: CompId,
    pub name: String,
    pub role: VarRole,
    pub unit: Unit,
}

/// The flat variable table.
///
/// IDs are dense and assigned in insertion order, so `VarId::slot()` indexes
/// directly into value arrays sized by `len()`.
#[derive(Debug, Clone, Default)]
pub struct VariableRegistry {
    vars: Vec<Variable>,
    by_name: HashMap<(CompId, String), VarId>,
}

impl VariableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a variable, rejecting `(comp, name)` collisions.
    pub(crate) fn insert(
        &mut self,
        comp: CompId,
        name: &str,
        role: VarRole,
        unit: Unit,
    ) -> GraphResult<VarId> {
        let key = (comp, name.to_string());
        if self.by_name.contains_key(&key) {
            return Err(GraphError::NameCollision {
                comp,
                name: name.to_string(),
            });
        }
        let id = VarId::from_index(self.vars.len() as u32);
        self.vars.push(Variable {
            id,
            comp,
            name: name.to_string(),
            role,
            unit,
        });
        self.by_name.insert(key, id);
        Ok(id)
    }

    /// Get a variable by ID (returns None if ID out of bounds).
    pub fn get(&self, id: VarId) -> Option<&Variable> {
        self.vars.get(id.slot())
    }

    /// Resolve a variable by its owning component and local name.
    pub fn lookup(&self, comp: CompId, name: &str) -> Option<VarId> {
        self.by_name.get(&(comp, name.to_string())).copied()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.vars.iter()
    }
}
