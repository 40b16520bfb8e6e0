//! System assembly: evaluation planning, value propagation, residual build.

use nalgebra::DVector;
use tc_components::Model;
use tc_core::{CompId, VarId};
use tc_graph::{ComponentDecl, ComponentKind, Source, SystemGraph};

use crate::error::{SolverError, SolverResult};
use crate::problem::SystemProblem;

/// Precomputed evaluation plan for one system.
///
/// Built once at assembly time; the solver replays it every residual and
/// Jacobian evaluation.
#[derive(Debug, Clone)]
pub struct EvaluationPlan {
    /// Explicit components in dependency order: each one's inputs are
    /// satisfiable from externals, implicit states, or earlier outputs.
    pub explicit_order: Vec<CompId>,

    /// Global state vector ordering: slot i holds this state variable.
    /// Deterministic (component construction order).
    pub state_slots: Vec<VarId>,

    /// Residual row ownership: (implicit component, first row) pairs, in
    /// construction order. A zero-state component owns zero rows.
    pub residual_rows: Vec<(CompId, usize)>,
}

impl EvaluationPlan {
    /// Slot of a state variable in the global vector, if it is one.
    pub fn state_slot(&self, var: VarId) -> Option<usize> {
        self.state_slots.iter().position(|&v| v == var)
    }
}

/// Walks the connection graph, orders explicit evaluation, and assembles the
/// global residual vector for all implicit unknowns.
pub struct SystemAssembler<'a> {
    problem: &'a SystemProblem<'a>,
    plan: EvaluationPlan,
}

impl<'a> SystemAssembler<'a> {
    /// Validate the problem and build the evaluation plan.
    ///
    /// An explicit-only cycle (evaluation order unresolvable without going
    /// through an implicit state) is a configuration error, not retried.
    pub fn new(problem: &'a SystemProblem<'a>) -> SolverResult<Self> {
        problem.validate()?;
        let plan = build_plan(problem.graph)?;
        Ok(Self { problem, plan })
    }

    pub fn problem(&self) -> &SystemProblem<'a> {
        self.problem
    }

    pub fn plan(&self) -> &EvaluationPlan {
        &self.plan
    }

    /// Size of the global state vector / residual / Jacobian.
    pub fn n_states(&self) -> usize {
        self.plan.state_slots.len()
    }

    /// Pack the caller-supplied initial guesses into state-slot order.
    pub fn pack_initial_guess(&self) -> SolverResult<DVector<f64>> {
        let mut x = DVector::zeros(self.n_states());
        for (slot, var) in self.plan.state_slots.iter().enumerate() {
            let value =
                self.problem
                    .initial_guess
                    .get(var)
                    .ok_or_else(|| SolverError::Configuration {
                        what: format!(
                            "state '{}' has no initial guess",
                            self.problem.graph.qualified_name(*var)
                        ),
                    })?;
            x[slot] = *value;
        }
        Ok(x)
    }

    /// Fill the full variable table for a given state vector: externals and
    /// states seed the table, explicit components run in dependency order,
    /// and every input slot receives its bound source value.
    pub fn propagate(&self, x: &DVector<f64>) -> SolverResult<Vec<f64>> {
        let graph = self.problem.graph;
        let mut values = vec![0.0; graph.n_vars()];

        for (slot, var) in self.plan.state_slots.iter().enumerate() {
            values[var.slot()] = x[slot];
        }

        for &comp_id in &self.plan.explicit_order {
            let decl = decl_of(graph, comp_id)?;
            let inputs = self.gather_inputs(decl, &mut values)?;
            let model = self.explicit_model(comp_id)?;

            let mut outputs = vec![0.0; decl.outputs.len()];
            model.compute(&inputs, &mut outputs)?;
            for (&var, &value) in decl.outputs.iter().zip(&outputs) {
                values[var.slot()] = value;
            }
        }

        // Resolve implicit-component input slots too, so the table is
        // complete for diagnostics and solution reporting.
        for (comp_id, _) in &self.plan.residual_rows {
            let decl = decl_of(graph, *comp_id)?;
            self.gather_inputs(decl, &mut values)?;
        }

        Ok(values)
    }

    /// Assemble the global residual vector at a given state.
    pub fn residuals(&self, x: &DVector<f64>) -> SolverResult<DVector<f64>> {
        let values = self.propagate(x)?;
        self.residuals_from_values(&values)
    }

    /// Assemble residuals from an already-propagated value table.
    pub fn residuals_from_values(&self, values: &[f64]) -> SolverResult<DVector<f64>> {
        let graph = self.problem.graph;
        let mut residual = DVector::zeros(self.n_states());

        for (comp_id, first_row) in &self.plan.residual_rows {
            let decl = decl_of(graph, *comp_id)?;
            let model = self.implicit_model(*comp_id)?;

            let inputs: Vec<f64> = decl.inputs.iter().map(|v| values[v.slot()]).collect();
            let state: Vec<f64> = decl.states.iter().map(|v| values[v.slot()]).collect();
            let mut local = vec![0.0; decl.states.len()];
            model.apply(&inputs, &state, &mut local)?;

            for (k, r) in local.iter().enumerate() {
                residual[first_row + k] = *r;
            }
        }

        Ok(residual)
    }

    /// Resolve a component's input values through its bindings, writing them
    /// into the value table as a side effect.
    fn gather_inputs(&self, decl: &ComponentDecl, values: &mut [f64]) -> SolverResult<Vec<f64>> {
        let graph = self.problem.graph;
        let mut inputs = Vec::with_capacity(decl.inputs.len());
        for &var in &decl.inputs {
            let source = graph.binding(var).ok_or_else(|| SolverError::Configuration {
                what: format!("input '{}' is unbound", graph.qualified_name(var)),
            })?;
            let value = match source {
                Source::Variable(src) => values[src.slot()],
                Source::External(ext) => self.external_value(ext)?,
            };
            values[var.slot()] = value;
            inputs.push(value);
        }
        Ok(inputs)
    }

    fn external_value(&self, ext: tc_core::ExtId) -> SolverResult<f64> {
        self.problem
            .externals
            .get(ext.slot())
            .copied()
            .flatten()
            .ok_or_else(|| SolverError::Configuration {
                what: format!("external {ext} has no boundary value"),
            })
    }

    fn explicit_model(&self, comp: CompId) -> SolverResult<&dyn tc_components::ExplicitModel> {
        match self.problem.models.get(&comp) {
            Some(Model::Explicit(m)) => Ok(m.as_ref()),
            _ => Err(SolverError::Configuration {
                what: format!("component {comp} has no explicit model"),
            }),
        }
    }

    fn implicit_model(&self, comp: CompId) -> SolverResult<&dyn tc_components::ImplicitModel> {
        match self.problem.models.get(&comp) {
            Some(Model::Implicit(m)) => Ok(m.as_ref()),
            _ => Err(SolverError::Configuration {
                what: format!("component {comp} has no implicit model"),
            }),
        }
    }
}

fn decl_of(graph: &SystemGraph, comp: CompId) -> SolverResult<&ComponentDecl> {
    graph.component(comp).ok_or_else(|| SolverError::Configuration {
        what: format!("unknown component {comp}"),
    })
}

/// Order explicit components topologically and lay out state slots and
/// residual rows.
fn build_plan(graph: &SystemGraph) -> SolverResult<EvaluationPlan> {
    // State variables (and externals) are known before any evaluation.
    let mut known = vec![false; graph.n_vars()];
    let state_slots = graph.state_vars();
    for &var in &state_slots {
        known[var.slot()] = true;
    }

    let explicit: Vec<&ComponentDecl> = graph
        .components()
        .iter()
        .filter(|c| c.kind == ComponentKind::Explicit)
        .collect();

    let mut scheduled = vec![false; graph.components().len()];
    let mut explicit_order = Vec::with_capacity(explicit.len());

    loop {
        let mut progressed = false;
        for decl in &explicit {
            if scheduled[decl.id.slot()] {
                continue;
            }
            let ready = decl.inputs.iter().all(|&input| {
                match graph.binding(input) {
                    Some(Source::External(_)) => true,
                    Some(Source::Variable(src)) => known[src.slot()],
                    None => false,
                }
            });
            if ready {
                scheduled[decl.id.slot()] = true;
                for &out in &decl.outputs {
                    known[out.slot()] = true;
                }
                explicit_order.push(decl.id);
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }

    if explicit_order.len() != explicit.len() {
        let stuck: Vec<&str> = explicit
            .iter()
            .filter(|d| !scheduled[d.id.slot()])
            .map(|d| d.name.as_str())
            .collect();
        return Err(SolverError::Configuration {
            what: format!(
                "explicit components form a cycle not broken by any implicit state: {}",
                stuck.join(", ")
            ),
        });
    }

    let mut residual_rows = Vec::new();
    let mut next_row = 0;
    for decl in graph.components() {
        if decl.kind == ComponentKind::Implicit {
            residual_rows.push((decl.id, next_row));
            next_row += decl.states.len();
        }
    }
    debug_assert_eq!(next_row, state_slots.len());

    Ok(EvaluationPlan {
        explicit_order,
        state_slots,
        residual_rows,
    })
}
