//! Finite-difference Jacobian assembly.
//!
//! Local partials are computed per component by finite differencing, in
//! parallel across components. The global Jacobian is then assembled by
//! chain-rule propagation: each state column seeds a unit sensitivity at its
//! state variable, pushes it through the explicit evaluation order, and
//! accumulates into the residual rows.

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use tc_components::{ExplicitModel, ImplicitModel, Model};
use tc_graph::{ComponentDecl, Source, SystemGraph};

use crate::assembler::SystemAssembler;
use crate::error::{SolverError, SolverResult};

/// Finite-difference scheme for local partials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Differencing {
    /// One extra evaluation per column, first-order accurate.
    Forward,
    /// Two extra evaluations per column, second-order accurate.
    Central,
}

/// Builds the global residual Jacobian for an assembled system.
#[derive(Debug, Clone, Copy)]
pub struct JacobianBuilder {
    pub scheme: Differencing,
    /// Absolute perturbation step, never scaled by the variable's magnitude.
    pub step: f64,
}

impl Default for JacobianBuilder {
    fn default() -> Self {
        Self {
            scheme: Differencing::Forward,
            step: 1e-6,
        }
    }
}

/// Per-component derivative blocks at one evaluation point.
enum LocalPartials {
    Explicit {
        /// `n_outputs x n_inputs`
        d_out_d_in: DMatrix<f64>,
    },
    Implicit {
        /// `n_states x n_inputs`
        d_res_d_in: DMatrix<f64>,
        /// `n_states x n_states`; an all-zero block is legitimate.
        d_res_d_state: DMatrix<f64>,
    },
}

impl JacobianBuilder {
    pub fn new(scheme: Differencing, step: f64) -> SolverResult<Self> {
        if !step.is_finite() || step <= 0.0 {
            return Err(SolverError::Configuration {
                what: format!("finite-difference step must be positive, got {step}"),
            });
        }
        Ok(Self { scheme, step })
    }

    /// Assemble the `n_states x n_states` Jacobian at a propagated point.
    ///
    /// `values` must be the table returned by
    /// [`SystemAssembler::propagate`] for the state the Jacobian is
    /// requested at.
    pub fn build(
        &self,
        asm: &SystemAssembler<'_>,
        values: &[f64],
    ) -> SolverResult<DMatrix<f64>> {
        let graph = asm.problem().graph;
        let plan = asm.plan();
        let n = asm.n_states();

        let partials = self.local_partials(asm, values)?;

        let mut jacobian = DMatrix::zeros(n, n);
        for (col, &seed) in plan.state_slots.iter().enumerate() {
            let mut sens = vec![0.0; graph.n_vars()];
            sens[seed.slot()] = 1.0;

            for &comp in &plan.explicit_order {
                let decl = self.decl_of(graph, comp)?;
                let in_sens = input_sensitivities(graph, decl, &mut sens);
                let d_out_d_in = match &partials[comp.slot()] {
                    LocalPartials::Explicit { d_out_d_in } => d_out_d_in,
                    LocalPartials::Implicit { .. } => {
                        return Err(self.block_mismatch(decl));
                    }
                };
                for (row, &out) in decl.outputs.iter().enumerate() {
                    let mut acc = 0.0;
                    for (c, s) in in_sens.iter().enumerate() {
                        acc += d_out_d_in[(row, c)] * s;
                    }
                    sens[out.slot()] = acc;
                }
            }

            for &(comp, first_row) in &plan.residual_rows {
                let decl = self.decl_of(graph, comp)?;
                let in_sens = input_sensitivities(graph, decl, &mut sens);
                let (d_res_d_in, d_res_d_state) = match &partials[comp.slot()] {
                    LocalPartials::Implicit {
                        d_res_d_in,
                        d_res_d_state,
                    } => (d_res_d_in, d_res_d_state),
                    LocalPartials::Explicit { .. } => {
                        return Err(self.block_mismatch(decl));
                    }
                };
                for k in 0..decl.states.len() {
                    let mut acc = 0.0;
                    for (c, s) in in_sens.iter().enumerate() {
                        acc += d_res_d_in[(k, c)] * s;
                    }
                    for (c, &sv) in decl.states.iter().enumerate() {
                        acc += d_res_d_state[(k, c)] * sens[sv.slot()];
                    }
                    jacobian[(first_row + k, col)] = acc;
                }
            }
        }

        Ok(jacobian)
    }

    /// Differentiate every component at the propagated point, in parallel.
    fn local_partials(
        &self,
        asm: &SystemAssembler<'_>,
        values: &[f64],
    ) -> SolverResult<Vec<LocalPartials>> {
        let graph = asm.problem().graph;
        let models = &asm.problem().models;

        graph
            .components()
            .par_iter()
            .map(|decl| {
                let model = models.get(&decl.id).ok_or_else(|| SolverError::Configuration {
                    what: format!("component '{}' has no model attached", decl.name),
                })?;
                let inputs: Vec<f64> = decl.inputs.iter().map(|v| values[v.slot()]).collect();
                let partials = match model {
                    Model::Explicit(m) => LocalPartials::Explicit {
                        d_out_d_in: self.diff_explicit(m.as_ref(), &inputs, decl, values)?,
                    },
                    Model::Implicit(m) => {
                        let state: Vec<f64> =
                            decl.states.iter().map(|v| values[v.slot()]).collect();
                        let (d_res_d_in, d_res_d_state) =
                            self.diff_implicit(m.as_ref(), &inputs, &state)?;
                        LocalPartials::Implicit {
                            d_res_d_in,
                            d_res_d_state,
                        }
                    }
                };
                self.check_finite(&partials, decl)?;
                Ok(partials)
            })
            .collect()
    }

    fn diff_explicit(
        &self,
        model: &dyn ExplicitModel,
        inputs: &[f64],
        decl: &ComponentDecl,
        values: &[f64],
    ) -> SolverResult<DMatrix<f64>> {
        let n_out = decl.outputs.len();
        let n_in = inputs.len();
        let mut jac = DMatrix::zeros(n_out, n_in);
        let h = self.step;

        let mut perturbed = inputs.to_vec();
        let mut plus = vec![0.0; n_out];
        let mut minus = vec![0.0; n_out];
        for c in 0..n_in {
            perturbed[c] = inputs[c] + h;
            model.compute(&perturbed, &mut plus)?;
            match self.scheme {
                Differencing::Forward => {
                    for (r, &out) in decl.outputs.iter().enumerate() {
                        jac[(r, c)] = (plus[r] - values[out.slot()]) / h;
                    }
                }
                Differencing::Central => {
                    perturbed[c] = inputs[c] - h;
                    model.compute(&perturbed, &mut minus)?;
                    for r in 0..n_out {
                        jac[(r, c)] = (plus[r] - minus[r]) / (2.0 * h);
                    }
                }
            }
            perturbed[c] = inputs[c];
        }
        Ok(jac)
    }

    fn diff_implicit(
        &self,
        model: &dyn ImplicitModel,
        inputs: &[f64],
        state: &[f64],
    ) -> SolverResult<(DMatrix<f64>, DMatrix<f64>)> {
        let n_res = state.len();
        let h = self.step;

        let mut base = vec![0.0; n_res];
        model.apply(inputs, state, &mut base)?;

        let mut plus = vec![0.0; n_res];
        let mut minus = vec![0.0; n_res];

        let mut d_in = DMatrix::zeros(n_res, inputs.len());
        let mut perturbed = inputs.to_vec();
        for c in 0..inputs.len() {
            perturbed[c] = inputs[c] + h;
            model.apply(&perturbed, state, &mut plus)?;
            match self.scheme {
                Differencing::Forward => {
                    for r in 0..n_res {
                        d_in[(r, c)] = (plus[r] - base[r]) / h;
                    }
                }
                Differencing::Central => {
                    perturbed[c] = inputs[c] - h;
                    model.apply(&perturbed, state, &mut minus)?;
                    for r in 0..n_res {
                        d_in[(r, c)] = (plus[r] - minus[r]) / (2.0 * h);
                    }
                }
            }
            perturbed[c] = inputs[c];
        }

        let mut d_state = DMatrix::zeros(n_res, n_res);
        let mut perturbed = state.to_vec();
        for c in 0..n_res {
            perturbed[c] = state[c] + h;
            model.apply(inputs, &perturbed, &mut plus)?;
            match self.scheme {
                Differencing::Forward => {
                    for r in 0..n_res {
                        d_state[(r, c)] = (plus[r] - base[r]) / h;
                    }
                }
                Differencing::Central => {
                    perturbed[c] = state[c] - h;
                    model.apply(inputs, &perturbed, &mut minus)?;
                    for r in 0..n_res {
                        d_state[(r, c)] = (plus[r] - minus[r]) / (2.0 * h);
                    }
                }
            }
            perturbed[c] = state[c];
        }

        Ok((d_in, d_state))
    }

    fn check_finite(&self, partials: &LocalPartials, decl: &ComponentDecl) -> SolverResult<()> {
        let finite = match partials {
            LocalPartials::Explicit { d_out_d_in } => d_out_d_in.iter().all(|v| v.is_finite()),
            LocalPartials::Implicit {
                d_res_d_in,
                d_res_d_state,
            } => {
                d_res_d_in.iter().all(|v| v.is_finite())
                    && d_res_d_state.iter().all(|v| v.is_finite())
            }
        };
        if !finite {
            return Err(SolverError::Numeric {
                what: format!("non-finite derivative in component '{}'", decl.name),
            });
        }
        Ok(())
    }

    fn decl_of<'g>(
        &self,
        graph: &'g SystemGraph,
        comp: tc_core::CompId,
    ) -> SolverResult<&'g ComponentDecl> {
        graph.component(comp).ok_or_else(|| SolverError::Configuration {
            what: format!("unknown component {comp}"),
        })
    }

    fn block_mismatch(&self, decl: &ComponentDecl) -> SolverError {
        SolverError::Configuration {
            what: format!("component '{}' has a mismatched derivative block", decl.name),
        }
    }
}

/// Gather a component's input sensitivities through its bindings, writing
/// them back into the sensitivity table.
fn input_sensitivities(graph: &SystemGraph, decl: &ComponentDecl, sens: &mut [f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(decl.inputs.len());
    for &var in &decl.inputs {
        let s = match graph.binding(var) {
            Some(Source::Variable(src)) => sens[src.slot()],
            // Boundary values are constants.
            Some(Source::External(_)) | None => 0.0,
        };
        sens[var.slot()] = s;
        out.push(s);
    }
    out
}

/// Convenience: propagate, then build residual and Jacobian together.
pub fn residual_and_jacobian(
    builder: &JacobianBuilder,
    asm: &SystemAssembler<'_>,
    x: &DVector<f64>,
) -> SolverResult<(DVector<f64>, DMatrix<f64>)> {
    let values = asm.propagate(x)?;
    let residual = asm.residuals_from_values(&values)?;
    let jacobian = builder.build(asm, &values)?;
    Ok((residual, jacobian))
}
