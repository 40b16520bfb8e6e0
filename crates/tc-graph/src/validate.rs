//! Graph validation logic.

use crate::builder::display_name;
use crate::error::{GraphError, GraphResult};
use crate::graph::{ComponentDecl, ComponentKind, External, Source};
use crate::registry::{VarRole, VariableRegistry};

/// Validate the declaration structure: every variable belongs to exactly one
/// component list, roles match list membership, kinds constrain the lists.
pub(crate) fn validate_structure(
    registry: &VariableRegistry,
    components: &[ComponentDecl],
    _externals: &[External],
) -> GraphResult<()> {
    let mut seen = vec![false; registry.len()];

    for comp in components {
        if comp.kind == ComponentKind::Explicit && !comp.states.is_empty() {
            return Err(GraphError::Inconsistent {
                comp: comp.id,
                what: "explicit component declares state variables",
            });
        }
        if comp.kind == ComponentKind::Implicit && !comp.outputs.is_empty() {
            return Err(GraphError::Inconsistent {
                comp: comp.id,
                what: "implicit component declares output variables",
            });
        }

        for (list, role) in [
            (&comp.inputs, VarRole::Input),
            (&comp.outputs, VarRole::Output),
            (&comp.states, VarRole::State),
        ] {
            for &var_id in list {
                let var = registry.get(var_id).ok_or(GraphError::DanglingRef {
                    what: "declared variable",
                    id: var_id,
                })?;
                if var.comp != comp.id || var.role != role {
                    return Err(GraphError::Inconsistent {
                        comp: comp.id,
                        what: "variable list disagrees with registry",
                    });
                }
                if seen[var_id.slot()] {
                    return Err(GraphError::Inconsistent {
                        comp: comp.id,
                        what: "variable appears in two declaration lists",
                    });
                }
                seen[var_id.slot()] = true;
            }
        }
    }

    // Every registered variable must appear in some declaration
    for var in registry.iter() {
        if !seen[var.id.slot()] {
            return Err(GraphError::DanglingRef {
                what: "orphan variable",
                id: var.id,
            });
        }
    }

    Ok(())
}

/// Validate bindings: every input bound to exactly one valid source, and
/// nothing else carries a binding.
pub(crate) fn validate_bindings(
    registry: &VariableRegistry,
    components: &[ComponentDecl],
    bindings: &[Option<Source>],
) -> GraphResult<()> {
    for var in registry.iter() {
        let bound = bindings.get(var.id.slot()).copied().flatten();
        match (var.role, bound) {
            (VarRole::Input, None) => {
                return Err(GraphError::UnboundInput {
                    name: display_name(registry, components, var.id),
                });
            }
            (VarRole::Input, Some(Source::Variable(src))) => {
                let src_var = registry.get(src).ok_or(GraphError::DanglingRef {
                    what: "binding source",
                    id: src,
                })?;
                if src_var.role == VarRole::Input {
                    return Err(GraphError::NotASource {
                        src: display_name(registry, components, src),
                    });
                }
            }
            (VarRole::Input, Some(Source::External(_))) => {}
            (_, Some(_)) => {
                return Err(GraphError::NotAnInput {
                    dest: display_name(registry, components, var.id),
                });
            }
            (_, None) => {}
        }
    }
    Ok(())
}
