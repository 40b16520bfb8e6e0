//! Incremental system builder.

use std::collections::HashMap;

use tc_core::{CompId, ExtId, Unit, VarId};

use crate::error::{GraphError, GraphResult};
use crate::graph::{ComponentDecl, ComponentKind, External, Source, SystemGraph};
use crate::registry::{VarRole, VariableRegistry};

/// Builder for constructing a system graph incrementally.
///
/// Declare components and externals first, then wire inputs with `connect`
/// and `bind_external`, then call `build()` to validate and freeze the graph.
/// Name promotion does not exist here: every connection is a direct
/// source -> destination binding resolved before any evaluation.
#[derive(Debug, Default)]
pub struct SystemBuilder {
    registry: VariableRegistry,
    components: Vec<ComponentDecl>,
    externals: Vec<External>,
    bindings: Vec<Option<Source>>,
    comp_names: HashMap<String, CompId>,
    ext_names: HashMap<String, ExtId>,
}

impl SystemBuilder {
    /// Create a new empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an explicit component: named inputs and named outputs.
    pub fn add_explicit(
        &mut self,
        name: impl Into<String>,
        inputs: &[(&str, Unit)],
        outputs: &[(&str, Unit)],
    ) -> GraphResult<CompId> {
        self.add_component(name.into(), ComponentKind::Explicit, inputs, outputs, &[])
    }

    /// Declare an implicit component: named inputs and named state unknowns.
    pub fn add_implicit(
        &mut self,
        name: impl Into<String>,
        inputs: &[(&str, Unit)],
        states: &[(&str, Unit)],
    ) -> GraphResult<CompId> {
        self.add_component(name.into(), ComponentKind::Implicit, inputs, &[], states)
    }

    fn add_component(
        &mut self,
        name: String,
        kind: ComponentKind,
        inputs: &[(&str, Unit)],
        outputs: &[(&str, Unit)],
        states: &[(&str, Unit)],
    ) -> GraphResult<CompId> {
        if self.comp_names.contains_key(&name) {
            return Err(GraphError::DuplicateComponent { name });
        }
        let comp_id = CompId::from_index(self.components.len() as u32);

        let mut input_ids = Vec::with_capacity(inputs.len());
        for (var_name, unit) in inputs {
            let id = self.registry.insert(comp_id, var_name, VarRole::Input, *unit)?;
            self.bindings.push(None);
            input_ids.push(id);
        }
        let mut output_ids = Vec::with_capacity(outputs.len());
        for (var_name, unit) in outputs {
            let id = self.registry.insert(comp_id, var_name, VarRole::Output, *unit)?;
            self.bindings.push(None);
            output_ids.push(id);
        }
        let mut state_ids = Vec::with_capacity(states.len());
        for (var_name, unit) in states {
            let id = self.registry.insert(comp_id, var_name, VarRole::State, *unit)?;
            self.bindings.push(None);
            state_ids.push(id);
        }

        self.comp_names.insert(name.clone(), comp_id);
        self.components.push(ComponentDecl {
            id: comp_id,
            name,
            kind,
            inputs: input_ids,
            outputs: output_ids,
            states: state_ids,
        });
        Ok(comp_id)
    }

    /// Declare an external boundary value slot.
    pub fn add_external(&mut self, name: impl Into<String>, unit: Unit) -> GraphResult<ExtId> {
        let name = name.into();
        if self.ext_names.contains_key(&name) {
            return Err(GraphError::DuplicateExternal { name });
        }
        let id = ExtId::from_index(self.externals.len() as u32);
        self.ext_names.insert(name.clone(), id);
        self.externals.push(External { id, name, unit });
        Ok(id)
    }

    /// Resolve an input variable of a component by name.
    pub fn input(&self, comp: CompId, name: &str) -> GraphResult<VarId> {
        self.var_with_role(comp, name, VarRole::Input)
    }

    /// Resolve an output variable of a component by name.
    pub fn output(&self, comp: CompId, name: &str) -> GraphResult<VarId> {
        self.var_with_role(comp, name, VarRole::Output)
    }

    /// Resolve a state variable of a component by name.
    pub fn state(&self, comp: CompId, name: &str) -> GraphResult<VarId> {
        self.var_with_role(comp, name, VarRole::State)
    }

    fn var_with_role(&self, comp: CompId, name: &str, role: VarRole) -> GraphResult<VarId> {
        let id = self
            .registry
            .lookup(comp, name)
            .ok_or_else(|| GraphError::Unknown {
                what: "variable",
                name: name.to_string(),
            })?;
        let var = self.registry.get(id).ok_or(GraphError::DanglingRef {
            what: "variable",
            id,
        })?;
        if var.role != role {
            return Err(match role {
                VarRole::Input => GraphError::NotAnInput {
                    dest: self.display(id),
                },
                _ => GraphError::NotASource {
                    src: self.display(id),
                },
            });
        }
        Ok(id)
    }

    /// Connect a source variable to one or more input destinations.
    ///
    /// The source must be an output or state variable; each destination must
    /// be an input and must not already hold a binding.
    pub fn connect(&mut self, source: VarId, dests: &[VarId]) -> GraphResult<()> {
        let src = self.registry.get(source).ok_or(GraphError::DanglingRef {
            what: "source variable",
            id: source,
        })?;
        if src.role == VarRole::Input {
            return Err(GraphError::NotASource {
                src: self.display(source),
            });
        }
        for &dest in dests {
            self.bind(dest, Source::Variable(source))?;
        }
        Ok(())
    }

    /// Bind an external boundary slot to an input destination.
    pub fn bind_external(&mut self, ext: ExtId, dest: VarId) -> GraphResult<()> {
        if ext.slot() >= self.externals.len() {
            return Err(GraphError::Unknown {
                what: "external",
                name: format!("#{ext}"),
            });
        }
        self.bind(dest, Source::External(ext))
    }

    fn bind(&mut self, dest: VarId, source: Source) -> GraphResult<()> {
        let var = self.registry.get(dest).ok_or(GraphError::DanglingRef {
            what: "destination variable",
            id: dest,
        })?;
        if var.role != VarRole::Input {
            return Err(GraphError::NotAnInput {
                dest: self.display(dest),
            });
        }
        let slot = &mut self.bindings[dest.slot()];
        if slot.is_some() {
            return Err(GraphError::DuplicateBinding {
                dest: display_name(&self.registry, &self.components, dest),
            });
        }
        *slot = Some(source);
        Ok(())
    }

    fn display(&self, var: VarId) -> String {
        display_name(&self.registry, &self.components, var)
    }

    /// Build and validate the graph, returning an immutable `SystemGraph`.
    ///
    /// Fails if any input variable is still unbound.
    pub fn build(self) -> GraphResult<SystemGraph> {
        crate::validate::validate_structure(&self.registry, &self.components, &self.externals)?;
        crate::validate::validate_bindings(&self.registry, &self.components, &self.bindings)?;

        Ok(SystemGraph {
            registry: self.registry,
            components: self.components,
            externals: self.externals,
            bindings: self.bindings,
        })
    }
}

pub(crate) fn display_name(
    registry: &VariableRegistry,
    components: &[ComponentDecl],
    var: VarId,
) -> String {
    match registry.get(var) {
        Some(v) => {
            let comp = components
                .get(v.comp.slot())
                .map(|c| c.name.as_str())
                .unwrap_or("?");
            format!("{}.{}", comp, v.name)
        }
        None => format!("var#{var}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resistor(builder: &mut SystemBuilder, name: &str) -> CompId {
        builder
            .add_explicit(
                name,
                &[("T_in", Unit::Kelvin), ("T_out", Unit::Kelvin)],
                &[("q", Unit::Watt)],
            )
            .unwrap()
    }

    #[test]
    fn builder_basic() {
        let mut builder = SystemBuilder::new();
        let r = resistor(&mut builder, "R1");
        let n = builder
            .add_implicit("n1", &[("q_0", Unit::Watt)], &[("T", Unit::Kelvin)])
            .unwrap();

        assert_eq!(r.slot(), 0);
        assert_eq!(n.slot(), 1);
        assert_eq!(builder.registry.len(), 5);
    }

    #[test]
    fn duplicate_component_name_rejected() {
        let mut builder = SystemBuilder::new();
        resistor(&mut builder, "R1");
        let err = builder
            .add_explicit("R1", &[], &[("q", Unit::Watt)])
            .unwrap_err();
        assert!(matches!(err, GraphError::DuplicateComponent { .. }));
    }

    #[test]
    fn duplicate_binding_rejected() {
        let mut builder = SystemBuilder::new();
        let r = resistor(&mut builder, "R1");
        let t_hot = builder.add_external("T_hot", Unit::Kelvin).unwrap();
        let t_in = builder.input(r, "T_in").unwrap();

        builder.bind_external(t_hot, t_in).unwrap();
        let err = builder.bind_external(t_hot, t_in).unwrap_err();
        assert!(matches!(err, GraphError::DuplicateBinding { .. }));
    }

    #[test]
    fn connect_rejects_input_as_source() {
        let mut builder = SystemBuilder::new();
        let r1 = resistor(&mut builder, "R1");
        let r2 = resistor(&mut builder, "R2");
        let t_in_1 = builder.input(r1, "T_in").unwrap();
        let t_in_2 = builder.input(r2, "T_in").unwrap();

        let err = builder.connect(t_in_1, &[t_in_2]).unwrap_err();
        assert!(matches!(err, GraphError::NotASource { .. }));
        assert!(err.to_string().contains("R1.T_in"));
    }

    #[test]
    fn connect_rejects_output_as_dest() {
        let mut builder = SystemBuilder::new();
        let r1 = resistor(&mut builder, "R1");
        let r2 = resistor(&mut builder, "R2");
        let q1 = builder.output(r1, "q").unwrap();
        let q2 = builder.output(r2, "q").unwrap();

        let err = builder.connect(q1, &[q2]).unwrap_err();
        assert!(matches!(err, GraphError::NotAnInput { .. }));
    }

    #[test]
    fn unbound_input_fails_build() {
        let mut builder = SystemBuilder::new();
        let r = resistor(&mut builder, "R1");
        let t_hot = builder.add_external("T_hot", Unit::Kelvin).unwrap();
        builder
            .bind_external(t_hot, builder.input(r, "T_in").unwrap())
            .unwrap();
        // T_out left unbound

        let err = builder.build().unwrap_err();
        match err {
            GraphError::UnboundInput { name } => assert_eq!(name, "R1.T_out"),
            other => panic!("expected UnboundInput, got {other:?}"),
        }
    }

    #[test]
    fn state_can_feed_many_inputs() {
        let mut builder = SystemBuilder::new();
        let r1 = resistor(&mut builder, "R1");
        let r2 = resistor(&mut builder, "R2");
        let n = builder
            .add_implicit("n1", &[], &[("T", Unit::Kelvin)])
            .unwrap();
        let t = builder.state(n, "T").unwrap();
        let t_hot = builder.add_external("T_hot", Unit::Kelvin).unwrap();

        builder
            .connect(
                t,
                &[
                    builder.input(r1, "T_out").unwrap(),
                    builder.input(r2, "T_in").unwrap(),
                ],
            )
            .unwrap();
        builder
            .bind_external(t_hot, builder.input(r1, "T_in").unwrap())
            .unwrap();
        builder
            .bind_external(t_hot, builder.input(r2, "T_out").unwrap())
            .unwrap();

        let graph = builder.build().unwrap();
        assert_eq!(graph.components().len(), 3);
    }
}
