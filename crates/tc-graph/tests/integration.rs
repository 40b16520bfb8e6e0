//! Integration test: building a complete thermal circuit graph.

use tc_core::Unit;
use tc_graph::{ComponentKind, Source, SystemBuilder, VarRole};

const T_UNITS: [(&str, Unit); 2] = [("T_in", Unit::Kelvin), ("T_out", Unit::Kelvin)];

#[test]
fn three_junction_chain_builds() {
    // T_hot --R1-- n1 --R2-- n2 --R3-- n3 --R4-- T_cold, with external
    // fluxes injected at n1 and extracted at n3.
    let mut b = SystemBuilder::new();

    let t_hot = b.add_external("T_hot", Unit::Kelvin).unwrap();
    let t_cold = b.add_external("T_cold", Unit::Kelvin).unwrap();
    let q_in = b.add_external("q_in", Unit::Watt).unwrap();
    let q_out = b.add_external("q_out", Unit::Watt).unwrap();

    let resistors: Vec<_> = (1..=4)
        .map(|i| {
            b.add_explicit(format!("R{i}"), &T_UNITS, &[("q", Unit::Watt)])
                .unwrap()
        })
        .collect();

    // Each junction balances: incoming resistor flux (+ any external flux)
    // against outgoing resistor flux.
    let n1 = b
        .add_implicit(
            "n1",
            &[("q_0", Unit::Watt), ("q_1", Unit::Watt), ("q_2", Unit::Watt)],
            &[("T", Unit::Kelvin)],
        )
        .unwrap();
    let n2 = b
        .add_implicit(
            "n2",
            &[("q_0", Unit::Watt), ("q_1", Unit::Watt)],
            &[("T", Unit::Kelvin)],
        )
        .unwrap();
    let n3 = b
        .add_implicit(
            "n3",
            &[("q_0", Unit::Watt), ("q_1", Unit::Watt), ("q_2", Unit::Watt)],
            &[("T", Unit::Kelvin)],
        )
        .unwrap();

    // Boundary temperatures
    b.bind_external(t_hot, b.input(resistors[0], "T_in").unwrap())
        .unwrap();
    b.bind_external(t_cold, b.input(resistors[3], "T_out").unwrap())
        .unwrap();

    // Junction temperatures feed adjacent resistor ports
    let t1 = b.state(n1, "T").unwrap();
    b.connect(
        t1,
        &[
            b.input(resistors[0], "T_out").unwrap(),
            b.input(resistors[1], "T_in").unwrap(),
        ],
    )
    .unwrap();
    let t2 = b.state(n2, "T").unwrap();
    b.connect(
        t2,
        &[
            b.input(resistors[1], "T_out").unwrap(),
            b.input(resistors[2], "T_in").unwrap(),
        ],
    )
    .unwrap();
    let t3 = b.state(n3, "T").unwrap();
    b.connect(
        t3,
        &[
            b.input(resistors[2], "T_out").unwrap(),
            b.input(resistors[3], "T_in").unwrap(),
        ],
    )
    .unwrap();

    // Resistor fluxes feed junction balance ports
    for (r, (n, port)) in [
        (resistors[0], (n1, "q_0")),
        (resistors[1], (n1, "q_2")),
        (resistors[1], (n2, "q_0")),
        (resistors[2], (n2, "q_1")),
        (resistors[2], (n3, "q_0")),
        (resistors[3], (n3, "q_2")),
    ] {
        let q = b.output(r, "q").unwrap();
        b.connect(q, &[b.input(n, port).unwrap()]).unwrap();
    }

    // External fluxes
    b.bind_external(q_in, b.input(n1, "q_1").unwrap()).unwrap();
    b.bind_external(q_out, b.input(n3, "q_1").unwrap()).unwrap();

    let graph = b.build().unwrap();

    assert_eq!(graph.components().len(), 7);
    assert_eq!(graph.externals().len(), 4);
    assert_eq!(graph.state_vars().len(), 3);

    // Every input carries exactly one binding; nothing else does.
    for var in graph.registry().iter() {
        match var.role {
            VarRole::Input => assert!(graph.binding(var.id).is_some()),
            _ => assert!(graph.binding(var.id).is_none()),
        }
    }

    // Spot-check routing: R2.T_in is fed by n1.T
    let r2 = graph.component(resistors[1]).unwrap();
    assert_eq!(r2.kind, ComponentKind::Explicit);
    let r2_t_in = graph.registry().lookup(resistors[1], "T_in").unwrap();
    match graph.binding(r2_t_in) {
        Some(Source::Variable(src)) => assert_eq!(graph.qualified_name(src), "n1.T"),
        other => panic!("unexpected binding {other:?}"),
    }
}
