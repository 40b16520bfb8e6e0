//! Solves a heat-pipe-like series chain and prints the temperature profile.
//!
//! Eight junction nodes sit between nine conduction resistances. Heat enters
//! at the evaporator end (n1), leaves at the condenser end (n8), and the two
//! chain ends are pinned to boundary temperatures.
//!
//! Run with `cargo run --example heat_pipe`.

use tc_components::{FluxJunction, Model, Polarity, Resistor};
use tc_core::units::{k, w};
use tc_core::Unit;
use tc_graph::{SystemBuilder, SystemGraph};
use tc_solver::{solve, SolveConfig, SolverResult, SystemProblem};

const N_NODES: usize = 8;

fn build_graph() -> SolverResult<SystemGraph> {
    let mut b = SystemBuilder::new();

    let mut resistors = Vec::new();
    for i in 1..=N_NODES + 1 {
        resistors.push(b.add_explicit(
            format!("R{i}"),
            &[("T_in", Unit::Kelvin), ("T_out", Unit::Kelvin)],
            &[("q", Unit::Watt)],
        )?);
    }
    let mut nodes = Vec::new();
    for i in 1..=N_NODES {
        let inputs: Vec<(&str, Unit)> = if i == 1 || i == N_NODES {
            vec![
                ("q_left", Unit::Watt),
                ("q_ext", Unit::Watt),
                ("q_right", Unit::Watt),
            ]
        } else {
            vec![("q_left", Unit::Watt), ("q_right", Unit::Watt)]
        };
        nodes.push(b.add_implicit(format!("n{i}"), &inputs, &[("T", Unit::Kelvin)])?);
    }

    let t_hot = b.add_external("T_hot", Unit::Kelvin)?;
    let t_cold = b.add_external("T_cold", Unit::Kelvin)?;
    let q_in = b.add_external("q_in", Unit::Watt)?;
    let q_out = b.add_external("q_out", Unit::Watt)?;

    b.bind_external(t_hot, b.input(resistors[0], "T_in")?)?;
    b.bind_external(t_cold, b.input(resistors[N_NODES], "T_out")?)?;
    for (i, &node) in nodes.iter().enumerate() {
        let t = b.state(node, "T")?;
        b.connect(
            t,
            &[
                b.input(resistors[i], "T_out")?,
                b.input(resistors[i + 1], "T_in")?,
            ],
        )?;
        b.connect(b.output(resistors[i], "q")?, &[b.input(node, "q_left")?])?;
        b.connect(
            b.output(resistors[i + 1], "q")?,
            &[b.input(node, "q_right")?],
        )?;
    }
    b.bind_external(q_in, b.input(nodes[0], "q_ext")?)?;
    b.bind_external(q_out, b.input(nodes[N_NODES - 1], "q_ext")?)?;

    Ok(b.build()?)
}

fn main() -> SolverResult<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let graph = build_graph()?;
    let mut problem = SystemProblem::new(&graph);

    for i in 1..=N_NODES + 1 {
        let name = format!("R{i}");
        let comp = graph
            .components()
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.id)
            .ok_or_else(|| tc_graph::GraphError::Unknown {
                what: "component",
                name: name.clone(),
            })?;
        problem.attach_model(
            comp,
            Model::Explicit(Box::new(Resistor::new(&name, 10.0)?)),
        )?;
    }
    for i in 1..=N_NODES {
        let name = format!("n{i}");
        let comp = graph
            .components()
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.id)
            .ok_or_else(|| tc_graph::GraphError::Unknown {
                what: "component",
                name: name.clone(),
            })?;
        let polarities: &[Polarity] = if i == 1 {
            &[Polarity::In, Polarity::In, Polarity::Out]
        } else if i == N_NODES {
            &[Polarity::In, Polarity::Out, Polarity::Out]
        } else {
            &[Polarity::In, Polarity::Out]
        };
        problem.attach_model(comp, Model::Implicit(Box::new(FluxJunction::new(&name, polarities))))?;
    }

    for e in graph.externals() {
        match e.name.as_str() {
            "T_hot" => problem.set_boundary_temperature(e.id, k(500.0))?,
            "T_cold" => problem.set_boundary_temperature(e.id, k(60.0))?,
            "q_in" => problem.set_boundary_flux(e.id, w(70.0))?,
            "q_out" => problem.set_boundary_flux(e.id, w(50.0))?,
            _ => {}
        }
    }
    let guesses = [500.0, 350.0, 300.0, 250.0, 200.0, 150.0, 100.0, 60.0];
    for (var, guess) in graph.state_vars().into_iter().zip(guesses) {
        problem.set_initial_guess(var, guess)?;
    }

    let report = solve(&problem, &SolveConfig::default())?;

    println!(
        "outcome: {:?} after {} iterations, |r| = {:.3e}",
        report.outcome,
        report.solution.iterations(),
        report.solution.residual_norm()
    );
    for rec in report.records() {
        println!(
            "  iter {:>2}: |r| = {:>12.6e}  alpha = {:<5.3}  cond = {:.3e}",
            rec.iteration, rec.residual_norm, rec.alpha, rec.condition
        );
    }
    println!("temperature profile:");
    for i in 1..=N_NODES {
        let n = graph
            .components()
            .iter()
            .find(|c| c.name == format!("n{i}"))
            .map(|c| c.id)
            .ok_or_else(|| tc_graph::GraphError::Unknown {
                what: "component",
                name: format!("n{i}"),
            })?;
        let t = graph.registry().lookup(n, "T").ok_or(tc_graph::GraphError::Unknown {
            what: "variable",
            name: "T".to_string(),
        })?;
        if let Some(value) = report.solution.value(t) {
            println!("  n{i}: {value:>10.3} K");
        }
    }
    Ok(())
}
