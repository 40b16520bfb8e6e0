//! End-to-end solve of an eight-node series thermal chain.
//!
//! Topology: T_hot -R1- n1 -R2- n2 - ... - n7 -R8- n8 -R9- T_cold, with
//! 70 W injected at n1 and 50 W extracted at n8. All resistances are
//! 10 K/W, so the network is linear and the converged profile is exact:
//! the flux through the middle of the chain is Q = 160/9 W and each
//! interior node sits 10*Q below its neighbor.

use tc_components::{FluxJunction, Model, Polarity, Resistor};
use tc_core::units::{k, w};
use tc_core::{CompId, ExtId, Unit};
use tc_graph::{SystemBuilder, SystemGraph};
use tc_solver::{solve, NewtonConfig, SolveConfig, Solution, SystemProblem};

const N_NODES: usize = 8;
const N_RESISTORS: usize = 9;
const RESISTANCE: f64 = 10.0;

fn build_chain() -> SystemGraph {
    let mut b = SystemBuilder::new();

    let resistors: Vec<CompId> = (1..=N_RESISTORS)
        .map(|i| {
            b.add_explicit(
                format!("R{i}"),
                &[("T_in", Unit::Kelvin), ("T_out", Unit::Kelvin)],
                &[("q", Unit::Watt)],
            )
            .unwrap()
        })
        .collect();

    let nodes: Vec<CompId> = (1..=N_NODES)
        .map(|i| {
            let inputs: Vec<(&str, Unit)> = if i == 1 || i == N_NODES {
                vec![
                    ("q_left", Unit::Watt),
                    ("q_ext", Unit::Watt),
                    ("q_right", Unit::Watt),
                ]
            } else {
                vec![("q_left", Unit::Watt), ("q_right", Unit::Watt)]
            };
            b.add_implicit(format!("n{i}"), &inputs, &[("T", Unit::Kelvin)])
                .unwrap()
        })
        .collect();

    let t_hot = b.add_external("T_hot", Unit::Kelvin).unwrap();
    let t_cold = b.add_external("T_cold", Unit::Kelvin).unwrap();
    let q_in = b.add_external("q_in", Unit::Watt).unwrap();
    let q_out = b.add_external("q_out", Unit::Watt).unwrap();

    b.bind_external(t_hot, b.input(resistors[0], "T_in").unwrap())
        .unwrap();
    b.bind_external(t_cold, b.input(resistors[N_RESISTORS - 1], "T_out").unwrap())
        .unwrap();

    // Node i sits between resistor i and resistor i+1.
    for (i, &node) in nodes.iter().enumerate() {
        let t = b.state(node, "T").unwrap();
        b.connect(
            t,
            &[
                b.input(resistors[i], "T_out").unwrap(),
                b.input(resistors[i + 1], "T_in").unwrap(),
            ],
        )
        .unwrap();
        b.connect(
            b.output(resistors[i], "q").unwrap(),
            &[b.input(node, "q_left").unwrap()],
        )
        .unwrap();
        b.connect(
            b.output(resistors[i + 1], "q").unwrap(),
            &[b.input(node, "q_right").unwrap()],
        )
        .unwrap();
    }
    b.bind_external(q_in, b.input(nodes[0], "q_ext").unwrap())
        .unwrap();
    b.bind_external(q_out, b.input(nodes[N_NODES - 1], "q_ext").unwrap())
        .unwrap();

    b.build().unwrap()
}

fn comp(graph: &SystemGraph, name: &str) -> CompId {
    graph
        .components()
        .iter()
        .find(|c| c.name == name)
        .unwrap_or_else(|| panic!("no component {name}"))
        .id
}

fn ext(graph: &SystemGraph, name: &str) -> ExtId {
    graph
        .externals()
        .iter()
        .find(|e| e.name == name)
        .unwrap_or_else(|| panic!("no external {name}"))
        .id
}

fn chain_problem<'a>(
    graph: &'a SystemGraph,
    t_hot: f64,
    t_cold: f64,
    q_in: f64,
    q_out: f64,
    guess: f64,
) -> SystemProblem<'a> {
    let mut problem = SystemProblem::new(graph);
    for i in 1..=N_RESISTORS {
        let name = format!("R{i}");
        problem
            .attach_model(
                comp(graph, &name),
                Model::Explicit(Box::new(Resistor::new(&name, RESISTANCE).unwrap())),
            )
            .unwrap();
    }
    for i in 1..=N_NODES {
        let name = format!("n{i}");
        let polarities: &[Polarity] = if i == 1 {
            &[Polarity::In, Polarity::In, Polarity::Out]
        } else if i == N_NODES {
            &[Polarity::In, Polarity::Out, Polarity::Out]
        } else {
            &[Polarity::In, Polarity::Out]
        };
        problem
            .attach_model(
                comp(graph, &name),
                Model::Implicit(Box::new(FluxJunction::new(&name, polarities))),
            )
            .unwrap();
    }
    problem
        .set_boundary_temperature(ext(graph, "T_hot"), k(t_hot))
        .unwrap();
    problem
        .set_boundary_temperature(ext(graph, "T_cold"), k(t_cold))
        .unwrap();
    problem
        .set_boundary_flux(ext(graph, "q_in"), w(q_in))
        .unwrap();
    problem
        .set_boundary_flux(ext(graph, "q_out"), w(q_out))
        .unwrap();
    for var in graph.state_vars() {
        problem.set_initial_guess(var, guess).unwrap();
    }
    problem
}

fn config() -> SolveConfig {
    SolveConfig {
        newton: NewtonConfig {
            max_iterations: 20,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn node_temps(graph: &SystemGraph, solution: &Solution) -> Vec<f64> {
    (1..=N_NODES)
        .map(|i| {
            let n = comp(graph, &format!("n{i}"));
            let t = graph.registry().lookup(n, "T").unwrap();
            solution.value(t).unwrap()
        })
        .collect()
}

fn flux(graph: &SystemGraph, solution: &Solution, resistor: &str) -> f64 {
    let r = comp(graph, resistor);
    let q = graph.registry().lookup(r, "q").unwrap();
    solution.value(q).unwrap()
}

#[test]
fn eight_node_chain_converges_to_exact_profile() {
    let graph = build_chain();
    let problem = chain_problem(&graph, 500.0, 100.0, 70.0, 50.0, 300.0);
    let report = solve(&problem, &config()).unwrap();

    assert!(report.is_converged(), "outcome: {:?}", report.outcome);
    assert!(report.solution.residual_norm() < 1e-6);
    assert!(report.solution.iterations() <= 20);

    // Flux through the middle of the chain: 9Q - 120 = (500 - 100)/10.
    let q_mid = 160.0 / 9.0;
    let temps = node_temps(&graph, &report.solution);
    for (i, t) in temps.iter().enumerate() {
        let expected = 1200.0 - (i as f64 + 1.0) * RESISTANCE * q_mid;
        assert!(
            (t - expected).abs() < 1e-3,
            "n{}: {} vs {}",
            i + 1,
            t,
            expected
        );
    }
    for pair in temps.windows(2) {
        assert!(pair[0] > pair[1], "profile not strictly decreasing");
    }
}

#[test]
fn heat_pipe_boundaries_converge_from_staged_guesses() {
    // The original heat-pipe sizing circuit: T_cold pinned at 60 K and a
    // staged initial temperature profile along the chain.
    let graph = build_chain();
    let mut problem = chain_problem(&graph, 500.0, 60.0, 70.0, 50.0, 300.0);
    let guesses = [500.0, 350.0, 300.0, 250.0, 200.0, 150.0, 100.0, 60.0];
    for (var, guess) in graph.state_vars().into_iter().zip(guesses) {
        problem.set_initial_guess(var, guess).unwrap();
    }

    let report = solve(&problem, &config()).unwrap();
    assert!(report.is_converged(), "outcome: {:?}", report.outcome);
    assert!(report.solution.residual_norm() < 1e-6);
    assert!(report.solution.iterations() <= 20);

    // 9Q - 120 = (500 - 60)/10
    let q_mid = 164.0 / 9.0;
    let temps = node_temps(&graph, &report.solution);
    for (i, t) in temps.iter().enumerate() {
        let expected = 1200.0 - (i as f64 + 1.0) * RESISTANCE * q_mid;
        assert!(
            (t - expected).abs() < 1e-3,
            "n{}: {} vs {}",
            i + 1,
            t,
            expected
        );
    }
    for pair in temps.windows(2) {
        assert!(pair[0] > pair[1], "profile not strictly decreasing");
    }

    let into_n1 = flux(&graph, &report.solution, "R1") + 70.0;
    let out_of_n8 = flux(&graph, &report.solution, "R9") + 50.0;
    assert!((into_n1 - q_mid).abs() < 1e-6);
    assert!((out_of_n8 - q_mid).abs() < 1e-6);
}

#[test]
fn injected_flux_is_conserved_end_to_end() {
    let graph = build_chain();
    let problem = chain_problem(&graph, 500.0, 100.0, 70.0, 50.0, 300.0);
    let report = solve(&problem, &config()).unwrap();
    assert!(report.is_converged());

    let into_n1 = flux(&graph, &report.solution, "R1") + 70.0;
    let out_of_n8 = flux(&graph, &report.solution, "R9") + 50.0;
    let mid = flux(&graph, &report.solution, "R5");

    assert!((into_n1 - mid).abs() < 1e-6);
    assert!((out_of_n8 - mid).abs() < 1e-6);
    assert!((mid - 160.0 / 9.0).abs() < 1e-6);
}

#[test]
fn equal_boundaries_give_a_flat_profile() {
    let graph = build_chain();
    let problem = chain_problem(&graph, 300.0, 300.0, 0.0, 0.0, 250.0);
    let report = solve(&problem, &config()).unwrap();
    assert!(report.is_converged());

    for t in node_temps(&graph, &report.solution) {
        assert!((t - 300.0).abs() < 1e-6);
    }
    for i in 1..=N_RESISTORS {
        assert!(flux(&graph, &report.solution, &format!("R{i}")).abs() < 1e-6);
    }
}

#[test]
fn restarting_from_the_solution_takes_no_iterations() {
    let graph = build_chain();
    let first = solve(
        &chain_problem(&graph, 500.0, 100.0, 70.0, 50.0, 300.0),
        &config(),
    )
    .unwrap();
    assert!(first.is_converged());

    let mut warm = chain_problem(&graph, 500.0, 100.0, 70.0, 50.0, 300.0);
    for var in graph.state_vars() {
        warm.set_initial_guess(var, first.solution.value(var).unwrap())
            .unwrap();
    }
    let second = solve(&warm, &config()).unwrap();
    assert!(second.is_converged());
    assert_eq!(second.solution.iterations(), 0);
}

#[test]
fn iteration_records_track_the_descent() {
    let graph = build_chain();
    let report = solve(
        &chain_problem(&graph, 500.0, 100.0, 70.0, 50.0, 300.0),
        &config(),
    )
    .unwrap();
    assert!(report.is_converged());

    let records: Vec<_> = report.records().collect();
    assert!(!records.is_empty());
    for (i, rec) in records.iter().enumerate() {
        assert_eq!(rec.iteration, i);
        assert!(rec.alpha > 0.0 && rec.alpha <= 1.0);
        assert!(rec.condition > 0.0);
    }
    assert!(records.last().unwrap().residual_norm < 1e-6);
}
