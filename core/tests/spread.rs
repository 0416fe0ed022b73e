//! End-to-end SIR spread tests.
//!
//! Covers: the ring walkthrough, zero transmission, compartment
//! invariants, and the independent-OR rule for several infectious neighbors.

use flicker_core::{
    make_starting_sir,
    policy::{FlickerEdges, NoUpdate, RandomFlicker},
    simulate, AdjacencyMatrix, Compartment, Disease, InitialInfected, SimEngine, SimError, SimRng,
    SirState,
};

fn ring4() -> AdjacencyMatrix {
    AdjacencyMatrix::from_edges(4, &[(0, 1), (1, 2), (2, 3), (3, 0)]).expect("ring")
}

fn infected_at(n: usize, nodes: &[usize], disease: &Disease) -> SirState {
    let selection = InitialInfected::Nodes(nodes.iter().copied().collect());
    make_starting_sir(n, &selection, disease, &mut SimRng::new(0)).expect("starting state")
}

fn random_graph(n: usize, p: f64, rng: &mut SimRng) -> AdjacencyMatrix {
    let mut edges = Vec::new();
    for u in 0..n {
        for v in u + 1..n {
            if rng.chance(p) {
                edges.push((u, v));
            }
        }
    }
    AdjacencyMatrix::from_edges(n, &edges).expect("random graph")
}

#[test]
fn ring_with_certain_transmission_spreads_both_ways() {
    let ring = ring4();
    let disease = Disease::new(1, 1.0).unwrap();
    let sir0 = infected_at(4, &[0], &disease);
    let mut rng = SimRng::new(1);

    let history = simulate(&ring, &sir0, &disease, &mut NoUpdate, 2, &mut rng).unwrap();
    assert_eq!(history.len(), 3);

    let t1 = history.get(1).unwrap();
    assert!(t1.is_recovered(0));
    assert!(t1.is_infectious(1));
    assert!(t1.is_infectious(3));
    assert!(t1.is_susceptible(2));

    let t2 = history.get(2).unwrap();
    assert!(t2.is_recovered(0), "Recovered must be absorbing");
    assert!(t2.is_recovered(1));
    assert!(t2.is_recovered(3));
    assert!(t2.is_infectious(2), "node 2 should be infected by both neighbors");
}

#[test]
fn zero_transmission_only_patient_zero_changes() {
    let ring = ring4();
    let disease = Disease::new(3, 0.0).unwrap();
    let sir0 = infected_at(4, &[0], &disease);
    let mut rng = SimRng::new(2);

    let history = simulate(&ring, &sir0, &disease, &mut NoUpdate, 10, &mut rng).unwrap();

    for (tick, state) in history.iter().enumerate() {
        for node in 1..4 {
            assert!(state.is_susceptible(node), "node {node} changed at tick {tick}");
        }
        if tick < 3 {
            assert!(state.is_infectious(0), "node 0 should be infectious at tick {tick}");
        } else {
            assert!(state.is_recovered(0), "node 0 should be recovered at tick {tick}");
        }
    }

    let expected = SirState::from_compartments(
        sir0.compartments()
            .iter()
            .map(|c| if c.is_infectious() { Compartment::Recovered } else { *c })
            .collect(),
    )
    .unwrap();
    assert_eq!(history.final_state(), &expected);
    assert_eq!(history.time_to_extinction(), Some(3));
}

#[test]
fn zero_transmission_never_grows_infectious_count() {
    let mut graph_rng = SimRng::new(77);
    let graph = random_graph(50, 0.2, &mut graph_rng);
    let disease = Disease::new(5, 0.0).unwrap();
    let mut rng = SimRng::new(78);
    let sir0 = make_starting_sir(50, &InitialInfected::Count(10), &disease, &mut rng).unwrap();

    let history = simulate(&graph, &sir0, &disease, &mut NoUpdate, 20, &mut rng).unwrap();
    let counts = history.infectious_counts();
    for pair in counts.windows(2) {
        assert!(pair[1] <= pair[0], "infectious count grew: {counts:?}");
    }
}

#[test]
fn compartments_stay_consistent_and_recovery_is_absorbing() {
    let mut graph_rng = SimRng::new(5);
    let graph = random_graph(60, 0.1, &mut graph_rng);
    let disease = Disease::new(3, 0.4).unwrap();
    let mut rng = SimRng::new(6);
    let sir0 = make_starting_sir(60, &InitialInfected::Count(3), &disease, &mut rng).unwrap();
    let mut policy = RandomFlicker::new(FlickerEdges::all(&graph), 0.5).unwrap();

    let history = simulate(&graph, &sir0, &disease, &mut policy, 100, &mut rng).unwrap();
    assert_eq!(history.len(), 101);
    assert_eq!(history.initial(), &sir0);

    for state in history.iter() {
        assert_eq!(state.counts().total(), 60);
        for c in state.compartments() {
            if let Compartment::Infectious { remaining } = c {
                assert!(*remaining >= 1 && *remaining <= 3, "bad counter {remaining}");
            }
        }
    }

    let snapshots: Vec<_> = history.iter().collect();
    for pair in snapshots.windows(2) {
        for node in 0..60 {
            if pair[0].is_recovered(node) {
                assert!(pair[1].is_recovered(node), "node {node} left Recovered");
            }
            if !pair[0].is_susceptible(node) {
                assert!(!pair[1].is_susceptible(node), "node {node} became Susceptible again");
            }
        }
    }
}

/// A susceptible hub with k infectious leaves is infected with
/// probability 1 - (1 - p)^k.
#[test]
fn several_infectious_neighbors_combine_independently() {
    let star = AdjacencyMatrix::from_edges(4, &[(0, 1), (0, 2), (0, 3)]).unwrap();
    let disease = Disease::new(1, 0.3).unwrap();
    let sir0 = infected_at(4, &[1, 2, 3], &disease);

    const TRIALS: u64 = 4000;
    let mut infected = 0u64;
    for seed in 0..TRIALS {
        let mut rng = SimRng::new(seed);
        let history = simulate(&star, &sir0, &disease, &mut NoUpdate, 1, &mut rng).unwrap();
        if history.final_state().is_infectious(0) {
            infected += 1;
        }
    }

    let observed = infected as f64 / TRIALS as f64;
    let expected = 1.0 - 0.7_f64.powi(3);
    assert!(
        (observed - expected).abs() < 0.03,
        "observed {observed:.3}, expected {expected:.3}"
    );
}

#[test]
fn newly_infected_nodes_wait_a_tick_before_spreading() {
    let path = AdjacencyMatrix::from_edges(3, &[(0, 1), (1, 2)]).unwrap();
    let disease = Disease::new(5, 1.0).unwrap();
    let sir0 = infected_at(3, &[0], &disease);
    let mut rng = SimRng::new(9);

    let history = simulate(&path, &sir0, &disease, &mut NoUpdate, 1, &mut rng).unwrap();
    assert!(history.final_state().is_infectious(1));
    assert!(history.final_state().is_susceptible(2));
}

#[test]
fn engine_steps_match_simulate() {
    let ring = ring4();
    let disease = Disease::new(2, 0.6).unwrap();
    let sir0 = infected_at(4, &[2], &disease);

    let mut rng_a = SimRng::new(31);
    let from_simulate = simulate(&ring, &sir0, &disease, &mut NoUpdate, 6, &mut rng_a).unwrap();

    let mut rng_b = SimRng::new(31);
    let mut policy = NoUpdate;
    let mut engine = SimEngine::new(&ring, sir0.clone(), disease, &mut policy).unwrap();
    for _ in 0..6 {
        engine.tick(&mut rng_b).unwrap();
    }
    assert_eq!(engine.current_tick(), 6);
    assert_eq!(engine.into_history(), from_simulate);
}

#[test]
fn mismatched_state_size_is_rejected_up_front() {
    let ring = ring4();
    let disease = Disease::default();
    let sir0 = SirState::all_susceptible(5);
    let mut rng = SimRng::new(0);

    let result = simulate(&ring, &sir0, &disease, &mut NoUpdate, 5, &mut rng);
    assert!(matches!(
        result,
        Err(SimError::DimensionMismatch { expected: 4, actual: 5 })
    ));
}

#[test]
fn history_metrics_track_the_epidemic_curve() {
    let ring = ring4();
    let disease = Disease::new(1, 1.0).unwrap();
    let sir0 = infected_at(4, &[0], &disease);
    let mut rng = SimRng::new(4);

    let history = simulate(&ring, &sir0, &disease, &mut NoUpdate, 5, &mut rng).unwrap();
    assert_eq!(history.infectious_counts(), vec![1, 2, 1, 0, 0, 0]);
    assert_eq!(history.peak_infectious(), (1, 2));
    assert_eq!(history.time_to_extinction(), Some(3));
    assert_eq!(history.survival_rate(), 0.0);
}
