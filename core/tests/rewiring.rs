//! Agent-based network generation tests.

use flicker_core::{
    rewiring::{
        generate_with_retries, make_agent_generated_network, AgentBehavior,
        TimeBasedAgentRewiring,
    },
    AdjacencyMatrix, SimError, SimRng,
};

fn complete(n: usize) -> AdjacencyMatrix {
    let mut edges = Vec::new();
    for u in 0..n {
        for v in u + 1..n {
            edges.push((u, v));
        }
    }
    AdjacencyMatrix::from_edges(n, &edges).expect("complete graph")
}

#[test]
fn two_lonely_agents_pair_up_and_settle() {
    // Step 1 adds the only possible edge; step 2 sees no change and finishes.
    let mut rng = SimRng::new(1);
    let mut behavior = TimeBasedAgentRewiring::new(2, 1, 1, 1).unwrap();
    let graph = make_agent_generated_network(AdjacencyMatrix::empty(2), &mut behavior, 5, &mut rng)
        .unwrap()
        .expect("two agents should settle");

    assert_eq!(graph, AdjacencyMatrix::from_edges(2, &[(0, 1)]).unwrap());
    assert_eq!(behavior.steps_taken(), 2);
    assert!(behavior.is_stable(0));
}

#[test]
fn unfinished_generation_is_absent() {
    let mut rng = SimRng::new(1);
    let mut behavior = TimeBasedAgentRewiring::new(2, 1, 1, 1).unwrap();
    let result =
        make_agent_generated_network(AdjacencyMatrix::empty(2), &mut behavior, 1, &mut rng)
            .unwrap();
    assert!(result.is_none());
    assert_eq!(behavior.steps_taken(), 1);
}

#[test]
fn crowded_agents_drop_edges() {
    let start = complete(6);
    let mut rng = SimRng::new(2);
    let mut behavior = TimeBasedAgentRewiring::new(6, 1, 2, 3).unwrap();

    let (next, done) = behavior.step(&start, &mut rng).unwrap();
    assert!(!done);
    assert!(next.edge_count() < start.edge_count());
    assert!(next.is_subgraph_of(&start), "over-connected agents only remove edges");
    assert_eq!(start.edge_count(), 15, "input graph must not be modified");
}

#[test]
fn isolated_agents_reach_the_lower_bound() {
    // With an upper bound nobody can exceed, agents only ever add edges:
    // every pass lifts each agent under the lower bound by one.
    let mut rng = SimRng::new(3);
    let mut behavior = TimeBasedAgentRewiring::new(20, 2, 19, 2).unwrap();
    let mut graph = AdjacencyMatrix::empty(20);
    for _ in 0..2 {
        graph = behavior.step(&graph, &mut rng).unwrap().0;
    }
    for agent in 0..20 {
        assert!(graph.degree(agent) >= 2, "agent {agent} has degree {}", graph.degree(agent));
    }
}

#[test]
fn retries_give_up_after_max_failures() {
    let mut rng = SimRng::new(4);
    let mut built = 0;
    let result = generate_with_retries(
        &AdjacencyMatrix::empty(2),
        || {
            built += 1;
            let behavior: Box<dyn AgentBehavior> =
                Box::new(TimeBasedAgentRewiring::new(2, 1, 1, 1)?);
            Ok(behavior)
        },
        1,
        3,
        &mut rng,
    );

    assert!(matches!(result, Err(SimError::GenerationExhausted { attempts: 3 })));
    assert_eq!(built, 3, "one fresh behavior per attempt");
}

#[test]
fn retries_return_the_first_settled_graph() {
    let mut rng = SimRng::new(5);
    let graph = generate_with_retries(
        &AdjacencyMatrix::empty(2),
        || {
            let behavior: Box<dyn AgentBehavior> =
                Box::new(TimeBasedAgentRewiring::new(2, 1, 1, 1)?);
            Ok(behavior)
        },
        10,
        3,
        &mut rng,
    )
    .unwrap();
    assert_eq!(graph.edge_count(), 1);
}

#[test]
fn bounds_are_validated() {
    assert!(TimeBasedAgentRewiring::new(5, 3, 2, 1).is_err());
    assert!(TimeBasedAgentRewiring::new(5, 0, 0, 1).is_err());
}

#[test]
fn step_rejects_a_graph_of_the_wrong_size() {
    let mut rng = SimRng::new(6);
    let mut behavior = TimeBasedAgentRewiring::new(4, 1, 2, 1).unwrap();
    assert!(matches!(
        behavior.step(&AdjacencyMatrix::empty(5), &mut rng),
        Err(SimError::DimensionMismatch { expected: 4, actual: 5 })
    ));
}

#[test]
fn stable_agents_link_only_to_long_stable_partners() {
    // lower_bound 0 keeps unstable agents idle, so every new edge comes
    // from the stable rule.
    let mut rng = SimRng::new(7);
    let mut behavior = TimeBasedAgentRewiring::new(10, 0, 4, 1).unwrap();
    let mut graph = AdjacencyMatrix::empty(10);

    for step in 1..=12 {
        let before: Vec<u64> = (0..10).map(|u| behavior.time_stable(u)).collect();
        let (next, _) = behavior.step(&graph, &mut rng).unwrap();

        assert!(graph.is_subgraph_of(&next), "step {step} removed an edge");
        for edge in next.edges() {
            if graph.has_edge(edge.0, edge.1) {
                continue;
            }
            let (a, b) = (before[edge.0], before[edge.1]);
            assert!(a.min(b) >= 1, "step {step}: {edge:?} joined an unstable agent");
            assert!(a.max(b) > 1, "step {step}: {edge:?} has no long-stable partner");
        }
        for agent in 0..10 {
            assert!(next.degree(agent) <= 3, "agent {agent} exceeds upper_bound - 1");
        }
        graph = next;
    }
    assert!(graph.edge_count() > 0, "stable agents never reached out");
}
