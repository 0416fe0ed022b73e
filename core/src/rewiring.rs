//! Agent-driven network generation.
//!
//! Agents rewire their own connections each step until the graph settles.
//! This shares the policy shape (graph in, graph out, RNG threaded through)
//! but drives generation, not spread: a step returns the next graph and
//! whether the process is finished.
//!
//! RULE: Generation that cannot settle within its budget is reported as
//! an absent result. Retrying is bounded and counted; nothing recurses.

use crate::{
    adjacency::AdjacencyMatrix,
    error::{SimError, SimResult},
    rng::SimRng,
    types::NodeId,
};
use std::collections::BTreeSet;

/// One generation step over the whole population.
pub trait AgentBehavior: Send {
    fn name(&self) -> &str;

    /// Returns the next graph and whether generation is finished.
    fn step(
        &mut self,
        graph: &AdjacencyMatrix,
        rng: &mut SimRng,
    ) -> SimResult<(AdjacencyMatrix, bool)>;
}

/// Agents aim for a degree in `[lower_bound, upper_bound]`.
///
/// Unstable agents below `lower_bound` connect to a neighbor of their
/// strongest neighbor (highest common-neighbor proportion), or to a random
/// node when that yields nothing; above `upper_bound` they drop their
/// weakest neighbor.
///
/// An agent whose neighbor set survives a full pass unchanged gains one
/// tick of stability; any change resets it. After `steps_to_stable` ticks
/// the agent only reaches out while its degree is below `upper_bound - 1`,
/// and only to agents stable for more than `steps_to_stable` passes with
/// room to spare.
pub struct TimeBasedAgentRewiring {
    name:               String,
    lower_bound:        usize,
    upper_bound:        usize,
    steps_to_stable:    u64,
    time_stable:        Vec<u64>,
    previous_neighbors: Vec<BTreeSet<NodeId>>,
    steps_taken:        u64,
}

impl TimeBasedAgentRewiring {
    pub fn new(
        n: usize,
        lower_bound: usize,
        upper_bound: usize,
        steps_to_stable: u64,
    ) -> SimResult<Self> {
        if upper_bound == 0 {
            return Err(SimError::invalid_parameter("upper_bound", "must be positive"));
        }
        if lower_bound > upper_bound {
            return Err(SimError::invalid_parameter(
                "lower_bound",
                format!("{lower_bound} exceeds upper_bound {upper_bound}"),
            ));
        }
        Ok(Self {
            name: format!(
                "TimeBasedBehavior(N={n}, lb={lower_bound}, ub={upper_bound}, sts={steps_to_stable})"
            ),
            lower_bound,
            upper_bound,
            steps_to_stable,
            time_stable: vec![0; n],
            previous_neighbors: vec![BTreeSet::new(); n],
            steps_taken: 0,
        })
    }

    pub fn steps_taken(&self) -> u64 {
        self.steps_taken
    }

    /// True once the agent's neighbors have held for `steps_to_stable` passes.
    pub fn is_stable(&self, agent: NodeId) -> bool {
        self.time_stable[agent] >= self.steps_to_stable
    }

    /// Passes in a row the agent's neighbor set has not changed.
    pub fn time_stable(&self, agent: NodeId) -> u64 {
        self.time_stable[agent]
    }

    /// Stable agents only link to partners that have been stable strictly
    /// longer than `steps_to_stable`.
    fn accepts_partner(&self, agent: NodeId) -> bool {
        self.time_stable[agent] > self.steps_to_stable
    }

    fn unstable_action(
        &self,
        graph: &mut AdjacencyMatrix,
        degrees: &mut [usize],
        agent: NodeId,
        neighbors: &[NodeId],
        rng: &mut SimRng,
    ) {
        if neighbors.len() < self.lower_bound {
            let via_neighbor = strongest(graph, agent, neighbors).and_then(|closest| {
                let choices: Vec<NodeId> = graph
                    .neighbors(closest)
                    .filter(|&c| c != agent && !neighbors.contains(&c))
                    .collect();
                rng.choose(&choices)
            });
            let target = match via_neighbor {
                Some(target) => Some(target),
                None => random_non_neighbor(graph, agent, neighbors, rng),
            };
            if let Some(target) = target {
                link(graph, degrees, agent, target);
            }
        } else if neighbors.len() > self.upper_bound {
            if let Some(farthest) = weakest(graph, agent, neighbors) {
                unlink(graph, degrees, agent, farthest);
            }
        }
    }

    fn stable_action(
        &self,
        graph: &mut AdjacencyMatrix,
        degrees: &mut [usize],
        agent: NodeId,
        neighbors: &[NodeId],
        rng: &mut SimRng,
    ) {
        if neighbors.len() + 1 >= self.upper_bound {
            return;
        }
        let choices: Vec<NodeId> = (0..graph.node_count())
            .filter(|&c| c != agent && !neighbors.contains(&c))
            .filter(|&c| self.accepts_partner(c) && degrees[c] + 1 < self.upper_bound)
            .collect();
        if let Some(target) = rng.choose(&choices) {
            link(graph, degrees, agent, target);
        }
    }
}

impl AgentBehavior for TimeBasedAgentRewiring {
    fn name(&self) -> &str { &self.name }

    fn step(
        &mut self,
        graph: &AdjacencyMatrix,
        rng: &mut SimRng,
    ) -> SimResult<(AdjacencyMatrix, bool)> {
        let n = self.time_stable.len();
        if graph.node_count() != n {
            return Err(SimError::DimensionMismatch { expected: n, actual: graph.node_count() });
        }

        let mut next = graph.clone();
        let mut degrees: Vec<usize> = (0..n).map(|u| next.degree(u)).collect();
        let mut agents: Vec<NodeId> = (0..n).collect();
        rng.shuffle(&mut agents);
        for &agent in &agents {
            let neighbors: Vec<NodeId> = next.neighbors(agent).collect();
            if self.is_stable(agent) {
                self.stable_action(&mut next, &mut degrees, agent, &neighbors, rng);
            } else {
                self.unstable_action(&mut next, &mut degrees, agent, &neighbors, rng);
            }
        }

        // Stability is judged after every agent has acted, so an edge added
        // and removed within the same pass counts as no change.
        for agent in 0..n {
            let neighbors: BTreeSet<NodeId> = next.neighbors(agent).collect();
            if neighbors == self.previous_neighbors[agent] {
                self.time_stable[agent] += 1;
            } else {
                self.time_stable[agent] = 0;
            }
            self.previous_neighbors[agent] = neighbors;
        }

        self.steps_taken += 1;
        let done = self.time_stable.iter().all(|&t| t > 0) && next.is_connected();
        Ok((next, done))
    }
}

fn link(graph: &mut AdjacencyMatrix, degrees: &mut [usize], u: NodeId, v: NodeId) {
    if u != v && !graph.has_edge(u, v) {
        graph.add_edge(u, v);
        degrees[u] += 1;
        degrees[v] += 1;
    }
}

fn unlink(graph: &mut AdjacencyMatrix, degrees: &mut [usize], u: NodeId, v: NodeId) {
    if graph.has_edge(u, v) {
        graph.remove_edge(u, v);
        degrees[u] -= 1;
        degrees[v] -= 1;
    }
}

/// Neighbor with the highest common-neighbor proportion; first wins ties.
fn strongest(graph: &AdjacencyMatrix, agent: NodeId, neighbors: &[NodeId]) -> Option<NodeId> {
    let mut best: Option<(NodeId, f64)> = None;
    for &v in neighbors {
        let strength = graph.common_neighbor_proportion(agent, v);
        if best.map_or(true, |(_, s)| strength > s) {
            best = Some((v, strength));
        }
    }
    best.map(|(v, _)| v)
}

/// Neighbor with the lowest common-neighbor proportion; first wins ties.
fn weakest(graph: &AdjacencyMatrix, agent: NodeId, neighbors: &[NodeId]) -> Option<NodeId> {
    let mut worst: Option<(NodeId, f64)> = None;
    for &v in neighbors {
        let strength = graph.common_neighbor_proportion(agent, v);
        if worst.map_or(true, |(_, s)| strength < s) {
            worst = Some((v, strength));
        }
    }
    worst.map(|(v, _)| v)
}

fn random_non_neighbor(
    graph: &AdjacencyMatrix,
    agent: NodeId,
    neighbors: &[NodeId],
    rng: &mut SimRng,
) -> Option<NodeId> {
    let choices: Vec<NodeId> = (0..graph.node_count())
        .filter(|&c| c != agent && !neighbors.contains(&c))
        .collect();
    rng.choose(&choices)
}

/// Step `behavior` from `start` until it reports done.
/// Returns `None` if it is still unfinished after `max_steps` steps.
pub fn make_agent_generated_network(
    start: AdjacencyMatrix,
    behavior: &mut dyn AgentBehavior,
    max_steps: u64,
    rng: &mut SimRng,
) -> SimResult<Option<AdjacencyMatrix>> {
    let mut graph = start;
    for step in 1..=max_steps {
        let (next, done) = behavior.step(&graph, rng)?;
        graph = next;
        if done {
            log::debug!("{} settled after {step} steps", behavior.name());
            return Ok(Some(graph));
        }
    }
    log::debug!("{} did not settle within {max_steps} steps", behavior.name());
    Ok(None)
}

/// Generate with a fresh behavior per attempt until one settles.
/// Gives up with `GenerationExhausted` after `max_failures` failures in a row.
pub fn generate_with_retries<F>(
    start: &AdjacencyMatrix,
    mut make_behavior: F,
    max_steps: u64,
    max_failures: usize,
    rng: &mut SimRng,
) -> SimResult<AdjacencyMatrix>
where
    F: FnMut() -> SimResult<Box<dyn AgentBehavior>>,
{
    let mut failures = 0usize;
    while failures < max_failures {
        let mut behavior = make_behavior()?;
        match make_agent_generated_network(start.clone(), behavior.as_mut(), max_steps, rng)? {
            Some(graph) => {
                log::info!(
                    "{}: generated {} edges after {failures} failed attempts",
                    behavior.name(),
                    graph.edge_count()
                );
                return Ok(graph);
            }
            None => {
                failures += 1;
                log::warn!(
                    "{}: attempt failed ({failures}/{max_failures})",
                    behavior.name()
                );
            }
        }
    }
    Err(SimError::GenerationExhausted { attempts: failures })
}
