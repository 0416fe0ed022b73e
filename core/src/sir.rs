//! Per-node SIR compartments and the initial-state builder.
//!
//! RULE: Recovered is absorbing. Nothing in the engine moves a node
//! out of Recovered, and no node starts there.

use crate::{
    disease::Disease,
    error::{SimError, SimResult},
    rng::SimRng,
    types::NodeId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Compartment {
    Susceptible,
    /// `remaining` ticks of infectiousness left, always > 0.
    Infectious { remaining: u32 },
    Recovered,
}

impl Compartment {
    pub fn is_susceptible(&self) -> bool {
        matches!(self, Self::Susceptible)
    }

    pub fn is_infectious(&self) -> bool {
        matches!(self, Self::Infectious { .. })
    }

    pub fn is_recovered(&self) -> bool {
        matches!(self, Self::Recovered)
    }
}

/// Compartment totals for one snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SirCounts {
    pub susceptible: usize,
    pub infectious:  usize,
    pub recovered:   usize,
}

impl SirCounts {
    pub fn total(&self) -> usize {
        self.susceptible + self.infectious + self.recovered
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSirState")]
pub struct SirState {
    nodes: Vec<Compartment>,
}

#[derive(Deserialize)]
struct RawSirState {
    nodes: Vec<Compartment>,
}

impl TryFrom<RawSirState> for SirState {
    type Error = SimError;

    fn try_from(raw: RawSirState) -> SimResult<Self> {
        SirState::from_compartments(raw.nodes)
    }
}

impl SirState {
    /// Every node Susceptible.
    pub fn all_susceptible(n: usize) -> Self {
        Self { nodes: vec![Compartment::Susceptible; n] }
    }

    /// Build a state from explicit compartments. Rejects an Infectious
    /// entry with a zero counter.
    pub fn from_compartments(nodes: Vec<Compartment>) -> SimResult<Self> {
        if let Some(node) = nodes
            .iter()
            .position(|c| matches!(c, Compartment::Infectious { remaining: 0 }))
        {
            return Err(SimError::InvalidArgument(format!(
                "node {node} is infectious with no remaining duration"
            )));
        }
        Ok(Self { nodes })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, node: NodeId) -> Option<Compartment> {
        self.nodes.get(node).copied()
    }

    pub fn compartments(&self) -> &[Compartment] {
        &self.nodes
    }

    pub fn is_susceptible(&self, node: NodeId) -> bool {
        self.nodes[node].is_susceptible()
    }

    pub fn is_infectious(&self, node: NodeId) -> bool {
        self.nodes[node].is_infectious()
    }

    pub fn is_recovered(&self, node: NodeId) -> bool {
        self.nodes[node].is_recovered()
    }

    pub fn infectious_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_infectious())
            .map(|(i, _)| i)
    }

    pub fn counts(&self) -> SirCounts {
        let mut counts = SirCounts::default();
        for c in &self.nodes {
            match c {
                Compartment::Susceptible       => counts.susceptible += 1,
                Compartment::Infectious { .. } => counts.infectious += 1,
                Compartment::Recovered         => counts.recovered += 1,
            }
        }
        counts
    }

    /// Fraction of the population still Susceptible.
    pub fn survival_rate(&self) -> f64 {
        if self.nodes.is_empty() {
            return 0.0;
        }
        self.counts().susceptible as f64 / self.nodes.len() as f64
    }

    /// Move a Susceptible node to Infectious. Other compartments are left alone.
    pub(crate) fn infect(&mut self, node: NodeId, duration: u32) {
        if self.nodes[node].is_susceptible() {
            self.nodes[node] = Compartment::Infectious { remaining: duration };
        }
    }

    /// Count down one tick of infectiousness; Recovered at zero.
    pub(crate) fn advance_infection(&mut self, node: NodeId) {
        if let Compartment::Infectious { remaining } = self.nodes[node] {
            self.nodes[node] = if remaining <= 1 {
                Compartment::Recovered
            } else {
                Compartment::Infectious { remaining: remaining - 1 }
            };
        }
    }
}

/// Which nodes start infectious.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialInfected {
    /// Exactly these nodes.
    Nodes(BTreeSet<NodeId>),
    /// This many nodes, sampled uniformly without replacement.
    Count(usize),
    /// This share of the population (rounded), sampled like `Count`.
    Fraction(f64),
}

/// Build the tick-0 state: the selected nodes Infectious with a full
/// `infectious_duration`, every other node Susceptible.
pub fn make_starting_sir(
    n: usize,
    selection: &InitialInfected,
    disease: &Disease,
    rng: &mut SimRng,
) -> SimResult<SirState> {
    let infected: Vec<NodeId> = match selection {
        InitialInfected::Nodes(nodes) => {
            if let Some(&bad) = nodes.iter().find(|&&i| i >= n) {
                return Err(SimError::InvalidArgument(format!(
                    "initial infected node {bad} is outside a population of {n}"
                )));
            }
            nodes.iter().copied().collect()
        }
        InitialInfected::Count(count) => sample_infected(n, *count, rng)?,
        InitialInfected::Fraction(fraction) => {
            if !(0.0..=1.0).contains(fraction) {
                return Err(SimError::InvalidArgument(format!(
                    "initial infected fraction must be in [0, 1], got {fraction}"
                )));
            }
            let count = (fraction * n as f64).round() as usize;
            sample_infected(n, count, rng)?
        }
    };

    let mut state = SirState::all_susceptible(n);
    for node in infected {
        state.infect(node, disease.infectious_duration());
    }
    log::debug!("starting state: {:?}", state.counts());
    Ok(state)
}

fn sample_infected(n: usize, count: usize, rng: &mut SimRng) -> SimResult<Vec<NodeId>> {
    if count > n {
        return Err(SimError::InvalidArgument(format!(
            "cannot infect {count} nodes in a population of {n}"
        )));
    }
    Ok(rng.sample_nodes(n, count))
}
