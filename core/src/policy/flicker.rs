//! Schedule-driven and random flicker over a fixed set of eligible edges.

use super::{check_probability, ConnectivityPolicy, FlickerEdges};
use crate::{
    adjacency::AdjacencyMatrix,
    error::{SimError, SimResult},
    rng::SimRng,
    sir::SirState,
    types::Tick,
};

/// Eligible edges follow a repeating on/off pattern indexed by `tick mod len`.
#[derive(Debug, Clone)]
pub struct StaticFlicker {
    name:    String,
    edges:   FlickerEdges,
    pattern: Vec<bool>,
}

impl StaticFlicker {
    pub fn new(edges: FlickerEdges, pattern: Vec<bool>) -> SimResult<Self> {
        if pattern.is_empty() {
            return Err(SimError::invalid_parameter("pattern", "must not be empty"));
        }
        let shown: String = pattern.iter().map(|&on| if on { 'T' } else { 'F' }).collect();
        Ok(Self {
            name: format!("Static Flicker {shown}"),
            edges,
            pattern,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Whether eligible edges are on at `tick`.
    pub fn is_on(&self, tick: Tick) -> bool {
        self.pattern[(tick % self.pattern.len() as u64) as usize]
    }
}

impl ConnectivityPolicy for StaticFlicker {
    fn name(&self) -> &str { &self.name }

    fn active_adjacency(
        &mut self,
        base: &AdjacencyMatrix,
        _sir: &SirState,
        tick: Tick,
        _rng: &mut SimRng,
    ) -> SimResult<AdjacencyMatrix> {
        self.edges.check_base(base)?;
        let mut active = base.clone();
        if !self.is_on(tick) {
            for edge in self.edges.edges() {
                active.remove_edge(edge.0, edge.1);
            }
        }
        Ok(active)
    }
}

/// Each eligible edge is independently on with probability `p` every tick.
#[derive(Debug, Clone)]
pub struct RandomFlicker {
    name:        String,
    edges:       FlickerEdges,
    probability: f64,
}

impl RandomFlicker {
    pub fn new(edges: FlickerEdges, probability: f64) -> SimResult<Self> {
        check_probability("flicker_probability", probability)?;
        Ok(Self {
            name: format!("Random Flicker {probability}"),
            edges,
            probability,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl ConnectivityPolicy for RandomFlicker {
    fn name(&self) -> &str { &self.name }

    fn active_adjacency(
        &mut self,
        base: &AdjacencyMatrix,
        _sir: &SirState,
        _tick: Tick,
        rng: &mut SimRng,
    ) -> SimResult<AdjacencyMatrix> {
        self.edges.check_base(base)?;
        let mut active = base.clone();
        for edge in self.edges.edges() {
            if !rng.chance(self.probability) {
                active.remove_edge(edge.0, edge.1);
            }
        }
        Ok(active)
    }
}
