//! Connectivity policies: which base edges carry transmission each tick.
//!
//! RULE: A policy returns a fresh active adjacency every tick. It never
//! writes to the base matrix, so deactivation is always transient.
//! The engine calls `active_adjacency()` once per tick, before transmission.

mod flicker;
mod multi;
mod no_update;
mod pressure;

pub use flicker::{RandomFlicker, StaticFlicker};
pub use multi::MultiPolicy;
pub use no_update::NoUpdate;
pub use pressure::{
    BetweenDistancePressureHandler, DistancePressureHandler, GlobalPressureHandler,
    MultiPressureHandler, PressureFlicker, PressureHandler,
};

use crate::{
    adjacency::{AdjacencyMatrix, Edge},
    error::{SimError, SimResult},
    rng::SimRng,
    sir::SirState,
    types::{NodeId, Tick},
};

/// The contract every connectivity policy must fulfill.
pub trait ConnectivityPolicy: Send {
    /// Stable display name, used in logs and run records.
    fn name(&self) -> &str;

    /// Called once per tick by the engine.
    ///
    /// - `base`: the maximum potential connectivity, read-only
    /// - `sir`:  the state at the start of this tick
    /// - `tick`: the tick being computed
    /// - `rng`:  the run's RNG
    ///
    /// Returns a subgraph of `base`.
    fn active_adjacency(
        &mut self,
        base: &AdjacencyMatrix,
        sir: &SirState,
        tick: Tick,
        rng: &mut SimRng,
    ) -> SimResult<AdjacencyMatrix>;
}

/// The edges a policy is allowed to toggle. Everything else stays active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlickerEdges {
    node_count: usize,
    edges:      Vec<Edge>,
}

impl FlickerEdges {
    /// Every listed pair must be an edge of `base`.
    pub fn new(base: &AdjacencyMatrix, pairs: &[(NodeId, NodeId)]) -> SimResult<Self> {
        let n = base.node_count();
        let mut edges = Vec::with_capacity(pairs.len());
        for &(u, v) in pairs {
            if u >= n || v >= n || !base.has_edge(u, v) {
                return Err(SimError::InvalidArgument(format!(
                    "flicker edge ({u}, {v}) is not an edge of the base network"
                )));
            }
            edges.push(Edge::new(u, v));
        }
        edges.sort_unstable();
        edges.dedup();
        Ok(Self { node_count: n, edges })
    }

    /// Every edge of `base` is eligible.
    pub fn all(base: &AdjacencyMatrix) -> Self {
        Self { node_count: base.node_count(), edges: base.edges() }
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Share of the base network's edges that may flicker.
    pub fn proportion_of(&self, base: &AdjacencyMatrix) -> f64 {
        let total = base.edge_count();
        if total == 0 { 0.0 } else { self.edges.len() as f64 / total as f64 }
    }

    pub(crate) fn check_base(&self, base: &AdjacencyMatrix) -> SimResult<()> {
        if base.node_count() != self.node_count {
            return Err(SimError::DimensionMismatch {
                expected: self.node_count,
                actual:   base.node_count(),
            });
        }
        Ok(())
    }
}

pub(crate) fn check_probability(name: &'static str, p: f64) -> SimResult<()> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(SimError::invalid_parameter(name, format!("must be in [0, 1], got {p}")))
    }
}
