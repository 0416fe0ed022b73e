//! Pressure-driven flicker: a simulated social-distancing response.
//!
//! A `PressureHandler` turns the current SIR state into a per-node
//! pressure in [0, 1]. `PressureFlicker` then switches eligible edges off
//! with a probability that grows with the pressure at either endpoint.
//!
//! Distance bands are half-open on the near side (`min < d <= max`), so
//! handlers built on bands like (0, 1], (1, 2], (2, 3] never overlap and
//! can carry different response intensities.

use super::{check_probability, ConnectivityPolicy, FlickerEdges};
use crate::{
    adjacency::{AdjacencyMatrix, DistanceMatrix},
    error::{SimError, SimResult},
    rng::SimRng,
    sir::SirState,
    types::{NodeId, Tick},
};

pub trait PressureHandler: Send {
    /// Pressure at every node, each in [0, 1].
    fn pressures(&self, sir: &SirState) -> SimResult<Vec<f64>>;
}

/// Fraction of the nodes inside a fixed distance band that are Infectious.
#[derive(Debug, Clone)]
struct BandMembers {
    members: Vec<Vec<NodeId>>,
}

impl BandMembers {
    fn new(distances: &DistanceMatrix, min: u32, max: u32) -> Self {
        let members = (0..distances.node_count())
            .map(|u| distances.nodes_in_band(u, min, max))
            .collect();
        Self { members }
    }

    fn pressures(&self, sir: &SirState) -> SimResult<Vec<f64>> {
        if sir.len() != self.members.len() {
            return Err(SimError::DimensionMismatch {
                expected: self.members.len(),
                actual:   sir.len(),
            });
        }
        Ok(self
            .members
            .iter()
            .map(|members| {
                if members.is_empty() {
                    return 0.0;
                }
                let infectious = members.iter().filter(|&&v| sir.is_infectious(v)).count();
                infectious as f64 / members.len() as f64
            })
            .collect())
    }
}

/// Pressure from every node within `radius` hops.
#[derive(Debug, Clone)]
pub struct DistancePressureHandler {
    radius: u32,
    band:   BandMembers,
}

impl DistancePressureHandler {
    pub fn new(distances: &DistanceMatrix, radius: u32) -> Self {
        Self { radius, band: BandMembers::new(distances, 0, radius) }
    }

    pub fn radius(&self) -> u32 {
        self.radius
    }
}

impl PressureHandler for DistancePressureHandler {
    fn pressures(&self, sir: &SirState) -> SimResult<Vec<f64>> {
        self.band.pressures(sir)
    }
}

/// Pressure from the nodes whose distance d satisfies `min < d <= max`.
#[derive(Debug, Clone)]
pub struct BetweenDistancePressureHandler {
    band: BandMembers,
}

impl BetweenDistancePressureHandler {
    pub fn new(distances: &DistanceMatrix, min: u32, max: u32) -> SimResult<Self> {
        if min >= max {
            return Err(SimError::invalid_parameter(
                "distance band",
                format!("min ({min}) must be below max ({max})"),
            ));
        }
        Ok(Self { band: BandMembers::new(distances, min, max) })
    }
}

impl PressureHandler for BetweenDistancePressureHandler {
    fn pressures(&self, sir: &SirState) -> SimResult<Vec<f64>> {
        self.band.pressures(sir)
    }
}

/// Every node feels the population-wide infectious fraction.
#[derive(Debug, Clone, Default)]
pub struct GlobalPressureHandler;

impl PressureHandler for GlobalPressureHandler {
    fn pressures(&self, sir: &SirState) -> SimResult<Vec<f64>> {
        let share = if sir.is_empty() {
            0.0
        } else {
            sir.counts().infectious as f64 / sir.len() as f64
        };
        Ok(vec![share; sir.len()])
    }
}

/// Combines handlers by taking the strongest pressure at each node.
pub struct MultiPressureHandler {
    handlers: Vec<Box<dyn PressureHandler>>,
}

impl MultiPressureHandler {
    pub fn new(handlers: Vec<Box<dyn PressureHandler>>) -> SimResult<Self> {
        if handlers.is_empty() {
            return Err(SimError::invalid_parameter("handlers", "must not be empty"));
        }
        Ok(Self { handlers })
    }
}

impl PressureHandler for MultiPressureHandler {
    fn pressures(&self, sir: &SirState) -> SimResult<Vec<f64>> {
        let mut combined = vec![0.0_f64; sir.len()];
        for handler in &self.handlers {
            for (acc, p) in combined.iter_mut().zip(handler.pressures(sir)?) {
                *acc = acc.max(p);
            }
        }
        Ok(combined)
    }
}

/// Switches eligible edges off with probability
/// `flicker_probability * max(pressure(u), pressure(v))`.
/// Pressures under `threshold` count as zero.
pub struct PressureFlicker {
    name:                String,
    handler:             Box<dyn PressureHandler>,
    flicker_probability: f64,
    threshold:           f64,
    edges:               Option<FlickerEdges>,
}

impl PressureFlicker {
    pub fn new(handler: Box<dyn PressureHandler>, flicker_probability: f64) -> SimResult<Self> {
        check_probability("flicker_probability", flicker_probability)?;
        Ok(Self {
            name: format!("Pressure Flicker {flicker_probability}"),
            handler,
            flicker_probability,
            threshold: 0.0,
            edges: None,
        })
    }

    /// Convenience for the common single-radius setup.
    pub fn with_radius(
        distances: &DistanceMatrix,
        radius: u32,
        flicker_probability: f64,
    ) -> SimResult<Self> {
        let handler = DistancePressureHandler::new(distances, radius);
        Ok(Self::new(Box::new(handler), flicker_probability)?
            .with_name(format!("Pressure R={radius} {flicker_probability}")))
    }

    pub fn with_threshold(mut self, threshold: f64) -> SimResult<Self> {
        check_probability("threshold", threshold)?;
        self.threshold = threshold;
        Ok(self)
    }

    /// Restrict the response to these edges. Defaults to every base edge.
    pub fn with_edges(mut self, edges: FlickerEdges) -> Self {
        self.edges = Some(edges);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Chance that an edge stays on, given its endpoints' pressures.
    pub fn activation_probability(&self, pressure_u: f64, pressure_v: f64) -> f64 {
        let pressure = pressure_u.max(pressure_v);
        if pressure < self.threshold {
            1.0
        } else {
            1.0 - self.flicker_probability * pressure
        }
    }
}

impl ConnectivityPolicy for PressureFlicker {
    fn name(&self) -> &str { &self.name }

    fn active_adjacency(
        &mut self,
        base: &AdjacencyMatrix,
        sir: &SirState,
        tick: Tick,
        rng: &mut SimRng,
    ) -> SimResult<AdjacencyMatrix> {
        let pressures = self.handler.pressures(sir)?;
        if pressures.len() != base.node_count() {
            return Err(SimError::DimensionMismatch {
                expected: base.node_count(),
                actual:   pressures.len(),
            });
        }

        let all_edges;
        let eligible = match &self.edges {
            Some(edges) => {
                edges.check_base(base)?;
                edges.edges()
            }
            None => {
                all_edges = base.edges();
                &all_edges[..]
            }
        };

        let mut active = base.clone();
        let mut switched_off = 0usize;
        for edge in eligible {
            let keep = self.activation_probability(pressures[edge.0], pressures[edge.1]);
            if keep < 1.0 && !rng.chance(keep) {
                active.remove_edge(edge.0, edge.1);
                switched_off += 1;
            }
        }
        log::trace!("tick={tick} {}: {switched_off} edges off", self.name);
        Ok(active)
    }
}
