use super::ConnectivityPolicy;
use crate::{
    adjacency::AdjacencyMatrix,
    error::{SimError, SimResult},
    rng::SimRng,
    sir::SirState,
    types::Tick,
};

/// Layers several policies. An edge is active only if every layer keeps it
/// active, so the most restrictive layer wins per edge.
///
/// Layers are consulted in registration order and share the run's RNG.
pub struct MultiPolicy {
    name:     String,
    policies: Vec<Box<dyn ConnectivityPolicy>>,
}

impl MultiPolicy {
    pub fn new(policies: Vec<Box<dyn ConnectivityPolicy>>) -> SimResult<Self> {
        if policies.is_empty() {
            return Err(SimError::invalid_parameter("policies", "must not be empty"));
        }
        let names: Vec<&str> = policies.iter().map(|p| p.name()).collect();
        let name = format!("Multi[{}]", names.join(", "));
        Ok(Self { name, policies })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

impl ConnectivityPolicy for MultiPolicy {
    fn name(&self) -> &str { &self.name }

    fn active_adjacency(
        &mut self,
        base: &AdjacencyMatrix,
        sir: &SirState,
        tick: Tick,
        rng: &mut SimRng,
    ) -> SimResult<AdjacencyMatrix> {
        let mut active = base.clone();
        for policy in &mut self.policies {
            let layer = policy.active_adjacency(base, sir, tick, rng)?;
            active = active.intersect(&layer)?;
        }
        Ok(active)
    }
}
