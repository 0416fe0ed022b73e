use super::ConnectivityPolicy;
use crate::{
    adjacency::AdjacencyMatrix, error::SimResult, rng::SimRng, sir::SirState, types::Tick,
};

/// Control baseline: every base edge is active on every tick.
#[derive(Debug, Clone, Default)]
pub struct NoUpdate;

impl ConnectivityPolicy for NoUpdate {
    fn name(&self) -> &str { "No Mitigations" }

    fn active_adjacency(
        &mut self,
        base: &AdjacencyMatrix,
        _sir: &SirState,
        _tick: Tick,
        _rng: &mut SimRng,
    ) -> SimResult<AdjacencyMatrix> {
        Ok(base.clone())
    }
}
