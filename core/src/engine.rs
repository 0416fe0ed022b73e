//! The simulation engine: SIR spread over a time-varying network.
//!
//! EXECUTION ORDER per tick (fixed, never reordered):
//!   1. Policy produces this tick's active adjacency.
//!   2. Every Infectious node tries every active edge to a Susceptible
//!      neighbor, one Bernoulli trial each.
//!   3. Nodes that were Infectious at the start of the tick count down;
//!      at zero they become Recovered.
//!   4. The resulting state is appended to the history.
//!
//! RULES:
//!   - Step 2 reads ONLY the state from the start of the tick. A node
//!     infected this tick does not transmit until the next one.
//!   - A Susceptible node is infected if any of its trials succeeds, so
//!     its overall chance is 1 - (1 - p)^k for k active infectious neighbors.
//!   - All randomness flows through the caller's SimRng.
//!   - The base adjacency is never written to.

use crate::{
    adjacency::AdjacencyMatrix,
    disease::Disease,
    error::{SimError, SimResult},
    policy::ConnectivityPolicy,
    rng::SimRng,
    sir::SirState,
    snapshot::SnapshotHistory,
    types::Tick,
};

pub struct SimEngine<'a, P: ConnectivityPolicy + ?Sized> {
    adjacency:    &'a AdjacencyMatrix,
    disease:      Disease,
    policy:       &'a mut P,
    current_tick: Tick,
    state:        SirState,
    history:      SnapshotHistory,
}

impl<'a, P: ConnectivityPolicy + ?Sized> SimEngine<'a, P> {
    /// Validates dimensions at the boundary so the stepping loop never has to.
    pub fn new(
        adjacency: &'a AdjacencyMatrix,
        sir0: SirState,
        disease: Disease,
        policy: &'a mut P,
    ) -> SimResult<Self> {
        if sir0.len() != adjacency.node_count() {
            return Err(SimError::DimensionMismatch {
                expected: adjacency.node_count(),
                actual:   sir0.len(),
            });
        }
        Ok(Self {
            adjacency,
            disease,
            policy,
            current_tick: 0,
            history: SnapshotHistory::new(sir0.clone()),
            state: sir0,
        })
    }

    pub fn current_tick(&self) -> Tick {
        self.current_tick
    }

    pub fn state(&self) -> &SirState {
        &self.state
    }

    pub fn history(&self) -> &SnapshotHistory {
        &self.history
    }

    /// Advance one tick. This is the core simulation step.
    pub fn tick(&mut self, rng: &mut SimRng) -> SimResult<&SirState> {
        let tick = self.current_tick + 1;

        let active = self
            .policy
            .active_adjacency(self.adjacency, &self.state, tick, rng)?;
        if !active.is_subgraph_of(self.adjacency) {
            return Err(SimError::InvalidArgument(format!(
                "policy '{}' activated edges outside the base network at tick {tick}",
                self.policy.name()
            )));
        }

        let start = &self.state;
        let mut next = start.clone();
        let p = self.disease.transmission_probability();
        let duration = self.disease.infectious_duration();

        for source in start.infectious_nodes() {
            for target in active.neighbors(source) {
                if !start.is_susceptible(target) || next.is_infectious(target) {
                    continue;
                }
                if rng.chance(p) {
                    next.infect(target, duration);
                }
            }
        }

        for node in start.infectious_nodes() {
            next.advance_infection(node);
        }

        let counts = next.counts();
        log::debug!(
            "tick={tick} policy={} S={} I={} R={}",
            self.policy.name(),
            counts.susceptible,
            counts.infectious,
            counts.recovered
        );

        self.history.push(next.clone());
        self.state = next;
        self.current_tick = tick;
        Ok(&self.state)
    }

    /// Run n ticks in a loop. There is no early stop on extinction.
    pub fn run_ticks(&mut self, n: Tick, rng: &mut SimRng) -> SimResult<()> {
        for _ in 0..n {
            self.tick(rng)?;
        }
        Ok(())
    }

    pub fn into_history(self) -> SnapshotHistory {
        self.history
    }
}

/// Run `max_steps` ticks and return all `max_steps + 1` snapshots.
/// Deterministic for a fixed RNG seed and fixed inputs.
pub fn simulate(
    adjacency: &AdjacencyMatrix,
    sir0: &SirState,
    disease: &Disease,
    policy: &mut dyn ConnectivityPolicy,
    max_steps: Tick,
    rng: &mut SimRng,
) -> SimResult<SnapshotHistory> {
    log::info!(
        "simulate: n={} edges={} policy={} max_steps={max_steps} seed={}",
        adjacency.node_count(),
        adjacency.edge_count(),
        policy.name(),
        rng.seed()
    );
    let mut engine = SimEngine::new(adjacency, sir0.clone(), *disease, policy)?;
    engine.run_ticks(max_steps, rng)?;
    let history = engine.into_history();
    log::info!(
        "simulate: done, survival_rate={:.3} extinction={:?}",
        history.survival_rate(),
        history.time_to_extinction()
    );
    Ok(history)
}
