//! Snapshot history: one immutable SIR state per tick.
//!
//! Index 0 is the initial state, so a run of `max_steps` ticks
//! yields `max_steps + 1` snapshots. Downstream analysis derives
//! survival rate, extinction time and per-tick curves from here.

use crate::{
    error::{SimError, SimResult},
    sir::{SirCounts, SirState},
    types::Tick,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawHistory")]
pub struct SnapshotHistory {
    snapshots: Vec<SirState>,
}

/// Stored form. A history always holds its initial state, and every
/// snapshot covers the same population.
#[derive(Deserialize)]
struct RawHistory {
    snapshots: Vec<SirState>,
}

impl TryFrom<RawHistory> for SnapshotHistory {
    type Error = SimError;

    fn try_from(raw: RawHistory) -> SimResult<Self> {
        let Some(initial) = raw.snapshots.first() else {
            return Err(SimError::InvalidArgument("history has no initial snapshot".into()));
        };
        let n = initial.len();
        if let Some(bad) = raw.snapshots.iter().find(|s| s.len() != n) {
            return Err(SimError::DimensionMismatch { expected: n, actual: bad.len() });
        }
        Ok(Self { snapshots: raw.snapshots })
    }
}

impl SnapshotHistory {
    pub(crate) fn new(initial: SirState) -> Self {
        Self { snapshots: vec![initial] }
    }

    pub(crate) fn push(&mut self, state: SirState) {
        self.snapshots.push(state);
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Never true for a history built by the engine.
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn get(&self, tick: Tick) -> Option<&SirState> {
        usize::try_from(tick).ok().and_then(|t| self.snapshots.get(t))
    }

    pub fn initial(&self) -> &SirState {
        &self.snapshots[0]
    }

    pub fn final_state(&self) -> &SirState {
        &self.snapshots[self.snapshots.len() - 1]
    }

    pub fn iter(&self) -> impl Iterator<Item = &SirState> {
        self.snapshots.iter()
    }

    pub fn counts_per_tick(&self) -> Vec<SirCounts> {
        self.snapshots.iter().map(SirState::counts).collect()
    }

    pub fn infectious_counts(&self) -> Vec<usize> {
        self.snapshots.iter().map(|s| s.counts().infectious).collect()
    }

    /// Fraction of nodes Susceptible in the final snapshot.
    pub fn survival_rate(&self) -> f64 {
        self.final_state().survival_rate()
    }

    /// First tick with no Infectious node, if the epidemic died out.
    pub fn time_to_extinction(&self) -> Option<Tick> {
        self.snapshots
            .iter()
            .position(|s| s.infectious_nodes().next().is_none())
            .map(|t| t as Tick)
    }

    /// Tick and size of the largest Infectious count; earliest tick on ties.
    pub fn peak_infectious(&self) -> (Tick, usize) {
        let mut peak = (0, 0);
        for (tick, count) in self.infectious_counts().into_iter().enumerate() {
            if count > peak.1 {
                peak = (tick as Tick, count);
            }
        }
        peak
    }
}
