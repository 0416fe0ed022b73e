//! Shared primitive types used across the engine.

use std::collections::BTreeMap;

/// A simulation tick. Tick 0 is the initial state.
pub type Tick = u64;

/// A node in the population graph, an index in `[0, N)`.
pub type NodeId = usize;

/// The canonical run identifier used by the store.
pub type RunId = String;

/// Drawing coordinates supplied alongside a network. Never read by engine logic.
pub type Layout = BTreeMap<NodeId, (f64, f64)>;
