//! Flicker: SIR epidemic spread over networks whose edges switch on and off.
//!
//! A run couples a per-node SIR state machine with a `ConnectivityPolicy`
//! that picks, every tick, which edges of a fixed base network carry
//! transmission. Networks, flicker-eligible edge sets and layouts come
//! from outside; the engine hands back one SIR snapshot per tick.

pub mod adjacency;
pub mod config;
pub mod disease;
pub mod engine;
pub mod error;
pub mod network_file;
pub mod policy;
pub mod rewiring;
pub mod rng;
pub mod sir;
pub mod snapshot;
pub mod store;
pub mod types;

pub use adjacency::{AdjacencyMatrix, DistanceMatrix, Edge};
pub use disease::Disease;
pub use engine::{simulate, SimEngine};
pub use error::{SimError, SimResult};
pub use policy::ConnectivityPolicy;
pub use rng::{RngBank, SimRng};
pub use sir::{make_starting_sir, Compartment, InitialInfected, SirCounts, SirState};
pub use snapshot::SnapshotHistory;
