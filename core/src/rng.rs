//! Deterministic random number generation.
//!
//! RULE: Nothing in the engine may call any platform RNG.
//! Every stochastic operation takes a `SimRng` owned by the caller.
//!
//! Trials get their own RNG stream, seeded deterministically
//! from (master_seed XOR mixed trial index). This means:
//!   - Trials can run in any order, or on separate workers, and
//!     still reproduce bit-for-bit.
//!   - Adding trials never changes the streams of earlier ones.

use crate::types::NodeId;
use rand::seq::{index, SliceRandom};
use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// A seedable, caller-owned RNG.
pub struct SimRng {
    seed:  u64,
    inner: Pcg64Mcg,
}

impl SimRng {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            inner: Pcg64Mcg::seed_from_u64(seed),
        }
    }

    /// The seed this stream was created from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Draw a raw u64 (full range).
    pub fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Pick one element uniformly, or None if the slice is empty.
    pub fn choose<T: Copy>(&mut self, items: &[T]) -> Option<T> {
        items.choose(&mut self.inner).copied()
    }

    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.inner);
    }

    /// Sample `amount` distinct nodes from `[0, n)`, in sampling order.
    /// Panics if `amount > n`; callers validate first.
    pub fn sample_nodes(&mut self, n: usize, amount: usize) -> Vec<NodeId> {
        index::sample(&mut self.inner, n, amount).into_vec()
    }
}

/// Per-trial RNG streams for a single run, all derived from one master seed.
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// The RNG for trial `index`. The same index always yields the same stream.
    pub fn for_trial(&self, index: u64) -> SimRng {
        SimRng::new(self.trial_seed(index))
    }

    pub fn trial_seed(&self, index: u64) -> u64 {
        self.master_seed ^ index.wrapping_mul(0x9e37_79b9_7f4a_7c15)
    }
}
