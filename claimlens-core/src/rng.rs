//! Deterministic seed hierarchy for resampling.
//!
//! A master seed expands into per-(label, iteration) sub-seeds via BLAKE3.
//! Derivation is hash-based, not order-dependent, so a parallel bootstrap
//! draws identical resamples regardless of thread count or scheduling.

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Deterministic seed hierarchy.
#[derive(Debug, Clone)]
pub struct SeedHierarchy {
    master_seed: u64,
}

impl SeedHierarchy {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Derive the sub-seed for one (label, iteration) pair.
    ///
    /// `label` names the consumer (e.g. the statistic being bootstrapped) so
    /// two resampling runs under the same master seed draw independently.
    pub fn sub_seed(&self, label: &str, iteration: u64) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(label.as_bytes());
        hasher.update(&iteration.to_le_bytes());
        let hash = hasher.finalize();
        u64::from_le_bytes(hash.as_bytes()[..8].try_into().expect("blake3 output >= 8 bytes"))
    }

    /// Seeded StdRng for one (label, iteration) pair.
    pub fn rng_for(&self, label: &str, iteration: u64) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(label, iteration))
    }
}
