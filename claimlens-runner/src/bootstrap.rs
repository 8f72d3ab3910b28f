//! Cluster bootstrap — generic resampling engine with percentile intervals.
//!
//! Resamples *cluster identifiers* (DRG code, provider id, state) with
//! replacement rather than individual rows, preserving within-cluster
//! correlation. The caller supplies the clustering key and the statistic;
//! the engine reports a NaN-aware mean and a 95% percentile interval.
//!
//! Key design choices:
//! - A cluster drawn more than once contributes its rows once per resample
//!   (membership semantics, matching the reference estimator).
//! - One resample whose statistic is undefined (NaN) is excluded from the
//!   aggregation only; it never aborts the remaining iterations.
//! - Iterations run on rayon with BLAKE3-derived per-iteration sub-seeds, so
//!   the same table and seed reproduce identical draws at any thread count.

use std::collections::{BTreeSet, HashSet};
use std::hash::Hash;

use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use claimlens_core::domain::RawRecord;
use claimlens_core::rng::SeedHierarchy;

use crate::metrics::{nan_mean, nan_percentile};

/// Configuration for the cluster bootstrap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapConfig {
    /// Number of resamples (default 300).
    pub n_resamples: usize,
    /// Master RNG seed for reproducibility.
    pub seed: u64,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self { n_resamples: 300, seed: 42 }
    }
}

/// {mean, p2.5, p97.5} of one bootstrapped scalar statistic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BootstrapSummary {
    pub mean: f64,
    pub p2_5: f64,
    pub p97_5: f64,
}

/// Errors from the bootstrap engine.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("no rows carry a cluster key; nothing to resample")]
    NoClusters,
    #[error("statistic was undefined on all {n_resamples} resamples")]
    AllResamplesUndefined { n_resamples: usize },
}

/// Run a cluster bootstrap of `statistic` over `records`.
///
/// - `label` names the consumer in the seed derivation, so distinct
///   statistics under one master seed draw independently.
/// - `cluster_key` maps a row to its cluster; rows returning `None` are
///   excluded from both the draw and every resample.
/// - `statistic` returns NaN to mark a resample as undefined.
pub fn cluster_bootstrap<K, KF, SF>(
    records: &[RawRecord],
    label: &str,
    cluster_key: KF,
    statistic: SF,
    config: &BootstrapConfig,
) -> Result<BootstrapSummary, BootstrapError>
where
    K: Ord + Hash + Clone + Sync + Send,
    KF: Fn(&RawRecord) -> Option<K> + Sync,
    SF: Fn(&[&RawRecord]) -> f64 + Sync,
{
    // BTreeSet gives a deterministic cluster ordering independent of row order
    // hashing, which the seeded draws rely on.
    let clusters: Vec<K> = records
        .iter()
        .filter_map(&cluster_key)
        .collect::<BTreeSet<K>>()
        .into_iter()
        .collect();
    if clusters.is_empty() {
        return Err(BootstrapError::NoClusters);
    }

    let keyed: Vec<(Option<K>, &RawRecord)> =
        records.iter().map(|r| (cluster_key(r), r)).collect();
    let seeds = SeedHierarchy::new(config.seed);

    let stats: Vec<f64> = (0..config.n_resamples as u64)
        .into_par_iter()
        .map(|iteration| {
            let mut rng = seeds.rng_for(label, iteration);
            let mut drawn: HashSet<&K> = HashSet::with_capacity(clusters.len());
            for _ in 0..clusters.len() {
                drawn.insert(&clusters[rng.gen_range(0..clusters.len())]);
            }
            let resample: Vec<&RawRecord> = keyed
                .iter()
                .filter(|(k, _)| k.as_ref().is_some_and(|k| drawn.contains(k)))
                .map(|(_, r)| *r)
                .collect();
            statistic(&resample)
        })
        .collect();

    let mean = nan_mean(&stats);
    let p2_5 = nan_percentile(&stats, 2.5);
    let p97_5 = nan_percentile(&stats, 97.5);
    match (mean, p2_5, p97_5) {
        (Some(mean), Some(p2_5), Some(p97_5)) => Ok(BootstrapSummary { mean, p2_5, p97_5 }),
        _ => Err(BootstrapError::AllResamplesUndefined { n_resamples: config.n_resamples }),
    }
}
