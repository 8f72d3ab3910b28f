//! ClaimLens Core — domain types, feature derivation, panel construction, splitting.
//!
//! This crate contains the data-shaping half of the pipeline:
//! - Domain types (DRG-level billing records, provider/year panel rows)
//! - Feature derivation (payment ratios, stress index, size buckets, diversity)
//! - Panel construction with a leakage-safe next-year target
//! - Temporal train/validation/test splitting by calendar-year predicate
//! - Deterministic seed hierarchy for resampling consumers

pub mod domain;
pub mod features;
pub mod panel;
pub mod rng;
pub mod split;

/// Additive guard used in every ratio denominator.
///
/// Keeps zero-volume providers from producing a division fault; the value is a
/// tunable artifact, not business semantics.
pub const EPS: f64 = 1e-6;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: core types are Send + Sync.
    ///
    /// The bootstrap engine in the runner fans iterations out across a rayon
    /// pool; everything it touches must cross thread boundaries.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::RawRecord>();
        require_sync::<domain::RawRecord>();
        require_send::<domain::ProviderYear>();
        require_sync::<domain::ProviderYear>();
        require_send::<domain::SizeCategory>();
        require_sync::<domain::SizeCategory>();

        require_send::<panel::Panel>();
        require_sync::<panel::Panel>();

        require_send::<split::SplitBoundaries>();
        require_sync::<split::SplitBoundaries>();

        require_send::<rng::SeedHierarchy>();
        require_sync::<rng::SeedHierarchy>();
    }
}
