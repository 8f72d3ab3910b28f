//! Causal estimation — 2×2 difference-in-differences on the payment ratio.
//!
//! The treated-group rule (a set of jurisdiction codes plus a policy-effective
//! year) encodes a real-world policy assumption, so it is always injected,
//! never hardcoded. The rule is a membership set: a row is treated or control,
//! and a third group cannot arise from the type — the staggered-treatment case
//! is excluded by construction rather than detected at runtime.
//!
//! An optional richer uplift estimator is modeled as a trait returning
//! success-or-absent, so the core estimator has no hard dependency on one.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use claimlens_core::domain::RawRecord;

/// Injectable treated-group rule: state membership plus a policy year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreatmentRule {
    treated_states: BTreeSet<String>,
    policy_year: i32,
}

/// Errors from treatment labeling and DiD estimation.
#[derive(Debug, Error)]
pub enum CausalError {
    #[error("treatment rule has an empty treated set; the design degenerates to one group")]
    EmptyTreatedSet,
    #[error("DiD effect is undefined: the {cell} cell has no observations")]
    EmptyCell { cell: &'static str },
}

impl TreatmentRule {
    pub fn new(
        treated_states: impl IntoIterator<Item = String>,
        policy_year: i32,
    ) -> Result<Self, CausalError> {
        let treated_states: BTreeSet<String> = treated_states.into_iter().collect();
        if treated_states.is_empty() {
            return Err(CausalError::EmptyTreatedSet);
        }
        Ok(Self { treated_states, policy_year })
    }

    pub fn is_treated(&self, state: &str) -> bool {
        self.treated_states.contains(state)
    }

    /// Post period starts at the policy-effective year (inclusive).
    pub fn is_post(&self, year: i32) -> bool {
        year >= self.policy_year
    }

    pub fn policy_year(&self) -> i32 {
        self.policy_year
    }
}

/// The four cell means and the difference-in-differences effect.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DidEstimate {
    pub treated_pre: f64,
    pub treated_post: f64,
    pub control_pre: f64,
    pub control_post: f64,
    /// (treated_post − treated_pre) − (control_post − control_pre).
    pub effect: f64,
    pub n_obs: usize,
}

/// Estimate the DiD effect of the policy on the payment ratio.
///
/// Every one of the four (group × period) cells must be populated; an empty
/// cell makes the effect undefined and is surfaced as an error, never coerced
/// to zero.
pub fn did_effect<'a>(
    rows: impl IntoIterator<Item = &'a RawRecord>,
    rule: &TreatmentRule,
) -> Result<DidEstimate, CausalError> {
    let mut cells = [(0.0_f64, 0usize); 4]; // [treated-pre, treated-post, control-pre, control-post]
    let mut n_obs = 0usize;

    for row in rows {
        let idx = match (rule.is_treated(&row.state), rule.is_post(row.year)) {
            (true, false) => 0,
            (true, true) => 1,
            (false, false) => 2,
            (false, true) => 3,
        };
        cells[idx].0 += row.payment_ratio;
        cells[idx].1 += 1;
        n_obs += 1;
    }

    const CELL_NAMES: [&str; 4] = ["treated-pre", "treated-post", "control-pre", "control-post"];
    let mut means = [0.0_f64; 4];
    for (i, (sum, n)) in cells.iter().enumerate() {
        if *n == 0 {
            return Err(CausalError::EmptyCell { cell: CELL_NAMES[i] });
        }
        means[i] = sum / *n as f64;
    }

    let [treated_pre, treated_post, control_pre, control_post] = means;
    Ok(DidEstimate {
        treated_pre,
        treated_post,
        control_pre,
        control_post,
        effect: (treated_post - treated_pre) - (control_post - control_pre),
        n_obs,
    })
}

/// DiD as a bootstrap statistic: NaN marks an undefined resample.
pub fn did_statistic(rows: &[&RawRecord], rule: &TreatmentRule) -> f64 {
    did_effect(rows.iter().copied(), rule).map_or(f64::NAN, |e| e.effect)
}

// ─── Optional uplift estimation ──────────────────────────────────────

/// Result of an optional per-observation uplift estimator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UpliftEstimate {
    pub average_effect: f64,
    pub n_obs: usize,
}

/// Optional richer causal-estimation capability.
///
/// Implementations attempt an estimate and return `None` when the capability
/// is unavailable or the data does not support it; the pipeline proceeds with
/// the plain DiD estimate either way.
pub trait UpliftEstimator {
    fn try_estimate(&self, records: &[RawRecord], rule: &TreatmentRule) -> Option<UpliftEstimate>;
}

/// The always-absent estimator. Default when no richer backend is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoUplift;

impl UpliftEstimator for NoUplift {
    fn try_estimate(&self, _: &[RawRecord], _: &TreatmentRule) -> Option<UpliftEstimate> {
        None
    }
}
