//! Panel construction — one (provider, year) row with a leakage-safe target.
//!
//! Collapses DRG-level records into provider/year aggregates (ratios averaged,
//! volume summed), then attaches `next_year_volume` from the same provider's
//! next observed year. Rows whose provider has no subsequent observation are
//! dropped: they carry no label and must never enter training or evaluation.
//!
//! The 80th-percentile growth threshold used for the `high_risk` label is
//! computed exactly once over all *defined* growth values and recorded on the
//! output, so inference-time score normalization reuses the identical value
//! and the identical exclusion policy.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{ProviderYear, RawRecord, SizeCategory};
use crate::EPS;

/// Quantile level for the `high_risk` growth threshold.
pub const HIGH_RISK_QUANTILE: f64 = 0.80;

/// Errors from panel construction.
#[derive(Debug, Error)]
pub enum PanelError {
    #[error("cannot build panel from an empty record table")]
    EmptyInput,
    #[error("no provider has two observed years; panel has no labelable rows")]
    NoLabeledRows,
    #[error("every labeled row has zero current volume; growth threshold is undefined")]
    NoDefinedGrowth,
}

/// The finished panel: labeled rows plus the recorded labeling threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Panel {
    pub rows: Vec<ProviderYear>,
    /// 80th percentile of all defined growth values, recorded at labeling time.
    pub growth_threshold: f64,
}

/// Intermediate per-(provider, year) accumulator.
#[derive(Debug)]
struct GroupAccum {
    provider_name: String,
    state: String,
    payment_ratio: f64,
    medicare_coverage_ratio: f64,
    financial_stress_index: f64,
    avg_charges_log: f64,
    state_avg_payment_ratio: f64,
    size_category: SizeCategory,
    drg_diversity: u32,
    discharge_volume: f64,
    n: usize,
}

/// Build the provider/year panel from feature-derived records.
///
/// Input row order is irrelevant; groups are keyed by (provider, year) and the
/// target shift walks years in ascending order per provider. The shift uses the
/// next *observed* year, even across gaps, matching the reference behavior.
pub fn build_panel(records: &[RawRecord]) -> Result<Panel, PanelError> {
    if records.is_empty() {
        return Err(PanelError::EmptyInput);
    }

    // BTreeMap keys give (provider, year) ascending for free.
    let mut groups: BTreeMap<(u64, i32), GroupAccum> = BTreeMap::new();
    for r in records {
        let acc = groups.entry((r.provider_id, r.year)).or_insert_with(|| GroupAccum {
            provider_name: r.provider_name.clone(),
            state: r.state.clone(),
            payment_ratio: 0.0,
            medicare_coverage_ratio: 0.0,
            financial_stress_index: 0.0,
            avg_charges_log: 0.0,
            state_avg_payment_ratio: 0.0,
            size_category: r.size_category,
            drg_diversity: r.drg_diversity,
            discharge_volume: 0.0,
            n: 0,
        });
        acc.payment_ratio += r.payment_ratio;
        acc.medicare_coverage_ratio += r.medicare_coverage_ratio;
        acc.financial_stress_index += r.financial_stress_index;
        acc.avg_charges_log += r.avg_charges_log;
        acc.state_avg_payment_ratio += r.state_avg_payment_ratio;
        acc.discharge_volume += r.total_discharges;
        acc.drg_diversity = acc.drg_diversity.max(r.drg_diversity);
        acc.n += 1;
    }

    let keys: Vec<(u64, i32)> = groups.keys().copied().collect();
    let mut rows = Vec::with_capacity(keys.len());

    for (i, &(provider_id, year)) in keys.iter().enumerate() {
        // Next observed row for the same provider, in ascending year order.
        let next_volume = match keys.get(i + 1) {
            Some(&(next_provider, next_year)) if next_provider == provider_id => {
                debug_assert!(next_year > year);
                Some(groups[&(next_provider, next_year)].discharge_volume)
            }
            _ => None,
        };
        let Some(next_year_volume) = next_volume else {
            continue; // final observed year: no target, row is dropped
        };

        let g = &groups[&(provider_id, year)];
        let n = g.n as f64;
        let current = g.discharge_volume;
        let growth = if current > 0.0 {
            Some((next_year_volume - current) / (current + EPS))
        } else {
            None
        };

        rows.push(ProviderYear {
            provider_id,
            provider_name: g.provider_name.clone(),
            state: g.state.clone(),
            year,
            payment_ratio: g.payment_ratio / n,
            medicare_coverage_ratio: g.medicare_coverage_ratio / n,
            financial_stress_index: g.financial_stress_index / n,
            avg_charges_log: g.avg_charges_log / n,
            state_avg_payment_ratio: g.state_avg_payment_ratio / n,
            size_category: g.size_category,
            drg_diversity: g.drg_diversity,
            discharge_volume: current,
            next_year_volume,
            growth,
            high_risk: false, // set below once the threshold is known
        });
    }

    if rows.is_empty() {
        return Err(PanelError::NoLabeledRows);
    }

    let mut defined: Vec<f64> = rows.iter().filter_map(|r| r.growth).collect();
    if defined.is_empty() {
        return Err(PanelError::NoDefinedGrowth);
    }
    defined.sort_by(f64::total_cmp);
    let growth_threshold = quantile_sorted(&defined, HIGH_RISK_QUANTILE);

    for row in rows.iter_mut() {
        row.high_risk = row.growth.is_some_and(|g| g >= growth_threshold);
    }

    Ok(Panel { rows, growth_threshold })
}

/// Quantile of a sorted slice via linear interpolation.
fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let frac = pos - lo as f64;
    sorted[lo] * (1.0 - frac) + sorted[hi] * frac
}
