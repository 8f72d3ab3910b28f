//! Descriptive views — groupby rollups consumed by external reporting.
//!
//! No algorithmic content: straight aggregations over the feature table,
//! exported as CSV artifacts. Row order is deterministic (keyed maps).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use claimlens_core::domain::RawRecord;
use claimlens_core::EPS;

use crate::metrics::percentile_sorted;

/// Hospital-system name markers recognized in provider names.
const SYSTEM_MARKERS: [&str; 10] = [
    "BAPTIST",
    "MERCY",
    "ADVENTIST",
    "PRESBYTERIAN",
    "METHODIST",
    "CATHOLIC",
    "KAISER",
    "HCA",
    "TENET",
    "ASCENSION",
];

#[derive(Debug, Default)]
struct Accum {
    ratio_sum: f64,
    payment_sum: f64,
    stress_sum: f64,
    discharges: f64,
    n: usize,
}

impl Accum {
    fn push(&mut self, r: &RawRecord) {
        self.ratio_sum += r.payment_ratio;
        self.payment_sum += r.avg_total_payments;
        self.stress_sum += r.financial_stress_index;
        self.discharges += r.total_discharges;
        self.n += 1;
    }
}

// ─── Zip-level metrics ───────────────────────────────────────────────

/// One (zip, year) aggregate with a bottom-quartile stress flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZipMetricsRow {
    pub zip_code: String,
    pub year: i32,
    pub payment_ratio: f64,
    pub total_discharges: f64,
    pub avg_total_payments: f64,
    pub financial_stress_index: f64,
    /// Payment ratio in the bottom quartile across all (zip, year) cells.
    pub stressed_area: bool,
}

pub fn zip_metrics(records: &[RawRecord]) -> Vec<ZipMetricsRow> {
    let mut groups: BTreeMap<(String, i32), Accum> = BTreeMap::new();
    for r in records {
        groups.entry((r.zip_code.clone(), r.year)).or_default().push(r);
    }

    let mut rows: Vec<ZipMetricsRow> = groups
        .into_iter()
        .map(|((zip_code, year), acc)| ZipMetricsRow {
            zip_code,
            year,
            payment_ratio: acc.ratio_sum / acc.n as f64,
            total_discharges: acc.discharges,
            avg_total_payments: acc.payment_sum / acc.n as f64,
            financial_stress_index: acc.stress_sum / acc.n as f64,
            stressed_area: false,
        })
        .collect();

    let mut ratios: Vec<f64> = rows.iter().map(|r| r.payment_ratio).collect();
    ratios.sort_by(f64::total_cmp);
    if !ratios.is_empty() {
        let q1 = percentile_sorted(&ratios, 25.0);
        for row in rows.iter_mut() {
            row.stressed_area = row.payment_ratio < q1;
        }
    }
    rows
}

/// Readmit-prone discharge volume per zip code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadmitConcentrationRow {
    pub zip_code: String,
    pub readmit_discharges: f64,
}

pub fn readmit_concentration(records: &[RawRecord]) -> Vec<ReadmitConcentrationRow> {
    let mut groups: BTreeMap<String, f64> = BTreeMap::new();
    for r in records.iter().filter(|r| r.readmit_prone) {
        *groups.entry(r.zip_code.clone()).or_default() += r.total_discharges;
    }
    groups
        .into_iter()
        .map(|(zip_code, readmit_discharges)| ReadmitConcentrationRow {
            zip_code,
            readmit_discharges,
        })
        .collect()
}

// ─── Temporal rollups ────────────────────────────────────────────────

/// One (year, state, readmit-prone) aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporalRow {
    pub year: i32,
    pub state: String,
    pub readmit_prone: bool,
    pub total_discharges: f64,
    pub payment_ratio: f64,
    pub avg_total_payments: f64,
}

pub fn temporal_rollup(records: &[RawRecord]) -> Vec<TemporalRow> {
    let mut groups: BTreeMap<(i32, String, bool), Accum> = BTreeMap::new();
    for r in records {
        groups
            .entry((r.year, r.state.clone(), r.readmit_prone))
            .or_default()
            .push(r);
    }
    groups
        .into_iter()
        .map(|((year, state, readmit_prone), acc)| TemporalRow {
            year,
            state,
            readmit_prone,
            total_discharges: acc.discharges,
            payment_ratio: acc.ratio_sum / acc.n as f64,
            avg_total_payments: acc.payment_sum / acc.n as f64,
        })
        .collect()
}

/// Year-over-year readmit-prone volume growth per provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YoyGrowthRow {
    pub provider_id: u64,
    pub year: i32,
    pub readmit_discharges: f64,
    /// Volume at the provider's previous observed year, when any.
    pub previous: Option<f64>,
    pub yoy_growth: Option<f64>,
}

pub fn yoy_readmit_growth(records: &[RawRecord]) -> Vec<YoyGrowthRow> {
    let mut groups: BTreeMap<(u64, i32), f64> = BTreeMap::new();
    for r in records.iter().filter(|r| r.readmit_prone) {
        *groups.entry((r.provider_id, r.year)).or_default() += r.total_discharges;
    }

    let mut rows = Vec::with_capacity(groups.len());
    let mut previous: Option<(u64, f64)> = None;
    for (&(provider_id, year), &volume) in &groups {
        let prev_volume = match previous {
            Some((prev_provider, prev_volume)) if prev_provider == provider_id => {
                Some(prev_volume)
            }
            _ => None,
        };
        rows.push(YoyGrowthRow {
            provider_id,
            year,
            readmit_discharges: volume,
            previous: prev_volume,
            yoy_growth: prev_volume.map(|p| (volume - p) / (p + EPS)),
        });
        previous = Some((provider_id, volume));
    }
    rows
}

// ─── Hospital-system performance ─────────────────────────────────────

/// One (system, readmit-prone) aggregate, for providers whose name carries a
/// recognized system marker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemPerfRow {
    pub system: String,
    pub readmit_prone: bool,
    pub total_discharges: f64,
    pub payment_ratio: f64,
    pub avg_total_payments: f64,
}

pub fn system_performance(records: &[RawRecord]) -> Vec<SystemPerfRow> {
    let mut groups: BTreeMap<(String, bool), Accum> = BTreeMap::new();
    for r in records {
        let Some(marker) = SYSTEM_MARKERS
            .iter()
            .find(|m| r.provider_name.to_uppercase().contains(*m))
        else {
            continue;
        };
        groups
            .entry((marker.to_string(), r.readmit_prone))
            .or_default()
            .push(r);
    }
    groups
        .into_iter()
        .map(|((system, readmit_prone), acc)| SystemPerfRow {
            system,
            readmit_prone,
            total_discharges: acc.discharges,
            payment_ratio: acc.ratio_sum / acc.n as f64,
            avg_total_payments: acc.payment_sum / acc.n as f64,
        })
        .collect()
}
