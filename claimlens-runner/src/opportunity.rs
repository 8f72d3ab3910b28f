//! Savings opportunity statistics — TAM, readmission cost ratio, rankings.
//!
//! Pure statistic functions over a (borrowed) record table, shaped so the
//! cluster bootstrap can reapply them to resamples unchanged.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use claimlens_core::domain::RawRecord;
use claimlens_core::EPS;

/// Payment ratio below which a provider cohort counts as financially stressed.
pub const STRESSED_RATIO: f64 = 0.3;
/// Payment ratio above which a provider cohort counts as reimbursed normally.
pub const HEALTHY_RATIO: f64 = 0.5;

/// Total-addressable-market estimate.
///
/// Over DRG codes present in both cohorts: Σ (mean payment in the stressed
/// cohort − mean payment in the healthy cohort) × stressed discharge volume.
/// DRGs present in only one cohort contribute nothing; an empty intersection
/// sums to zero.
pub fn tam_statistic(rows: &[&RawRecord]) -> f64 {
    #[derive(Default)]
    struct Cohort {
        payment_sum: f64,
        n: usize,
        discharges: f64,
    }

    let mut stressed: BTreeMap<&str, Cohort> = BTreeMap::new();
    let mut healthy: BTreeMap<&str, Cohort> = BTreeMap::new();

    for r in rows {
        let Some(code) = r.drg_code.as_deref() else { continue };
        let cohort = if r.payment_ratio < STRESSED_RATIO {
            stressed.entry(code).or_default()
        } else if r.payment_ratio > HEALTHY_RATIO {
            healthy.entry(code).or_default()
        } else {
            continue;
        };
        cohort.payment_sum += r.avg_total_payments;
        cohort.n += 1;
        cohort.discharges += r.total_discharges;
    }

    stressed
        .iter()
        .filter_map(|(code, s)| {
            let h = healthy.get(code)?;
            let gap = s.payment_sum / s.n as f64 - h.payment_sum / h.n as f64;
            Some(gap * s.discharges)
        })
        .sum()
}

/// Readmission cost ratio: readmit-prone discharge volume in the stressed
/// cohort over the same volume in the remaining cohort.
pub fn readmit_cost_ratio(rows: &[&RawRecord]) -> f64 {
    let mut stressed_volume = 0.0;
    let mut other_volume = 0.0;
    for r in rows.iter().filter(|r| r.readmit_prone) {
        if r.payment_ratio < STRESSED_RATIO {
            stressed_volume += r.total_discharges;
        } else {
            other_volume += r.total_discharges;
        }
    }
    stressed_volume / (other_volume + EPS)
}

/// One provider's aggregate savings opportunity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpportunityRow {
    pub provider_id: u64,
    pub provider_name: String,
    pub state: String,
    /// Σ over the provider's rows of (payment − DRG median payment) × discharges.
    pub opportunity: f64,
}

/// Rank providers by total cost gap against the per-DRG median payment.
pub fn top_opportunities(records: &[RawRecord], limit: usize) -> Vec<OpportunityRow> {
    // Median payment per DRG code.
    let mut by_drg: HashMap<&str, Vec<f64>> = HashMap::new();
    for r in records {
        if let Some(code) = r.drg_code.as_deref() {
            by_drg.entry(code).or_default().push(r.avg_total_payments);
        }
    }
    let medians: HashMap<&str, f64> = by_drg
        .into_iter()
        .map(|(code, mut payments)| {
            payments.sort_by(f64::total_cmp);
            let n = payments.len();
            let median = if n % 2 == 1 {
                payments[n / 2]
            } else {
                (payments[n / 2 - 1] + payments[n / 2]) / 2.0
            };
            (code, median)
        })
        .collect();

    let mut by_provider: BTreeMap<u64, OpportunityRow> = BTreeMap::new();
    for r in records {
        let Some(code) = r.drg_code.as_deref() else { continue };
        let delta = (r.avg_total_payments - medians[code]) * r.total_discharges;
        by_provider
            .entry(r.provider_id)
            .or_insert_with(|| OpportunityRow {
                provider_id: r.provider_id,
                provider_name: r.provider_name.clone(),
                state: r.state.clone(),
                opportunity: 0.0,
            })
            .opportunity += delta;
    }

    let mut ranking: Vec<OpportunityRow> = by_provider.into_values().collect();
    ranking.sort_by(|a, b| b.opportunity.total_cmp(&a.opportunity));
    ranking.truncate(limit);
    ranking
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(
        provider: u64,
        drg: &str,
        payment_ratio: f64,
        payments: f64,
        discharges: f64,
        readmit: bool,
    ) -> RawRecord {
        let mut r = RawRecord::new(
            provider,
            format!("PROVIDER {provider}"),
            "GA",
            "30301",
            2013,
            drg,
            discharges,
            40_000.0,
            payments,
            8_000.0,
        );
        r.drg_code = Some(drg.to_string());
        r.payment_ratio = payment_ratio;
        r.readmit_prone = readmit;
        r
    }

    #[test]
    fn tam_weights_gap_by_stressed_volume() {
        // DRG 291: stressed mean 12_000, healthy mean 10_000, stressed volume 100
        // ⇒ TAM = 2_000 × 100 = 200_000.
        let rows = vec![
            row(1, "291", 0.2, 12_000.0, 100.0, true),
            row(2, "291", 0.6, 10_000.0, 500.0, true),
        ];
        let refs: Vec<&RawRecord> = rows.iter().collect();
        assert!((tam_statistic(&refs) - 200_000.0).abs() < 1e-6);
    }

    #[test]
    fn tam_ignores_drgs_missing_from_either_cohort() {
        let rows = vec![
            row(1, "291", 0.2, 12_000.0, 100.0, true), // stressed only
            row(2, "470", 0.6, 10_000.0, 500.0, false), // healthy only
        ];
        let refs: Vec<&RawRecord> = rows.iter().collect();
        assert_eq!(tam_statistic(&refs), 0.0);
    }

    #[test]
    fn tam_mid_band_rows_join_neither_cohort() {
        let rows = vec![
            row(1, "291", 0.2, 12_000.0, 100.0, true),
            row(2, "291", 0.4, 99_000.0, 500.0, true), // between 0.3 and 0.5
            row(3, "291", 0.6, 10_000.0, 200.0, true),
        ];
        let refs: Vec<&RawRecord> = rows.iter().collect();
        assert!((tam_statistic(&refs) - 200_000.0).abs() < 1e-6);
    }

    #[test]
    fn readmit_ratio_splits_at_stressed_boundary() {
        let rows = vec![
            row(1, "291", 0.2, 10_000.0, 300.0, true),
            row(2, "291", 0.3, 10_000.0, 100.0, true), // exactly 0.3 is not stressed
            row(3, "291", 0.8, 10_000.0, 100.0, true),
            row(4, "470", 0.1, 10_000.0, 999.0, false), // not readmit-prone
        ];
        let refs: Vec<&RawRecord> = rows.iter().collect();
        assert!((readmit_cost_ratio(&refs) - 1.5).abs() < 1e-4);
    }

    #[test]
    fn readmit_ratio_empty_denominator_is_guarded() {
        let rows = vec![row(1, "291", 0.2, 10_000.0, 300.0, true)];
        let refs: Vec<&RawRecord> = rows.iter().collect();
        let ratio = readmit_cost_ratio(&refs);
        assert!(ratio.is_finite());
        assert!(ratio > 1e6);
    }

    #[test]
    fn opportunity_ranking_orders_by_gap() {
        // DRG 291 median payment = 10_000.
        let records = vec![
            row(1, "291", 0.2, 14_000.0, 10.0, true), // +40_000
            row(2, "291", 0.2, 10_000.0, 10.0, true), // 0
            row(3, "291", 0.2, 6_000.0, 10.0, true),  // −40_000
        ];
        let ranking = top_opportunities(&records, 2);
        assert_eq!(ranking.len(), 2);
        assert_eq!(ranking[0].provider_id, 1);
        assert!((ranking[0].opportunity - 40_000.0).abs() < 1e-6);
        assert_eq!(ranking[1].provider_id, 2);
    }
}
