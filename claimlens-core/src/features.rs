//! Feature derivation — ratio, index, and categorical features on raw records.
//!
//! Fills the derived block of [`RawRecord`] in one pass:
//! - payment ratio, Medicare coverage ratio, financial stress index
//! - DRG code extraction and the fixed readmit-prone flag
//! - log-charges, per-(state, year) average payment ratio
//! - per-(provider, year) annual volume → size bucket, DRG diversity index
//!
//! All ratio denominators carry the [`crate::EPS`] guard. Input ordering does
//! not matter; group statistics are keyed, not positional.

use std::collections::{HashMap, HashSet};

use regex::Regex;

use crate::domain::{RawRecord, SizeCategory, HIGH_READMIT_DRGS};
use crate::EPS;

/// Derive all feature columns, consuming and returning the record table.
pub fn derive(mut records: Vec<RawRecord>) -> Vec<RawRecord> {
    // Regex is infallible here: fixed pattern, compiled once per call.
    let drg_pattern = Regex::new(r"(\d{3})").expect("static DRG pattern");

    for r in records.iter_mut() {
        r.payment_ratio = r.avg_total_payments / (r.avg_covered_charges + EPS);
        r.medicare_coverage_ratio = r.avg_medicare_payments / (r.avg_total_payments + EPS);
        r.financial_stress_index = 1.0 - r.payment_ratio;
        r.avg_charges_log = r.avg_covered_charges.max(0.0).ln_1p();
        r.drg_code = drg_pattern
            .find(&r.drg_definition)
            .map(|m| m.as_str().to_string());
        r.readmit_prone = r
            .drg_code
            .as_deref()
            .is_some_and(|code| HIGH_READMIT_DRGS.contains(&code));
    }

    // Per-(state, year) mean payment ratio.
    let mut state_sum: HashMap<(String, i32), (f64, usize)> = HashMap::new();
    for r in &records {
        let entry = state_sum.entry((r.state.clone(), r.year)).or_insert((0.0, 0));
        entry.0 += r.payment_ratio;
        entry.1 += 1;
    }

    // Per-(provider, year) annual discharge total and distinct DRG codes.
    let mut annual_volume: HashMap<(u64, i32), f64> = HashMap::new();
    let mut drg_sets: HashMap<(u64, i32), HashSet<String>> = HashMap::new();
    for r in &records {
        let key = (r.provider_id, r.year);
        *annual_volume.entry(key).or_insert(0.0) += r.total_discharges;
        if let Some(code) = &r.drg_code {
            drg_sets.entry(key).or_default().insert(code.clone());
        }
    }

    for r in records.iter_mut() {
        let (sum, n) = state_sum[&(r.state.clone(), r.year)];
        r.state_avg_payment_ratio = sum / n as f64;

        let key = (r.provider_id, r.year);
        r.size_category = SizeCategory::from_annual_discharges(annual_volume[&key]);
        r.drg_diversity = drg_sets.get(&key).map_or(0, |s| s.len() as u32);
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(provider: u64, state: &str, year: i32, drg: &str, discharges: f64) -> RawRecord {
        RawRecord::new(
            provider,
            format!("PROVIDER {provider}"),
            state,
            "30301",
            year,
            drg,
            discharges,
            40_000.0,
            10_000.0,
            8_000.0,
        )
    }

    #[test]
    fn ratio_features() {
        let rows = derive(vec![record(1, "GA", 2013, "291 - HEART FAILURE & SHOCK W MCC", 100.0)]);
        let r = &rows[0];
        assert!((r.payment_ratio - 0.25).abs() < 1e-4);
        assert!((r.medicare_coverage_ratio - 0.8).abs() < 1e-4);
        assert!((r.financial_stress_index - 0.75).abs() < 1e-4);
        assert!((r.avg_charges_log - 40_001.0_f64.ln()).abs() < 1e-9);
    }

    #[test]
    fn drg_code_extraction_and_readmit_flag() {
        let rows = derive(vec![
            record(1, "GA", 2013, "291 - HEART FAILURE & SHOCK W MCC", 10.0),
            record(1, "GA", 2013, "470 - MAJOR JOINT REPLACEMENT", 10.0),
            record(1, "GA", 2013, "NO CODE HERE", 10.0),
        ]);
        assert_eq!(rows[0].drg_code.as_deref(), Some("291"));
        assert!(rows[0].readmit_prone);
        assert_eq!(rows[1].drg_code.as_deref(), Some("470"));
        assert!(!rows[1].readmit_prone);
        assert_eq!(rows[2].drg_code, None);
        assert!(!rows[2].readmit_prone);
    }

    #[test]
    fn state_average_is_per_state_and_year() {
        let mut a = record(1, "GA", 2013, "291", 10.0);
        a.avg_total_payments = 10_000.0; // ratio 0.25
        let mut b = record(2, "GA", 2013, "292", 10.0);
        b.avg_total_payments = 30_000.0; // ratio 0.75
        let mut c = record(3, "TX", 2013, "293", 10.0);
        c.avg_total_payments = 4_000.0; // ratio 0.1, different state

        let rows = derive(vec![a, b, c]);
        assert!((rows[0].state_avg_payment_ratio - 0.5).abs() < 1e-4);
        assert!((rows[1].state_avg_payment_ratio - 0.5).abs() < 1e-4);
        assert!((rows[2].state_avg_payment_ratio - 0.1).abs() < 1e-4);
    }

    #[test]
    fn size_bucket_uses_annual_provider_total() {
        // Two rows of 300 each → annual total 600 → Medium for both.
        let rows = derive(vec![
            record(1, "GA", 2013, "291", 300.0),
            record(1, "GA", 2013, "292", 300.0),
        ]);
        assert_eq!(rows[0].size_category, SizeCategory::Medium);
        assert_eq!(rows[1].size_category, SizeCategory::Medium);
    }

    #[test]
    fn diversity_counts_distinct_codes() {
        let rows = derive(vec![
            record(1, "GA", 2013, "291 W MCC", 10.0),
            record(1, "GA", 2013, "291 W/O MCC", 10.0),
            record(1, "GA", 2013, "470", 10.0),
        ]);
        assert_eq!(rows[0].drg_diversity, 2);
    }
}
