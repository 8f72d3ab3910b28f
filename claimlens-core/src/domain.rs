//! Domain types — DRG-level billing records and provider/year panel rows.

use serde::{Deserialize, Serialize};

/// DRG codes with historically elevated readmission rates.
///
/// Heart failure (291–293), COPD (190–192), and pneumonia (193–195) cohorts.
/// Fixed set; membership is computed once during feature derivation.
pub const HIGH_READMIT_DRGS: [&str; 9] =
    ["190", "191", "192", "193", "194", "195", "291", "292", "293"];

/// Hospital size bucket from total annual discharges.
///
/// The set of categories is fixed and explicitly enumerated so the one-hot
/// encoding is byte-identical between training and scoring. A record whose
/// annual volume is unavailable lands in `Unknown`; it is a real bucket, not
/// an error state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeCategory {
    Small,
    Medium,
    Large,
    Unknown,
}

impl SizeCategory {
    /// All categories in canonical encoding order.
    pub const ALL: [SizeCategory; 4] = [
        SizeCategory::Small,
        SizeCategory::Medium,
        SizeCategory::Large,
        SizeCategory::Unknown,
    ];

    /// Bucket boundaries: (0, 500] small, (500, 2000] medium, (2000, ∞) large.
    pub fn from_annual_discharges(total: f64) -> Self {
        if !total.is_finite() || total <= 0.0 {
            SizeCategory::Unknown
        } else if total <= 500.0 {
            SizeCategory::Small
        } else if total <= 2000.0 {
            SizeCategory::Medium
        } else {
            SizeCategory::Large
        }
    }

    /// Parse the lowercase label used in artifacts and scoring requests.
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "small" => Some(SizeCategory::Small),
            "medium" => Some(SizeCategory::Medium),
            "large" => Some(SizeCategory::Large),
            "unknown" => Some(SizeCategory::Unknown),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SizeCategory::Small => "small",
            SizeCategory::Medium => "medium",
            SizeCategory::Large => "large",
            SizeCategory::Unknown => "unknown",
        }
    }

    /// Fixed four-column one-hot encoding in `ALL` order.
    pub fn dummies(&self) -> [f64; 4] {
        let mut d = [0.0; 4];
        for (i, cat) in Self::ALL.iter().enumerate() {
            if cat == self {
                d[i] = 1.0;
            }
        }
        d
    }
}

/// One DRG-level billing row from a cost report, plus derived features.
///
/// The first block comes straight from the harmonized CSV; the derived block
/// is filled by [`crate::features::derive`] and is zeroed/empty until then.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    pub provider_id: u64,
    pub provider_name: String,
    pub state: String,
    pub zip_code: String,
    pub year: i32,
    pub drg_definition: String,
    pub total_discharges: f64,
    pub avg_covered_charges: f64,
    pub avg_total_payments: f64,
    pub avg_medicare_payments: f64,

    // Derived features
    pub drg_code: Option<String>,
    pub readmit_prone: bool,
    pub payment_ratio: f64,
    pub medicare_coverage_ratio: f64,
    pub financial_stress_index: f64,
    pub avg_charges_log: f64,
    pub state_avg_payment_ratio: f64,
    pub size_category: SizeCategory,
    pub drg_diversity: u32,
}

impl RawRecord {
    /// A record with only the raw billing columns populated.
    pub fn new(
        provider_id: u64,
        provider_name: impl Into<String>,
        state: impl Into<String>,
        zip_code: impl Into<String>,
        year: i32,
        drg_definition: impl Into<String>,
        total_discharges: f64,
        avg_covered_charges: f64,
        avg_total_payments: f64,
        avg_medicare_payments: f64,
    ) -> Self {
        Self {
            provider_id,
            provider_name: provider_name.into(),
            state: state.into(),
            zip_code: zip_code.into(),
            year,
            drg_definition: drg_definition.into(),
            total_discharges,
            avg_covered_charges,
            avg_total_payments,
            avg_medicare_payments,
            drg_code: None,
            readmit_prone: false,
            payment_ratio: 0.0,
            medicare_coverage_ratio: 0.0,
            financial_stress_index: 0.0,
            avg_charges_log: 0.0,
            state_avg_payment_ratio: 0.0,
            size_category: SizeCategory::Unknown,
            drg_diversity: 0,
        }
    }
}

/// One (provider, year) aggregate with a leakage-safe next-year target.
///
/// Built once by [`crate::panel::build_panel`] and never mutated afterwards.
/// A `ProviderYear` exists only if the provider has an observed subsequent
/// year — the final observed year per provider carries no label and is
/// dropped at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderYear {
    pub provider_id: u64,
    pub provider_name: String,
    pub state: String,
    pub year: i32,

    // Averaged ratio features
    pub payment_ratio: f64,
    pub medicare_coverage_ratio: f64,
    pub financial_stress_index: f64,
    pub avg_charges_log: f64,
    pub state_avg_payment_ratio: f64,

    // Representative categorical attributes
    pub size_category: SizeCategory,
    pub drg_diversity: u32,

    /// Total discharge volume this year.
    pub discharge_volume: f64,
    /// The same provider's volume at the next observed year.
    pub next_year_volume: f64,
    /// (next − current) / (current + ε); `None` when current volume is zero.
    pub growth: Option<f64>,
    /// Growth at or above the recorded 80th-percentile threshold.
    pub high_risk: bool,
}
