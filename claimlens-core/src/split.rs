//! Temporal splitting — train/validation/test partition by calendar year.
//!
//! The split is a year predicate, never a random draw: train = year ≤ Y1,
//! validation = year == Y2, test = year == Y3, with Y1 < Y2 < Y3. No predicate
//! consults the target column.
//!
//! Leak caveat: a panel row at year Y1 carries a target observed at Y1 + 1.
//! When Y1 + 1 ≥ Y2, one year of validation-period information is embedded in
//! the train set. The reference boundaries (2013/2014/2015) have exactly this
//! overlap; it is preserved here and reported as an explicit warning rather
//! than silently accepted or hard-rejected.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::ProviderYear;

/// Year boundaries for the temporal split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitBoundaries {
    /// Last year included in the train set (inclusive).
    pub train_end: i32,
    /// The single validation year.
    pub validation_year: i32,
    /// The single test year.
    pub test_year: i32,
}

impl Default for SplitBoundaries {
    fn default() -> Self {
        Self { train_end: 2013, validation_year: 2014, test_year: 2015 }
    }
}

/// Errors from split configuration.
#[derive(Debug, Error)]
pub enum SplitError {
    #[error(
        "split boundaries must be strictly increasing: \
         train_end={train_end} < validation_year={validation_year} < test_year={test_year} fails"
    )]
    NonMonotoneBoundaries { train_end: i32, validation_year: i32, test_year: i32 },
}

impl SplitBoundaries {
    pub fn validate(&self) -> Result<(), SplitError> {
        if !(self.train_end < self.validation_year && self.validation_year < self.test_year) {
            return Err(SplitError::NonMonotoneBoundaries {
                train_end: self.train_end,
                validation_year: self.validation_year,
                test_year: self.test_year,
            });
        }
        if self.train_end + 1 >= self.validation_year {
            log::warn!(
                "train rows at year {} carry targets observed at {}, inside the \
                 validation boundary {}; one year of future information leaks across the split",
                self.train_end,
                self.train_end + 1,
                self.validation_year,
            );
        }
        Ok(())
    }
}

/// The three disjoint panel subsets. Borrows the panel; rows are never copied.
#[derive(Debug)]
pub struct PanelSplit<'a> {
    pub train: Vec<&'a ProviderYear>,
    pub validation: Vec<&'a ProviderYear>,
    pub test: Vec<&'a ProviderYear>,
}

/// Partition panel rows by the year predicates.
///
/// Rows with `train_end < year < validation_year`, between validation and
/// test, or beyond `test_year` fall outside all three sets. With consecutive
/// boundaries the three sets exactly cover all rows with year ≤ `test_year`.
pub fn split_panel<'a>(
    rows: &'a [ProviderYear],
    boundaries: &SplitBoundaries,
) -> Result<PanelSplit<'a>, SplitError> {
    boundaries.validate()?;

    let mut split =
        PanelSplit { train: Vec::new(), validation: Vec::new(), test: Vec::new() };
    for row in rows {
        if row.year <= boundaries.train_end {
            split.train.push(row);
        } else if row.year == boundaries.validation_year {
            split.validation.push(row);
        } else if row.year == boundaries.test_year {
            split.test.push(row);
        }
    }
    Ok(split)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SizeCategory;

    fn row(provider_id: u64, year: i32) -> ProviderYear {
        ProviderYear {
            provider_id,
            provider_name: format!("PROVIDER {provider_id}"),
            state: "GA".into(),
            year,
            payment_ratio: 0.3,
            medicare_coverage_ratio: 0.8,
            financial_stress_index: 0.7,
            avg_charges_log: 10.0,
            state_avg_payment_ratio: 0.3,
            size_category: SizeCategory::Medium,
            drg_diversity: 3,
            discharge_volume: 100.0,
            next_year_volume: 110.0,
            growth: Some(0.1),
            high_risk: false,
        }
    }

    #[test]
    fn default_boundaries_are_valid() {
        assert!(SplitBoundaries::default().validate().is_ok());
    }

    #[test]
    fn non_monotone_boundaries_rejected() {
        let b = SplitBoundaries { train_end: 2014, validation_year: 2014, test_year: 2015 };
        assert!(matches!(b.validate(), Err(SplitError::NonMonotoneBoundaries { .. })));
        let b = SplitBoundaries { train_end: 2013, validation_year: 2015, test_year: 2014 };
        assert!(b.validate().is_err());
    }

    #[test]
    fn partition_is_disjoint_and_covers_contiguous_years() {
        let rows: Vec<ProviderYear> =
            (2011..=2015).map(|y| row(y as u64, y)).collect();
        let split = split_panel(&rows, &SplitBoundaries::default()).unwrap();

        assert_eq!(split.train.len(), 3); // 2011–2013
        assert_eq!(split.validation.len(), 1); // 2014
        assert_eq!(split.test.len(), 1); // 2015
        assert_eq!(
            split.train.len() + split.validation.len() + split.test.len(),
            rows.iter().filter(|r| r.year <= 2015).count()
        );
    }

    #[test]
    fn years_beyond_test_boundary_are_excluded() {
        let rows = vec![row(1, 2015), row(2, 2016)];
        let split = split_panel(&rows, &SplitBoundaries::default()).unwrap();
        assert_eq!(split.test.len(), 1);
        assert!(split.train.is_empty());
        assert!(split.validation.is_empty());
    }

    #[test]
    fn gap_years_fall_outside_all_sets() {
        let b = SplitBoundaries { train_end: 2011, validation_year: 2014, test_year: 2016 };
        let rows: Vec<ProviderYear> = (2010..=2016).map(|y| row(y as u64, y)).collect();
        let split = split_panel(&rows, &b).unwrap();
        assert_eq!(split.train.len(), 2); // 2010, 2011
        assert_eq!(split.validation.len(), 1); // 2014
        assert_eq!(split.test.len(), 1); // 2016
    }
}
