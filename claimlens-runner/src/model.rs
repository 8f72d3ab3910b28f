//! Risk model — one regression serving a magnitude task and a ranking task.
//!
//! An ordinary-least-squares regressor (SVD least squares; rank-deficient
//! designs take the minimum-norm solution, since the stress index is exactly
//! collinear with the payment ratio and intercept) is fit on the train split
//! only and predicts next-year discharge volume. The same prediction then
//! feeds a bounded risk score:
//!
//! `score = clip((predicted − current)/(current + ε) / (threshold + ε), 0, 1)`
//!
//! where `threshold` is the 80th-percentile growth recorded at panel-labeling
//! time. The dual use trades calibration fidelity for a single unified signal
//! and is deliberate; do not split it into two tuned models.
//!
//! The feature layout is fixed and enumerated — including the four size
//! buckets — so the persisted artifact and the scoring path cannot drift from
//! the training-time encoding.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use claimlens_core::domain::{ProviderYear, SizeCategory};
use claimlens_core::split::{PanelSplit, SplitBoundaries};
use claimlens_core::EPS;

use crate::metrics::{mean_absolute_error, roc_auc};

/// Persisted artifact schema version; unknown versions are rejected on load.
pub const ARTIFACT_SCHEMA_VERSION: u32 = 1;

/// Singular values below this are treated as zero in the least-squares solve.
const SVD_EPS: f64 = 1e-9;

/// Fixed, ordered feature layout. The artifact records this list and scoring
/// validates against it.
pub const FEATURE_NAMES: [&str; 12] = [
    "payment_ratio",
    "medicare_coverage_ratio",
    "financial_stress_index",
    "avg_charges_log",
    "state_avg_payment_ratio",
    "drg_diversity",
    "year",
    "size_small",
    "size_medium",
    "size_large",
    "size_unknown",
    "intercept",
];

/// Errors from model fitting.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("cannot fit risk model: train split is empty")]
    EmptyTrainSplit,
    #[error("least-squares solve failed on the training design")]
    SingularDesign,
}

/// The raw inputs a prediction needs, independent of where they came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInputs {
    pub payment_ratio: f64,
    pub medicare_coverage_ratio: f64,
    pub financial_stress_index: f64,
    pub avg_charges_log: f64,
    pub state_avg_payment_ratio: f64,
    pub drg_diversity: f64,
    pub year: i32,
    pub size_category: SizeCategory,
}

impl ModelInputs {
    /// Encode into the fixed `FEATURE_NAMES` layout.
    pub fn encode(&self) -> [f64; 12] {
        let size = self.size_category.dummies();
        [
            self.payment_ratio,
            self.medicare_coverage_ratio,
            self.financial_stress_index,
            self.avg_charges_log,
            self.state_avg_payment_ratio,
            self.drg_diversity,
            self.year as f64,
            size[0],
            size[1],
            size[2],
            size[3],
            1.0,
        ]
    }
}

impl From<&ProviderYear> for ModelInputs {
    fn from(row: &ProviderYear) -> Self {
        Self {
            payment_ratio: row.payment_ratio,
            medicare_coverage_ratio: row.medicare_coverage_ratio,
            financial_stress_index: row.financial_stress_index,
            avg_charges_log: row.avg_charges_log,
            state_avg_payment_ratio: row.state_avg_payment_ratio,
            drg_diversity: row.drg_diversity as f64,
            year: row.year,
            size_category: row.size_category,
        }
    }
}

/// Fitted risk model: weight vector plus the recorded labeling threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskModel {
    weights: Vec<f64>,
    growth_threshold: f64,
}

impl RiskModel {
    /// Fit on the train split only, predicting `next_year_volume`.
    pub fn fit(train: &[&ProviderYear], growth_threshold: f64) -> Result<Self, ModelError> {
        if train.is_empty() {
            return Err(ModelError::EmptyTrainSplit);
        }
        let n = train.len();
        let k = FEATURE_NAMES.len();

        let mut x_data = Vec::with_capacity(n * k);
        for row in train {
            x_data.extend_from_slice(&ModelInputs::from(*row).encode());
        }
        let x = DMatrix::from_row_slice(n, k, &x_data);
        let y = DVector::from_iterator(n, train.iter().map(|r| r.next_year_volume));

        let svd = x.svd(true, true);
        let weights = svd.solve(&y, SVD_EPS).map_err(|_| ModelError::SingularDesign)?;

        Ok(Self { weights: weights.iter().copied().collect(), growth_threshold })
    }

    pub fn growth_threshold(&self) -> f64 {
        self.growth_threshold
    }

    pub fn predict(&self, inputs: &ModelInputs) -> f64 {
        inputs
            .encode()
            .iter()
            .zip(&self.weights)
            .map(|(f, w)| f * w)
            .sum()
    }

    /// Bounded risk score in [0, 1] from a predicted and a current volume.
    pub fn risk_score(&self, predicted: f64, current_volume: f64) -> f64 {
        let raw_growth = (predicted - current_volume) / (current_volume + EPS);
        let score = raw_growth / (self.growth_threshold + EPS);
        if score.is_nan() {
            0.0
        } else {
            score.clamp(0.0, 1.0)
        }
    }

    /// Predict across validation and test, report MAE and ranking quality.
    ///
    /// An empty split produces `None` for its metrics — explicitly undefined,
    /// never a panic; callers decide whether that is fatal.
    pub fn evaluate(&self, split: &PanelSplit<'_>) -> ModelReport {
        let mae_of = |rows: &[&ProviderYear]| {
            let actual: Vec<f64> = rows.iter().map(|r| r.next_year_volume).collect();
            let predicted: Vec<f64> =
                rows.iter().map(|r| self.predict(&ModelInputs::from(*r))).collect();
            mean_absolute_error(&actual, &predicted)
        };

        let predictions: Vec<Prediction> = split
            .test
            .iter()
            .map(|row| {
                let predicted = self.predict(&ModelInputs::from(*row));
                Prediction {
                    provider_id: row.provider_id,
                    provider_name: row.provider_name.clone(),
                    state: row.state.clone(),
                    year: row.year,
                    current_volume: row.discharge_volume,
                    predicted_next_volume: predicted,
                    growth: row.growth,
                    high_risk: row.high_risk,
                    risk_score: self.risk_score(predicted, row.discharge_volume),
                }
            })
            .collect();

        let labels: Vec<bool> = split.test.iter().map(|r| r.high_risk).collect();
        let scores: Vec<f64> = predictions.iter().map(|p| p.risk_score).collect();

        ModelReport {
            mae_validation: mae_of(&split.validation),
            mae_test: mae_of(&split.test),
            auc_test: roc_auc(&labels, &scores),
            predictions,
        }
    }

    pub fn to_artifact(&self, boundaries: SplitBoundaries) -> ModelArtifact {
        ModelArtifact {
            schema_version: ARTIFACT_SCHEMA_VERSION,
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            weights: self.weights.clone(),
            growth_threshold: self.growth_threshold,
            boundaries,
        }
    }

    /// Rebuild from a persisted artifact. The artifact's feature-name list
    /// must match the compiled-in layout exactly; drift is a hard error.
    pub fn from_artifact(artifact: &ModelArtifact) -> Result<Self, ArtifactError> {
        if artifact.schema_version > ARTIFACT_SCHEMA_VERSION {
            return Err(ArtifactError::UnsupportedVersion {
                found: artifact.schema_version,
                max: ARTIFACT_SCHEMA_VERSION,
            });
        }
        if artifact.feature_names != FEATURE_NAMES {
            return Err(ArtifactError::FeatureSchemaDrift {
                expected: FEATURE_NAMES.join(","),
                found: artifact.feature_names.join(","),
            });
        }
        if artifact.weights.len() != FEATURE_NAMES.len() {
            return Err(ArtifactError::WeightCountMismatch {
                expected: FEATURE_NAMES.len(),
                found: artifact.weights.len(),
            });
        }
        Ok(Self {
            weights: artifact.weights.clone(),
            growth_threshold: artifact.growth_threshold,
        })
    }
}

/// One scored test-split row, exported as the predictions table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub provider_id: u64,
    pub provider_name: String,
    pub state: String,
    pub year: i32,
    pub current_volume: f64,
    pub predicted_next_volume: f64,
    pub growth: Option<f64>,
    pub high_risk: bool,
    pub risk_score: f64,
}

/// Evaluation summary across the validation and test splits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelReport {
    pub mae_validation: Option<f64>,
    pub mae_test: Option<f64>,
    pub auc_test: Option<f64>,
    pub predictions: Vec<Prediction>,
}

/// Persisted model artifact: ordered feature names, weights, and the
/// labeling-time growth threshold, under a schema version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub schema_version: u32,
    pub feature_names: Vec<String>,
    pub weights: Vec<f64>,
    pub growth_threshold: f64,
    pub boundaries: SplitBoundaries,
}

/// Errors from artifact persistence.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("unsupported artifact schema version {found} (max supported: {max})")]
    UnsupportedVersion { found: u32, max: u32 },
    #[error("feature schema drift: artifact has [{found}], this build expects [{expected}]")]
    FeatureSchemaDrift { expected: String, found: String },
    #[error("artifact has {found} weights, expected {expected}")]
    WeightCountMismatch { expected: usize, found: usize },
    #[error("failed to parse model artifact: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ModelArtifact {
    pub fn to_json(&self) -> Result<String, ArtifactError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ArtifactError> {
        let artifact: ModelArtifact = serde_json::from_str(json)?;
        if artifact.schema_version > ARTIFACT_SCHEMA_VERSION {
            return Err(ArtifactError::UnsupportedVersion {
                found: artifact.schema_version,
                max: ARTIFACT_SCHEMA_VERSION,
            });
        }
        Ok(artifact)
    }
}
