//! Batch scoring against a persisted model artifact.
//!
//! A `ScoringHandle` is an immutable model loaded from `model.json`; scoring
//! never mutates it, so one handle can serve any number of requests. Requests
//! carry raw feature values; an unknown size label falls into the Unknown
//! bucket rather than failing the request.

use serde::{Deserialize, Serialize};

use claimlens_core::domain::SizeCategory;

use crate::model::{ArtifactError, ModelArtifact, ModelInputs, RiskModel};

/// An immutable, loaded scoring model.
#[derive(Debug, Clone)]
pub struct ScoringHandle {
    model: RiskModel,
}

/// One provider-year to score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreRequest {
    pub payment_ratio: f64,
    pub medicare_coverage_ratio: f64,
    pub financial_stress_index: f64,
    pub avg_charges_log: f64,
    pub state_avg_payment_ratio: f64,
    pub drg_diversity: f64,
    pub year: i32,
    /// Size label ("small", "medium", "large"); absent or unrecognized labels
    /// score in the Unknown bucket.
    #[serde(default)]
    pub size_category: Option<String>,
    /// Current-year volume; without it the risk score is undefined.
    #[serde(default)]
    pub current_volume: Option<f64>,
}

/// Scoring output for one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreResponse {
    pub predicted_next_volume: f64,
    /// Absent when the request carried no current volume.
    pub risk_score: Option<f64>,
}

impl ScoringHandle {
    /// Load a handle from a schema-checked artifact.
    pub fn from_artifact(artifact: &ModelArtifact) -> Result<Self, ArtifactError> {
        Ok(Self { model: RiskModel::from_artifact(artifact)? })
    }

    /// Load a handle from serialized `model.json` content.
    pub fn from_json(json: &str) -> Result<Self, ArtifactError> {
        Self::from_artifact(&ModelArtifact::from_json(json)?)
    }

    pub fn score(&self, request: &ScoreRequest) -> ScoreResponse {
        let size_category = request
            .size_category
            .as_deref()
            .and_then(SizeCategory::parse)
            .unwrap_or(SizeCategory::Unknown);
        let inputs = ModelInputs {
            payment_ratio: request.payment_ratio,
            medicare_coverage_ratio: request.medicare_coverage_ratio,
            financial_stress_index: request.financial_stress_index,
            avg_charges_log: request.avg_charges_log,
            state_avg_payment_ratio: request.state_avg_payment_ratio,
            drg_diversity: request.drg_diversity,
            year: request.year,
            size_category,
        };
        let predicted_next_volume = self.model.predict(&inputs);
        ScoreResponse {
            predicted_next_volume,
            risk_score: request
                .current_volume
                .map(|current| self.model.risk_score(predicted_next_volume, current)),
        }
    }

    /// Score a whole batch in request order.
    pub fn score_batch(&self, requests: &[ScoreRequest]) -> Vec<ScoreResponse> {
        requests.iter().map(|r| self.score(r)).collect()
    }
}
