//! ClaimLens Runner — analysis orchestration, estimation, and export.
//!
//! This crate builds on `claimlens-core` to provide:
//! - Cost-report CSV ingestion with header harmonization
//! - Risk model fitting, evaluation, and schema-versioned artifacts
//! - Difference-in-differences policy estimation
//! - Cluster bootstrap with percentile confidence intervals
//! - Savings-opportunity statistics and descriptive views
//! - Artifact export (JSON, CSV, Markdown) and batch scoring

pub mod bootstrap;
pub mod causal;
pub mod config;
pub mod data;
pub mod export;
pub mod metrics;
pub mod model;
pub mod opportunity;
pub mod runner;
pub mod scoring;
pub mod views;

pub use bootstrap::{cluster_bootstrap, BootstrapConfig, BootstrapError, BootstrapSummary};
pub use causal::{
    did_effect, CausalError, DidEstimate, NoUplift, TreatmentRule, UpliftEstimate,
    UpliftEstimator,
};
pub use config::{ConfigError, RunConfig, RunId, TreatmentConfig};
pub use data::{load_cost_reports, LoadError};
pub use export::{generate_report, save_artifacts};
pub use metrics::{mean_absolute_error, roc_auc};
pub use model::{
    ArtifactError, ModelArtifact, ModelError, ModelInputs, ModelReport, Prediction, RiskModel,
};
pub use opportunity::{readmit_cost_ratio, tam_statistic, top_opportunities, OpportunityRow};
pub use runner::{run_analysis, run_analysis_with, AnalysisReport, RunError};
pub use scoring::{ScoreRequest, ScoreResponse, ScoringHandle};
