//! Pipeline orchestration — load, feature, panel, model, causal, bootstrap.
//!
//! `run_analysis` wires the stages end to end and returns a single
//! `AnalysisReport` that downstream export turns into artifacts. Every stage
//! is deterministic for a fixed configuration, so the report is reproducible
//! from the config alone (its RunId is the config hash).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use claimlens_core::features;
use claimlens_core::panel::{self, PanelError};
use claimlens_core::split::{split_panel, SplitError};

use crate::bootstrap::{cluster_bootstrap, BootstrapError, BootstrapSummary};
use crate::causal::{
    did_effect, did_statistic, CausalError, DidEstimate, NoUplift, UpliftEstimate,
    UpliftEstimator,
};
use crate::config::{ConfigError, RunConfig, RunId};
use crate::data::{load_cost_reports, LoadError};
use crate::model::{ArtifactError, ModelArtifact, ModelError, ModelReport, RiskModel};
use crate::opportunity::{readmit_cost_ratio, tam_statistic, top_opportunities, OpportunityRow};
use crate::views::{
    readmit_concentration, system_performance, temporal_rollup, yoy_readmit_growth,
    zip_metrics, ReadmitConcentrationRow, SystemPerfRow, TemporalRow, YoyGrowthRow,
    ZipMetricsRow,
};

/// Any failure of the analysis pipeline, by stage.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Panel(#[from] PanelError),
    #[error(transparent)]
    Split(#[from] SplitError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Causal(#[from] CausalError),
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

/// Everything one analysis run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub run_id: RunId,
    pub n_records: usize,
    pub n_panel_rows: usize,
    pub growth_threshold: f64,

    pub model: ModelReport,
    pub artifact: ModelArtifact,

    pub did: DidEstimate,
    pub uplift: Option<UpliftEstimate>,

    pub tam_estimate: f64,
    pub readmit_ratio_estimate: f64,
    pub tam_bootstrap: BootstrapSummary,
    pub readmit_ratio_bootstrap: BootstrapSummary,
    pub did_bootstrap: BootstrapSummary,

    pub zip_metrics: Vec<ZipMetricsRow>,
    pub readmit_concentration: Vec<ReadmitConcentrationRow>,
    pub temporal: Vec<TemporalRow>,
    pub yoy_growth: Vec<YoyGrowthRow>,
    pub system_performance: Vec<SystemPerfRow>,
    pub top_opportunities: Vec<OpportunityRow>,
}

/// Run the full analysis described by `config`.
pub fn run_analysis(config: &RunConfig) -> Result<AnalysisReport, RunError> {
    run_analysis_with(config, &NoUplift)
}

/// As `run_analysis`, with a caller-supplied uplift estimator.
pub fn run_analysis_with(
    config: &RunConfig,
    uplift_estimator: &dyn UpliftEstimator,
) -> Result<AnalysisReport, RunError> {
    let run_id = config.run_id();
    let rule = config.treatment_rule()?;
    log::info!("run {run_id}: loading cost reports from {}", config.data_dir.display());

    let records = features::derive(load_cost_reports(&config.data_dir)?);
    log::info!("run {run_id}: {} records loaded", records.len());

    let panel = panel::build_panel(&records)?;
    log::info!(
        "run {run_id}: panel has {} provider-years, growth threshold {:.4}",
        panel.rows.len(),
        panel.growth_threshold
    );

    let split = split_panel(&panel.rows, &config.split)?;
    let risk_model = RiskModel::fit(&split.train, panel.growth_threshold)?;
    let model_report = risk_model.evaluate(&split);
    let artifact = risk_model.to_artifact(config.split);
    log::info!(
        "run {run_id}: model fit on {} rows (mae_validation={:?}, auc_test={:?})",
        split.train.len(),
        model_report.mae_validation,
        model_report.auc_test
    );

    let did = did_effect(records.iter(), &rule)?;
    let uplift = uplift_estimator.try_estimate(&records, &rule);
    log::info!("run {run_id}: DiD effect {:.6} over {} observations", did.effect, did.n_obs);

    let all_refs: Vec<&_> = records.iter().collect();
    let tam_estimate = tam_statistic(&all_refs);
    let readmit_ratio_estimate = readmit_cost_ratio(&all_refs);

    let tam_bootstrap = cluster_bootstrap(
        &records,
        "tam",
        |r| r.drg_code.clone(),
        tam_statistic,
        &config.bootstrap,
    )?;
    let readmit_ratio_bootstrap = cluster_bootstrap(
        &records,
        "readmit_ratio",
        |r| Some(r.provider_id),
        readmit_cost_ratio,
        &config.bootstrap,
    )?;
    let did_bootstrap = cluster_bootstrap(
        &records,
        "did",
        |r| Some(r.state.clone()),
        |rows| did_statistic(rows, &rule),
        &config.bootstrap,
    )?;
    log::info!(
        "run {run_id}: bootstraps done (tam mean {:.2}, did mean {:.6})",
        tam_bootstrap.mean,
        did_bootstrap.mean
    );

    Ok(AnalysisReport {
        run_id,
        n_records: records.len(),
        n_panel_rows: panel.rows.len(),
        growth_threshold: panel.growth_threshold,
        model: model_report,
        artifact,
        did,
        uplift,
        tam_estimate,
        readmit_ratio_estimate,
        tam_bootstrap,
        readmit_ratio_bootstrap,
        did_bootstrap,
        zip_metrics: zip_metrics(&records),
        readmit_concentration: readmit_concentration(&records),
        temporal: temporal_rollup(&records),
        yoy_growth: yoy_readmit_growth(&records),
        system_performance: system_performance(&records),
        top_opportunities: top_opportunities(&records, config.top_opportunities),
    })
}
