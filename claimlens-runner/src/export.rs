//! Reporting and export — JSON, CSV, and Markdown artifact generation.
//!
//! One analysis run produces a directory of artifacts:
//! - `report.json` — the full `AnalysisReport`
//! - `model.json` — the scoring artifact alone, schema-versioned
//! - `predictions.csv`, `did_summary.csv`, `top_hospitals.csv`
//! - one `*_bootstrap.csv` per bootstrapped statistic, exactly {mean, p2_5, p97_5}
//! - view CSVs (`zip_metrics.csv`, `temporal.csv`, ...)
//! - `report.md` — a human-readable summary

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::bootstrap::BootstrapSummary;
use crate::model::Prediction;
use crate::opportunity::OpportunityRow;
use crate::runner::AnalysisReport;
use crate::views::{
    ReadmitConcentrationRow, SystemPerfRow, TemporalRow, YoyGrowthRow, ZipMetricsRow,
};

// ─── CSV export ─────────────────────────────────────────────────────

fn csv_into_string(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map_or_else(String::new, |v| format!("{v:.6}"))
}

/// Per-provider-year predictions with risk scores.
pub fn export_predictions_csv(predictions: &[Prediction]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "provider_id",
        "provider_name",
        "state",
        "year",
        "current_volume",
        "predicted_next_volume",
        "growth",
        "high_risk",
        "risk_score",
    ])?;
    for p in predictions {
        wtr.write_record([
            &p.provider_id.to_string(),
            &p.provider_name,
            &p.state,
            &p.year.to_string(),
            &format!("{:.2}", p.current_volume),
            &format!("{:.2}", p.predicted_next_volume),
            &fmt_opt(p.growth),
            &p.high_risk.to_string(),
            &format!("{:.6}", p.risk_score),
        ])?;
    }
    csv_into_string(wtr)
}

/// One bootstrap-summary table: exactly {mean, p2_5, p97_5}.
pub fn export_bootstrap_csv(summary: &BootstrapSummary) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["mean", "p2_5", "p97_5"])?;
    wtr.write_record([
        format!("{:.6}", summary.mean),
        format!("{:.6}", summary.p2_5),
        format!("{:.6}", summary.p97_5),
    ])?;
    csv_into_string(wtr)
}

/// The four DiD cell means and the effect.
pub fn export_did_csv(report: &AnalysisReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "treated_pre",
        "treated_post",
        "control_pre",
        "control_post",
        "effect",
        "n_obs",
    ])?;
    let d = &report.did;
    wtr.write_record([
        &format!("{:.6}", d.treated_pre),
        &format!("{:.6}", d.treated_post),
        &format!("{:.6}", d.control_pre),
        &format!("{:.6}", d.control_post),
        &format!("{:.6}", d.effect),
        &d.n_obs.to_string(),
    ])?;
    csv_into_string(wtr)
}

pub fn export_opportunities_csv(rows: &[OpportunityRow]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["provider_id", "provider_name", "state", "opportunity"])?;
    for r in rows {
        wtr.write_record([
            &r.provider_id.to_string(),
            &r.provider_name,
            &r.state,
            &format!("{:.2}", r.opportunity),
        ])?;
    }
    csv_into_string(wtr)
}

pub fn export_zip_metrics_csv(rows: &[ZipMetricsRow]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "zip_code",
        "year",
        "payment_ratio",
        "total_discharges",
        "avg_total_payments",
        "financial_stress_index",
        "stressed_area",
    ])?;
    for r in rows {
        wtr.write_record([
            &r.zip_code,
            &r.year.to_string(),
            &format!("{:.6}", r.payment_ratio),
            &format!("{:.2}", r.total_discharges),
            &format!("{:.2}", r.avg_total_payments),
            &format!("{:.6}", r.financial_stress_index),
            &r.stressed_area.to_string(),
        ])?;
    }
    csv_into_string(wtr)
}

pub fn export_readmit_concentration_csv(rows: &[ReadmitConcentrationRow]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["zip_code", "readmit_discharges"])?;
    for r in rows {
        wtr.write_record([&r.zip_code, &format!("{:.2}", r.readmit_discharges)])?;
    }
    csv_into_string(wtr)
}

pub fn export_temporal_csv(rows: &[TemporalRow]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "year",
        "state",
        "readmit_prone",
        "total_discharges",
        "payment_ratio",
        "avg_total_payments",
    ])?;
    for r in rows {
        wtr.write_record([
            &r.year.to_string(),
            &r.state,
            &r.readmit_prone.to_string(),
            &format!("{:.2}", r.total_discharges),
            &format!("{:.6}", r.payment_ratio),
            &format!("{:.2}", r.avg_total_payments),
        ])?;
    }
    csv_into_string(wtr)
}

pub fn export_yoy_growth_csv(rows: &[YoyGrowthRow]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["provider_id", "year", "readmit_discharges", "previous", "yoy_growth"])?;
    for r in rows {
        wtr.write_record([
            &r.provider_id.to_string(),
            &r.year.to_string(),
            &format!("{:.2}", r.readmit_discharges),
            &fmt_opt(r.previous),
            &fmt_opt(r.yoy_growth),
        ])?;
    }
    csv_into_string(wtr)
}

pub fn export_system_performance_csv(rows: &[SystemPerfRow]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "system",
        "readmit_prone",
        "total_discharges",
        "payment_ratio",
        "avg_total_payments",
    ])?;
    for r in rows {
        wtr.write_record([
            &r.system,
            &r.readmit_prone.to_string(),
            &format!("{:.2}", r.total_discharges),
            &format!("{:.6}", r.payment_ratio),
            &format!("{:.2}", r.avg_total_payments),
        ])?;
    }
    csv_into_string(wtr)
}

// ─── Markdown report ────────────────────────────────────────────────

/// Human-readable summary of one analysis run.
pub fn generate_report(report: &AnalysisReport) -> String {
    let mut md = String::with_capacity(2048);

    md.push_str("# Cost-Report Analysis\n\n");

    md.push_str("## Run\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Run ID | {} |\n", report.run_id));
    md.push_str(&format!("| Records | {} |\n", report.n_records));
    md.push_str(&format!("| Provider-years | {} |\n", report.n_panel_rows));
    md.push_str(&format!(
        "| Growth threshold | {:.4} |\n",
        report.growth_threshold
    ));
    md.push('\n');

    md.push_str("## Risk Model\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!(
        "| MAE (validation) | {} |\n",
        fmt_opt(report.model.mae_validation)
    ));
    md.push_str(&format!("| MAE (test) | {} |\n", fmt_opt(report.model.mae_test)));
    md.push_str(&format!("| AUC (test) | {} |\n", fmt_opt(report.model.auc_test)));
    md.push('\n');

    md.push_str("## Policy Effect (DiD)\n\n");
    md.push_str("| Cell | Mean payment ratio |\n");
    md.push_str("| --- | ---: |\n");
    md.push_str(&format!("| Treated, pre | {:.6} |\n", report.did.treated_pre));
    md.push_str(&format!("| Treated, post | {:.6} |\n", report.did.treated_post));
    md.push_str(&format!("| Control, pre | {:.6} |\n", report.did.control_pre));
    md.push_str(&format!("| Control, post | {:.6} |\n", report.did.control_post));
    md.push_str(&format!("| **Effect** | {:.6} |\n", report.did.effect));
    if let Some(uplift) = &report.uplift {
        md.push_str(&format!(
            "\nUplift estimate: {:.6} over {} observations.\n",
            uplift.average_effect, uplift.n_obs
        ));
    }
    md.push('\n');

    md.push_str("## Bootstrapped Statistics\n\n");
    md.push_str("| Statistic | Estimate | Mean | 2.5% | 97.5% |\n");
    md.push_str("| --- | ---: | ---: | ---: | ---: |\n");
    for (name, estimate, summary) in [
        ("TAM", report.tam_estimate, &report.tam_bootstrap),
        (
            "Readmit cost ratio",
            report.readmit_ratio_estimate,
            &report.readmit_ratio_bootstrap,
        ),
        ("DiD effect", report.did.effect, &report.did_bootstrap),
    ] {
        md.push_str(&format!(
            "| {name} | {estimate:.4} | {:.4} | {:.4} | {:.4} |\n",
            summary.mean, summary.p2_5, summary.p97_5
        ));
    }
    md.push('\n');

    if !report.top_opportunities.is_empty() {
        md.push_str("## Top Savings Opportunities\n\n");
        md.push_str("| Provider | State | Opportunity |\n");
        md.push_str("| --- | --- | ---: |\n");
        for row in &report.top_opportunities {
            md.push_str(&format!(
                "| {} | {} | {:.0} |\n",
                row.provider_name, row.state, row.opportunity
            ));
        }
        md.push('\n');
    }

    md
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for one analysis run.
///
/// Creates `run_{timestamp}/` under `output_dir` and returns its path.
pub fn save_artifacts(report: &AnalysisReport, output_dir: &Path) -> Result<PathBuf> {
    let dirname = format!("run_{}", chrono::Local::now().format("%Y%m%d_%H%M%S"));
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let json = serde_json::to_string_pretty(report)
        .context("failed to serialize AnalysisReport to JSON")?;
    std::fs::write(run_dir.join("report.json"), &json)?;

    let model_json = report
        .artifact
        .to_json()
        .context("failed to serialize model artifact")?;
    std::fs::write(run_dir.join("model.json"), &model_json)?;

    std::fs::write(
        run_dir.join("predictions.csv"),
        export_predictions_csv(&report.model.predictions)?,
    )?;
    std::fs::write(
        run_dir.join("tam_bootstrap.csv"),
        export_bootstrap_csv(&report.tam_bootstrap)?,
    )?;
    std::fs::write(
        run_dir.join("readmit_ratio_bootstrap.csv"),
        export_bootstrap_csv(&report.readmit_ratio_bootstrap)?,
    )?;
    std::fs::write(
        run_dir.join("did_bootstrap.csv"),
        export_bootstrap_csv(&report.did_bootstrap)?,
    )?;
    std::fs::write(run_dir.join("did_summary.csv"), export_did_csv(report)?)?;
    std::fs::write(
        run_dir.join("top_hospitals.csv"),
        export_opportunities_csv(&report.top_opportunities)?,
    )?;
    std::fs::write(run_dir.join("zip_metrics.csv"), export_zip_metrics_csv(&report.zip_metrics)?)?;
    std::fs::write(
        run_dir.join("readmit_concentration.csv"),
        export_readmit_concentration_csv(&report.readmit_concentration)?,
    )?;
    std::fs::write(run_dir.join("temporal.csv"), export_temporal_csv(&report.temporal)?)?;
    std::fs::write(run_dir.join("yoy_growth.csv"), export_yoy_growth_csv(&report.yoy_growth)?)?;
    std::fs::write(
        run_dir.join("system_performance.csv"),
        export_system_performance_csv(&report.system_performance)?,
    )?;
    std::fs::write(run_dir.join("report.md"), generate_report(report))?;

    Ok(run_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use claimlens_core::split::SplitBoundaries;

    use crate::bootstrap::BootstrapSummary;
    use crate::causal::DidEstimate;
    use crate::model::{ModelArtifact, ModelReport, ARTIFACT_SCHEMA_VERSION, FEATURE_NAMES};

    fn sample_prediction() -> Prediction {
        Prediction {
            provider_id: 10001,
            provider_name: "MERCY GENERAL".into(),
            state: "GA".into(),
            year: 2014,
            current_volume: 120.0,
            predicted_next_volume: 135.5,
            growth: Some(0.1292),
            high_risk: true,
            risk_score: 0.81,
        }
    }

    fn sample_summary() -> BootstrapSummary {
        BootstrapSummary { mean: 1.5, p2_5: 1.1, p97_5: 2.2 }
    }

    fn sample_report() -> AnalysisReport {
        AnalysisReport {
            run_id: "abc123".into(),
            n_records: 10,
            n_panel_rows: 4,
            growth_threshold: 0.64,
            model: ModelReport {
                mae_validation: Some(12.5),
                mae_test: Some(14.0),
                auc_test: Some(0.73),
                predictions: vec![sample_prediction()],
            },
            artifact: ModelArtifact {
                schema_version: ARTIFACT_SCHEMA_VERSION,
                feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
                weights: vec![0.0; FEATURE_NAMES.len()],
                growth_threshold: 0.64,
                boundaries: SplitBoundaries::default(),
            },
            did: DidEstimate {
                treated_pre: 0.30,
                treated_post: 0.40,
                control_pre: 0.32,
                control_post: 0.33,
                effect: 0.09,
                n_obs: 4,
            },
            uplift: None,
            tam_estimate: 200_000.0,
            readmit_ratio_estimate: 1.5,
            tam_bootstrap: sample_summary(),
            readmit_ratio_bootstrap: sample_summary(),
            did_bootstrap: sample_summary(),
            zip_metrics: vec![],
            readmit_concentration: vec![],
            temporal: vec![],
            yoy_growth: vec![],
            system_performance: vec![],
            top_opportunities: vec![OpportunityRow {
                provider_id: 10001,
                provider_name: "MERCY GENERAL".into(),
                state: "GA".into(),
                opportunity: 40_000.0,
            }],
        }
    }

    #[test]
    fn predictions_csv_has_all_columns() {
        let csv = export_predictions_csv(&[sample_prediction()]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "provider_id,provider_name,state,year,current_volume,\
             predicted_next_volume,growth,high_risk,risk_score"
        );
        assert!(lines[1].contains("MERCY GENERAL"));
        assert!(lines[1].contains("true"));
    }

    #[test]
    fn predictions_csv_blank_for_undefined_growth() {
        let mut p = sample_prediction();
        p.growth = None;
        let csv = export_predictions_csv(&[p]).unwrap();
        assert!(csv.lines().nth(1).unwrap().contains(",,"));
    }

    #[test]
    fn bootstrap_csv_is_exactly_mean_and_interval() {
        let csv = export_bootstrap_csv(&sample_summary()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "mean,p2_5,p97_5");
        assert_eq!(lines[1], "1.500000,1.100000,2.200000");
    }

    #[test]
    fn did_csv_single_row() {
        let csv = export_did_csv(&sample_report()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].ends_with(",4"));
        assert!(lines[1].contains("0.090000"));
    }

    #[test]
    fn markdown_report_has_sections() {
        let md = generate_report(&sample_report());
        assert!(md.contains("# Cost-Report Analysis"));
        assert!(md.contains("## Risk Model"));
        assert!(md.contains("## Policy Effect (DiD)"));
        assert!(md.contains("## Bootstrapped Statistics"));
        assert!(md.contains("## Top Savings Opportunities"));
        assert!(md.contains("| **Effect** | 0.090000 |"));
    }

    #[test]
    fn save_artifacts_writes_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let run_dir = save_artifacts(&sample_report(), dir.path()).unwrap();

        for name in [
            "report.json",
            "model.json",
            "predictions.csv",
            "tam_bootstrap.csv",
            "readmit_ratio_bootstrap.csv",
            "did_bootstrap.csv",
            "did_summary.csv",
            "top_hospitals.csv",
            "zip_metrics.csv",
            "readmit_concentration.csv",
            "temporal.csv",
            "yoy_growth.csv",
            "system_performance.csv",
            "report.md",
        ] {
            assert!(run_dir.join(name).exists(), "missing artifact {name}");
        }

        let loaded = ModelArtifact::from_json(
            &std::fs::read_to_string(run_dir.join("model.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(loaded.schema_version, ARTIFACT_SCHEMA_VERSION);
    }
}
