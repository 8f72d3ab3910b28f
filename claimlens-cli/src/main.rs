//! ClaimLens CLI — analysis and scoring commands.
//!
//! Commands:
//! - `run` — execute the full analysis from a TOML config and save artifacts
//! - `score` — score provider-year requests against a saved model.json

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use claimlens_runner::{
    run_analysis, save_artifacts, AnalysisReport, RunConfig, ScoreRequest, ScoringHandle,
};

#[derive(Parser)]
#[command(name = "claimlens", about = "ClaimLens CLI — hospital cost-report analytics")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute the full analysis pipeline and save the artifact bundle.
    Run {
        /// Path to a TOML config file. Without it, defaults apply.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the configured input data directory.
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Override the configured artifact output directory.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Score requests from a JSON file against a saved model artifact.
    Score {
        /// Path to a model.json produced by `run`.
        #[arg(long)]
        model: PathBuf,

        /// JSON file holding one request object or an array of them.
        #[arg(long)]
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, data_dir, out } => run_cmd(config, data_dir, out),
        Commands::Score { model, input } => score_cmd(&model, &input),
    }
}

fn run_cmd(
    config_path: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    out: Option<PathBuf>,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => RunConfig::from_toml_file(&path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => RunConfig::default(),
    };
    if let Some(data_dir) = data_dir {
        config.data_dir = data_dir;
    }
    if let Some(out) = out {
        config.output_dir = out;
    }

    let report = run_analysis(&config)?;
    print_summary(&report);

    let run_dir = save_artifacts(&report, &config.output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());

    Ok(())
}

fn score_cmd(model_path: &PathBuf, input_path: &PathBuf) -> Result<()> {
    let model_json = std::fs::read_to_string(model_path)
        .with_context(|| format!("failed to read {}", model_path.display()))?;
    let handle = ScoringHandle::from_json(&model_json)?;

    let input = std::fs::read_to_string(input_path)
        .with_context(|| format!("failed to read {}", input_path.display()))?;
    // Accept either a single request object or an array.
    let requests: Vec<ScoreRequest> = match serde_json::from_str(&input) {
        Ok(batch) => batch,
        Err(_) => vec![serde_json::from_str(&input)
            .context("input is neither a request object nor an array of them")?],
    };

    let responses = handle.score_batch(&requests);
    println!("{}", serde_json::to_string_pretty(&responses)?);
    Ok(())
}

fn print_summary(report: &AnalysisReport) {
    println!();
    println!("=== Analysis Result ===");
    println!("Run ID:          {}", report.run_id);
    println!("Records:         {}", report.n_records);
    println!("Provider-years:  {}", report.n_panel_rows);
    println!("Growth threshold:{:.4}", report.growth_threshold);
    println!();
    println!("--- Risk Model ---");
    println!("MAE (validation):{}", fmt_opt(report.model.mae_validation));
    println!("MAE (test):      {}", fmt_opt(report.model.mae_test));
    println!("AUC (test):      {}", fmt_opt(report.model.auc_test));
    println!();
    println!("--- Policy Effect ---");
    println!("DiD effect:      {:.6}", report.did.effect);
    println!(
        "DiD 95% CI:      [{:.6}, {:.6}]",
        report.did_bootstrap.p2_5, report.did_bootstrap.p97_5
    );
    if let Some(uplift) = &report.uplift {
        println!("Uplift:          {:.6} (n={})", uplift.average_effect, uplift.n_obs);
    }
    println!();
    println!("--- Opportunity ---");
    println!(
        "TAM:             {:.0} [{:.0}, {:.0}]",
        report.tam_estimate, report.tam_bootstrap.p2_5, report.tam_bootstrap.p97_5
    );
    println!(
        "Readmit ratio:   {:.4} [{:.4}, {:.4}]",
        report.readmit_ratio_estimate,
        report.readmit_ratio_bootstrap.p2_5,
        report.readmit_ratio_bootstrap.p97_5
    );
    println!();
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map_or_else(|| "n/a".to_string(), |v| format!("{v:.4}"))
}
