//! Serializable run configuration.
//!
//! A `RunConfig` captures everything needed to reproduce an analysis run:
//! data location, split boundaries, treatment rule, and bootstrap settings.
//! Its content hash doubles as the run identifier.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use claimlens_core::split::SplitBoundaries;

use crate::bootstrap::BootstrapConfig;
use crate::causal::{CausalError, TreatmentRule};

/// Unique identifier for an analysis run (content-addressable hash).
pub type RunId = String;

/// Errors raised while loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error(transparent)]
    Treatment(#[from] CausalError),
}

/// Serializable configuration for one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunConfig {
    /// Directory of cost-report CSV inputs.
    pub data_dir: PathBuf,

    /// Directory under which the run's artifact directory is created.
    pub output_dir: PathBuf,

    /// Temporal split boundaries.
    pub split: SplitBoundaries,

    /// Treated-group definition for the policy estimate.
    pub treatment: TreatmentConfig,

    /// Cluster-bootstrap settings shared by every bootstrapped statistic.
    pub bootstrap: BootstrapConfig,

    /// Number of providers reported in the opportunity ranking.
    pub top_opportunities: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("artifacts"),
            split: SplitBoundaries::default(),
            treatment: TreatmentConfig::default(),
            bootstrap: BootstrapConfig::default(),
            top_opportunities: 20,
        }
    }
}

impl RunConfig {
    /// Load a configuration from a TOML file. Absent keys take defaults.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        toml::from_str(&text)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    /// Deterministic hash ID for this configuration. Two runs with identical
    /// configs share a RunId.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_string(self).expect("RunConfig serialization failed");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    /// Build the validated treatment rule from the configured states.
    pub fn treatment_rule(&self) -> Result<TreatmentRule, ConfigError> {
        Ok(TreatmentRule::new(
            self.treatment.treated_states.iter().cloned(),
            self.treatment.policy_year,
        )?)
    }
}

/// Treated-group definition: jurisdiction codes plus the policy year.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TreatmentConfig {
    pub treated_states: Vec<String>,
    pub policy_year: i32,
}

impl Default for TreatmentConfig {
    fn default() -> Self {
        Self {
            treated_states: ["CA", "NY", "IL", "PA", "OH", "MI", "NJ", "WA", "MA", "MD"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            policy_year: 2014,
        }
    }
}
