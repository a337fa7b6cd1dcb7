//! Pipeline configuration file.
//!
//! The file keeps the upper-case key layout used by the project's existing
//! configs:
//!
//! ```json
//! {
//!   "DATA": { "CATEGORICAL_FEATS": [], "NUMERICAL_FEATS": [], "BOOLEAN_FEATS": [] },
//!   "PATHS": { "RAW_DATA_DIR": "data/raw" },
//!   "CLUSTERING": { "EVAL_DATE": "2021-06-30" }
//! }
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{DemandError, Result};
use crate::models::FeatureConfig;
use crate::parsers::DateParser;

/// Storage locations for raw, intermediate and output tables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PathsConfig {
    #[serde(rename = "RAW_DATA_DIR")]
    pub raw_data_dir: PathBuf,
    #[serde(rename = "INTERMEDIATE_DATA", skip_serializing_if = "Option::is_none", default)]
    pub intermediate_data: Option<PathBuf>,
    #[serde(rename = "PREPROCESSED_DATA", skip_serializing_if = "Option::is_none", default)]
    pub preprocessed_data: Option<PathBuf>,
    #[serde(rename = "CLIENT_DATA", skip_serializing_if = "Option::is_none", default)]
    pub client_data: Option<PathBuf>,
}

/// Settings for the client snapshot stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClusteringConfig {
    /// Evaluation date as written in the file; parsed lazily.
    #[serde(rename = "EVAL_DATE", skip_serializing_if = "Option::is_none", default)]
    pub eval_date: Option<String>,
}

/// The whole configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PipelineConfig {
    #[serde(rename = "DATA", default)]
    pub data: FeatureConfig,
    #[serde(rename = "PATHS")]
    pub paths: PathsConfig,
    #[serde(rename = "CLUSTERING", alias = "K-PROTOTYPES", default)]
    pub clustering: ClusteringConfig,
}

impl PipelineConfig {
    /// Load a config file. A missing or malformed file is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DemandError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let mut config: PipelineConfig = serde_json::from_str(&content)?;
        // Rebuild through the constructor so fixed column names are filtered.
        config.data = FeatureConfig::new(
            std::mem::take(&mut config.data.categorical),
            std::mem::take(&mut config.data.numerical),
            std::mem::take(&mut config.data.boolean),
        );
        Ok(config)
    }

    /// Atomically write the config, creating parent directories if needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;

        // Write to a temp file then rename for atomicity.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// The configured evaluation date, if any.
    pub fn eval_date(&self) -> Result<Option<NaiveDate>> {
        match self.clustering.eval_date.as_deref() {
            None => Ok(None),
            Some(raw) => DateParser::parse(raw)
                .map(Some)
                .ok_or_else(|| DemandError::InvalidDate(raw.to_string())),
        }
    }
}
