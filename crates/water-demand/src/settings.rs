use anyhow::{bail, Result};
use clap::Parser;
use demand_core::config::PipelineConfig;
use demand_core::parsers::DateParser;
use std::path::PathBuf;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Preprocess water billing data into daily demand and client features
#[derive(Parser, Debug, Clone)]
#[command(
    name = "water-demand",
    about = "Preprocess water billing data into daily demand and client features",
    version
)]
pub struct Settings {
    /// Pipeline configuration file (JSON)
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// Directory searched recursively for raw CSV files
    #[arg(long)]
    pub raw_data_dir: Option<PathBuf>,

    /// Write the normalized records here
    #[arg(long)]
    pub intermediate_data: Option<PathBuf>,

    /// Write the daily series here
    #[arg(long)]
    pub preprocessed_data: Option<PathBuf>,

    /// Write the client snapshot table here
    #[arg(long)]
    pub client_data: Option<PathBuf>,

    /// Evaluation date for client snapshots
    #[arg(long)]
    pub eval_date: Option<String>,

    /// Skip client snapshots even when an evaluation date is configured
    #[arg(long)]
    pub skip_clients: bool,

    /// Save the merged configuration to this path before running
    #[arg(long)]
    pub save_config: Option<PathBuf>,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Settings {
    /// `--debug` wins over `--log-level`.
    pub fn effective_log_level(&self) -> &str {
        if self.debug {
            "DEBUG"
        } else {
            self.log_level.as_str()
        }
    }

    /// Overwrite the file's paths and evaluation date with any values given
    /// on the command line.
    pub fn apply_overrides(&self, config: &mut PipelineConfig) -> Result<()> {
        if let Some(dir) = &self.raw_data_dir {
            config.paths.raw_data_dir = dir.clone();
        }
        if let Some(path) = &self.intermediate_data {
            config.paths.intermediate_data = Some(path.clone());
        }
        if let Some(path) = &self.preprocessed_data {
            config.paths.preprocessed_data = Some(path.clone());
        }
        if let Some(path) = &self.client_data {
            config.paths.client_data = Some(path.clone());
        }
        if let Some(raw) = &self.eval_date {
            if DateParser::parse(raw).is_none() {
                bail!("Invalid --eval-date: {}", raw);
            }
            config.clustering.eval_date = Some(raw.clone());
        }
        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn parse(args: &[&str]) -> Settings {
        Settings::parse_from(std::iter::once("water-demand").chain(args.iter().copied()))
    }

    fn base_config() -> PipelineConfig {
        serde_json::from_str(
            r#"{
                "DATA": { "CATEGORICAL_FEATS": ["RES_TYPE"] },
                "PATHS": { "RAW_DATA_DIR": "data/raw", "PREPROCESSED_DATA": "data/daily.csv" },
                "CLUSTERING": { "EVAL_DATE": "2021-06-30" }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_defaults() {
        let settings = parse(&[]);
        assert_eq!(settings.config, PathBuf::from("config.json"));
        assert_eq!(settings.effective_log_level(), "INFO");
        assert!(!settings.skip_clients);
    }

    #[test]
    fn test_debug_overrides_log_level() {
        let settings = parse(&["--log-level", "ERROR", "--debug"]);
        assert_eq!(settings.effective_log_level(), "DEBUG");
    }

    #[test]
    fn test_rejects_unknown_log_level() {
        let result = Settings::try_parse_from(["water-demand", "--log-level", "LOUD"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_no_overrides_keeps_config() {
        let mut config = base_config();
        parse(&[]).apply_overrides(&mut config).unwrap();
        assert_eq!(config, base_config());
    }

    #[test]
    fn test_overrides_replace_paths_and_date() {
        let mut config = base_config();
        let settings = parse(&[
            "--raw-data-dir",
            "elsewhere",
            "--client-data",
            "out/clients.csv",
            "--eval-date",
            "2022-12-31",
        ]);
        settings.apply_overrides(&mut config).unwrap();

        assert_eq!(config.paths.raw_data_dir, PathBuf::from("elsewhere"));
        assert_eq!(config.paths.client_data, Some(PathBuf::from("out/clients.csv")));
        assert_eq!(
            config.paths.preprocessed_data,
            Some(PathBuf::from("data/daily.csv"))
        );
        assert_eq!(
            config.eval_date().unwrap(),
            NaiveDate::from_ymd_opt(2022, 12, 31)
        );
    }

    #[test]
    fn test_invalid_eval_date_is_rejected() {
        let mut config = base_config();
        let settings = parse(&["--eval-date", "someday"]);
        assert!(settings.apply_overrides(&mut config).is_err());
        assert_eq!(config.clustering.eval_date.as_deref(), Some("2021-06-30"));
    }
}
