use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the water demand pipeline.
#[derive(Error, Debug)]
pub enum DemandError {
    /// A raw source file could not be opened or parsed as CSV.
    #[error("Failed to read source {path}: {source}")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// An output table could not be written.
    #[error("Failed to write {path}: {source}")]
    SourceWrite {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A date string did not match any recognised format.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// The raw data directory does not exist.
    #[error("Data path not found: {0}")]
    DataPathNotFound(PathBuf),

    /// No CSV sources were found under the given directory.
    #[error("No CSV files found in {0}")]
    NoDataFiles(PathBuf),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A forecasting model could not fit, score or forecast a series.
    #[error("Forecast error: {0}")]
    Forecast(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the demand crates.
pub type Result<T> = std::result::Result<T, DemandError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_source_read() {
        let csv_err = csv::Error::from(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no such file",
        ));
        let err = DemandError::SourceRead {
            path: PathBuf::from("/raw/quarterly/q1.csv"),
            source: csv_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read source"));
        assert!(msg.contains("/raw/quarterly/q1.csv"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_error_display_invalid_date() {
        let err = DemandError::InvalidDate("2023-13-45".to_string());
        assert_eq!(err.to_string(), "Invalid date: 2023-13-45");
    }

    #[test]
    fn test_error_display_data_path_not_found() {
        let err = DemandError::DataPathNotFound(PathBuf::from("/missing/dir"));
        assert_eq!(err.to_string(), "Data path not found: /missing/dir");
    }

    #[test]
    fn test_error_display_no_data_files() {
        let err = DemandError::NoDataFiles(PathBuf::from("/empty/dir"));
        assert_eq!(err.to_string(), "No CSV files found in /empty/dir");
    }

    #[test]
    fn test_error_display_config() {
        let err = DemandError::Config("EVAL_DATE is not set".to_string());
        assert_eq!(err.to_string(), "Configuration error: EVAL_DATE is not set");
    }

    #[test]
    fn test_error_display_forecast() {
        let err = DemandError::Forecast("model is not fitted".to_string());
        assert_eq!(err.to_string(), "Forecast error: model is not fitted");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: DemandError = io_err.into();
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid}").unwrap_err();
        let err: DemandError = json_err.into();
        assert!(err.to_string().contains("Failed to parse JSON"));
    }
}
