//! CSV output for the pipeline's three artifacts.

use std::path::Path;

use demand_core::calendar::format_date;
use demand_core::error::{DemandError, Result};
use demand_core::models::{monthly_feature_name, ClientSnapshot, FeatureConfig, CLIENT_COLUMN};
use demand_core::series::DailySeries;
use tracing::info;

use crate::reader::RawTable;

/// Header of the daily series file.
pub const DAILY_HEADERS: [&str; 2] = ["Date", "Consumption"];

/// Write the daily series as `Date,Consumption`.
pub fn write_daily_series(path: &Path, series: &DailySeries) -> Result<()> {
    let rows = series
        .points()
        .iter()
        .map(|p| vec![format_date(p.date), p.consumption.to_string()]);
    write_rows(path, &DAILY_HEADERS.map(String::from), rows)?;
    info!("Wrote {} daily points to {}", series.len(), path.display());
    Ok(())
}

/// Column order of the client snapshot file.
pub fn client_headers(config: &FeatureConfig) -> Vec<String> {
    let mut headers = vec![CLIENT_COLUMN.to_string()];
    headers.extend(config.numerical.iter().cloned());
    headers.extend(config.boolean.iter().cloned());
    headers.extend(config.categorical.iter().cloned());
    headers.extend((0..demand_core::models::MONTHS_OF_HISTORY).map(monthly_feature_name));
    headers
}

/// Write one row per client: id, features, then `CONS_0m_AGO..CONS_11m_AGO`.
pub fn write_client_snapshots(
    path: &Path,
    config: &FeatureConfig,
    snapshots: &[ClientSnapshot],
) -> Result<()> {
    let rows = snapshots.iter().map(|s| {
        let mut row = vec![s.client_id.clone()];
        row.extend(s.numerical.iter().map(f64::to_string));
        row.extend(s.boolean.iter().map(f64::to_string));
        row.extend(s.categorical.iter().cloned());
        row.extend(s.monthly_consumption.iter().map(f64::to_string));
        row
    });
    write_rows(path, &client_headers(config), rows)?;
    info!("Wrote {} client snapshots to {}", snapshots.len(), path.display());
    Ok(())
}

/// Write a raw table (the normalized intermediate data) as-is.
pub fn write_raw_table(path: &Path, table: &RawTable) -> Result<()> {
    write_rows(path, &table.headers, table.rows.iter().cloned())?;
    info!("Wrote {} rows to {}", table.len(), path.display());
    Ok(())
}

fn write_rows<I>(path: &Path, headers: &[String], rows: I) -> Result<()>
where
    I: IntoIterator<Item = Vec<String>>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let write_err = |source: csv::Error| DemandError::SourceWrite {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::Writer::from_path(path).map_err(write_err)?;
    writer.write_record(headers).map_err(write_err)?;
    for row in rows {
        writer.write_record(&row).map_err(write_err)?;
    }
    writer.flush()?;
    Ok(())
}
