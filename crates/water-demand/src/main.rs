mod bootstrap;
mod settings;

use anyhow::{Context, Result};
use clap::Parser;
use demand_core::config::PipelineConfig;
use demand_data::pipeline::{preprocess, PipelineOptions};
use settings::Settings;

fn main() -> Result<()> {
    let settings = Settings::parse();

    bootstrap::setup_logging(settings.effective_log_level(), settings.log_file.as_deref())?;

    tracing::info!("Water demand preprocessing v{} starting", env!("CARGO_PKG_VERSION"));

    let mut config = PipelineConfig::load_from(&settings.config)
        .with_context(|| format!("loading {}", settings.config.display()))?;
    settings.apply_overrides(&mut config)?;

    if let Some(path) = &settings.save_config {
        config.save_to(path)?;
        tracing::info!("Saved merged configuration to {}", path.display());
    }

    let mut options = PipelineOptions::from_config(&config)?;
    if settings.skip_clients {
        options.eval_date = None;
    }
    tracing::info!(
        "Raw data: {}, features: {} categorical, {} numerical, {} boolean",
        options.raw_data_dir.display(),
        config.data.categorical.len(),
        config.data.numerical.len(),
        config.data.boolean.len()
    );

    let result = preprocess(&config.data, &options)?;

    let meta = &result.metadata;
    tracing::info!(
        "Processed {} records from {} sources into {} days in {:.2}s",
        meta.records,
        meta.sources_read,
        meta.days,
        meta.load_time_seconds + meta.normalize_time_seconds + meta.daily_time_seconds
    );
    if let Some(monthly) = &result.monthly {
        tracing::info!(
            "{} client snapshots as of {} ({} zeroed attributions)",
            monthly.snapshots.len(),
            monthly.eval_date,
            monthly.attribution_faults.total()
        );
    }

    let skipped = result.daily.record_faults.total();
    if skipped > 0 || !result.daily.degraded_days.is_empty() {
        tracing::warn!(
            "{} records contributed nothing; {} days were zeroed",
            skipped,
            result.daily.degraded_days.len()
        );
    }

    Ok(())
}
