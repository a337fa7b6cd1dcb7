//! Top-level preprocessing pipeline.
//!
//! Loads every raw source, normalizes it into billing records, builds the
//! daily series and, when an evaluation date is set, the client snapshot
//! table. Each artifact is written when its output path is configured.

use std::path::PathBuf;
use std::time::Instant;

use chrono::{NaiveDate, Utc};
use demand_core::config::PipelineConfig;
use demand_core::error::Result;
use demand_core::models::{BillingRecord, FeatureConfig};
use tracing::{info, warn};

use crate::daily::{DailyAllocator, DailyReport};
use crate::monthly::{ClientAttributor, MonthlyReport};
use crate::normalizer::{NormalizeReport, SchemaNormalizer};
use crate::reader::load_sources;
use crate::writer::{write_client_snapshots, write_daily_series, write_raw_table};

// ── Public types ──────────────────────────────────────────────────────────────

/// Where to read from, what to write, and as of when.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub raw_data_dir: PathBuf,
    /// Normalized records, written only when set.
    pub intermediate_data: Option<PathBuf>,
    /// The `Date,Consumption` series, written only when set.
    pub preprocessed_data: Option<PathBuf>,
    /// The client snapshot table, written only when set.
    pub client_data: Option<PathBuf>,
    /// Client snapshots are skipped without one.
    pub eval_date: Option<NaiveDate>,
}

impl PipelineOptions {
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Ok(Self {
            raw_data_dir: config.paths.raw_data_dir.clone(),
            intermediate_data: config.paths.intermediate_data.clone(),
            preprocessed_data: config.paths.preprocessed_data.clone(),
            client_data: config.paths.client_data.clone(),
            eval_date: config.eval_date()?,
        })
    }
}

/// Counts and timings for one run.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PipelineMetadata {
    /// RFC 3339 timestamp of when the run finished.
    pub generated_at: String,
    pub sources_read: usize,
    pub records: usize,
    pub days: usize,
    pub clients: Option<usize>,
    pub load_time_seconds: f64,
    pub normalize_time_seconds: f64,
    pub daily_time_seconds: f64,
    pub monthly_time_seconds: Option<f64>,
}

/// Everything [`preprocess`] produced.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub records: Vec<BillingRecord>,
    pub normalize: NormalizeReport,
    pub daily: DailyReport,
    /// `None` when no evaluation date was given.
    pub monthly: Option<MonthlyReport>,
    pub metadata: PipelineMetadata,
}

// ── Public function ───────────────────────────────────────────────────────────

/// Run the pipeline.
///
/// 1. Load every CSV under `raw_data_dir`.
/// 2. Normalize and deduplicate into billing records.
/// 3. Build the daily series.
/// 4. Build client snapshots as of `eval_date`, if set.
///
/// A source that cannot be read or an output that cannot be written fails the
/// run; malformed rows and days are zeroed and reported instead.
pub fn preprocess(features: &FeatureConfig, options: &PipelineOptions) -> Result<PipelineResult> {
    // ── Step 1: Load ──────────────────────────────────────────────────────────
    let load_start = Instant::now();
    let tables = load_sources(&options.raw_data_dir)?;
    let load_time = load_start.elapsed().as_secs_f64();

    // ── Step 2: Normalize ─────────────────────────────────────────────────────
    let normalize_start = Instant::now();
    let normalizer = SchemaNormalizer::new(features);
    let (records, normalize) = normalizer.normalize(&tables);
    let normalize_time = normalize_start.elapsed().as_secs_f64();
    drop(tables);

    if let Some(path) = &options.intermediate_data {
        write_raw_table(path, &normalizer.to_raw_table(&records))?;
    }

    // ── Step 3: Daily series ──────────────────────────────────────────────────
    let daily_start = Instant::now();
    let daily = DailyAllocator::allocate(&records);
    let daily_time = daily_start.elapsed().as_secs_f64();
    if !daily.degraded_days.is_empty() {
        warn!("{} days were set to 0", daily.degraded_days.len());
    }

    if let Some(path) = &options.preprocessed_data {
        write_daily_series(path, &daily.series)?;
    }

    // ── Step 4: Client snapshots ──────────────────────────────────────────────
    let (monthly, monthly_time) = match options.eval_date {
        Some(eval_date) => {
            let monthly_start = Instant::now();
            let report = ClientAttributor::new(eval_date)?.snapshot(&records);
            let elapsed = monthly_start.elapsed().as_secs_f64();
            if let Some(path) = &options.client_data {
                write_client_snapshots(path, features, &report.snapshots)?;
            }
            (Some(report), Some(elapsed))
        }
        None => {
            info!("No evaluation date set; skipping client snapshots");
            (None, None)
        }
    };

    // ── Step 5: Build result ──────────────────────────────────────────────────
    let metadata = PipelineMetadata {
        generated_at: Utc::now().to_rfc3339(),
        sources_read: normalize.sources,
        records: records.len(),
        days: daily.series.len(),
        clients: monthly.as_ref().map(|m| m.snapshots.len()),
        load_time_seconds: load_time,
        normalize_time_seconds: normalize_time,
        daily_time_seconds: daily_time,
        monthly_time_seconds: monthly_time,
    };

    Ok(PipelineResult {
        records,
        normalize,
        daily,
        monthly,
        metadata,
    })
}
