//! Schema normalization of raw billing tables.
//!
//! Aligns every source to the configured column set, types the cells and
//! fills gaps, producing the immutable [`BillingRecord`] set both engines
//! consume.

use std::collections::HashSet;

use demand_core::calendar::format_date;
use demand_core::models::{BillingRecord, ColumnKind, FeatureConfig, MISSING_TOKEN, UNKNOWN_TOKEN};
use demand_core::parsers::{BooleanParser, Cell, DateParser, NumberParser};
use serde::Serialize;
use tracing::{debug, info};

use crate::reader::RawTable;

/// What normalization had to repair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeReport {
    pub sources: usize,
    pub rows_read: usize,
    pub duplicates_dropped: usize,
    /// Required columns synthesized, summed over sources.
    pub synthesized_columns: usize,
    /// Date cells that were blank or unparsable.
    pub invalid_dates: usize,
    pub unparsable_numbers: usize,
    pub unrecognized_booleans: usize,
}

/// Turns raw tables into normalized billing records for one feature config.
pub struct SchemaNormalizer<'a> {
    config: &'a FeatureConfig,
    columns: Vec<String>,
}

impl<'a> SchemaNormalizer<'a> {
    pub fn new(config: &'a FeatureConfig) -> Self {
        Self {
            config,
            columns: config.required_columns(),
        }
    }

    /// Normalize all `sources` into one deduplicated record set.
    ///
    /// Rows keep their source order; of two rows that normalize to the same
    /// values only the first is kept. Rows are compared after typing, not as
    /// raw text, so `01/05/2023` and `2023-01-05`, or flags `X` and `On`,
    /// count as the same value.
    pub fn normalize<'t, I>(&self, sources: I) -> (Vec<BillingRecord>, NormalizeReport)
    where
        I: IntoIterator<Item = &'t RawTable>,
    {
        let mut report = NormalizeReport::default();
        let mut seen: HashSet<Vec<String>> = HashSet::new();
        let mut records = Vec::new();

        for table in sources {
            report.sources += 1;
            let (aligned, synthesized) = self.align(table);
            report.synthesized_columns += synthesized;
            if synthesized > 0 {
                debug!(
                    "Synthesized {} missing columns for {}",
                    synthesized,
                    table.source.display()
                );
            }

            for row in aligned {
                report.rows_read += 1;
                let record = self.type_row(&row, &mut report);
                if seen.insert(self.render(&record)) {
                    records.push(record);
                } else {
                    report.duplicates_dropped += 1;
                }
            }
        }

        let total: f64 = records.iter().map(|r| r.consumption).sum();
        info!(
            "Normalized {} records from {} sources ({} duplicates dropped)",
            records.len(),
            report.sources,
            report.duplicates_dropped
        );
        info!("Consumption total: {}", total);
        if report.invalid_dates + report.unparsable_numbers + report.unrecognized_booleans > 0 {
            info!(
                "Cleaned {} invalid dates, {} unparsable numbers, {} unrecognized booleans",
                report.invalid_dates, report.unparsable_numbers, report.unrecognized_booleans
            );
        }

        (records, report)
    }

    /// Render `records` back into a raw table with the required columns.
    ///
    /// Normalizing the result again yields the same records.
    pub fn to_raw_table(&self, records: &[BillingRecord]) -> RawTable {
        let rows = records.iter().map(|r| self.render(r)).collect();
        RawTable::new(self.columns.clone(), rows)
    }

    // ── Private ───────────────────────────────────────────────────────────────

    /// Select the required columns from `table`, synthesizing absent ones.
    /// Returns the aligned rows and how many columns were synthesized.
    fn align(&self, table: &RawTable) -> (Vec<Vec<String>>, usize) {
        let cleaned: Vec<String> = table.headers.iter().map(|h| clean_column_name(h)).collect();

        enum Source {
            Column(usize),
            Fill(&'static str),
        }

        let plan: Vec<Source> = self
            .columns
            .iter()
            .map(|name| match cleaned.iter().position(|h| h == name) {
                Some(idx) => Source::Column(idx),
                None if self.config.column_kind(name) == Some(ColumnKind::Categorical) => {
                    Source::Fill(UNKNOWN_TOKEN)
                }
                None => Source::Fill("0"),
            })
            .collect();
        let synthesized = plan.iter().filter(|s| matches!(s, Source::Fill(_))).count();

        let rows = table
            .rows
            .iter()
            .map(|row| {
                plan.iter()
                    .map(|source| match source {
                        Source::Column(idx) => row
                            .get(*idx)
                            .map(|cell| cell.trim().to_string())
                            .unwrap_or_default(),
                        Source::Fill(value) => value.to_string(),
                    })
                    .collect()
            })
            .collect();

        (rows, synthesized)
    }

    /// Type one aligned row, counting every cell that had to be repaired.
    fn type_row(&self, row: &[String], report: &mut NormalizeReport) -> BillingRecord {
        let n_num = self.config.numerical.len();
        let n_bool = self.config.boolean.len();
        let (fixed, features) = row.split_at(4);
        let (numerical, rest) = features.split_at(n_num);
        let (boolean, categorical) = rest.split_at(n_bool);

        BillingRecord {
            client_id: fixed[0].clone(),
            effective_date: parse_date(&fixed[1], report),
            end_date: parse_date(&fixed[2], report),
            consumption: parse_number(&fixed[3], report),
            numerical: numerical
                .iter()
                .map(|cell| parse_number(cell, report))
                .collect(),
            boolean: boolean
                .iter()
                .map(|cell| {
                    let parsed = BooleanParser::parse(cell);
                    if parsed == Cell::Invalid {
                        report.unrecognized_booleans += 1;
                    }
                    parsed.or_zero()
                })
                .collect(),
            categorical: categorical
                .iter()
                .map(|cell| {
                    if cell.is_empty() {
                        MISSING_TOKEN.to_string()
                    } else {
                        cell.clone()
                    }
                })
                .collect(),
        }
    }

    /// Canonical text form of a record, in required column order.
    fn render(&self, record: &BillingRecord) -> Vec<String> {
        let mut row = Vec::with_capacity(self.columns.len());
        row.push(record.client_id.clone());
        row.push(record.effective_date.map(format_date).unwrap_or_default());
        row.push(record.end_date.map(format_date).unwrap_or_default());
        row.push(record.consumption.to_string());
        row.extend(record.numerical.iter().map(|v| v.to_string()));
        row.extend(record.boolean.iter().map(|v| v.to_string()));
        row.extend(record.categorical.iter().cloned());
        row
    }
}

/// Strip whitespace and quote characters from a column header.
pub fn clean_column_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '"' && *c != '\u{feff}')
        .collect()
}

fn parse_date(cell: &str, report: &mut NormalizeReport) -> Option<chrono::NaiveDate> {
    let date = DateParser::parse(cell);
    if date.is_none() {
        report.invalid_dates += 1;
    }
    date
}

fn parse_number(cell: &str, report: &mut NormalizeReport) -> f64 {
    let parsed = NumberParser::parse(cell);
    if parsed == Cell::Invalid {
        report.unparsable_numbers += 1;
    }
    parsed.or_zero()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
