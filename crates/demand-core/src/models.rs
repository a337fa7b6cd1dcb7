use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::allocation::{Allocation, ZeroReason};
use crate::calendar::days_between;

/// Column holding the opaque client identifier.
pub const CLIENT_COLUMN: &str = "CONTRACT_ACCOUNT";
/// Inclusive first day of a billing cycle.
pub const EFFECTIVE_DATE_COLUMN: &str = "EFFECTIVE_DATE";
/// Inclusive last day of a billing cycle.
pub const END_DATE_COLUMN: &str = "END_DATE";
/// Consumption total for the whole cycle.
pub const CONSUMPTION_COLUMN: &str = "CONSUMPTION";

/// Fill value for categorical columns absent from a source file.
pub const UNKNOWN_TOKEN: &str = "Unknown";
/// Fill value for categorical cells that are empty.
pub const MISSING_TOKEN: &str = "MISSING";

/// Number of trailing monthly consumption features per client.
pub const MONTHS_OF_HISTORY: usize = 12;

/// Name of the monthly feature `m` months before the evaluation date.
pub fn monthly_feature_name(months_ago: usize) -> String {
    format!("CONS_{}m_AGO", months_ago)
}

// ── FeatureConfig ─────────────────────────────────────────────────────────────

/// How a required column is typed and filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    ClientId,
    Date,
    Consumption,
    Numerical,
    Boolean,
    Categorical,
}

/// The configured auxiliary feature lists.
///
/// Immutable once built; every stage receives it explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureConfig {
    #[serde(rename = "CATEGORICAL_FEATS", default)]
    pub categorical: Vec<String>,
    #[serde(rename = "NUMERICAL_FEATS", default)]
    pub numerical: Vec<String>,
    #[serde(rename = "BOOLEAN_FEATS", default)]
    pub boolean: Vec<String>,
}

impl FeatureConfig {
    /// Build a config, dropping names that collide with the fixed columns.
    ///
    /// A name listed more than once keeps only its first appearance, looking
    /// at categorical, then numerical, then boolean.
    pub fn new(categorical: Vec<String>, numerical: Vec<String>, boolean: Vec<String>) -> Self {
        let mut seen: HashSet<String> = HashSet::new();
        let mut keep = |names: Vec<String>| -> Vec<String> {
            names
                .into_iter()
                .filter(|n| !is_fixed_column(n) && seen.insert(n.clone()))
                .collect()
        };
        let categorical = keep(categorical);
        let numerical = keep(numerical);
        let boolean = keep(boolean);
        Self {
            categorical,
            numerical,
            boolean,
        }
    }

    /// All columns a normalized record set carries, in declared order:
    /// the four fixed columns, then numerical, boolean and categorical features.
    pub fn required_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = [
            CLIENT_COLUMN,
            EFFECTIVE_DATE_COLUMN,
            END_DATE_COLUMN,
            CONSUMPTION_COLUMN,
        ]
        .iter()
        .map(|c| c.to_string())
        .collect();
        columns.extend(self.numerical.iter().cloned());
        columns.extend(self.boolean.iter().cloned());
        columns.extend(self.categorical.iter().cloned());
        columns
    }

    /// Classify `name`. Categorical membership wins over the other lists.
    pub fn column_kind(&self, name: &str) -> Option<ColumnKind> {
        match name {
            CLIENT_COLUMN => return Some(ColumnKind::ClientId),
            EFFECTIVE_DATE_COLUMN | END_DATE_COLUMN => return Some(ColumnKind::Date),
            CONSUMPTION_COLUMN => return Some(ColumnKind::Consumption),
            _ => {}
        }
        if self.categorical.iter().any(|c| c == name) {
            Some(ColumnKind::Categorical)
        } else if self.numerical.iter().any(|c| c == name) {
            Some(ColumnKind::Numerical)
        } else if self.boolean.iter().any(|c| c == name) {
            Some(ColumnKind::Boolean)
        } else {
            None
        }
    }
}

fn is_fixed_column(name: &str) -> bool {
    matches!(
        name,
        CLIENT_COLUMN | EFFECTIVE_DATE_COLUMN | END_DATE_COLUMN | CONSUMPTION_COLUMN
    )
}

// ── BillingRecord ─────────────────────────────────────────────────────────────

/// One client's consumption over one billing cycle, after normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingRecord {
    /// Opaque client identifier; one client has many records.
    pub client_id: String,
    /// Inclusive first day of the cycle, `None` when unparsable.
    pub effective_date: Option<NaiveDate>,
    /// Inclusive last day of the cycle, `None` when unparsable.
    pub end_date: Option<NaiveDate>,
    /// Total consumption for the cycle.
    pub consumption: f64,
    /// Values for [`FeatureConfig::numerical`], same order.
    #[serde(default)]
    pub numerical: Vec<f64>,
    /// 0/1 values for [`FeatureConfig::boolean`], same order.
    #[serde(default)]
    pub boolean: Vec<f64>,
    /// Values for [`FeatureConfig::categorical`], same order.
    #[serde(default)]
    pub categorical: Vec<String>,
}

impl BillingRecord {
    /// Both cycle bounds, when both parsed.
    pub fn period(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.effective_date?, self.end_date?))
    }

    /// Inclusive billing length in days (`end - effective + 1`).
    pub fn billing_days(&self) -> Option<i64> {
        self.period()
            .map(|(start, end)| days_between(start, end) + 1)
    }

    /// Whether `day` lies inside `[effective_date, end_date]`.
    pub fn covers(&self, day: NaiveDate) -> bool {
        match self.period() {
            Some((start, end)) => start <= day && day <= end,
            None => false,
        }
    }

    /// The record's uniform share of consumption for each covered day.
    pub fn daily_share(&self) -> Allocation {
        match self.billing_days() {
            Some(days) => Allocation::daily_share(self.consumption, days),
            None => Allocation::Zeroed(ZeroReason::MissingDate),
        }
    }
}

// ── ClientSnapshot ────────────────────────────────────────────────────────────

/// A client's attributes as of an evaluation date plus its trailing
/// monthly consumption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSnapshot {
    pub client_id: String,
    pub numerical: Vec<f64>,
    pub boolean: Vec<f64>,
    pub categorical: Vec<String>,
    /// `monthly_consumption[m]` is the `CONS_{m}m_AGO` feature.
    pub monthly_consumption: [f64; MONTHS_OF_HISTORY],
}

impl ClientSnapshot {
    /// Sum of the trailing monthly features.
    pub fn total_consumption(&self) -> f64 {
        self.monthly_consumption.iter().sum()
    }
}
