//! Per-unit allocation results.
//!
//! Every share of consumption handed out by the engines is an [`Allocation`]:
//! either a real value or a zero that carries the reason it was zeroed, so
//! malformed rows can be counted instead of silently disappearing.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why an allocation unit was forced to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroReason {
    /// The record has no usable effective or end date.
    MissingDate,
    /// The billing (or cycle) length is zero or negative.
    NonPositivePeriod { days: i64 },
    /// The record's consumption is NaN or infinite.
    NonFiniteConsumption,
    /// A day's summed total overflowed to a non-finite value.
    NonFiniteTotal,
}

impl fmt::Display for ZeroReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZeroReason::MissingDate => write!(f, "missing effective or end date"),
            ZeroReason::NonPositivePeriod { days } => {
                write!(f, "non-positive billing period ({days} days)")
            }
            ZeroReason::NonFiniteConsumption => write!(f, "non-finite consumption"),
            ZeroReason::NonFiniteTotal => write!(f, "non-finite daily total"),
        }
    }
}

/// The outcome of allocating consumption to one unit (a day or a month).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Allocation {
    Value(f64),
    Zeroed(ZeroReason),
}

impl Allocation {
    /// Uniform per-day share of a billing total: `consumption / days`.
    ///
    /// `days` is the inclusive billing length; anything `<= 0` yields zero.
    pub fn daily_share(consumption: f64, days: i64) -> Self {
        if days <= 0 {
            return Allocation::Zeroed(ZeroReason::NonPositivePeriod { days });
        }
        if !consumption.is_finite() {
            return Allocation::Zeroed(ZeroReason::NonFiniteConsumption);
        }
        Allocation::Value(consumption / days as f64)
    }

    /// Share of `consumption` proportional to `overlap_days / cycle_days`.
    ///
    /// A non-positive cycle is zeroed with a reason. A non-positive overlap
    /// means the intervals merely touch and is a plain `0.0`.
    pub fn prorate(consumption: f64, overlap_days: i64, cycle_days: i64) -> Self {
        if cycle_days <= 0 {
            return Allocation::Zeroed(ZeroReason::NonPositivePeriod { days: cycle_days });
        }
        if !consumption.is_finite() {
            return Allocation::Zeroed(ZeroReason::NonFiniteConsumption);
        }
        if overlap_days <= 0 {
            return Allocation::Value(0.0);
        }
        Allocation::Value(consumption * (overlap_days as f64 / cycle_days as f64))
    }

    /// The allocated amount; zeroed units count as `0.0`.
    pub fn value(&self) -> f64 {
        match self {
            Allocation::Value(v) => *v,
            Allocation::Zeroed(_) => 0.0,
        }
    }

    pub fn reason(&self) -> Option<ZeroReason> {
        match self {
            Allocation::Value(_) => None,
            Allocation::Zeroed(reason) => Some(*reason),
        }
    }
}

/// Tally of zeroed units by reason, for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZeroCounts {
    pub missing_date: usize,
    pub non_positive_period: usize,
    pub non_finite_consumption: usize,
    pub non_finite_total: usize,
}

impl ZeroCounts {
    pub fn record(&mut self, reason: ZeroReason) {
        match reason {
            ZeroReason::MissingDate => self.missing_date += 1,
            ZeroReason::NonPositivePeriod { .. } => self.non_positive_period += 1,
            ZeroReason::NonFiniteConsumption => self.non_finite_consumption += 1,
            ZeroReason::NonFiniteTotal => self.non_finite_total += 1,
        }
    }

    /// Count `allocation` if it was zeroed.
    pub fn observe(&mut self, allocation: &Allocation) {
        if let Some(reason) = allocation.reason() {
            self.record(reason);
        }
    }

    pub fn merge(&mut self, other: &ZeroCounts) {
        self.missing_date += other.missing_date;
        self.non_positive_period += other.non_positive_period;
        self.non_finite_consumption += other.non_finite_consumption;
        self.non_finite_total += other.non_finite_total;
    }

    pub fn total(&self) -> usize {
        self.missing_date
            + self.non_positive_period
            + self.non_finite_consumption
            + self.non_finite_total
    }
}
