//! Daily consumption estimates from billing intervals.
//!
//! Each record's consumption is spread uniformly over the days of its billing
//! cycle; a day's estimate is the sum of the shares of every cycle covering
//! it, across all clients.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use chrono::{Days, NaiveDate};
use demand_core::allocation::{Allocation, ZeroCounts, ZeroReason};
use demand_core::calendar::date_range;
use demand_core::models::BillingRecord;
use demand_core::series::{DailySeries, DailySeriesPoint};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Days between progress log lines.
const PROGRESS_INTERVAL_DAYS: usize = 365;

// ── DailyReport ───────────────────────────────────────────────────────────────

/// The daily series plus everything that was zeroed on the way.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DailyReport {
    pub series: DailySeries,
    /// Days whose total could not be computed and were set to 0.
    pub degraded_days: Vec<(NaiveDate, ZeroReason)>,
    /// Records that never contribute, by reason.
    pub record_faults: ZeroCounts,
}

// ── DailyAllocator ────────────────────────────────────────────────────────────

/// Stateless helper that turns billing records into a daily series.
pub struct DailyAllocator;

impl DailyAllocator {
    /// The covered range: earliest effective date to the day before the
    /// latest end date. `None` when no record has either date, or the range
    /// is empty.
    pub fn date_range(records: &[BillingRecord]) -> Option<(NaiveDate, NaiveDate)> {
        let start = records.iter().filter_map(|r| r.effective_date).min()?;
        let last_end = records.iter().filter_map(|r| r.end_date).max()?;
        let end = last_end.checked_sub_days(Days::new(1))?;
        (start <= end).then_some((start, end))
    }

    /// Build the daily series over [`Self::date_range`].
    ///
    /// Records are swept in start-date order with an active set keyed by
    /// their position in `records`, so each day only visits the cycles
    /// covering it while summing in the same order as a full scan.
    pub fn allocate(records: &[BillingRecord]) -> DailyReport {
        let mut report = DailyReport::default();

        // (start, position, end, share) for every record that can contribute.
        let mut intervals: Vec<(NaiveDate, usize, NaiveDate, f64)> = Vec::new();
        for (idx, record) in records.iter().enumerate() {
            let share = record.daily_share();
            match (share, record.period()) {
                (Allocation::Value(value), Some((start, end))) => {
                    intervals.push((start, idx, end, value))
                }
                _ => report.record_faults.observe(&share),
            }
        }
        if report.record_faults.total() > 0 {
            debug!(
                "{} records contribute nothing ({} undated, {} non-positive periods)",
                report.record_faults.total(),
                report.record_faults.missing_date,
                report.record_faults.non_positive_period
            );
        }

        let Some((first_day, last_day)) = Self::date_range(records) else {
            info!("No dated records; daily series is empty");
            return report;
        };

        intervals.sort_by_key(|&(start, idx, _, _)| (start, idx));

        let mut pending = intervals.into_iter().peekable();
        let mut active: BTreeMap<usize, f64> = BTreeMap::new();
        let mut expiry: BinaryHeap<Reverse<(NaiveDate, usize)>> = BinaryHeap::new();
        let mut points = Vec::new();

        for (n, day) in date_range(first_day, last_day).enumerate() {
            while let Some(&(start, idx, end, share)) = pending.peek() {
                if start > day {
                    break;
                }
                active.insert(idx, share);
                expiry.push(Reverse((end, idx)));
                pending.next();
            }
            while let Some(&Reverse((end, idx))) = expiry.peek() {
                if end >= day {
                    break;
                }
                active.remove(&idx);
                expiry.pop();
            }

            let consumption = match day_total(active.values().copied()) {
                Allocation::Value(total) => total,
                Allocation::Zeroed(reason) => {
                    warn!("Daily total for {} set to 0: {}", day, reason);
                    report.degraded_days.push((day, reason));
                    0.0
                }
            };
            points.push(DailySeriesPoint {
                date: day,
                consumption,
            });

            if (n + 1) % PROGRESS_INTERVAL_DAYS == 0 {
                debug!("Estimated daily consumption up to {}", day);
            }
        }

        info!(
            "Calculated daily consumption for {} days ({} to {})",
            points.len(),
            first_day,
            last_day
        );
        report.series = DailySeries::from_points_unchecked(points);
        report
    }

    /// Reference implementation: rescans every record for every day.
    ///
    /// Quadratic; kept to check [`Self::allocate`] against.
    pub fn allocate_naive(records: &[BillingRecord]) -> DailySeries {
        let Some((first_day, last_day)) = Self::date_range(records) else {
            return DailySeries::default();
        };

        let points = date_range(first_day, last_day)
            .map(|day| {
                let shares = records
                    .iter()
                    .filter(|r| r.covers(day))
                    .map(|r| r.daily_share().value());
                DailySeriesPoint {
                    date: day,
                    consumption: day_total(shares).value(),
                }
            })
            .collect();
        DailySeries::from_points_unchecked(points)
    }
}

/// Sum shares left to right; a non-finite sum degrades the day.
fn day_total(shares: impl Iterator<Item = f64>) -> Allocation {
    let total = shares.fold(0.0, |acc, share| acc + share);
    if total.is_finite() {
        Allocation::Value(total)
    } else {
        Allocation::Zeroed(ZeroReason::NonFiniteTotal)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
