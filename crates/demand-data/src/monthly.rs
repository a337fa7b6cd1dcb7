//! Per-client snapshots with trailing monthly consumption.
//!
//! For an evaluation date, every client billed within the previous year gets
//! one row: its latest attributes plus twelve `CONS_{m}m_AGO` features, each
//! the consumption attributed to that month window in proportion to how many
//! days of each billing cycle fall inside it.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use demand_core::allocation::{Allocation, ZeroCounts, ZeroReason};
use demand_core::calendar::{days_between, months_before, years_before};
use demand_core::error::{DemandError, Result};
use demand_core::models::{BillingRecord, ClientSnapshot, MONTHS_OF_HISTORY};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

/// `[month_start, month_end]` for one trailing month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl MonthWindow {
    /// The window `months_ago` months before `eval_date`:
    /// `[eval - (m+1) months, eval - m months]`.
    pub fn before(eval_date: NaiveDate, months_ago: u32) -> Option<Self> {
        Some(Self {
            start: months_before(eval_date, months_ago + 1)?,
            end: months_before(eval_date, months_ago)?,
        })
    }

    /// Attribute part of `record`'s consumption to this window.
    ///
    /// `None` when the record's cycle does not intersect the window.
    pub fn attribute(&self, record: &BillingRecord) -> Option<Allocation> {
        let end = record.end_date?;
        let Some(start) = record.effective_date else {
            // Without a start date the cycle length is unknown.
            let touches = self.start <= end && end <= self.end;
            return touches.then_some(Allocation::Zeroed(ZeroReason::MissingDate));
        };
        if start > self.end || end < self.start {
            return None;
        }

        let overlap = days_between(start.max(self.start), end.min(self.end));
        let cycle = days_between(start, end);
        Some(Allocation::prorate(record.consumption, overlap, cycle))
    }
}

// ── MonthlyReport ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyReport {
    pub eval_date: NaiveDate,
    /// One per qualifying client, ordered by client id.
    pub snapshots: Vec<ClientSnapshot>,
    /// Records whose end date falls inside the one-year lookback.
    pub records_in_window: usize,
    /// Record/month attributions that were zeroed, by reason.
    pub attribution_faults: ZeroCounts,
}

// ── ClientAttributor ──────────────────────────────────────────────────────────

/// Builds [`ClientSnapshot`]s as of an evaluation date.
pub struct ClientAttributor {
    eval_date: NaiveDate,
    lookback_start: NaiveDate,
    windows: [MonthWindow; MONTHS_OF_HISTORY],
}

impl ClientAttributor {
    pub fn new(eval_date: NaiveDate) -> Result<Self> {
        let out_of_range = || DemandError::InvalidDate(format!("{} is out of range", eval_date));

        let lookback_start = years_before(eval_date, 1).ok_or_else(out_of_range)?;
        let mut windows = [MonthWindow {
            start: eval_date,
            end: eval_date,
        }; MONTHS_OF_HISTORY];
        for (m, window) in windows.iter_mut().enumerate() {
            *window = MonthWindow::before(eval_date, m as u32).ok_or_else(out_of_range)?;
        }

        Ok(Self {
            eval_date,
            lookback_start,
            windows,
        })
    }

    pub fn windows(&self) -> &[MonthWindow; MONTHS_OF_HISTORY] {
        &self.windows
    }

    /// Snapshot every client with a record ending on or after
    /// `eval_date - 1 year`.
    ///
    /// Clients are processed in parallel; output is ordered by client id.
    pub fn snapshot(&self, records: &[BillingRecord]) -> MonthlyReport {
        let mut by_client: BTreeMap<&str, Vec<&BillingRecord>> = BTreeMap::new();
        let mut records_in_window = 0usize;
        for record in records {
            if record.end_date.is_some_and(|end| end >= self.lookback_start) {
                records_in_window += 1;
                by_client
                    .entry(record.client_id.as_str())
                    .or_default()
                    .push(record);
            }
        }
        debug!(
            "{} records from {} clients end after {}",
            records_in_window,
            by_client.len(),
            self.lookback_start
        );

        let results: Vec<(ClientSnapshot, ZeroCounts)> = by_client
            .into_iter()
            .collect::<Vec<_>>()
            .into_par_iter()
            .filter_map(|(client_id, history)| self.snapshot_client(client_id, &history))
            .collect();

        let mut attribution_faults = ZeroCounts::default();
        let snapshots = results
            .into_iter()
            .map(|(snapshot, faults)| {
                attribution_faults.merge(&faults);
                snapshot
            })
            .collect::<Vec<_>>();

        info!(
            "Built {} client snapshots as of {}",
            snapshots.len(),
            self.eval_date
        );

        MonthlyReport {
            eval_date: self.eval_date,
            snapshots,
            records_in_window,
            attribution_faults,
        }
    }

    /// One client's snapshot from its in-window records (record order).
    fn snapshot_client(
        &self,
        client_id: &str,
        history: &[&BillingRecord],
    ) -> Option<(ClientSnapshot, ZeroCounts)> {
        // Latest end date wins; the first record wins a tie.
        let latest = history.iter().copied().reduce(|best, r| {
            if r.end_date > best.end_date {
                r
            } else {
                best
            }
        })?;

        let mut faults = ZeroCounts::default();
        let mut monthly_consumption = [0.0; MONTHS_OF_HISTORY];
        for (slot, window) in monthly_consumption.iter_mut().zip(&self.windows) {
            *slot = history
                .iter()
                .filter_map(|r| window.attribute(r))
                .inspect(|a| faults.observe(a))
                .fold(0.0, |acc, a| acc + a.value());
        }

        let snapshot = ClientSnapshot {
            client_id: client_id.to_string(),
            numerical: latest.numerical.clone(),
            boolean: latest.boolean.clone(),
            categorical: latest.categorical.clone(),
            monthly_consumption,
        };
        Some((snapshot, faults))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn record(client: &str, start: &str, end: &str, consumption: f64) -> BillingRecord {
        BillingRecord {
            client_id: client.to_string(),
            effective_date: Some(date(start)),
            end_date: Some(date(end)),
            consumption,
            numerical: vec![1.0],
            boolean: vec![0.0],
            categorical: vec![format!("{}-{}", client, end)],
        }
    }

    // ── MonthWindow ───────────────────────────────────────────────────────────

    #[test]
    fn test_windows_chain_backwards() {
        let attributor = ClientAttributor::new(date("2023-06-30")).unwrap();
        let windows = attributor.windows();
        assert_eq!(windows[0].end, date("2023-06-30"));
        assert_eq!(windows[0].start, date("2023-05-30"));
        assert_eq!(windows[3].start, date("2023-02-28"));
        assert_eq!(windows[11].start, date("2022-06-30"));
        for pair in windows.windows(2) {
            assert_eq!(pair[0].start, pair[1].end);
        }
    }

    #[test]
    fn test_attribute_partial_overlap() {
        let window = MonthWindow {
            start: date("2023-01-01"),
            end: date("2023-01-31"),
        };
        // 30-day cycle, 15 days inside the window.
        let r = record("A", "2022-12-17", "2023-01-16", 60.0);
        let a = window.attribute(&r).unwrap();
        assert!((a.value() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_attribute_cycle_containing_window() {
        let window = MonthWindow {
            start: date("2023-02-01"),
            end: date("2023-03-01"),
        };
        // 28 of the cycle's 59 days.
        let r = record("A", "2023-01-01", "2023-03-01", 59.0);
        let a = window.attribute(&r).unwrap();
        assert!((a.value() - 28.0).abs() < 1e-9);
    }

    #[test]
    fn test_attribute_disjoint_is_none() {
        let window = MonthWindow {
            start: date("2023-02-01"),
            end: date("2023-03-01"),
        };
        let r = record("A", "2023-03-02", "2023-03-20", 10.0);
        assert_eq!(window.attribute(&r), None);
    }

    #[test]
    fn test_attribute_zero_length_cycle() {
        let window = MonthWindow {
            start: date("2023-02-01"),
            end: date("2023-03-01"),
        };
        let r = record("A", "2023-02-10", "2023-02-10", 10.0);
        let a = window.attribute(&r).unwrap();
        assert_eq!(a.value(), 0.0);
        assert_eq!(a.reason(), Some(ZeroReason::NonPositivePeriod { days: 0 }));
    }

    #[test]
    fn test_attribute_missing_effective_date() {
        let window = MonthWindow {
            start: date("2023-02-01"),
            end: date("2023-03-01"),
        };
        let mut r = record("A", "2023-01-10", "2023-02-10", 10.0);
        r.effective_date = None;
        assert_eq!(
            window.attribute(&r),
            Some(Allocation::Zeroed(ZeroReason::MissingDate))
        );
    }

    // ── snapshot ──────────────────────────────────────────────────────────────

    #[test]
    fn test_snapshot_excludes_stale_clients() {
        let records = vec![
            record("A", "2023-05-01", "2023-05-31", 31.0),
            record("B", "2021-01-01", "2021-01-31", 31.0),
        ];
        let report = ClientAttributor::new(date("2023-06-30"))
            .unwrap()
            .snapshot(&records);

        assert_eq!(report.snapshots.len(), 1);
        assert_eq!(report.snapshots[0].client_id, "A");
        assert_eq!(report.records_in_window, 1);
    }

    #[test]
    fn test_snapshot_uses_latest_record_attributes() {
        let records = vec![
            record("A", "2023-05-01", "2023-05-31", 30.0),
            record("A", "2023-06-01", "2023-06-20", 19.0),
            record("A", "2023-04-01", "2023-04-30", 29.0),
        ];
        let report = ClientAttributor::new(date("2023-06-30"))
            .unwrap()
            .snapshot(&records);

        assert_eq!(report.snapshots[0].categorical, vec!["A-2023-06-20"]);
    }

    #[test]
    fn test_snapshot_monthly_features() {
        let records = vec![
            // Entirely inside window 0 ([2023-05-30, 2023-06-30]).
            record("A", "2023-06-01", "2023-06-21", 20.0),
            // Split across windows 1 and 0 at 2023-05-30.
            record("A", "2023-05-20", "2023-06-09", 40.0),
        ];
        let report = ClientAttributor::new(date("2023-06-30"))
            .unwrap()
            .snapshot(&records);
        let months = report.snapshots[0].monthly_consumption;

        // 20 + 40 * 10/20
        assert!((months[0] - 40.0).abs() < 1e-9);
        // 40 * 10/20
        assert!((months[1] - 20.0).abs() < 1e-9);
        assert!(months[2..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_snapshot_total_never_exceeds_consumption() {
        let records = vec![
            record("A", "2022-05-15", "2022-08-14", 91.0),
            record("A", "2022-08-15", "2022-11-14", 92.0),
            record("A", "2022-11-15", "2023-02-14", 92.0),
            record("A", "2023-02-15", "2023-05-14", 89.0),
            record("A", "2023-05-15", "2023-08-14", 92.0),
        ];
        let report = ClientAttributor::new(date("2023-06-30"))
            .unwrap()
            .snapshot(&records);
        let total_in: f64 = records.iter().map(|r| r.consumption).sum();

        assert!(report.snapshots[0].total_consumption() <= total_in + 1e-9);
    }

    #[test]
    fn test_snapshot_orders_clients() {
        let records = vec![
            record("C", "2023-06-01", "2023-06-10", 1.0),
            record("A", "2023-06-01", "2023-06-10", 1.0),
            record("B", "2023-06-01", "2023-06-10", 1.0),
        ];
        let report = ClientAttributor::new(date("2023-06-30"))
            .unwrap()
            .snapshot(&records);
        let ids: Vec<&str> = report
            .snapshots
            .iter()
            .map(|s| s.client_id.as_str())
            .collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_snapshot_counts_faults() {
        let records = vec![record("A", "2023-06-10", "2023-06-10", 5.0)];
        let report = ClientAttributor::new(date("2023-06-30"))
            .unwrap()
            .snapshot(&records);

        assert_eq!(report.snapshots[0].total_consumption(), 0.0);
        assert_eq!(report.attribution_faults.non_positive_period, 1);
    }
}
