use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::calendar::days_between;

/// Estimated consumption for one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailySeriesPoint {
    pub date: NaiveDate,
    pub consumption: f64,
}

/// A gap-free, ascending run of daily points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailySeries {
    points: Vec<DailySeriesPoint>,
}

impl DailySeries {
    /// Wrap points the caller has produced day by day without gaps.
    pub fn from_points_unchecked(points: Vec<DailySeriesPoint>) -> Self {
        debug_assert!(points
            .windows(2)
            .all(|pair| days_between(pair[0].date, pair[1].date) == 1));
        Self { points }
    }

    /// Build a series of consecutive days starting at `start`.
    pub fn from_values(start: NaiveDate, values: &[f64]) -> Self {
        let points = start
            .iter_days()
            .zip(values.iter())
            .map(|(date, &consumption)| DailySeriesPoint { date, consumption })
            .collect();
        Self { points }
    }

    pub fn points(&self) -> &[DailySeriesPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.consumption).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// The day after the last point, where a forecast would begin.
    pub fn next_date(&self) -> Option<NaiveDate> {
        self.last_date()
            .and_then(|d| d.checked_add_days(Days::new(1)))
    }

    /// Sum of every day's consumption.
    pub fn total(&self) -> f64 {
        self.points.iter().map(|p| p.consumption).sum()
    }

    /// Consumption recorded for `date`, if it is inside the series.
    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        let first = self.first_date()?;
        let offset = days_between(first, date);
        if offset < 0 {
            return None;
        }
        self.points.get(offset as usize).map(|p| p.consumption)
    }

    /// Split off the final `test_days` points as a test set.
    ///
    /// `test_days` larger than the series leaves the training part empty.
    pub fn split_at(&self, test_days: usize) -> (DailySeries, DailySeries) {
        let cut = self.points.len().saturating_sub(test_days);
        let (train, test) = self.points.split_at(cut);
        (
            DailySeries {
                points: train.to_vec(),
            },
            DailySeries {
                points: test.to_vec(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_from_values_consecutive_days() {
        let series = DailySeries::from_values(date(2023, 1, 30), &[1.0, 2.0, 3.0]);
        assert_eq!(series.len(), 3);
        assert_eq!(series.first_date(), Some(date(2023, 1, 30)));
        assert_eq!(series.last_date(), Some(date(2023, 2, 1)));
        assert_eq!(series.next_date(), Some(date(2023, 2, 2)));
        assert_eq!(series.total(), 6.0);
    }

    #[test]
    fn test_from_points_unchecked_keeps_points() {
        let points = vec![
            DailySeriesPoint {
                date: date(2023, 1, 1),
                consumption: 1.0,
            },
            DailySeriesPoint {
                date: date(2023, 1, 2),
                consumption: 2.5,
            },
        ];
        let series = DailySeries::from_points_unchecked(points.clone());
        assert_eq!(series.points(), points.as_slice());
        assert_eq!(series.total(), 3.5);
    }

    #[test]
    fn test_get_by_date() {
        let series = DailySeries::from_values(date(2023, 1, 1), &[5.0, 6.0]);
        assert_eq!(series.get(date(2023, 1, 2)), Some(6.0));
        assert_eq!(series.get(date(2022, 12, 31)), None);
        assert_eq!(series.get(date(2023, 1, 3)), None);
    }

    #[test]
    fn test_split_at() {
        let series = DailySeries::from_values(date(2023, 1, 1), &[1.0, 2.0, 3.0, 4.0]);
        let (train, test) = series.split_at(1);
        assert_eq!(train.values(), vec![1.0, 2.0, 3.0]);
        assert_eq!(test.values(), vec![4.0]);
        assert_eq!(test.first_date(), Some(date(2023, 1, 4)));
    }

    #[test]
    fn test_split_at_larger_than_series() {
        let series = DailySeries::from_values(date(2023, 1, 1), &[1.0, 2.0]);
        let (train, test) = series.split_at(10);
        assert!(train.is_empty());
        assert_eq!(test.len(), 2);
    }

    #[test]
    fn test_empty_series() {
        let series = DailySeries::default();
        assert!(series.is_empty());
        assert_eq!(series.next_date(), None);
        assert_eq!(series.total(), 0.0);
    }
}
