//! Calendar-day primitives shared by the policy, calculators, and queries
//!
//! Completions are keyed on calendar days (time-of-day is discarded at the
//! engine boundary), so everything here works in [`NaiveDate`].

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Inclusive range of calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    /// First day of the range
    pub start: NaiveDate,
    /// Last day of the range
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a range; swaps the endpoints if given in reverse
    #[inline]
    #[must_use]
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self { start: end, end: start }
        }
    }

    /// Single-day range
    #[inline]
    #[must_use]
    pub fn single(day: NaiveDate) -> Self {
        Self { start: day, end: day }
    }

    /// The calendar month containing `day`
    #[must_use]
    pub fn month_of(day: NaiveDate) -> Self {
        let start = day.with_day(1).unwrap_or(day);
        Self { start, end: last_day_of_month(day.year(), day.month()) }
    }

    /// Whether `day` falls inside the range
    #[inline]
    #[must_use]
    pub fn contains(&self, day: NaiveDate) -> bool {
        day >= self.start && day <= self.end
    }

    /// Iterate every day in the range, ascending
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        let mut next = Some(self.start);
        std::iter::from_fn(move || {
            let day = next?;
            if day > end {
                return None;
            }
            next = day.succ_opt();
            Some(day)
        })
    }
}

/// Last day of a calendar month (month is 1-based)
#[must_use]
pub fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(year, month, 28).unwrap_or_default())
}

/// Weekday index in the remote documents' convention (Sunday = 0)
#[inline]
#[must_use]
pub fn weekday_index(day: NaiveDate) -> u8 {
    day.weekday().num_days_from_sunday() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn range_days_iterates_inclusive() {
        let range = DateRange::new(d(2024, 3, 1), d(2024, 3, 3));
        let days: Vec<_> = range.days().collect();
        assert_eq!(days, vec![d(2024, 3, 1), d(2024, 3, 2), d(2024, 3, 3)]);
    }

    #[test]
    fn range_swaps_reversed_endpoints() {
        let range = DateRange::new(d(2024, 3, 3), d(2024, 3, 1));
        assert_eq!(range.start, d(2024, 3, 1));
        assert_eq!(range.end, d(2024, 3, 3));
    }

    #[test]
    fn single_day_range() {
        let range = DateRange::single(d(2024, 3, 5));
        assert_eq!(range.days().count(), 1);
        assert!(range.contains(d(2024, 3, 5)));
        assert!(!range.contains(d(2024, 3, 6)));
    }

    #[test]
    fn last_day_handles_leap_and_december() {
        assert_eq!(last_day_of_month(2024, 2), d(2024, 2, 29));
        assert_eq!(last_day_of_month(2023, 2), d(2023, 2, 28));
        assert_eq!(last_day_of_month(2024, 12), d(2024, 12, 31));
    }

    #[test]
    fn month_of_spans_whole_month() {
        let range = DateRange::month_of(d(2024, 2, 15));
        assert_eq!(range.start, d(2024, 2, 1));
        assert_eq!(range.end, d(2024, 2, 29));
    }

    #[test]
    fn weekday_index_is_sunday_based() {
        // 2024-03-03 is a Sunday
        assert_eq!(weekday_index(d(2024, 3, 3)), 0);
        assert_eq!(weekday_index(d(2024, 3, 4)), 1);
        assert_eq!(weekday_index(d(2024, 3, 9)), 6);
    }
}
