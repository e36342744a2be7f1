//! Frequency policy
//!
//! Decides which calendar days "count" for a habit: the streak calculator
//! uses it to detect missed days, the progress aggregator to build
//! completion-rate denominators. Pure, total, no failure modes.

use crate::habit::Recurrence;
use chrono::{Datelike, NaiveDate};

/// Whether a completion was expected on `date` for a habit created on
/// `created_on` with the given recurrence
///
/// Days before creation are never expected.
#[must_use]
pub fn is_expected_on(recurrence: &Recurrence, created_on: NaiveDate, date: NaiveDate) -> bool {
    if date < created_on {
        return false;
    }
    match recurrence {
        Recurrence::Daily => true,
        Recurrence::SpecificWeekdays { days } => days.contains(date.weekday()),
    }
}

/// Count of expected days strictly between `after` and `until`
///
/// Exclusive on both ends; zero whenever the dates are adjacent or out of
/// order. This is what the streak rule means by "an expected day was
/// missed".
#[must_use]
pub fn expected_days_between(
    recurrence: &Recurrence,
    created_on: NaiveDate,
    after: NaiveDate,
    until: NaiveDate,
) -> u32 {
    let mut missed = 0;
    let mut day = after.succ_opt();
    while let Some(d) = day {
        if d >= until {
            break;
        }
        if is_expected_on(recurrence, created_on, d) {
            missed += 1;
        }
        day = d.succ_opt();
    }
    missed
}
