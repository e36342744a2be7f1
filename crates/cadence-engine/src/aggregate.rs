//! Progress aggregator
//!
//! Read-side projections over registry and ledger state: completion rates,
//! rankings, today's completion flags, calendar occupancy, and the summary
//! blocks the home and progress screens render. Pure functions over cloned
//! state; deterministic given their inputs and total over empty ones.

use crate::session::{today, HabitEngine};
use cadence_model::frequency::is_expected_on;
use cadence_model::streak::level_for_xp;
use cadence_model::{Completion, DateRange, Habit, HabitId, UserProfile};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::HashMap;

/// One cell of a month occupancy grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDay {
    /// Day of month, 1-based
    pub day: u32,
    /// The date itself
    pub date: NaiveDate,
    /// Whether a counted completion covers the day
    pub completed: bool,
    /// Whether the day is today
    pub is_today: bool,
}

/// Summary block for the signed-in user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    /// Habits with a counted completion today
    pub completed_today: usize,
    /// Total habits
    pub total_habits: usize,
    /// Frequency-aware completion rate over the current month, percent
    pub monthly_completion_rate: u32,
    /// Mean current streak across habits, rounded
    pub average_streak: u32,
    /// Total XP
    pub total_xp: u32,
    /// Level derived from total XP
    pub level: u32,
    /// Current cross-habit streak
    pub global_streak: u32,
    /// Best cross-habit streak
    pub best_global_streak: u32,
}

/// Summary block for one habit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitStats {
    /// Counted completions over the habit's lifetime
    pub total_completions: usize,
    /// Counted completions in the current month
    pub monthly_completions: usize,
    /// Frequency-aware completion rate over the current month, percent
    pub monthly_completion_rate: u32,
    /// Whether the habit has a counted completion today
    pub completed_today: bool,
}

fn completed_on(completions: &[Completion], date: NaiveDate) -> bool {
    completions.iter().any(|c| c.counts() && c.date == date)
}

/// Completed-expected-days over total-expected-days in `range`, restricted
/// to days up to `today`
///
/// Zero when no day in the range is expected.
#[must_use]
pub fn completion_rate(
    habit: &Habit,
    completions: &[Completion],
    range: DateRange,
    today: NaiveDate,
) -> f64 {
    let mut expected = 0u32;
    let mut completed = 0u32;
    for day in range.days() {
        if day > today || !is_expected_on(&habit.recurrence, habit.created_on(), day) {
            continue;
        }
        expected += 1;
        if completed_on(completions, day) {
            completed += 1;
        }
    }
    if expected == 0 {
        0.0
    } else {
        f64::from(completed) / f64::from(expected)
    }
}

/// The same ratio with expected and completed days summed across all habits
#[must_use]
pub fn overall_completion_rate(
    habits: &[Habit],
    completions: &HashMap<HabitId, Vec<Completion>>,
    range: DateRange,
    today: NaiveDate,
) -> f64 {
    let mut expected = 0u32;
    let mut completed = 0u32;
    for habit in habits {
        let records = completions.get(&habit.id).map_or(&[][..], Vec::as_slice);
        for day in range.days() {
            if day > today || !is_expected_on(&habit.recurrence, habit.created_on(), day) {
                continue;
            }
            expected += 1;
            if completed_on(records, day) {
                completed += 1;
            }
        }
    }
    if expected == 0 {
        0.0
    } else {
        f64::from(completed) / f64::from(expected)
    }
}

/// Habits paired with their completion rate over `range`, sorted
///
/// Ascending order surfaces "needs improvement", descending "best
/// performing". Ties keep creation order.
#[must_use]
pub fn rank_by_completion_rate(
    habits: &[Habit],
    completions: &HashMap<HabitId, Vec<Completion>>,
    range: DateRange,
    today: NaiveDate,
    ascending: bool,
) -> Vec<(Habit, f64)> {
    let mut ranked: Vec<(Habit, f64)> = habits
        .iter()
        .map(|habit| {
            let records = completions.get(&habit.id).map_or(&[][..], Vec::as_slice);
            let rate = completion_rate(habit, records, range, today);
            (habit.clone(), rate)
        })
        .collect();
    ranked.sort_by(|a, b| {
        let ordering = a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal);
        if ascending {
            ordering
        } else {
            ordering.reverse()
        }
    });
    ranked
}

/// Each habit paired with whether it has a counted completion on `today`
#[must_use]
pub fn todays_completion_flags(
    habits: &[Habit],
    completions: &HashMap<HabitId, Vec<Completion>>,
    today: NaiveDate,
) -> Vec<(Habit, bool)> {
    habits
        .iter()
        .map(|habit| {
            let records = completions.get(&habit.id).map_or(&[][..], Vec::as_slice);
            (habit.clone(), completed_on(records, today))
        })
        .collect()
}

/// Per-day occupancy grid for one habit and one calendar month
///
/// Empty for an invalid month; never fails.
#[must_use]
pub fn calendar_grid(
    completions: &[Completion],
    year: i32,
    month: u32,
    today: NaiveDate,
) -> Vec<CalendarDay> {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return Vec::new();
    };
    let range = DateRange::month_of(first);
    range
        .days()
        .map(|date| CalendarDay {
            day: date.day(),
            date,
            completed: completed_on(completions, date),
            is_today: date == today,
        })
        .collect()
}

/// User summary across all habits plus the cached profile
#[must_use]
pub fn user_progress(
    habits: &[Habit],
    completions: &HashMap<HabitId, Vec<Completion>>,
    profile: Option<&UserProfile>,
    today: NaiveDate,
) -> UserProgress {
    let completed_today = habits
        .iter()
        .filter(|habit| {
            let records = completions.get(&habit.id).map_or(&[][..], Vec::as_slice);
            completed_on(records, today)
        })
        .count();

    let month = DateRange::month_of(today);
    let monthly_rate = overall_completion_rate(habits, completions, month, today);

    let average_streak = if habits.is_empty() {
        0
    } else {
        let sum: u32 = habits.iter().map(|h| h.current_streak).sum();
        (f64::from(sum) / habits.len() as f64).round() as u32
    };

    let total_xp = profile.map_or(0, |p| p.total_xp);
    UserProgress {
        completed_today,
        total_habits: habits.len(),
        monthly_completion_rate: (monthly_rate * 100.0).round() as u32,
        average_streak,
        total_xp,
        level: profile.map_or_else(|| level_for_xp(total_xp), |p| p.level),
        global_streak: profile.map_or(0, |p| p.current_global_streak),
        best_global_streak: profile.map_or(0, |p| p.best_global_streak),
    }
}

/// Per-habit summary for the detail screen
#[must_use]
pub fn habit_stats(habit: &Habit, completions: &[Completion], today: NaiveDate) -> HabitStats {
    let month = DateRange::month_of(today);
    let monthly_completions = completions
        .iter()
        .filter(|c| c.counts() && month.contains(c.date))
        .count();
    let rate = completion_rate(habit, completions, month, today);

    HabitStats {
        total_completions: completions.iter().filter(|c| c.counts()).count(),
        monthly_completions,
        monthly_completion_rate: (rate * 100.0).round() as u32,
        completed_today: completed_on(completions, today),
    }
}

impl HabitEngine {
    /// Frequency-aware completion rate for one habit over a day range
    #[must_use]
    pub fn completion_rate(&self, habit_id: HabitId, range: DateRange) -> f64 {
        let Some(habit) = self.shared.cache.habit(habit_id) else {
            return 0.0;
        };
        let completions = self.shared.cache.completions_for(habit_id);
        completion_rate(&habit, &completions, range, today())
    }

    /// Completion rate summed across all habits over a day range
    #[must_use]
    pub fn overall_completion_rate(&self, range: DateRange) -> f64 {
        let (habits, completions) = self.shared.cache.projection();
        overall_completion_rate(&habits, &completions, range, today())
    }

    /// Habits ranked by completion rate over a day range
    #[must_use]
    pub fn habits_by_completion_rate(&self, range: DateRange, ascending: bool) -> Vec<(Habit, f64)> {
        let (habits, completions) = self.shared.cache.projection();
        rank_by_completion_rate(&habits, &completions, range, today(), ascending)
    }

    /// Each habit paired with its completed-today flag
    #[must_use]
    pub fn todays_completions(&self) -> Vec<(Habit, bool)> {
        let (habits, completions) = self.shared.cache.projection();
        todays_completion_flags(&habits, &completions, today())
    }

    /// Month occupancy grid for one habit
    #[must_use]
    pub fn calendar_grid(&self, habit_id: HabitId, year: i32, month: u32) -> Vec<CalendarDay> {
        let completions = self.shared.cache.completions_for(habit_id);
        calendar_grid(&completions, year, month, today())
    }

    /// User summary across all habits plus the cached profile
    #[must_use]
    pub fn user_progress(&self) -> UserProgress {
        let (habits, completions) = self.shared.cache.projection();
        let profile = self.shared.cache.profile();
        user_progress(&habits, &completions, profile.as_ref(), today())
    }

    /// Per-habit summary; `None` for an id the cache does not hold
    #[must_use]
    pub fn habit_stats(&self, habit_id: HabitId) -> Option<HabitStats> {
        let habit = self.shared.cache.habit(habit_id)?;
        let completions = self.shared.cache.completions_for(habit_id);
        Some(habit_stats(&habit, &completions, today()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_model::{CompletionId, HabitDraft, LogOptions, Recurrence, UserId, WeekdaySet};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn habit_created(day: NaiveDate, recurrence: Recurrence) -> Habit {
        let created = Utc
            .with_ymd_and_hms(day.year(), day.month(), day.day(), 8, 0, 0)
            .unwrap();
        Habit::from_draft(HabitId::new(), HabitDraft::new("Habit", recurrence), created)
    }

    fn completion(habit: &Habit, date: NaiveDate) -> Completion {
        Completion::new(
            CompletionId::new(),
            habit.id,
            date,
            LogOptions::default(),
            Utc::now(),
        )
    }

    #[test]
    fn rate_is_one_for_completed_single_day() {
        let today = d(2024, 3, 4);
        let habit = habit_created(today, Recurrence::Daily);
        let completions = vec![completion(&habit, today)];
        let rate = completion_rate(&habit, &completions, DateRange::single(today), today);
        assert!((rate - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rate_is_zero_without_completions() {
        let today = d(2024, 3, 4);
        let habit = habit_created(today, Recurrence::Daily);
        let rate = completion_rate(&habit, &[], DateRange::single(today), today);
        assert!(rate.abs() < f64::EPSILON);
    }

    #[test]
    fn rate_ignores_future_and_unexpected_days() {
        let today = d(2024, 3, 6);
        // Mon/Wed habit created Monday 2024-03-04
        let habit = habit_created(
            d(2024, 3, 4),
            Recurrence::SpecificWeekdays { days: WeekdaySet::from_days([1, 3]) },
        );
        let completions = vec![completion(&habit, d(2024, 3, 4))];
        // Range covers Mon-Fri, but only Mon+Wed up to today count
        let range = DateRange::new(d(2024, 3, 4), d(2024, 3, 8));
        let rate = completion_rate(&habit, &completions, range, today);
        assert!((rate - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn rate_tolerates_empty_range_denominator() {
        let today = d(2024, 3, 4);
        // Created after the queried range: no expected days
        let habit = habit_created(d(2024, 3, 10), Recurrence::Daily);
        let rate = completion_rate(&habit, &[], DateRange::new(d(2024, 3, 1), d(2024, 3, 4)), today);
        assert!(rate.abs() < f64::EPSILON);
    }

    #[test]
    fn ranking_orders_by_rate() {
        let today = d(2024, 3, 5);
        let good = habit_created(d(2024, 3, 4), Recurrence::Daily);
        let bad = habit_created(d(2024, 3, 4), Recurrence::Daily);
        let mut completions = HashMap::new();
        completions.insert(
            good.id,
            vec![completion(&good, d(2024, 3, 4)), completion(&good, d(2024, 3, 5))],
        );
        completions.insert(bad.id, Vec::new());

        let habits = vec![good.clone(), bad.clone()];
        let range = DateRange::new(d(2024, 3, 4), d(2024, 3, 5));

        let worst_first = rank_by_completion_rate(&habits, &completions, range, today, true);
        assert_eq!(worst_first[0].0.id, bad.id);

        let best_first = rank_by_completion_rate(&habits, &completions, range, today, false);
        assert_eq!(best_first[0].0.id, good.id);
    }

    #[test]
    fn calendar_grid_marks_completed_and_today() {
        let today = d(2024, 2, 15);
        let habit = habit_created(d(2024, 2, 1), Recurrence::Daily);
        let completions = vec![completion(&habit, d(2024, 2, 10))];

        let grid = calendar_grid(&completions, 2024, 2, today);
        assert_eq!(grid.len(), 29);
        assert!(grid[9].completed);
        assert!(!grid[10].completed);
        assert!(grid[14].is_today);
    }

    #[test]
    fn calendar_grid_empty_for_invalid_month() {
        assert!(calendar_grid(&[], 2024, 13, d(2024, 3, 4)).is_empty());
    }

    #[test]
    fn user_progress_over_empty_state_is_zeroed() {
        let progress = user_progress(&[], &HashMap::new(), None, d(2024, 3, 4));
        assert_eq!(progress, UserProgress { level: 1, ..UserProgress::default() });
    }

    #[test]
    fn user_progress_aggregates_streaks_and_profile() {
        let today = d(2024, 3, 4);
        let mut first = habit_created(d(2024, 3, 1), Recurrence::Daily);
        first.current_streak = 3;
        let mut second = habit_created(d(2024, 3, 1), Recurrence::Daily);
        second.current_streak = 6;

        let mut completions = HashMap::new();
        completions.insert(first.id, vec![completion(&first, today)]);
        completions.insert(second.id, Vec::new());

        let mut profile = UserProfile::fresh(UserId::new("u1"), Utc::now());
        profile.total_xp = 520;
        profile.level = 2;
        profile.current_global_streak = 4;
        profile.best_global_streak = 7;

        let habits = vec![first, second];
        let progress = user_progress(&habits, &completions, Some(&profile), today);

        assert_eq!(progress.completed_today, 1);
        assert_eq!(progress.total_habits, 2);
        assert_eq!(progress.average_streak, 5);
        assert_eq!(progress.total_xp, 520);
        assert_eq!(progress.level, 2);
        assert_eq!(progress.global_streak, 4);
        assert_eq!(progress.best_global_streak, 7);
    }

    #[test]
    fn habit_stats_counts_only_counted_records() {
        let today = d(2024, 3, 4);
        let habit = habit_created(d(2024, 3, 1), Recurrence::Daily);
        let mut skipped = completion(&habit, d(2024, 3, 2));
        skipped.is_skipped = true;
        let completions = vec![completion(&habit, d(2024, 3, 3)), skipped, completion(&habit, today)];

        let stats = habit_stats(&habit, &completions, today);
        assert_eq!(stats.total_completions, 2);
        assert_eq!(stats.monthly_completions, 2);
        assert!(stats.completed_today);
        // 2 of the 4 expected days so far this month
        assert_eq!(stats.monthly_completion_rate, 50);
    }
}
