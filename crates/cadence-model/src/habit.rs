//! Habit definitions
//!
//! A habit is a recurring activity: its recurrence rule, reminder settings,
//! and the derived progress fields (streaks, XP) the completion ledger keeps
//! up to date as a side effect of logging.

use crate::ids::HabitId;
use chrono::{DateTime, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Set of weekday indices, Sunday = 0 through Saturday = 6
///
/// Matches the convention the remote documents use for the
/// specific-weekdays recurrence variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeekdaySet(BTreeSet<u8>);

impl WeekdaySet {
    /// Build a set from weekday indices; out-of-range values are ignored
    #[must_use]
    pub fn from_days(days: impl IntoIterator<Item = u8>) -> Self {
        Self(days.into_iter().filter(|d| *d <= 6).collect())
    }

    /// Whether the set contains `weekday`
    #[inline]
    #[must_use]
    pub fn contains(&self, weekday: Weekday) -> bool {
        self.0.contains(&(weekday.num_days_from_sunday() as u8))
    }

    /// Number of selected weekdays
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no weekday is selected
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate the selected weekday indices, ascending
    pub fn days(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.iter().copied()
    }
}

/// Recurrence rule: which calendar days a habit is expected on
///
/// Closed tagged union; the loosely-typed remote variants are resolved into
/// this shape at the reconciliation boundary, never in business logic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Recurrence {
    /// Expected every day
    Daily,
    /// Expected only on the listed weekdays
    SpecificWeekdays {
        /// Selected weekdays, Sunday = 0
        days: WeekdaySet,
    },
}

/// Error for an unparseable time-of-day string
#[derive(Debug, thiserror::Error)]
#[error("invalid time of day: {0:?}")]
pub struct InvalidTime(pub String);

/// Reminder time-of-day, serialized as `"HH:MM"` on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReminderTime {
    /// Hour, 0-23
    pub hour: u8,
    /// Minute, 0-59
    pub minute: u8,
}

impl ReminderTime {
    /// Create a time-of-day
    ///
    /// # Errors
    /// Returns [`InvalidTime`] when hour or minute is out of range.
    pub fn new(hour: u8, minute: u8) -> Result<Self, InvalidTime> {
        if hour > 23 || minute > 59 {
            return Err(InvalidTime(format!("{hour:02}:{minute:02}")));
        }
        Ok(Self { hour, minute })
    }
}

impl std::fmt::Display for ReminderTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl std::str::FromStr for ReminderTime {
    type Err = InvalidTime;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (h, m) = s.split_once(':').ok_or_else(|| InvalidTime(s.to_string()))?;
        let hour: u8 = h.parse().map_err(|_| InvalidTime(s.to_string()))?;
        let minute: u8 = m.parse().map_err(|_| InvalidTime(s.to_string()))?;
        Self::new(hour, minute)
    }
}

impl TryFrom<String> for ReminderTime {
    type Error = InvalidTime;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ReminderTime> for String {
    fn from(time: ReminderTime) -> Self {
        time.to_string()
    }
}

/// Reminder settings for a habit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    /// Whether the reminder should fire
    pub enabled: bool,
    /// Time of day; absent on records written with the reminder disabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<ReminderTime>,
}

impl Reminder {
    /// Enabled reminder at `time`
    #[inline]
    #[must_use]
    pub fn at(time: ReminderTime) -> Self {
        Self { enabled: true, time: Some(time) }
    }

    /// Disabled reminder
    #[inline]
    #[must_use]
    pub fn off() -> Self {
        Self { enabled: false, time: None }
    }

    /// Whether this reminder is actually schedulable
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.enabled && self.time.is_some()
    }
}

/// Icon reference: family + name in the UI's icon catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IconRef {
    /// Icon family
    pub family: String,
    /// Icon name within the family
    pub name: String,
}

impl IconRef {
    /// Create an icon reference
    #[inline]
    #[must_use]
    pub fn new(family: impl Into<String>, name: impl Into<String>) -> Self {
        Self { family: family.into(), name: name.into() }
    }
}

impl Default for IconRef {
    fn default() -> Self {
        Self::new("Ionicons", "star")
    }
}

/// A recurring activity definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    /// Opaque id, stable for the habit's lifetime
    pub id: HabitId,
    /// Display name, non-empty
    pub name: String,
    /// Optional free-text description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Recurrence rule
    pub recurrence: Recurrence,
    /// Reminder settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder: Option<Reminder>,
    /// Icon reference
    #[serde(default)]
    pub icon: IconRef,
    /// Whether the habit is currently active
    pub is_active: bool,
    /// Current streak, maintained by the completion ledger
    #[serde(default)]
    pub current_streak: u32,
    /// Best streak ever; never less than `current_streak`
    #[serde(default)]
    pub best_streak: u32,
    /// XP accumulated on this habit
    #[serde(default)]
    pub habit_xp: u32,
    /// Day of the most recent completion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_completion_date: Option<NaiveDate>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last-update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Habit {
    /// Materialize a draft into a habit with zeroed progress fields
    #[must_use]
    pub fn from_draft(id: HabitId, draft: HabitDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: draft.name,
            description: draft.description,
            recurrence: draft.recurrence,
            reminder: draft.reminder,
            icon: draft.icon,
            is_active: true,
            current_streak: 0,
            best_streak: 0,
            habit_xp: 0,
            last_completion_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Calendar day the habit was created on
    #[inline]
    #[must_use]
    pub fn created_on(&self) -> NaiveDate {
        self.created_at.date_naive()
    }

    /// Whether the reminder collaborator should have a schedule for this habit
    #[inline]
    #[must_use]
    pub fn reminder_active(&self) -> bool {
        self.reminder.is_some_and(|r| r.is_active())
    }

    /// Merge a partial edit into the habit
    pub fn apply_patch(&mut self, patch: &HabitPatch, now: DateTime<Utc>) {
        if let Some(name) = &patch.name {
            self.name.clone_from(name);
        }
        if let Some(description) = &patch.description {
            self.description = Some(description.clone());
        }
        if let Some(recurrence) = &patch.recurrence {
            self.recurrence = recurrence.clone();
        }
        if let Some(reminder) = patch.reminder {
            self.reminder = Some(reminder);
        }
        if let Some(icon) = &patch.icon {
            self.icon = icon.clone();
        }
        if let Some(is_active) = patch.is_active {
            self.is_active = is_active;
        }
        self.updated_at = now;
    }

    /// Snapshot of the derived progress fields
    #[inline]
    #[must_use]
    pub fn progress(&self) -> HabitProgress {
        HabitProgress {
            current_streak: self.current_streak,
            best_streak: self.best_streak,
            habit_xp: self.habit_xp,
            last_completion_date: self.last_completion_date,
        }
    }

    /// Write back derived progress fields
    pub fn apply_progress(&mut self, progress: &HabitProgress, now: DateTime<Utc>) {
        self.current_streak = progress.current_streak;
        self.best_streak = progress.best_streak;
        self.habit_xp = progress.habit_xp;
        self.last_completion_date = progress.last_completion_date;
        self.updated_at = now;
    }
}

/// Input for creating a habit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitDraft {
    /// Display name
    pub name: String,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Recurrence rule
    pub recurrence: Recurrence,
    /// Reminder settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder: Option<Reminder>,
    /// Icon reference
    #[serde(default)]
    pub icon: IconRef,
}

impl HabitDraft {
    /// Create a draft with the required fields
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, recurrence: Recurrence) -> Self {
        Self {
            name: name.into(),
            description: None,
            recurrence,
            reminder: None,
            icon: IconRef::default(),
        }
    }

    /// With description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// With reminder
    #[inline]
    #[must_use]
    pub fn with_reminder(mut self, reminder: Reminder) -> Self {
        self.reminder = Some(reminder);
        self
    }

    /// With icon
    #[inline]
    #[must_use]
    pub fn with_icon(mut self, icon: IconRef) -> Self {
        self.icon = icon;
        self
    }
}

/// Partial habit edit; `None` fields are left untouched
///
/// A reminder is removed by patching it to a disabled value, the same way
/// the remote documents record it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitPatch {
    /// New name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New recurrence rule
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,
    /// New reminder settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder: Option<Reminder>,
    /// New icon
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<IconRef>,
    /// New active flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl HabitPatch {
    /// Empty patch
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With name
    #[inline]
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// With description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// With recurrence
    #[inline]
    #[must_use]
    pub fn with_recurrence(mut self, recurrence: Recurrence) -> Self {
        self.recurrence = Some(recurrence);
        self
    }

    /// With reminder
    #[inline]
    #[must_use]
    pub fn with_reminder(mut self, reminder: Reminder) -> Self {
        self.reminder = Some(reminder);
        self
    }

    /// With icon
    #[inline]
    #[must_use]
    pub fn with_icon(mut self, icon: IconRef) -> Self {
        self.icon = Some(icon);
        self
    }

    /// With active flag
    #[inline]
    #[must_use]
    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }

    /// Whether the patch changes nothing
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.recurrence.is_none()
            && self.reminder.is_none()
            && self.icon.is_none()
            && self.is_active.is_none()
    }
}

/// Derived progress fields written back by the completion ledger
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitProgress {
    /// Current streak
    pub current_streak: u32,
    /// Best streak
    pub best_streak: u32,
    /// Accumulated habit XP
    pub habit_xp: u32,
    /// Most recent completion day
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_completion_date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 9, 30, 0).unwrap()
    }

    #[test]
    fn weekday_set_ignores_out_of_range() {
        let set = WeekdaySet::from_days([1, 3, 9]);
        assert_eq!(set.len(), 2);
        assert!(set.contains(Weekday::Mon));
        assert!(set.contains(Weekday::Wed));
        assert!(!set.contains(Weekday::Sun));
    }

    #[test]
    fn reminder_time_parse_and_format() {
        let time: ReminderTime = "07:45".parse().unwrap();
        assert_eq!(time, ReminderTime::new(7, 45).unwrap());
        assert_eq!(time.to_string(), "07:45");
        assert!("25:00".parse::<ReminderTime>().is_err());
        assert!("0745".parse::<ReminderTime>().is_err());
    }

    #[test]
    fn reminder_active_requires_enabled_and_time() {
        assert!(Reminder::at(ReminderTime::new(8, 0).unwrap()).is_active());
        assert!(!Reminder::off().is_active());
        assert!(!Reminder { enabled: true, time: None }.is_active());
    }

    #[test]
    fn from_draft_zeroes_progress() {
        let draft = HabitDraft::new("Read", Recurrence::Daily).with_description("20 pages");
        let habit = Habit::from_draft(HabitId::new(), draft, now());

        assert_eq!(habit.name, "Read");
        assert!(habit.is_active);
        assert_eq!(habit.current_streak, 0);
        assert_eq!(habit.best_streak, 0);
        assert_eq!(habit.habit_xp, 0);
        assert!(habit.last_completion_date.is_none());
    }

    #[test]
    fn patch_merges_only_set_fields() {
        let draft = HabitDraft::new("Read", Recurrence::Daily);
        let mut habit = Habit::from_draft(HabitId::new(), draft, now());

        let patch = HabitPatch::new().with_name("Read more").with_active(false);
        let later = now() + chrono::Duration::hours(1);
        habit.apply_patch(&patch, later);

        assert_eq!(habit.name, "Read more");
        assert!(!habit.is_active);
        assert_eq!(habit.recurrence, Recurrence::Daily);
        assert_eq!(habit.updated_at, later);
    }

    #[test]
    fn habit_serde_uses_camel_case() {
        let draft = HabitDraft::new("Run", Recurrence::SpecificWeekdays {
            days: WeekdaySet::from_days([1, 3, 5]),
        });
        let habit = Habit::from_draft(HabitId::new(), draft, now());
        let json = serde_json::to_value(&habit).unwrap();

        assert!(json.get("isActive").is_some());
        assert!(json.get("currentStreak").is_some());
        assert_eq!(json["recurrence"]["type"], "specificWeekdays");
        assert_eq!(json["recurrence"]["days"], serde_json::json!([1, 3, 5]));
    }
}
