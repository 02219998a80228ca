//! Patient habits and their daily progress.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

use super::validation::{ValidationError, bounded_text, optional_text};
use super::{HabitId, UserId};

/// Maximum habit name length.
pub const NAME_MAX: usize = 80;
/// Maximum habit description length.
pub const DESCRIPTION_MAX: usize = 1000;

/// A habit a patient tracks daily.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Habit {
    /// Identifier.
    pub id: HabitId,
    /// Owning patient.
    pub patient_id: UserId,
    /// Short name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Days per week the patient aims for.
    pub target_per_week: u8,
    /// Archived habits accept no more progress.
    pub archived: bool,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
}

/// Editable habit fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HabitDetails {
    /// Short name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Days per week the patient aims for.
    pub target_per_week: u8,
}

impl HabitDetails {
    /// Validate raw input.
    ///
    /// # Errors
    /// Returns a validation error for blank names or targets outside `1..=7`.
    pub fn new(
        name: &str,
        description: Option<&str>,
        target_per_week: u8,
    ) -> Result<Self, ValidationError> {
        if !(1..=7).contains(&target_per_week) {
            return Err(ValidationError::new(
                "targetPerWeek",
                "out_of_range",
                "targetPerWeek must be between 1 and 7",
            ));
        }
        Ok(Self {
            name: bounded_text("name", name, NAME_MAX)?,
            description: optional_text("description", description, DESCRIPTION_MAX)?,
            target_per_week,
        })
    }
}

impl Habit {
    /// Create a habit from validated details.
    #[must_use]
    pub fn create(patient_id: UserId, details: HabitDetails, now: DateTime<Utc>) -> Self {
        Self {
            id: HabitId::random(),
            patient_id,
            name: details.name,
            description: details.description,
            target_per_week: details.target_per_week,
            archived: false,
            created_at: now,
        }
    }

    /// Check that progress may be recorded on `date`.
    ///
    /// # Errors
    /// Returns a `date` validation error for future dates or dates before the
    /// habit existed.
    pub fn check_progress_date(&self, date: NaiveDate, today: NaiveDate) -> Result<(), ValidationError> {
        if date > today {
            return Err(ValidationError::new(
                "date",
                "future_date",
                "progress cannot be recorded for a future date",
            ));
        }
        if date < self.created_at.date_naive() {
            return Err(ValidationError::new(
                "date",
                "before_habit",
                "progress cannot predate the habit",
            ));
        }
        Ok(())
    }
}

/// Streak and frequency statistics for a habit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HabitStats {
    /// Consecutive logged days ending today, or yesterday if today is open.
    pub current_streak: u32,
    /// Longest run of consecutive logged days.
    pub longest_streak: u32,
    /// Logged days in the last 7 days, today included.
    pub last_7_days: u32,
    /// Logged days in the last 30 days, today included.
    pub last_30_days: u32,
    /// Logged days in the current ISO week.
    pub this_week: u32,
    /// Whether `this_week` meets the weekly target.
    pub weekly_target_met: bool,
}

impl HabitStats {
    /// Compute statistics from logged dates as of `today`.
    ///
    /// Dates after `today` are ignored.
    #[must_use]
    pub fn compute(target_per_week: u8, logged: &[NaiveDate], today: NaiveDate) -> Self {
        let dates: BTreeSet<NaiveDate> = logged.iter().copied().filter(|d| *d <= today).collect();

        let mut cursor = if dates.contains(&today) {
            Some(today)
        } else {
            today.pred_opt()
        };
        let mut current_streak = 0_u32;
        while let Some(day) = cursor.filter(|day| dates.contains(day)) {
            current_streak = current_streak.saturating_add(1);
            cursor = day.pred_opt();
        }

        let mut longest_streak = 0_u32;
        let mut running = 0_u32;
        let mut previous: Option<NaiveDate> = None;
        for date in &dates {
            running = match previous {
                Some(prev) if prev.succ_opt() == Some(*date) => running.saturating_add(1),
                _ => 1,
            };
            longest_streak = longest_streak.max(running);
            previous = Some(*date);
        }

        let since = |days: i64| {
            let from = today - Duration::days(days - 1);
            count(dates.range(from..=today).count())
        };
        let week_start = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
        let this_week = count(dates.range(week_start..=today).count());

        Self {
            current_streak,
            longest_streak,
            last_7_days: since(7),
            last_30_days: since(30),
            this_week,
            weekly_target_met: this_week >= u32::from(target_per_week),
        }
    }
}

fn count(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
