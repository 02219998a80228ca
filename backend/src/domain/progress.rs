//! Derived progress metrics for a prescription.
//!
//! [`PrescriptionProgress::compute`] is the only place adherence and streaks
//! are calculated. It is a pure function of the plan, the prescription, its
//! completions and the current date.

use std::collections::HashSet;

use chrono::NaiveDate;

use super::{Prescription, ProtocolPlan, TaskCompletion, TaskId};

/// Scheduled and completed task counts for one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayProgress {
    /// One-based day number.
    pub day_number: u16,
    /// Tasks scheduled on the day; zero on rest days.
    pub scheduled: usize,
    /// Scheduled tasks that were completed.
    pub completed: usize,
}

impl DayProgress {
    /// Whether nothing was scheduled.
    #[must_use]
    pub const fn is_rest_day(&self) -> bool {
        self.scheduled == 0
    }

    /// Whether every scheduled task was completed.
    #[must_use]
    pub const fn is_fulfilled(&self) -> bool {
        self.scheduled > 0 && self.completed >= self.scheduled
    }
}

/// Progress snapshot of a prescription.
///
/// ## Invariants
/// - `completed_tasks <= expected_tasks`.
/// - `adherence_percent` is within `0..=100`.
/// - `days` covers `1..=current_day`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrescriptionProgress {
    /// One-based current day; zero before activation.
    pub current_day: u16,
    /// Protocol length in days.
    pub duration_days: u16,
    /// Days left after the current day.
    pub days_remaining: u16,
    /// Whether the schedule has run past its last day.
    pub overdue: bool,
    /// Tasks scheduled up to and including the current day.
    pub expected_tasks: usize,
    /// Scheduled tasks completed up to and including the current day.
    pub completed_tasks: usize,
    /// `completed * 100 / expected`, floored.
    pub adherence_percent: u8,
    /// Fulfilled days counting back from the current day.
    pub current_streak: u16,
    /// Longest run of fulfilled days.
    pub longest_streak: u16,
    /// Per-day breakdown.
    pub days: Vec<DayProgress>,
}

impl PrescriptionProgress {
    /// Compute progress as of `today`.
    ///
    /// Completions for unscheduled tasks or days beyond the current day are
    /// ignored. Rest days neither extend nor break a streak, and an
    /// unfinished current day does not break the running streak.
    #[must_use]
    pub fn compute(
        plan: &ProtocolPlan,
        duration_days: u16,
        prescription: &Prescription,
        completions: &[TaskCompletion],
        today: NaiveDate,
    ) -> Self {
        let Some(position) = prescription.schedule_position(duration_days, today) else {
            return Self::not_started(duration_days);
        };
        let current_day = position.current_day;

        let done: HashSet<(u16, TaskId)> = completions
            .iter()
            .filter(|completion| completion.day_number >= 1 && completion.day_number <= current_day)
            .filter(|completion| plan.is_scheduled(completion.day_number, completion.task_id))
            .map(|completion| (completion.day_number, completion.task_id))
            .collect();

        let days: Vec<DayProgress> = (1..=current_day)
            .map(|day_number| DayProgress {
                day_number,
                scheduled: plan.task_count_on(day_number),
                completed: done.iter().filter(|(day, _)| *day == day_number).count(),
            })
            .collect();

        let expected_tasks = days.iter().map(|day| day.scheduled).sum();
        let completed_tasks = days.iter().map(|day| day.completed).sum();

        Self {
            current_day,
            duration_days,
            days_remaining: duration_days.saturating_sub(current_day),
            overdue: position.overdue,
            expected_tasks,
            completed_tasks,
            adherence_percent: adherence(completed_tasks, expected_tasks),
            current_streak: current_streak(&days),
            longest_streak: longest_streak(&days),
            days,
        }
    }

    fn not_started(duration_days: u16) -> Self {
        Self {
            current_day: 0,
            duration_days,
            days_remaining: duration_days,
            overdue: false,
            expected_tasks: 0,
            completed_tasks: 0,
            adherence_percent: 0,
            current_streak: 0,
            longest_streak: 0,
            days: Vec::new(),
        }
    }
}

fn adherence(completed: usize, expected: usize) -> u8 {
    if expected == 0 {
        return 0;
    }
    let percent = completed.min(expected).saturating_mul(100) / expected;
    u8::try_from(percent).unwrap_or(100)
}

fn current_streak(days: &[DayProgress]) -> u16 {
    // The current day is still in progress until all of its tasks are done.
    let skip_current = days
        .last()
        .is_some_and(|last| !last.is_rest_day() && !last.is_fulfilled());
    let mut streak: u16 = 0;
    for day in days
        .iter()
        .rev()
        .skip(usize::from(skip_current))
        .filter(|day| !day.is_rest_day())
    {
        if !day.is_fulfilled() {
            break;
        }
        streak = streak.saturating_add(1);
    }
    streak
}

fn longest_streak(days: &[DayProgress]) -> u16 {
    let mut longest: u16 = 0;
    let mut running: u16 = 0;
    for day in days.iter().filter(|day| !day.is_rest_day()) {
        if day.is_fulfilled() {
            running = running.saturating_add(1);
            longest = longest.max(running);
        } else {
            running = 0;
        }
    }
    longest
}

#[cfg(test)]
#[path = "progress_tests.rs"]
mod tests;
