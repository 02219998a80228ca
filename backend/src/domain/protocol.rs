//! Doctor-authored protocols: a plan of days, sessions and tasks.
//!
//! A protocol runs for `duration_days`. Only days that carry sessions are
//! stored; every other day in `1..=duration_days` is a rest day.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::{ValidationError, bounded_text, optional_text};
use super::{ProtocolId, TaskId, UserId};

/// Longest supported protocol, in days.
pub const MAX_DURATION_DAYS: u16 = 365;
/// Maximum protocol title length.
pub const TITLE_MAX: usize = 120;
/// Maximum protocol description length.
pub const DESCRIPTION_MAX: usize = 4000;
/// Maximum task title length.
pub const TASK_TITLE_MAX: usize = 200;
/// Maximum task instructions length.
pub const INSTRUCTIONS_MAX: usize = 2000;

/// Part of the day a session is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeOfDay {
    /// Before noon.
    Morning,
    /// Noon to early evening.
    Afternoon,
    /// Evening.
    Evening,
    /// No preferred time.
    Anytime,
}

/// Category of a protocol task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskKind {
    /// Generic action item.
    Action,
    /// Physical exercise.
    Exercise,
    /// Diet or meal instruction.
    Nutrition,
    /// Medication intake.
    Medication,
    /// Reading or learning material.
    Education,
    /// Journaling or reflection prompt.
    Reflection,
}

/// A single task a patient ticks off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolTask {
    /// Identifier stable across plan edits.
    pub id: TaskId,
    /// Short instruction.
    pub title: String,
    /// Category.
    pub kind: TaskKind,
    /// Optional longer guidance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// A group of tasks performed together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolSession {
    /// Session heading.
    pub title: String,
    /// Preferred time of day.
    pub time_of_day: TimeOfDay,
    /// Tasks in display order.
    pub tasks: Vec<ProtocolTask>,
}

/// Sessions scheduled on one day of the protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolDay {
    /// One-based day number.
    pub day_number: u16,
    /// Optional heading for the day.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Sessions in display order.
    pub sessions: Vec<ProtocolSession>,
}

impl ProtocolDay {
    /// Tasks scheduled on this day, in display order.
    pub fn tasks(&self) -> impl Iterator<Item = &ProtocolTask> {
        self.sessions.iter().flat_map(|session| session.tasks.iter())
    }
}

/// A validated day-by-day plan.
///
/// ## Invariants
/// - Day numbers are unique, within `1..=duration_days` and sorted.
/// - Every session holds at least one task; the plan holds at least one.
/// - Task identifiers are unique across the plan.
/// - Titles are trimmed and non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolPlan {
    days: Vec<ProtocolDay>,
}

impl ProtocolPlan {
    /// Validate and normalise a plan for a protocol of `duration_days`.
    ///
    /// # Errors
    /// Returns a [`ValidationError`] on the `days` field describing the first
    /// broken invariant.
    pub fn new(days: Vec<ProtocolDay>, duration_days: u16) -> Result<Self, ValidationError> {
        let mut seen_days = HashSet::new();
        let mut seen_tasks = HashSet::new();
        let mut normalised = Vec::with_capacity(days.len());
        for day in days {
            if day.day_number == 0 || day.day_number > duration_days {
                return Err(ValidationError::new(
                    "days",
                    "day_out_of_range",
                    format!(
                        "day {} is outside the protocol duration of {duration_days} days",
                        day.day_number
                    ),
                ));
            }
            if !seen_days.insert(day.day_number) {
                return Err(ValidationError::new(
                    "days",
                    "duplicate_day",
                    format!("day {} appears more than once", day.day_number),
                ));
            }
            normalised.push(normalise_day(day, &mut seen_tasks)?);
        }
        if seen_tasks.is_empty() {
            return Err(ValidationError::new(
                "days",
                "empty_plan",
                "a protocol must schedule at least one task",
            ));
        }
        normalised.sort_by_key(|day| day.day_number);
        Ok(Self { days: normalised })
    }

    /// Days that carry sessions, sorted by day number.
    #[must_use]
    pub fn days(&self) -> &[ProtocolDay] {
        &self.days
    }

    /// Consume the plan, returning its days.
    #[must_use]
    pub fn into_days(self) -> Vec<ProtocolDay> {
        self.days
    }

    /// The scheduled day, or `None` for a rest day.
    #[must_use]
    pub fn day(&self, day_number: u16) -> Option<&ProtocolDay> {
        self.days
            .binary_search_by_key(&day_number, |day| day.day_number)
            .ok()
            .and_then(|index| self.days.get(index))
    }

    /// Number of tasks scheduled on `day_number`.
    #[must_use]
    pub fn task_count_on(&self, day_number: u16) -> usize {
        self.day(day_number).map_or(0, |day| day.tasks().count())
    }

    /// Whether `task_id` is scheduled on `day_number`.
    #[must_use]
    pub fn is_scheduled(&self, day_number: u16, task_id: TaskId) -> bool {
        self.day(day_number)
            .is_some_and(|day| day.tasks().any(|task| task.id == task_id))
    }

    /// Total number of tasks in the plan.
    #[must_use]
    pub fn total_tasks(&self) -> usize {
        self.days.iter().map(|day| day.tasks().count()).sum()
    }
}

fn normalise_day(
    day: ProtocolDay,
    seen_tasks: &mut HashSet<TaskId>,
) -> Result<ProtocolDay, ValidationError> {
    let title = optional_text("days", day.title.as_deref(), TITLE_MAX)?;
    let mut sessions = Vec::with_capacity(day.sessions.len());
    for session in day.sessions {
        if session.tasks.is_empty() {
            return Err(ValidationError::new(
                "days",
                "empty_session",
                format!("a session on day {} has no tasks", day.day_number),
            ));
        }
        let mut tasks = Vec::with_capacity(session.tasks.len());
        for task in session.tasks {
            if !seen_tasks.insert(task.id) {
                return Err(ValidationError::new(
                    "days",
                    "duplicate_task",
                    format!("task {} appears more than once", task.id),
                ));
            }
            tasks.push(ProtocolTask {
                id: task.id,
                title: bounded_text("days", &task.title, TASK_TITLE_MAX)?,
                kind: task.kind,
                instructions: optional_text(
                    "days",
                    task.instructions.as_deref(),
                    INSTRUCTIONS_MAX,
                )?,
            });
        }
        sessions.push(ProtocolSession {
            title: bounded_text("days", &session.title, TITLE_MAX)?,
            time_of_day: session.time_of_day,
            tasks,
        });
    }
    Ok(ProtocolDay {
        day_number: day.day_number,
        title,
        sessions,
    })
}

/// Author-editable content of a protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolContent {
    /// Trimmed title.
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Length of the protocol in days.
    pub duration_days: u16,
    /// Validated plan.
    pub plan: ProtocolPlan,
}

impl ProtocolContent {
    /// Validate raw author input.
    ///
    /// # Errors
    /// Returns a [`ValidationError`] for the first invalid field.
    pub fn new(
        title: &str,
        description: Option<&str>,
        duration_days: u16,
        days: Vec<ProtocolDay>,
    ) -> Result<Self, ValidationError> {
        let title = bounded_text("title", title, TITLE_MAX)?;
        let description = optional_text("description", description, DESCRIPTION_MAX)?;
        if duration_days == 0 || duration_days > MAX_DURATION_DAYS {
            return Err(ValidationError::new(
                "durationDays",
                "out_of_range",
                format!("durationDays must be between 1 and {MAX_DURATION_DAYS}"),
            ));
        }
        let plan = ProtocolPlan::new(days, duration_days)?;
        Ok(Self {
            title,
            description,
            duration_days,
            plan,
        })
    }
}

/// A stored protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Protocol {
    /// Identifier.
    pub id: ProtocolId,
    /// Authoring doctor.
    pub doctor_id: UserId,
    /// Editable content.
    pub content: ProtocolContent,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last edit instant.
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    fn task(title: &str) -> ProtocolTask {
        ProtocolTask {
            id: TaskId::random(),
            title: title.to_owned(),
            kind: TaskKind::Action,
            instructions: None,
        }
    }

    fn day(day_number: u16, tasks: Vec<ProtocolTask>) -> ProtocolDay {
        ProtocolDay {
            day_number,
            title: None,
            sessions: vec![ProtocolSession {
                title: "Morning routine".to_owned(),
                time_of_day: TimeOfDay::Morning,
                tasks,
            }],
        }
    }

    #[fixture]
    fn two_day_plan() -> Vec<ProtocolDay> {
        vec![
            day(3, vec![task("Stretch")]),
            day(1, vec![task(" Drink water "), task("Walk")]),
        ]
    }

    #[rstest]
    fn sorts_days_and_trims_titles(two_day_plan: Vec<ProtocolDay>) {
        let plan = ProtocolPlan::new(two_day_plan, 3).expect("valid plan");
        let numbers: Vec<u16> = plan.days().iter().map(|d| d.day_number).collect();
        assert_eq!(numbers, vec![1, 3]);
        let first = plan.day(1).and_then(|d| d.tasks().next()).expect("task");
        assert_eq!(first.title, "Drink water");
    }

    #[rstest]
    fn rest_days_have_no_tasks(two_day_plan: Vec<ProtocolDay>) {
        let plan = ProtocolPlan::new(two_day_plan, 3).expect("valid plan");
        assert_eq!(plan.task_count_on(1), 2);
        assert_eq!(plan.task_count_on(2), 0);
        assert!(plan.day(2).is_none());
        assert_eq!(plan.total_tasks(), 3);
    }

    #[rstest]
    fn is_scheduled_checks_the_day(two_day_plan: Vec<ProtocolDay>) {
        let plan = ProtocolPlan::new(two_day_plan, 3).expect("valid plan");
        let stretch = plan
            .day(3)
            .and_then(|d| d.tasks().next())
            .map(|t| t.id)
            .expect("task");
        assert!(plan.is_scheduled(3, stretch));
        assert!(!plan.is_scheduled(1, stretch));
    }

    #[rstest]
    #[case(vec![day(0, vec![task("a")])], "day_out_of_range")]
    #[case(vec![day(4, vec![task("a")])], "day_out_of_range")]
    #[case(vec![day(1, vec![task("a")]), day(1, vec![task("b")])], "duplicate_day")]
    #[case(vec![day(1, Vec::new())], "empty_session")]
    #[case(Vec::new(), "empty_plan")]
    #[case(vec![day(1, vec![task("  ")])], "empty")]
    fn rejects_invalid_plans(#[case] days: Vec<ProtocolDay>, #[case] code: &str) {
        let err = ProtocolPlan::new(days, 3).expect_err("invalid plan");
        assert_eq!(err.code(), code);
    }

    #[rstest]
    fn rejects_duplicate_task_ids() {
        let shared = task("Shared");
        let days = vec![day(1, vec![shared.clone()]), day(2, vec![shared])];
        let err = ProtocolPlan::new(days, 2).expect_err("duplicate task");
        assert_eq!(err.code(), "duplicate_task");
    }

    #[rstest]
    #[case(0)]
    #[case(MAX_DURATION_DAYS + 1)]
    fn content_rejects_out_of_range_duration(#[case] duration: u16) {
        let err = ProtocolContent::new("Sleep reset", None, duration, vec![day(1, vec![task("a")])])
            .expect_err("invalid duration");
        assert_eq!(err.field(), "durationDays");
    }

    #[rstest]
    fn plan_json_uses_camel_case() {
        let value = serde_json::to_value(day(2, vec![task("Walk")])).expect("serialise day");
        assert_eq!(value["dayNumber"], 2);
        assert_eq!(value["sessions"][0]["timeOfDay"], "MORNING");
        assert_eq!(value["sessions"][0]["tasks"][0]["kind"], "ACTION");
    }
}
