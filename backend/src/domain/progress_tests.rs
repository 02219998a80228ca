//! Progress model tests.

use super::*;
use crate::domain::{
    PrescriptionId, PrescriptionStatus, ProtocolDay, ProtocolId, ProtocolSession, ProtocolTask,
    TaskKind, TimeOfDay, TransitionActor, UserId,
};
use chrono::{DateTime, TimeZone, Utc};
use rstest::{fixture, rstest};

struct Scenario {
    plan: ProtocolPlan,
    tasks: Vec<Vec<TaskId>>,
    prescription: Prescription,
}

const DURATION: u16 = 5;

fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, 8, 30, 0)
        .single()
        .expect("valid fixture instant")
}

fn day_with(day_number: u16, count: usize) -> (ProtocolDay, Vec<TaskId>) {
    let tasks: Vec<ProtocolTask> = (0..count)
        .map(|index| ProtocolTask {
            id: TaskId::random(),
            title: format!("Task {index}"),
            kind: TaskKind::Exercise,
            instructions: None,
        })
        .collect();
    let ids = tasks.iter().map(|task| task.id).collect();
    let day = ProtocolDay {
        day_number,
        title: None,
        sessions: vec![ProtocolSession {
            title: "Session".to_owned(),
            time_of_day: TimeOfDay::Anytime,
            tasks,
        }],
    };
    (day, ids)
}

/// Day 1: two tasks, day 2: one, day 3: rest, days 4 and 5: one each.
#[fixture]
fn scenario() -> Scenario {
    let mut days = Vec::new();
    let mut tasks = vec![Vec::new()];
    for (day_number, count) in [(1, 2), (2, 1), (4, 1), (5, 1)] {
        let (day, ids) = day_with(day_number, count);
        days.push(day);
        while tasks.len() < usize::from(day_number) {
            tasks.push(Vec::new());
        }
        tasks.push(ids);
    }
    let plan = ProtocolPlan::new(days, DURATION).expect("valid plan");
    let prescription = Prescription::prescribe(
        PrescriptionId::random(),
        ProtocolId::random(),
        UserId::random(),
        UserId::random(),
        None,
        at(1),
    )
    .transition(PrescriptionStatus::Active, TransitionActor::Patient, at(1))
    .expect("activate");
    Scenario {
        plan,
        tasks,
        prescription,
    }
}

impl Scenario {
    fn task(&self, day: u16, index: usize) -> TaskId {
        *self
            .tasks
            .get(usize::from(day))
            .and_then(|ids| ids.get(index))
            .expect("task exists in fixture")
    }

    fn completion(&self, day: u16, index: usize) -> TaskCompletion {
        TaskCompletion {
            prescription_id: self.prescription.id,
            day_number: day,
            task_id: self.task(day, index),
            completed_at: at(1),
        }
    }

    fn progress(&self, completions: &[TaskCompletion], today: u32) -> PrescriptionProgress {
        PrescriptionProgress::compute(
            &self.plan,
            DURATION,
            &self.prescription,
            completions,
            at(today).date_naive(),
        )
    }
}

#[rstest]
fn not_started_prescription_has_zero_metrics(scenario: Scenario) {
    let prescribed = Prescription::prescribe(
        PrescriptionId::random(),
        ProtocolId::random(),
        UserId::random(),
        UserId::random(),
        None,
        at(1),
    );
    let progress =
        PrescriptionProgress::compute(&scenario.plan, DURATION, &prescribed, &[], at(3).date_naive());
    assert_eq!(progress.current_day, 0);
    assert_eq!(progress.days_remaining, DURATION);
    assert_eq!(progress.adherence_percent, 0);
    assert!(progress.days.is_empty());
}

#[rstest]
fn counts_expected_tasks_up_to_current_day(scenario: Scenario) {
    let progress = scenario.progress(&[], 4);
    assert_eq!(progress.current_day, 4);
    assert_eq!(progress.expected_tasks, 4);
    assert_eq!(progress.completed_tasks, 0);
    assert_eq!(progress.days_remaining, 1);
    assert_eq!(progress.days.len(), 4);
}

#[rstest]
fn adherence_is_floored_percentage(scenario: Scenario) {
    let completions = vec![scenario.completion(1, 0), scenario.completion(2, 0)];
    let progress = scenario.progress(&completions, 2);
    assert_eq!(progress.expected_tasks, 3);
    assert_eq!(progress.completed_tasks, 2);
    assert_eq!(progress.adherence_percent, 66);
}

#[rstest]
fn ignores_future_and_unscheduled_completions(scenario: Scenario) {
    let mut misplaced = scenario.completion(1, 0);
    misplaced.day_number = 2;
    let completions = vec![scenario.completion(5, 0), misplaced];
    let progress = scenario.progress(&completions, 2);
    assert_eq!(progress.completed_tasks, 0);
}

#[rstest]
fn duplicate_completions_count_once(scenario: Scenario) {
    let completions = vec![scenario.completion(2, 0), scenario.completion(2, 0)];
    let progress = scenario.progress(&completions, 2);
    assert_eq!(progress.completed_tasks, 1);
}

#[rstest]
fn rest_days_do_not_break_streaks(scenario: Scenario) {
    let completions = vec![
        scenario.completion(1, 0),
        scenario.completion(1, 1),
        scenario.completion(2, 0),
        scenario.completion(4, 0),
    ];
    let progress = scenario.progress(&completions, 4);
    assert_eq!(progress.current_streak, 3);
    assert_eq!(progress.longest_streak, 3);
    assert_eq!(progress.adherence_percent, 100);
}

#[rstest]
fn unfinished_current_day_keeps_running_streak(scenario: Scenario) {
    let completions = vec![scenario.completion(1, 0), scenario.completion(1, 1)];
    let progress = scenario.progress(&completions, 2);
    assert_eq!(progress.current_streak, 1);
}

#[rstest]
fn missed_day_breaks_current_streak(scenario: Scenario) {
    let completions = vec![
        scenario.completion(1, 0),
        scenario.completion(1, 1),
        scenario.completion(4, 0),
        scenario.completion(5, 0),
    ];
    let progress = scenario.progress(&completions, 5);
    assert_eq!(progress.current_streak, 2);
    assert_eq!(progress.longest_streak, 2);
}

#[rstest]
fn partially_completed_day_is_not_fulfilled(scenario: Scenario) {
    let completions = vec![scenario.completion(1, 0), scenario.completion(2, 0)];
    let progress = scenario.progress(&completions, 3);
    assert_eq!(progress.current_streak, 1);
    let first = progress.days.first().expect("day one");
    assert!(!first.is_fulfilled());
    let rest = progress.days.get(2).expect("day three");
    assert!(rest.is_rest_day());
}

#[rstest]
fn overdue_runs_clamp_to_last_day(scenario: Scenario) {
    let progress = scenario.progress(&[], 20);
    assert_eq!(progress.current_day, DURATION);
    assert!(progress.overdue);
    assert_eq!(progress.days_remaining, 0);
    assert_eq!(progress.expected_tasks, 5);
}

#[rstest]
fn completed_never_exceeds_expected(scenario: Scenario) {
    let completions: Vec<TaskCompletion> = [(1, 0), (1, 1), (2, 0), (4, 0), (5, 0)]
        .into_iter()
        .map(|(day, index)| scenario.completion(day, index))
        .collect();
    for today in 1..=10 {
        let progress = scenario.progress(&completions, today);
        assert!(progress.completed_tasks <= progress.expected_tasks);
        assert!(progress.adherence_percent <= 100);
    }
}

#[rstest]
#[case(PrescriptionStatus::Completed)]
#[case(PrescriptionStatus::Abandoned)]
fn ended_runs_freeze_at_their_end_date(
    mut scenario: Scenario,
    #[case] end: PrescriptionStatus,
) {
    scenario.prescription = scenario
        .prescription
        .transition(end, TransitionActor::Patient, at(4))
        .expect("end the run");
    let completions = vec![
        scenario.completion(1, 0),
        scenario.completion(1, 1),
        scenario.completion(2, 0),
    ];

    let frozen = scenario.progress(&completions, 20);
    assert_eq!(frozen.current_day, 4);
    assert!(!frozen.overdue);
    assert_eq!(frozen.days_remaining, 1);
    assert_eq!(frozen.expected_tasks, 4);
    assert_eq!(frozen.completed_tasks, 3);
    assert_eq!(frozen.adherence_percent, 75);
    assert_eq!(frozen, scenario.progress(&completions, 4));
}
