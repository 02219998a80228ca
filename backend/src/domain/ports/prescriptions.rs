//! Driving port for prescriptions, completions and progress.

use async_trait::async_trait;

use crate::domain::{
    Error, Page, PageRequest, Prescription, PrescriptionId, PrescriptionProgress,
    PrescriptionStatus, Principal, ProtocolId, ProtocolTask, TaskCompletion, TaskId, TimeOfDay,
    UserId,
};

/// A doctor's request to prescribe a protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrescribeRequest {
    /// Protocol to run.
    pub protocol_id: ProtocolId,
    /// Patient who runs it.
    pub patient_id: UserId,
    /// Notes for the patient.
    pub notes: Option<String>,
}

/// Filters accepted when listing prescriptions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrescriptionQuery {
    /// Restrict to one patient.
    pub patient_id: Option<UserId>,
    /// Restrict to one status.
    pub status: Option<PrescriptionStatus>,
}

/// Ticking a task on or off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionUpdate {
    /// One-based day.
    pub day_number: u16,
    /// Task on that day.
    pub task_id: TaskId,
    /// `true` records, `false` clears.
    pub completed: bool,
}

/// A task on today's plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodayTask {
    /// The scheduled task.
    pub task: ProtocolTask,
    /// Whether it is ticked off for the day.
    pub completed: bool,
}

/// A session on today's plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodaySession {
    /// Session heading.
    pub title: String,
    /// Preferred time of day.
    pub time_of_day: TimeOfDay,
    /// Tasks in display order.
    pub tasks: Vec<TodayTask>,
}

/// What the patient should do on the current day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodayPlan {
    /// Prescription.
    pub prescription_id: PrescriptionId,
    /// Current day, `0` before activation.
    pub day_number: u16,
    /// Optional heading of the day.
    pub title: Option<String>,
    /// Sessions, empty on rest days.
    pub sessions: Vec<TodaySession>,
}

impl TodayPlan {
    /// Whether nothing is scheduled.
    #[must_use]
    pub fn is_rest_day(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Prescription use-cases.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Prescriptions: Send + Sync {
    /// Prescribe a protocol to a linked patient.
    async fn prescribe(
        &self,
        principal: Principal,
        request: PrescribeRequest,
    ) -> Result<Prescription, Error>;

    /// Read a prescription as its doctor, its patient or an operator.
    async fn get(&self, principal: Principal, id: PrescriptionId) -> Result<Prescription, Error>;

    /// Prescriptions visible to the caller.
    async fn list(
        &self,
        principal: Principal,
        query: PrescriptionQuery,
        page: PageRequest,
    ) -> Result<Page<Prescription>, Error>;

    /// Move a prescription to another status.
    async fn transition(
        &self,
        principal: Principal,
        id: PrescriptionId,
        to: PrescriptionStatus,
    ) -> Result<Prescription, Error>;

    /// Adherence and streak metrics.
    async fn progress(
        &self,
        principal: Principal,
        id: PrescriptionId,
    ) -> Result<PrescriptionProgress, Error>;

    /// Tasks of the current day with their completion flags.
    async fn today(&self, principal: Principal, id: PrescriptionId) -> Result<TodayPlan, Error>;

    /// Every recorded completion.
    async fn completions(
        &self,
        principal: Principal,
        id: PrescriptionId,
    ) -> Result<Vec<TaskCompletion>, Error>;

    /// Tick a task on or off and return the refreshed progress.
    async fn record_completion(
        &self,
        principal: Principal,
        id: PrescriptionId,
        update: CompletionUpdate,
    ) -> Result<PrescriptionProgress, Error>;
}
