//! Prescriptions: a patient's run of a protocol and its status lifecycle.
//!
//! Every status change goes through [`Prescription::transition`], which
//! consults a single transition table and applies the date bookkeeping that
//! the progress model relies on.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::validation::ValidationError;
use super::{PrescriptionId, ProtocolId, TaskId, UserId};

/// Lifecycle status of a prescription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrescriptionStatus {
    /// Assigned by the doctor, not yet started.
    Prescribed,
    /// Running.
    Active,
    /// Temporarily halted; the schedule is frozen.
    Paused,
    /// Finished.
    Completed,
    /// Given up before finishing.
    Abandoned,
}

impl PrescriptionStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::Prescribed,
        Self::Active,
        Self::Paused,
        Self::Completed,
        Self::Abandoned,
    ];

    /// Storage and wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Prescribed => "PRESCRIBED",
            Self::Active => "ACTIVE",
            Self::Paused => "PAUSED",
            Self::Completed => "COMPLETED",
            Self::Abandoned => "ABANDONED",
        }
    }

    /// Whether no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Abandoned)
    }

    /// Whether the prescription has started and not yet ended.
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Active | Self::Paused)
    }
}

impl fmt::Display for PrescriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrescriptionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                ValidationError::new("status", "unknown_status", format!("unknown status {s}"))
            })
    }
}

/// Which side of the care relationship requests a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionActor {
    /// The patient running the prescription.
    Patient,
    /// The prescribing doctor.
    Doctor,
}

/// Who may perform a permitted transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Permitted {
    PatientOnly,
    Either,
}

const fn permitted(from: PrescriptionStatus, to: PrescriptionStatus) -> Option<Permitted> {
    use PrescriptionStatus::{Abandoned, Active, Completed, Paused, Prescribed};
    match (from, to) {
        (Prescribed, Active) => Some(Permitted::PatientOnly),
        (Active, Paused)
        | (Paused, Active)
        | (Active | Paused, Completed)
        | (Prescribed | Active | Paused, Abandoned) => Some(Permitted::Either),
        _ => None,
    }
}

/// Whether the lifecycle allows moving from `from` to `to` at all.
#[must_use]
pub const fn is_transition_allowed(from: PrescriptionStatus, to: PrescriptionStatus) -> bool {
    permitted(from, to).is_some()
}

/// Rejected transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// The lifecycle has no edge between the two statuses.
    #[error("cannot move prescription from {from} to {to}")]
    NotAllowed {
        /// Current status.
        from: PrescriptionStatus,
        /// Requested status.
        to: PrescriptionStatus,
    },
    /// The edge exists but only the patient may take it.
    #[error("only the patient may move a prescription to {to}")]
    PatientOnly {
        /// Requested status.
        to: PrescriptionStatus,
    },
}

/// A patient's run of a protocol.
///
/// ## Invariants
/// - `start_date` is set once the prescription has been activated.
/// - `paused_on` is set exactly while the status is `PAUSED`.
/// - `paused_days` counts whole days spent paused in completed pauses.
/// - `ended_at` is set exactly when the status is terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prescription {
    /// Identifier.
    pub id: PrescriptionId,
    /// Protocol being run.
    pub protocol_id: ProtocolId,
    /// Prescribing doctor.
    pub doctor_id: UserId,
    /// Patient running the protocol.
    pub patient_id: UserId,
    /// Lifecycle status.
    pub status: PrescriptionStatus,
    /// Doctor's notes for the patient.
    pub notes: Option<String>,
    /// When the doctor prescribed it.
    pub prescribed_at: DateTime<Utc>,
    /// Day one of the schedule.
    pub start_date: Option<NaiveDate>,
    /// Date of the current pause.
    pub paused_on: Option<NaiveDate>,
    /// Days spent paused in completed pauses.
    pub paused_days: u32,
    /// When it was completed or abandoned.
    pub ended_at: Option<DateTime<Utc>>,
    /// Last modification instant.
    pub updated_at: DateTime<Utc>,
}

impl Prescription {
    /// Create a freshly prescribed run.
    #[must_use]
    pub const fn prescribe(
        id: PrescriptionId,
        protocol_id: ProtocolId,
        doctor_id: UserId,
        patient_id: UserId,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            protocol_id,
            doctor_id,
            patient_id,
            status: PrescriptionStatus::Prescribed,
            notes,
            prescribed_at: now,
            start_date: None,
            paused_on: None,
            paused_days: 0,
            ended_at: None,
            updated_at: now,
        }
    }

    /// Apply a status transition requested by `actor` at `now`.
    ///
    /// # Errors
    /// Returns [`TransitionError`] when the lifecycle forbids the move or the
    /// actor may not take it.
    ///
    /// # Examples
    /// ```
    /// use careplan::domain::{
    ///     Prescription, PrescriptionId, PrescriptionStatus, ProtocolId, TransitionActor, UserId,
    /// };
    /// use chrono::Utc;
    ///
    /// let now = Utc::now();
    /// let prescribed = Prescription::prescribe(
    ///     PrescriptionId::random(),
    ///     ProtocolId::random(),
    ///     UserId::random(),
    ///     UserId::random(),
    ///     None,
    ///     now,
    /// );
    /// let active = prescribed
    ///     .transition(PrescriptionStatus::Active, TransitionActor::Patient, now)
    ///     .unwrap();
    /// assert_eq!(active.start_date, Some(now.date_naive()));
    /// ```
    pub fn transition(
        &self,
        to: PrescriptionStatus,
        actor: TransitionActor,
        now: DateTime<Utc>,
    ) -> Result<Self, TransitionError> {
        let from = self.status;
        match permitted(from, to) {
            None => return Err(TransitionError::NotAllowed { from, to }),
            Some(Permitted::PatientOnly) if actor != TransitionActor::Patient => {
                return Err(TransitionError::PatientOnly { to });
            }
            Some(_) => {}
        }

        let today = now.date_naive();
        let mut next = self.clone();
        next.status = to;
        next.updated_at = now;
        match to {
            PrescriptionStatus::Active if from == PrescriptionStatus::Prescribed => {
                next.start_date = Some(today);
            }
            PrescriptionStatus::Active => next.close_pause(today),
            PrescriptionStatus::Paused => next.paused_on = Some(today),
            PrescriptionStatus::Completed | PrescriptionStatus::Abandoned => {
                next.close_pause(today);
                next.ended_at = Some(now);
            }
            PrescriptionStatus::Prescribed => {}
        }
        Ok(next)
    }

    fn close_pause(&mut self, today: NaiveDate) {
        if let Some(paused_on) = self.paused_on.take() {
            let days = (today - paused_on).num_days().max(0);
            let days = u32::try_from(days).unwrap_or(u32::MAX);
            self.paused_days = self.paused_days.saturating_add(days);
        }
    }

    /// Date the schedule is measured against, or `None` before activation.
    ///
    /// Active runs use `today`; paused runs freeze at the pause date; ended
    /// runs freeze at the end date.
    #[must_use]
    pub fn reference_date(&self, today: NaiveDate) -> Option<NaiveDate> {
        self.start_date?;
        match self.status {
            PrescriptionStatus::Prescribed => None,
            PrescriptionStatus::Active => Some(today),
            PrescriptionStatus::Paused => self.paused_on.or(Some(today)),
            PrescriptionStatus::Completed | PrescriptionStatus::Abandoned => self
                .ended_at
                .map(|ended| ended.date_naive())
                .or(Some(today)),
        }
    }

    /// Position within a protocol of `duration_days`, or `None` before
    /// activation.
    #[must_use]
    pub fn schedule_position(&self, duration_days: u16, today: NaiveDate) -> Option<SchedulePosition> {
        let start = self.start_date?;
        let reference = self.reference_date(today)?;
        let elapsed = (reference - start).num_days() - i64::from(self.paused_days);
        let day = elapsed.max(0).saturating_add(1);
        let duration = i64::from(duration_days.max(1));
        let current_day = u16::try_from(day.min(duration)).unwrap_or(duration_days);
        Some(SchedulePosition {
            current_day,
            overdue: day > duration,
        })
    }
}

/// Where a running prescription sits in its protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulePosition {
    /// One-based current day, clamped to the protocol duration.
    pub current_day: u16,
    /// Whether the schedule has run past its last day.
    pub overdue: bool,
}

/// A task ticked off on a given day of a prescription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskCompletion {
    /// Prescription the completion belongs to.
    pub prescription_id: PrescriptionId,
    /// One-based day number.
    pub day_number: u16,
    /// Completed task.
    pub task_id: TaskId,
    /// When the patient ticked it off.
    pub completed_at: DateTime<Utc>,
}

/// Filter applied when listing prescriptions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrescriptionFilter {
    /// Restrict to a prescribing doctor.
    pub doctor_id: Option<UserId>,
    /// Restrict to a patient.
    pub patient_id: Option<UserId>,
    /// Restrict to a status.
    pub status: Option<PrescriptionStatus>,
}

#[cfg(test)]
#[path = "prescription_tests.rs"]
mod tests;
