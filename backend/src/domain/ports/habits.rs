//! Driving port for patient habits.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::{Error, Habit, HabitDetails, HabitId, HabitStats, Principal, UserId};

/// Partial update of a habit's fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HabitPatch {
    /// New name.
    pub name: Option<String>,
    /// New description; a blank value clears it.
    pub description: Option<String>,
    /// New weekly target.
    pub target_per_week: Option<u8>,
}

/// Habit use-cases.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Habits: Send + Sync {
    /// Start tracking a habit.
    async fn create(&self, principal: Principal, details: HabitDetails) -> Result<Habit, Error>;

    /// Change a habit's fields.
    async fn update(&self, principal: Principal, id: HabitId, patch: HabitPatch)
    -> Result<Habit, Error>;

    /// Stop tracking a habit while keeping its history.
    async fn archive(&self, principal: Principal, id: HabitId) -> Result<Habit, Error>;

    /// Habits of the caller, or of a linked patient for doctors.
    async fn list(
        &self,
        principal: Principal,
        patient_id: Option<UserId>,
        include_archived: bool,
    ) -> Result<Vec<Habit>, Error>;

    /// Mark a date done or not done and return the refreshed statistics.
    async fn set_progress(
        &self,
        principal: Principal,
        id: HabitId,
        date: NaiveDate,
        done: bool,
    ) -> Result<HabitStats, Error>;

    /// Streak and frequency statistics.
    async fn stats(&self, principal: Principal, id: HabitId) -> Result<HabitStats, Error>;
}
