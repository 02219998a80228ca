//! Port for habits and their daily logs.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::{Habit, HabitId, UserId};

use super::RepositoryError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HabitRepository: Send + Sync {
    /// Insert or replace a habit.
    async fn save(&self, habit: &Habit) -> Result<(), RepositoryError>;

    /// Fetch a habit.
    async fn find(&self, id: HabitId) -> Result<Option<Habit>, RepositoryError>;

    /// A patient's habits, oldest first.
    async fn list(
        &self,
        patient_id: UserId,
        include_archived: bool,
    ) -> Result<Vec<Habit>, RepositoryError>;

    /// Mark `date` done or not done. Repeating either is a no-op.
    async fn set_log(&self, habit_id: HabitId, date: NaiveDate, done: bool)
    -> Result<(), RepositoryError>;

    /// Every logged date, ascending.
    async fn logs(&self, habit_id: HabitId) -> Result<Vec<NaiveDate>, RepositoryError>;
}
