//! PostgreSQL-backed `HabitRepository`.

use async_trait::async_trait;
use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{HabitRepository, RepositoryError};
use crate::domain::{Habit, HabitId, UserId};

use super::diesel_helpers::{corrupt_row, map_diesel_error};
use super::models::{HabitRow, NewHabitLogRow};
use super::pool::DbPool;
use super::schema::{habit_logs, habits};

/// Diesel implementation of [`HabitRepository`].
#[derive(Clone)]
pub struct DieselHabitRepository {
    pool: DbPool,
}

impl DieselHabitRepository {
    /// Create a repository over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_habit(row: HabitRow) -> Result<Habit, RepositoryError> {
    let target_per_week = u8::try_from(row.target_per_week)
        .ok()
        .filter(|target| (1..=7).contains(target))
        .ok_or_else(|| corrupt_row("weekly target", row.target_per_week))?;
    Ok(Habit {
        id: HabitId::from_uuid(row.id),
        patient_id: UserId::from_uuid(row.patient_id),
        name: row.name,
        description: row.description,
        target_per_week,
        archived: row.archived,
        created_at: row.created_at,
    })
}

#[async_trait]
impl HabitRepository for DieselHabitRepository {
    async fn save(&self, habit: &Habit) -> Result<(), RepositoryError> {
        let row = HabitRow {
            id: *habit.id.as_uuid(),
            patient_id: *habit.patient_id.as_uuid(),
            name: habit.name.clone(),
            description: habit.description.clone(),
            target_per_week: i16::from(habit.target_per_week),
            archived: habit.archived,
            created_at: habit.created_at,
        };
        let mut conn = self.pool.get().await?;
        diesel::insert_into(habits::table)
            .values(&row)
            .on_conflict(habits::id)
            .do_update()
            .set((
                habits::name.eq(excluded(habits::name)),
                habits::description.eq(excluded(habits::description)),
                habits::target_per_week.eq(excluded(habits::target_per_week)),
                habits::archived.eq(excluded(habits::archived)),
            ))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn find(&self, id: HabitId) -> Result<Option<Habit>, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let row = habits::table
            .find(id.as_uuid())
            .select(HabitRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_habit).transpose()
    }

    async fn list(&self, patient_id: UserId, include_archived: bool) -> Result<Vec<Habit>, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let mut query = habits::table
            .filter(habits::patient_id.eq(*patient_id.as_uuid()))
            .select(HabitRow::as_select())
            .order((habits::created_at.asc(), habits::id.asc()))
            .into_boxed();
        if !include_archived {
            query = query.filter(habits::archived.eq(false));
        }
        let rows = query.load(&mut conn).await.map_err(map_diesel_error)?;
        rows.into_iter().map(row_to_habit).collect()
    }

    async fn set_log(&self, habit_id: HabitId, date: NaiveDate, done: bool) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await?;
        let outcome = if done {
            diesel::insert_into(habit_logs::table)
                .values(&NewHabitLogRow {
                    habit_id: *habit_id.as_uuid(),
                    log_date: date,
                })
                .on_conflict_do_nothing()
                .execute(&mut conn)
                .await
        } else {
            diesel::delete(
                habit_logs::table
                    .filter(habit_logs::habit_id.eq(habit_id.as_uuid()))
                    .filter(habit_logs::log_date.eq(date)),
            )
            .execute(&mut conn)
            .await
        };
        outcome.map(|_| ()).map_err(map_diesel_error)
    }

    async fn logs(&self, habit_id: HabitId) -> Result<Vec<NaiveDate>, RepositoryError> {
        let mut conn = self.pool.get().await?;
        habit_logs::table
            .filter(habit_logs::habit_id.eq(habit_id.as_uuid()))
            .select(habit_logs::log_date)
            .order(habit_logs::log_date.asc())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)
    }
}
