//! Patient-owned habits and their daily logs.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use mockable::Clock;
use tracing::info;

use super::care_team_service::{ensure_patient_access, subject_patient};
use crate::domain::ports::{CareLinkRepository, HabitPatch, HabitRepository, Habits};
use crate::domain::{Error, Habit, HabitDetails, HabitId, HabitStats, Principal, UserId};

/// Habit service implementing [`Habits`].
#[derive(Clone)]
pub struct HabitService {
    habits: Arc<dyn HabitRepository>,
    links: Arc<dyn CareLinkRepository>,
    clock: Arc<dyn Clock>,
}

impl HabitService {
    /// Create the service.
    pub fn new(
        habits: Arc<dyn HabitRepository>,
        links: Arc<dyn CareLinkRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            habits,
            links,
            clock,
        }
    }

    async fn find(&self, id: HabitId) -> Result<Habit, Error> {
        self.habits
            .find(id)
            .await?
            .ok_or_else(|| Error::not_found("habit not found"))
    }

    async fn owned(&self, principal: Principal, id: HabitId) -> Result<Habit, Error> {
        principal.require_patient()?;
        let habit = self.find(id).await?;
        if habit.patient_id == principal.user_id {
            Ok(habit)
        } else {
            Err(Error::forbidden("habit belongs to another patient"))
        }
    }

    async fn stats_of(&self, habit: &Habit) -> Result<HabitStats, Error> {
        let logs = self.habits.logs(habit.id).await?;
        Ok(HabitStats::compute(
            habit.target_per_week,
            &logs,
            self.clock.utc().date_naive(),
        ))
    }
}

#[async_trait]
impl Habits for HabitService {
    async fn create(&self, principal: Principal, details: HabitDetails) -> Result<Habit, Error> {
        principal.require_patient()?;
        let habit = Habit::create(principal.user_id, details, self.clock.utc());
        self.habits.save(&habit).await?;
        info!(habit_id = %habit.id, patient_id = %habit.patient_id, "habit created");
        Ok(habit)
    }

    async fn update(
        &self,
        principal: Principal,
        id: HabitId,
        patch: HabitPatch,
    ) -> Result<Habit, Error> {
        let mut habit = self.owned(principal, id).await?;
        // A blank description clears it; an absent one keeps the current text.
        let description = patch.description.or_else(|| habit.description.clone());
        let details = HabitDetails::new(
            patch.name.as_deref().unwrap_or(&habit.name),
            description.as_deref(),
            patch.target_per_week.unwrap_or(habit.target_per_week),
        )?;
        habit.name = details.name;
        habit.description = details.description;
        habit.target_per_week = details.target_per_week;
        self.habits.save(&habit).await?;
        Ok(habit)
    }

    async fn archive(&self, principal: Principal, id: HabitId) -> Result<Habit, Error> {
        let mut habit = self.owned(principal, id).await?;
        if !habit.archived {
            habit.archived = true;
            self.habits.save(&habit).await?;
            info!(habit_id = %id, "habit archived");
        }
        Ok(habit)
    }

    async fn list(
        &self,
        principal: Principal,
        patient_id: Option<UserId>,
        include_archived: bool,
    ) -> Result<Vec<Habit>, Error> {
        let patient_id = subject_patient(principal, patient_id)?;
        ensure_patient_access(self.links.as_ref(), principal, patient_id).await?;
        Ok(self.habits.list(patient_id, include_archived).await?)
    }

    async fn set_progress(
        &self,
        principal: Principal,
        id: HabitId,
        date: NaiveDate,
        done: bool,
    ) -> Result<HabitStats, Error> {
        let habit = self.owned(principal, id).await?;
        if habit.archived {
            return Err(Error::conflict("archived habits cannot record progress"));
        }
        habit.check_progress_date(date, self.clock.utc().date_naive())?;
        self.habits.set_log(id, date, done).await?;
        self.stats_of(&habit).await
    }

    async fn stats(&self, principal: Principal, id: HabitId) -> Result<HabitStats, Error> {
        let habit = self.find(id).await?;
        ensure_patient_access(self.links.as_ref(), principal, habit.patient_id).await?;
        self.stats_of(&habit).await
    }
}
