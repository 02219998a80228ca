//! PostgreSQL-backed `PrescriptionRepository`.
//!
//! The partial unique index `prescriptions_running_key` backs the
//! one-running-run-per-protocol rule; violations surface as conflicts.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{PrescriptionRepository, ProtocolUsage, RepositoryError};
use crate::domain::{
    Page, PageKey, PageRequest, Prescription, PrescriptionFilter, PrescriptionId,
    PrescriptionStatus, ProtocolId, TaskCompletion, TaskId, UserId,
};

use super::diesel_helpers::{corrupt_row, day_from_db, day_to_db, fetch_limit, map_diesel_error};
use super::models::{PrescriptionRow, TaskCompletionRow};
use super::pool::DbPool;
use super::schema::{prescriptions, task_completions};

const RUNNING: [&str; 2] = [
    PrescriptionStatus::Active.as_str(),
    PrescriptionStatus::Paused.as_str(),
];

/// Diesel implementation of [`PrescriptionRepository`].
#[derive(Clone)]
pub struct DieselPrescriptionRepository {
    pool: DbPool,
}

impl DieselPrescriptionRepository {
    /// Create a repository over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn prescription_to_row(prescription: &Prescription) -> Result<PrescriptionRow, RepositoryError> {
    let paused_days = i32::try_from(prescription.paused_days)
        .map_err(|_| RepositoryError::query("paused days exceed the column range"))?;
    Ok(PrescriptionRow {
        id: *prescription.id.as_uuid(),
        protocol_id: *prescription.protocol_id.as_uuid(),
        doctor_id: *prescription.doctor_id.as_uuid(),
        patient_id: *prescription.patient_id.as_uuid(),
        status: prescription.status.as_str().to_owned(),
        notes: prescription.notes.clone(),
        prescribed_at: prescription.prescribed_at,
        start_date: prescription.start_date,
        paused_on: prescription.paused_on,
        paused_days,
        ended_at: prescription.ended_at,
        updated_at: prescription.updated_at,
    })
}

fn row_to_prescription(row: PrescriptionRow) -> Result<Prescription, RepositoryError> {
    Ok(Prescription {
        id: PrescriptionId::from_uuid(row.id),
        protocol_id: ProtocolId::from_uuid(row.protocol_id),
        doctor_id: UserId::from_uuid(row.doctor_id),
        patient_id: UserId::from_uuid(row.patient_id),
        status: row
            .status
            .parse()
            .map_err(|err| corrupt_row("prescription status", err))?,
        notes: row.notes,
        prescribed_at: row.prescribed_at,
        start_date: row.start_date,
        paused_on: row.paused_on,
        paused_days: u32::try_from(row.paused_days)
            .map_err(|_| corrupt_row("paused days", row.paused_days))?,
        ended_at: row.ended_at,
        updated_at: row.updated_at,
    })
}

fn row_to_completion(row: TaskCompletionRow) -> Result<TaskCompletion, RepositoryError> {
    Ok(TaskCompletion {
        prescription_id: PrescriptionId::from_uuid(row.prescription_id),
        day_number: day_from_db("completion day", row.day_number)?,
        task_id: TaskId::from_uuid(row.task_id),
        completed_at: row.completed_at,
    })
}

fn count_to_u64(count: i64) -> u64 {
    u64::try_from(count).unwrap_or(0)
}

#[async_trait]
impl PrescriptionRepository for DieselPrescriptionRepository {
    async fn insert(&self, prescription: &Prescription) -> Result<(), RepositoryError> {
        let row = prescription_to_row(prescription)?;
        let mut conn = self.pool.get().await?;
        diesel::insert_into(prescriptions::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn update(&self, prescription: &Prescription) -> Result<(), RepositoryError> {
        let row = prescription_to_row(prescription)?;
        let mut conn = self.pool.get().await?;
        let updated = diesel::update(prescriptions::table.find(row.id))
            .set(&row)
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        if updated == 0 {
            return Err(RepositoryError::query("prescription vanished during update"));
        }
        Ok(())
    }

    async fn find(&self, id: PrescriptionId) -> Result<Option<Prescription>, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let row = prescriptions::table
            .find(id.as_uuid())
            .select(PrescriptionRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_prescription).transpose()
    }

    async fn list(
        &self,
        filter: &PrescriptionFilter,
        page: PageRequest,
    ) -> Result<Page<Prescription>, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let mut query = prescriptions::table
            .select(PrescriptionRow::as_select())
            .order((prescriptions::prescribed_at.desc(), prescriptions::id.desc()))
            .limit(fetch_limit(&page))
            .into_boxed();
        if let Some(doctor_id) = filter.doctor_id {
            query = query.filter(prescriptions::doctor_id.eq(*doctor_id.as_uuid()));
        }
        if let Some(patient_id) = filter.patient_id {
            query = query.filter(prescriptions::patient_id.eq(*patient_id.as_uuid()));
        }
        if let Some(status) = filter.status {
            query = query.filter(prescriptions::status.eq(status.as_str()));
        }
        if let Some(after) = page.after {
            query = query.filter(
                prescriptions::prescribed_at
                    .lt(after.created_at)
                    .or(prescriptions::prescribed_at
                        .eq(after.created_at)
                        .and(prescriptions::id.lt(after.id))),
            );
        }
        let rows = query.load(&mut conn).await.map_err(map_diesel_error)?;
        let items = rows
            .into_iter()
            .map(row_to_prescription)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::from_overfetch(items, &page, |prescription| {
            PageKey::new(prescription.prescribed_at, *prescription.id.as_uuid())
        }))
    }

    async fn has_running(
        &self,
        patient_id: UserId,
        protocol_id: ProtocolId,
    ) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.get().await?;
        diesel::select(diesel::dsl::exists(
            prescriptions::table
                .filter(prescriptions::patient_id.eq(patient_id.as_uuid()))
                .filter(prescriptions::protocol_id.eq(protocol_id.as_uuid()))
                .filter(prescriptions::status.eq_any(RUNNING)),
        ))
        .get_result(&mut conn)
        .await
        .map_err(map_diesel_error)
    }

    async fn patient_holds(
        &self,
        patient_id: UserId,
        protocol_id: ProtocolId,
    ) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.get().await?;
        diesel::select(diesel::dsl::exists(
            prescriptions::table
                .filter(prescriptions::patient_id.eq(patient_id.as_uuid()))
                .filter(prescriptions::protocol_id.eq(protocol_id.as_uuid())),
        ))
        .get_result(&mut conn)
        .await
        .map_err(map_diesel_error)
    }

    async fn protocol_usage(&self, protocol_id: ProtocolId) -> Result<ProtocolUsage, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let total: i64 = prescriptions::table
            .filter(prescriptions::protocol_id.eq(protocol_id.as_uuid()))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        let running: i64 = prescriptions::table
            .filter(prescriptions::protocol_id.eq(protocol_id.as_uuid()))
            .filter(prescriptions::status.eq_any(RUNNING))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(ProtocolUsage {
            total: count_to_u64(total),
            running: count_to_u64(running),
        })
    }

    async fn upsert_completion(&self, completion: &TaskCompletion) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await?;
        let row = TaskCompletionRow {
            prescription_id: *completion.prescription_id.as_uuid(),
            day_number: day_to_db(completion.day_number),
            task_id: *completion.task_id.as_uuid(),
            completed_at: completion.completed_at,
        };
        diesel::insert_into(task_completions::table)
            .values(&row)
            .on_conflict((
                task_completions::prescription_id,
                task_completions::day_number,
                task_completions::task_id,
            ))
            .do_nothing()
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn delete_completion(
        &self,
        prescription_id: PrescriptionId,
        day_number: u16,
        task_id: TaskId,
    ) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await?;
        diesel::delete(
            task_completions::table
                .filter(task_completions::prescription_id.eq(prescription_id.as_uuid()))
                .filter(task_completions::day_number.eq(day_to_db(day_number)))
                .filter(task_completions::task_id.eq(task_id.as_uuid())),
        )
        .execute(&mut conn)
        .await
        .map(|_| ())
        .map_err(map_diesel_error)
    }

    async fn completions(
        &self,
        prescription_id: PrescriptionId,
    ) -> Result<Vec<TaskCompletion>, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let rows = task_completions::table
            .filter(task_completions::prescription_id.eq(prescription_id.as_uuid()))
            .select(TaskCompletionRow::as_select())
            .order((task_completions::day_number.asc(), task_completions::completed_at.asc()))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter().map(row_to_completion).collect()
    }
}
