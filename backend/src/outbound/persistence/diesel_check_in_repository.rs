//! PostgreSQL-backed `CheckInRepository`.

use async_trait::async_trait;
use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::ports::{CheckInRepository, RepositoryError};
use crate::domain::{CheckIn, CheckInId, CheckInQuestion, QuestionId, UserId};

use super::diesel_helpers::{corrupt_row, map_diesel_error};
use super::json_serializers::{answers_to_json, json_to_answers, json_to_kind, kind_to_json};
use super::models::{CheckInRow, QuestionRow};
use super::pool::DbPool;
use super::schema::{check_in_questions, check_ins};

/// Diesel implementation of [`CheckInRepository`].
#[derive(Clone)]
pub struct DieselCheckInRepository {
    pool: DbPool,
}

impl DieselCheckInRepository {
    /// Create a repository over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn question_to_row(question: &CheckInQuestion) -> Result<QuestionRow, RepositoryError> {
    Ok(QuestionRow {
        id: *question.id.as_uuid(),
        doctor_id: *question.doctor_id.as_uuid(),
        patient_id: question.patient_id.map(|id| *id.as_uuid()),
        prompt: question.prompt.clone(),
        kind: kind_to_json(question.kind)?,
        active: question.active,
        created_at: question.created_at,
    })
}

fn row_to_question(row: QuestionRow) -> Result<CheckInQuestion, RepositoryError> {
    if row.prompt.trim().is_empty() {
        return Err(corrupt_row("question prompt", "empty"));
    }
    Ok(CheckInQuestion {
        id: QuestionId::from_uuid(row.id),
        doctor_id: UserId::from_uuid(row.doctor_id),
        patient_id: row.patient_id.map(UserId::from_uuid),
        prompt: row.prompt,
        kind: json_to_kind(row.kind)?,
        active: row.active,
        created_at: row.created_at,
    })
}

fn row_to_check_in(row: CheckInRow) -> Result<CheckIn, RepositoryError> {
    Ok(CheckIn {
        id: CheckInId::from_uuid(row.id),
        patient_id: UserId::from_uuid(row.patient_id),
        date: row.check_in_date,
        answers: json_to_answers(row.answers)?,
        submitted_at: row.submitted_at,
    })
}

#[async_trait]
impl CheckInRepository for DieselCheckInRepository {
    async fn insert_question(&self, question: &CheckInQuestion) -> Result<(), RepositoryError> {
        let row = question_to_row(question)?;
        let mut conn = self.pool.get().await?;
        diesel::insert_into(check_in_questions::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn find_question(&self, id: QuestionId) -> Result<Option<CheckInQuestion>, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let row = check_in_questions::table
            .find(id.as_uuid())
            .select(QuestionRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_question).transpose()
    }

    async fn save_question(&self, question: &CheckInQuestion) -> Result<(), RepositoryError> {
        let row = question_to_row(question)?;
        let mut conn = self.pool.get().await?;
        diesel::update(check_in_questions::table.find(row.id))
            .set(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn questions_by_doctor(
        &self,
        doctor_id: UserId,
        patient_id: Option<UserId>,
    ) -> Result<Vec<CheckInQuestion>, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let mut query = check_in_questions::table
            .filter(check_in_questions::doctor_id.eq(*doctor_id.as_uuid()))
            .select(QuestionRow::as_select())
            .order((check_in_questions::created_at.asc(), check_in_questions::id.asc()))
            .into_boxed();
        if let Some(patient_id) = patient_id {
            query = query.filter(
                check_in_questions::patient_id
                    .is_null()
                    .or(check_in_questions::patient_id.eq(*patient_id.as_uuid())),
            );
        }
        let rows = query.load(&mut conn).await.map_err(map_diesel_error)?;
        rows.into_iter().map(row_to_question).collect()
    }

    async fn active_questions_for(
        &self,
        doctor_ids: &[UserId],
        patient_id: UserId,
    ) -> Result<Vec<CheckInQuestion>, RepositoryError> {
        let doctors: Vec<Uuid> = doctor_ids.iter().map(|id| *id.as_uuid()).collect();
        let mut conn = self.pool.get().await?;
        let rows = check_in_questions::table
            .filter(check_in_questions::doctor_id.eq_any(doctors))
            .filter(check_in_questions::active.eq(true))
            .filter(
                check_in_questions::patient_id
                    .is_null()
                    .or(check_in_questions::patient_id.eq(patient_id.as_uuid())),
            )
            .select(QuestionRow::as_select())
            .order((check_in_questions::created_at.asc(), check_in_questions::id.asc()))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter().map(row_to_question).collect()
    }

    async fn upsert_check_in(&self, check_in: &CheckIn) -> Result<CheckIn, RepositoryError> {
        let row = CheckInRow {
            id: *check_in.id.as_uuid(),
            patient_id: *check_in.patient_id.as_uuid(),
            check_in_date: check_in.date,
            answers: answers_to_json(&check_in.answers)?,
            submitted_at: check_in.submitted_at,
        };
        let mut conn = self.pool.get().await?;
        let stored = diesel::insert_into(check_ins::table)
            .values(&row)
            .on_conflict((check_ins::patient_id, check_ins::check_in_date))
            .do_update()
            .set((
                check_ins::answers.eq(excluded(check_ins::answers)),
                check_ins::submitted_at.eq(excluded(check_ins::submitted_at)),
            ))
            .returning(CheckInRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        row_to_check_in(stored)
    }

    async fn check_ins(
        &self,
        patient_id: UserId,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<CheckIn>, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let mut query = check_ins::table
            .filter(check_ins::patient_id.eq(*patient_id.as_uuid()))
            .select(CheckInRow::as_select())
            .order(check_ins::check_in_date.desc())
            .into_boxed();
        if let Some(from) = from {
            query = query.filter(check_ins::check_in_date.ge(from));
        }
        if let Some(to) = to {
            query = query.filter(check_ins::check_in_date.le(to));
        }
        let rows = query.load(&mut conn).await.map_err(map_diesel_error)?;
        rows.into_iter().map(row_to_check_in).collect()
    }
}
