//! PostgreSQL-backed `CourseRepository`.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{CourseRepository, RepositoryError};
use crate::domain::{Course, CourseId, Enrollment, LessonId, Page, PageKey, PageRequest, UserId};

use super::diesel_helpers::{corrupt_row, fetch_limit, map_diesel_error, touched};
use super::json_serializers::{json_to_outline, outline_to_json};
use super::models::{CourseRow, EnrollmentRow};
use super::pool::DbPool;
use super::schema::{course_enrollments, courses};

/// Diesel implementation of [`CourseRepository`].
#[derive(Clone)]
pub struct DieselCourseRepository {
    pool: DbPool,
}

impl DieselCourseRepository {
    /// Create a repository over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_course(row: CourseRow) -> Result<Course, RepositoryError> {
    if row.title.trim().is_empty() {
        return Err(corrupt_row("course title", "empty"));
    }
    Ok(Course {
        id: CourseId::from_uuid(row.id),
        doctor_id: UserId::from_uuid(row.doctor_id),
        title: row.title,
        description: row.description,
        published: row.published,
        outline: json_to_outline(row.outline)?,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn enrollment_to_row(enrollment: &Enrollment) -> EnrollmentRow {
    EnrollmentRow {
        course_id: *enrollment.course_id.as_uuid(),
        patient_id: *enrollment.patient_id.as_uuid(),
        enrolled_by: *enrollment.enrolled_by.as_uuid(),
        completed_lessons: enrollment
            .completed_lessons
            .iter()
            .map(|id| *id.as_uuid())
            .collect(),
        completed_at: enrollment.completed_at,
        enrolled_at: enrollment.enrolled_at,
    }
}

fn row_to_enrollment(row: EnrollmentRow) -> Enrollment {
    Enrollment {
        course_id: CourseId::from_uuid(row.course_id),
        patient_id: UserId::from_uuid(row.patient_id),
        enrolled_by: UserId::from_uuid(row.enrolled_by),
        completed_lessons: row
            .completed_lessons
            .into_iter()
            .map(LessonId::from_uuid)
            .collect(),
        completed_at: row.completed_at,
        enrolled_at: row.enrolled_at,
    }
}

#[async_trait]
impl CourseRepository for DieselCourseRepository {
    async fn save(&self, course: &Course) -> Result<(), RepositoryError> {
        let row = CourseRow {
            id: *course.id.as_uuid(),
            doctor_id: *course.doctor_id.as_uuid(),
            title: course.title.clone(),
            description: course.description.clone(),
            published: course.published,
            outline: outline_to_json(&course.outline)?,
            created_at: course.created_at,
            updated_at: course.updated_at,
        };
        let mut conn = self.pool.get().await?;
        diesel::insert_into(courses::table)
            .values(&row)
            .on_conflict(courses::id)
            .do_update()
            .set((
                courses::title.eq(excluded(courses::title)),
                courses::description.eq(excluded(courses::description)),
                courses::published.eq(excluded(courses::published)),
                courses::outline.eq(excluded(courses::outline)),
                courses::updated_at.eq(excluded(courses::updated_at)),
            ))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn find(&self, id: CourseId) -> Result<Option<Course>, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let row = courses::table
            .find(id.as_uuid())
            .select(CourseRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_course).transpose()
    }

    async fn delete(&self, id: CourseId) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.get().await?;
        diesel::delete(courses::table.find(id.as_uuid()))
            .execute(&mut conn)
            .await
            .map(touched)
            .map_err(map_diesel_error)
    }

    async fn list_for_doctor(
        &self,
        doctor_id: UserId,
        page: PageRequest,
    ) -> Result<Page<Course>, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let mut query = courses::table
            .filter(courses::doctor_id.eq(*doctor_id.as_uuid()))
            .select(CourseRow::as_select())
            .order((courses::created_at.desc(), courses::id.desc()))
            .limit(fetch_limit(&page))
            .into_boxed();
        if let Some(after) = page.after {
            query = query.filter(
                courses::created_at.lt(after.created_at).or(courses::created_at
                    .eq(after.created_at)
                    .and(courses::id.lt(after.id))),
            );
        }
        let rows = query.load(&mut conn).await.map_err(map_diesel_error)?;
        let items = rows
            .into_iter()
            .map(row_to_course)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::from_overfetch(items, &page, |course| {
            PageKey::new(course.created_at, *course.id.as_uuid())
        }))
    }

    async fn insert_enrollment(&self, enrollment: &Enrollment) -> Result<(), RepositoryError> {
        let row = enrollment_to_row(enrollment);
        let mut conn = self.pool.get().await?;
        diesel::insert_into(course_enrollments::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn find_enrollment(
        &self,
        course_id: CourseId,
        patient_id: UserId,
    ) -> Result<Option<Enrollment>, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let row = course_enrollments::table
            .find((course_id.as_uuid(), patient_id.as_uuid()))
            .select(EnrollmentRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(row_to_enrollment))
    }

    async fn save_enrollment(&self, enrollment: &Enrollment) -> Result<(), RepositoryError> {
        let row = enrollment_to_row(enrollment);
        let mut conn = self.pool.get().await?;
        diesel::update(course_enrollments::table.find((row.course_id, row.patient_id)))
            .set((
                course_enrollments::completed_lessons.eq(&row.completed_lessons),
                course_enrollments::completed_at.eq(row.completed_at),
            ))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn count_enrollments(&self, course_id: CourseId) -> Result<u64, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let count: i64 = course_enrollments::table
            .filter(course_enrollments::course_id.eq(course_id.as_uuid()))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn enrollments_for_patient(
        &self,
        patient_id: UserId,
    ) -> Result<Vec<(Course, Enrollment)>, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let rows: Vec<(CourseRow, EnrollmentRow)> = course_enrollments::table
            .inner_join(courses::table)
            .filter(course_enrollments::patient_id.eq(patient_id.as_uuid()))
            .select((CourseRow::as_select(), EnrollmentRow::as_select()))
            .order(course_enrollments::enrolled_at.desc())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter()
            .map(|(course, enrollment)| Ok((row_to_course(course)?, row_to_enrollment(enrollment))))
            .collect()
    }
}
