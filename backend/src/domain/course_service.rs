//! Course authoring, enrolment and lesson progress.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::info;

use super::care_team_service::ensure_linked;
use super::validation::ValidationError;
use crate::domain::ports::{CareLinkRepository, CourseRepository, Courses, EnrolledCourse};
use crate::domain::{
    Course, CourseContent, CourseId, Enrollment, Error, LessonId, Page, PageRequest, Principal,
    UserId,
};

fn no_lessons() -> Error {
    ValidationError::new(
        "modules",
        "no_lessons",
        "a published course needs at least one lesson",
    )
    .into()
}

/// Course service implementing [`Courses`].
#[derive(Clone)]
pub struct CourseService {
    courses: Arc<dyn CourseRepository>,
    links: Arc<dyn CareLinkRepository>,
    clock: Arc<dyn Clock>,
}

impl CourseService {
    /// Create the service.
    pub fn new(
        courses: Arc<dyn CourseRepository>,
        links: Arc<dyn CareLinkRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            courses,
            links,
            clock,
        }
    }

    async fn find(&self, id: CourseId) -> Result<Course, Error> {
        self.courses
            .find(id)
            .await?
            .ok_or_else(|| Error::not_found("course not found"))
    }

    async fn authored(&self, principal: Principal, id: CourseId) -> Result<Course, Error> {
        principal.require_doctor()?;
        let course = self.find(id).await?;
        if course.doctor_id == principal.user_id {
            Ok(course)
        } else {
            Err(Error::forbidden("course belongs to another doctor"))
        }
    }
}

#[async_trait]
impl Courses for CourseService {
    async fn create(&self, principal: Principal, content: CourseContent) -> Result<Course, Error> {
        principal.require_doctor()?;
        let now = self.clock.utc();
        let course = Course {
            id: CourseId::random(),
            doctor_id: principal.user_id,
            title: content.title,
            description: content.description,
            published: false,
            outline: content.outline,
            created_at: now,
            updated_at: now,
        };
        self.courses.save(&course).await?;
        info!(course_id = %course.id, doctor_id = %course.doctor_id, "course created");
        Ok(course)
    }

    async fn update(
        &self,
        principal: Principal,
        id: CourseId,
        content: CourseContent,
    ) -> Result<Course, Error> {
        let mut course = self.authored(principal, id).await?;
        if course.published && content.outline.lessons().next().is_none() {
            return Err(no_lessons());
        }
        course.title = content.title;
        course.description = content.description;
        course.outline = content.outline;
        course.updated_at = self.clock.utc();
        self.courses.save(&course).await?;
        Ok(course)
    }

    async fn publish(&self, principal: Principal, id: CourseId) -> Result<Course, Error> {
        let mut course = self.authored(principal, id).await?;
        if course.published {
            return Ok(course);
        }
        if course.outline.lessons().next().is_none() {
            return Err(no_lessons());
        }
        course.published = true;
        course.updated_at = self.clock.utc();
        self.courses.save(&course).await?;
        info!(course_id = %id, "course published");
        Ok(course)
    }

    async fn delete(&self, principal: Principal, id: CourseId) -> Result<(), Error> {
        self.authored(principal, id).await?;
        let enrollments = self.courses.count_enrollments(id).await?;
        if enrollments > 0 {
            return Err(Error::conflict("course has enrolled patients")
                .with_details(json!({ "code": "course_enrolled", "enrollments": enrollments })));
        }
        if self.courses.delete(id).await? {
            info!(course_id = %id, "course deleted");
            Ok(())
        } else {
            Err(Error::not_found("course not found"))
        }
    }

    async fn list_mine(&self, principal: Principal, page: PageRequest) -> Result<Page<Course>, Error> {
        principal.require_doctor()?;
        Ok(self.courses.list_for_doctor(principal.user_id, page).await?)
    }

    async fn enroll(
        &self,
        principal: Principal,
        course_id: CourseId,
        patient_id: UserId,
    ) -> Result<Enrollment, Error> {
        let course = self.authored(principal, course_id).await?;
        if !course.published {
            return Err(Error::conflict("only published courses accept enrolments")
                .with_details(json!({ "code": "course_unpublished" })));
        }
        ensure_linked(self.links.as_ref(), principal.user_id, patient_id).await?;
        if self
            .courses
            .find_enrollment(course_id, patient_id)
            .await?
            .is_some()
        {
            return Err(Error::conflict("patient is already enrolled"));
        }
        let enrollment = Enrollment {
            course_id,
            patient_id,
            enrolled_by: principal.user_id,
            completed_lessons: Vec::new(),
            completed_at: None,
            enrolled_at: self.clock.utc(),
        };
        self.courses.insert_enrollment(&enrollment).await?;
        info!(%course_id, %patient_id, "patient enrolled");
        Ok(enrollment)
    }

    async fn my_courses(&self, principal: Principal) -> Result<Vec<EnrolledCourse>, Error> {
        principal.require_patient()?;
        Ok(self
            .courses
            .enrollments_for_patient(principal.user_id)
            .await?
            .into_iter()
            .map(|(course, enrollment)| EnrolledCourse::new(course, enrollment))
            .collect())
    }

    async fn set_lesson_completion(
        &self,
        principal: Principal,
        course_id: CourseId,
        lesson_id: LessonId,
        completed: bool,
    ) -> Result<EnrolledCourse, Error> {
        principal.require_patient()?;
        let mut enrollment = self
            .courses
            .find_enrollment(course_id, principal.user_id)
            .await?
            .ok_or_else(|| Error::not_found("not enrolled in this course"))?;
        let course = self.find(course_id).await?;
        if !course.outline.contains_lesson(lesson_id) {
            return Err(Error::not_found("lesson not found"));
        }
        enrollment.set_lesson(&course.outline, lesson_id, completed, self.clock.utc());
        self.courses.save_enrollment(&enrollment).await?;
        Ok(EnrolledCourse::new(course, enrollment))
    }
}

#[cfg(test)]
#[path = "course_service_tests.rs"]
mod tests;
