//! Port for courses and enrolments.

use async_trait::async_trait;

use crate::domain::{Course, CourseId, Enrollment, Page, PageRequest, UserId};

use super::RepositoryError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Insert or replace a course.
    async fn save(&self, course: &Course) -> Result<(), RepositoryError>;

    /// Fetch a course.
    async fn find(&self, id: CourseId) -> Result<Option<Course>, RepositoryError>;

    /// Delete a course, reporting whether it existed.
    async fn delete(&self, id: CourseId) -> Result<bool, RepositoryError>;

    /// Courses authored by a doctor, newest first.
    async fn list_for_doctor(
        &self,
        doctor_id: UserId,
        page: PageRequest,
    ) -> Result<Page<Course>, RepositoryError>;

    /// Store an enrolment; [`RepositoryError::Conflict`] when it exists.
    async fn insert_enrollment(&self, enrollment: &Enrollment) -> Result<(), RepositoryError>;

    /// Fetch a patient's enrolment in a course.
    async fn find_enrollment(
        &self,
        course_id: CourseId,
        patient_id: UserId,
    ) -> Result<Option<Enrollment>, RepositoryError>;

    /// Persist lesson progress.
    async fn save_enrollment(&self, enrollment: &Enrollment) -> Result<(), RepositoryError>;

    /// Number of enrolments in a course.
    async fn count_enrollments(&self, course_id: CourseId) -> Result<u64, RepositoryError>;

    /// A patient's enrolments with their courses, most recent first.
    async fn enrollments_for_patient(
        &self,
        patient_id: UserId,
    ) -> Result<Vec<(Course, Enrollment)>, RepositoryError>;
}
