//! Driving port for courses and enrolments.

use async_trait::async_trait;

use crate::domain::{
    Course, CourseContent, CourseId, CourseProgress, Enrollment, Error, LessonId, Page,
    PageRequest, Principal, UserId,
};

/// An enrolment with its course and progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrolledCourse {
    /// Course.
    pub course: Course,
    /// Enrolment record.
    pub enrollment: Enrollment,
    /// Lesson progress.
    pub progress: CourseProgress,
}

impl EnrolledCourse {
    /// Bundle an enrolment with its computed progress.
    #[must_use]
    pub fn new(course: Course, enrollment: Enrollment) -> Self {
        let progress = CourseProgress::compute(&course.outline, &enrollment.completed_lessons);
        Self {
            course,
            enrollment,
            progress,
        }
    }
}

/// Course use-cases.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Courses: Send + Sync {
    /// Author a draft course.
    async fn create(&self, principal: Principal, content: CourseContent) -> Result<Course, Error>;

    /// Replace a course's content.
    async fn update(
        &self,
        principal: Principal,
        id: CourseId,
        content: CourseContent,
    ) -> Result<Course, Error>;

    /// Make a course available for enrolment.
    async fn publish(&self, principal: Principal, id: CourseId) -> Result<Course, Error>;

    /// Delete a course nobody is enrolled in.
    async fn delete(&self, principal: Principal, id: CourseId) -> Result<(), Error>;

    /// The calling doctor's courses.
    async fn list_mine(&self, principal: Principal, page: PageRequest)
    -> Result<Page<Course>, Error>;

    /// Enrol a linked patient in a published course.
    async fn enroll(
        &self,
        principal: Principal,
        course_id: CourseId,
        patient_id: UserId,
    ) -> Result<Enrollment, Error>;

    /// The calling patient's courses with progress.
    async fn my_courses(&self, principal: Principal) -> Result<Vec<EnrolledCourse>, Error>;

    /// Mark a lesson completed or not.
    async fn set_lesson_completion(
        &self,
        principal: Principal,
        course_id: CourseId,
        lesson_id: LessonId,
        completed: bool,
    ) -> Result<EnrolledCourse, Error>;
}
