//! Course authoring and enrolment handlers.
//!
//! ```text
//! POST   /api/v1/courses
//! GET    /api/v1/courses
//! PUT    /api/v1/courses/{id}
//! DELETE /api/v1/courses/{id}
//! POST   /api/v1/courses/{id}/publish
//! POST   /api/v1/courses/{id}/enrollments {"patientId":"…"}
//! GET    /api/v1/me/courses
//! PUT    /api/v1/courses/{id}/lessons/{lessonId}/completion {"completed":true}
//! ```

use actix_web::{HttpResponse, delete, get, post, put, web};
use chrono::{DateTime, Utc};
use pagination::{PageParams, Paginated};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ports::EnrolledCourse;
use crate::domain::{
    Course, CourseContent, CourseId, CourseModule, CourseProgress, Enrollment, Error,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::pagination::{page_request, paginated};
use crate::inbound::http::schemas::{CourseModuleSchema, ErrorSchema, PaginatedSchema};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_id};

/// Authored course content, used for create and replace.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseRequest {
    #[schema(example = "Living with type 2 diabetes")]
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    #[schema(value_type = Vec<CourseModuleSchema>)]
    pub modules: Vec<CourseModule>,
}

impl TryFrom<CourseRequest> for CourseContent {
    type Error = Error;

    fn try_from(value: CourseRequest) -> Result<Self, Self::Error> {
        Ok(Self::new(
            &value.title,
            value.description.as_deref(),
            value.modules,
        )?)
    }
}

/// A stored course.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseResponse {
    #[schema(format = "uuid")]
    pub id: String,
    #[schema(format = "uuid")]
    pub doctor_id: String,
    pub title: String,
    pub description: Option<String>,
    pub published: bool,
    #[schema(value_type = Vec<CourseModuleSchema>)]
    pub modules: Vec<CourseModule>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Course> for CourseResponse {
    fn from(value: Course) -> Self {
        Self {
            id: value.id.to_string(),
            doctor_id: value.doctor_id.to_string(),
            title: value.title,
            description: value.description,
            published: value.published,
            modules: value.outline.into_modules(),
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

/// Request body for enrolling a patient.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrollRequest {
    #[schema(format = "uuid")]
    pub patient_id: String,
}

/// An enrolment record.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentResponse {
    #[schema(format = "uuid")]
    pub course_id: String,
    #[schema(format = "uuid")]
    pub patient_id: String,
    #[schema(format = "uuid")]
    pub enrolled_by: String,
    pub completed_lessons: Vec<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub enrolled_at: DateTime<Utc>,
}

impl From<Enrollment> for EnrollmentResponse {
    fn from(value: Enrollment) -> Self {
        Self {
            course_id: value.course_id.to_string(),
            patient_id: value.patient_id.to_string(),
            enrolled_by: value.enrolled_by.to_string(),
            completed_lessons: value
                .completed_lessons
                .iter()
                .map(ToString::to_string)
                .collect(),
            completed_at: value.completed_at,
            enrolled_at: value.enrolled_at,
        }
    }
}

/// Lesson progress through a course.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseProgressResponse {
    pub completed_lessons: usize,
    pub total_lessons: usize,
    #[schema(maximum = 100)]
    pub percent: u8,
}

impl From<CourseProgress> for CourseProgressResponse {
    fn from(value: CourseProgress) -> Self {
        Self {
            completed_lessons: value.completed_lessons,
            total_lessons: value.total_lessons,
            percent: value.percent,
        }
    }
}

/// A course the caller is enrolled in.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrolledCourseResponse {
    pub course: CourseResponse,
    pub enrollment: EnrollmentResponse,
    pub progress: CourseProgressResponse,
}

impl From<EnrolledCourse> for EnrolledCourseResponse {
    fn from(value: EnrolledCourse) -> Self {
        Self {
            course: value.course.into(),
            enrollment: value.enrollment.into(),
            progress: value.progress.into(),
        }
    }
}

/// Request body for a lesson completion toggle.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct LessonCompletionRequest {
    pub completed: bool,
}

fn course_id(raw: &str) -> Result<CourseId, Error> {
    parse_id(raw, FieldName::new("id"))
}

/// Author a draft course.
#[utoipa::path(
    post,
    path = "/api/v1/courses",
    request_body = CourseRequest,
    responses(
        (status = 201, description = "Course created", body = CourseResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Not a doctor", body = ErrorSchema)
    ),
    tags = ["courses"],
    operation_id = "createCourse"
)]
#[post("/courses")]
pub async fn create_course(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CourseRequest>,
) -> ApiResult<HttpResponse> {
    let principal = session.require_principal()?;
    let content = CourseContent::try_from(payload.into_inner())?;
    let course = state.courses.create(principal, content).await?;
    Ok(HttpResponse::Created().json(CourseResponse::from(course)))
}

/// The calling doctor's courses.
#[utoipa::path(
    get,
    path = "/api/v1/courses",
    params(
        ("cursor" = Option<String>, Query, description = "Opaque cursor from a previous page"),
        ("limit" = Option<usize>, Query, description = "Page size, 1 to 100")
    ),
    responses(
        (status = 200, description = "Courses", body = PaginatedSchema<CourseResponse>),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Not a doctor", body = ErrorSchema)
    ),
    tags = ["courses"],
    operation_id = "listCourses"
)]
#[get("/courses")]
pub async fn list_courses(
    state: web::Data<HttpState>,
    session: SessionContext,
    page: web::Query<PageParams>,
) -> ApiResult<web::Json<Paginated<CourseResponse>>> {
    let principal = session.require_principal()?;
    let page = state
        .courses
        .list_mine(principal, page_request(&page)?)
        .await?;
    Ok(web::Json(paginated(page, CourseResponse::from)?))
}

/// Replace a course's content. Lessons keep their identifiers across edits.
#[utoipa::path(
    put,
    path = "/api/v1/courses/{id}",
    params(("id" = String, Path, description = "Course identifier")),
    request_body = CourseRequest,
    responses(
        (status = 200, description = "Course updated", body = CourseResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Not the author", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["courses"],
    operation_id = "updateCourse"
)]
#[put("/courses/{id}")]
pub async fn update_course(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<CourseRequest>,
) -> ApiResult<web::Json<CourseResponse>> {
    let principal = session.require_principal()?;
    let id = course_id(&path)?;
    let content = CourseContent::try_from(payload.into_inner())?;
    let course = state.courses.update(principal, id, content).await?;
    Ok(web::Json(course.into()))
}

/// Delete a course nobody is enrolled in.
#[utoipa::path(
    delete,
    path = "/api/v1/courses/{id}",
    params(("id" = String, Path, description = "Course identifier")),
    responses(
        (status = 204, description = "Course deleted"),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Not the author", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Course has enrolments", body = ErrorSchema)
    ),
    tags = ["courses"],
    operation_id = "deleteCourse"
)]
#[delete("/courses/{id}")]
pub async fn delete_course(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let principal = session.require_principal()?;
    state.courses.delete(principal, course_id(&path)?).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Open a course for enrolment.
#[utoipa::path(
    post,
    path = "/api/v1/courses/{id}/publish",
    params(("id" = String, Path, description = "Course identifier")),
    responses(
        (status = 200, description = "Course published", body = CourseResponse),
        (status = 400, description = "Course has no lessons", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Not the author", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["courses"],
    operation_id = "publishCourse"
)]
#[post("/courses/{id}/publish")]
pub async fn publish_course(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<CourseResponse>> {
    let principal = session.require_principal()?;
    let course = state.courses.publish(principal, course_id(&path)?).await?;
    Ok(web::Json(course.into()))
}

/// Enrol a linked patient in a published course.
#[utoipa::path(
    post,
    path = "/api/v1/courses/{id}/enrollments",
    params(("id" = String, Path, description = "Course identifier")),
    request_body = EnrollRequest,
    responses(
        (status = 201, description = "Patient enrolled", body = EnrollmentResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Not the author or patient not linked", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Unpublished or already enrolled", body = ErrorSchema)
    ),
    tags = ["courses"],
    operation_id = "enrollPatient"
)]
#[post("/courses/{id}/enrollments")]
pub async fn enroll_patient(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<EnrollRequest>,
) -> ApiResult<HttpResponse> {
    let principal = session.require_principal()?;
    let id = course_id(&path)?;
    let patient_id = parse_id(&payload.patient_id, FieldName::new("patientId"))?;
    let enrollment = state.courses.enroll(principal, id, patient_id).await?;
    Ok(HttpResponse::Created().json(EnrollmentResponse::from(enrollment)))
}

/// Courses the calling patient is enrolled in.
#[utoipa::path(
    get,
    path = "/api/v1/me/courses",
    responses(
        (status = 200, description = "Enrolled courses", body = [EnrolledCourseResponse]),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Not a patient", body = ErrorSchema)
    ),
    tags = ["courses"],
    operation_id = "myCourses"
)]
#[get("/me/courses")]
pub async fn my_courses(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Vec<EnrolledCourseResponse>>> {
    let principal = session.require_principal()?;
    let courses = state.courses.my_courses(principal).await?;
    Ok(web::Json(courses.into_iter().map(Into::into).collect()))
}

/// Mark a lesson completed or not.
#[utoipa::path(
    put,
    path = "/api/v1/courses/{id}/lessons/{lessonId}/completion",
    params(
        ("id" = String, Path, description = "Course identifier"),
        ("lessonId" = String, Path, description = "Lesson identifier")
    ),
    request_body = LessonCompletionRequest,
    responses(
        (status = 200, description = "Updated progress", body = EnrolledCourseResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Not a patient", body = ErrorSchema),
        (status = 404, description = "Not enrolled or unknown lesson", body = ErrorSchema)
    ),
    tags = ["courses"],
    operation_id = "setLessonCompletion"
)]
#[put("/courses/{id}/lessons/{lesson_id}/completion")]
pub async fn set_lesson_completion(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<(String, String)>,
    payload: web::Json<LessonCompletionRequest>,
) -> ApiResult<web::Json<EnrolledCourseResponse>> {
    let principal = session.require_principal()?;
    let (raw_course, raw_lesson) = path.into_inner();
    let id = course_id(&raw_course)?;
    let lesson_id = parse_id(&raw_lesson, FieldName::new("lessonId"))?;
    let enrolled = state
        .courses
        .set_lesson_completion(principal, id, lesson_id, payload.completed)
        .await?;
    Ok(web::Json(enrolled.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inbound::http::test_utils::{
        api_app, call_json, link_patient, memory_state, sign_up,
    };
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use serde_json::{Value, json};

    const FIRST_LESSON: &str = "4b1e6a52-2f0c-4c55-9a51-0c3f5e8e0a01";
    const SECOND_LESSON: &str = "4b1e6a52-2f0c-4c55-9a51-0c3f5e8e0a02";

    fn sample_course() -> Value {
        json!({
            "title": "Sleep basics",
            "modules": [{
                "id": "4b1e6a52-2f0c-4c55-9a51-0c3f5e8e0b01",
                "title": "Foundations",
                "lessons": [
                    { "id": FIRST_LESSON, "title": "Why sleep", "body": "Rest matters.", "durationMinutes": 5 },
                    { "id": SECOND_LESSON, "title": "Routines", "body": "Keep a schedule.", "durationMinutes": 8 }
                ]
            }]
        })
    }

    #[actix_web::test]
    async fn patients_work_through_published_courses() {
        let (_, _, state) = memory_state();
        let app = actix_test::init_service(api_app(state)).await;
        let (doctor, _) = sign_up(&app, "doc@example.com", "DOCTOR").await;
        let (patient, patient_id) = sign_up(&app, "pat@example.com", "PATIENT").await;
        link_patient(&app, &doctor, "pat@example.com").await;

        let (status, course) = call_json(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/courses")
                .cookie(doctor.clone())
                .set_json(sample_course())
                .to_request(),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(course["published"], false);
        let id = course["id"].as_str().expect("id").to_owned();

        let enroll = || {
            actix_test::TestRequest::post()
                .uri(&format!("/api/v1/courses/{id}/enrollments"))
                .cookie(doctor.clone())
                .set_json(json!({ "patientId": patient_id }))
                .to_request()
        };
        let (status, _) = call_json(&app, enroll()).await;
        assert_eq!(status, StatusCode::CONFLICT, "drafts take no enrolments");

        let (status, published) = call_json(
            &app,
            actix_test::TestRequest::post()
                .uri(&format!("/api/v1/courses/{id}/publish"))
                .cookie(doctor.clone())
                .to_request(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(published["published"], true);

        let (status, _) = call_json(&app, enroll()).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = call_json(&app, enroll()).await;
        assert_eq!(status, StatusCode::CONFLICT, "already enrolled");

        let (status, progress) = call_json(
            &app,
            actix_test::TestRequest::put()
                .uri(&format!("/api/v1/courses/{id}/lessons/{FIRST_LESSON}/completion"))
                .cookie(patient.clone())
                .set_json(json!({ "completed": true }))
                .to_request(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(progress["progress"]["percent"], 50);
        assert_eq!(progress["enrollment"]["completedAt"], Value::Null);

        let (status, mine) = call_json(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/me/courses")
                .cookie(patient)
                .to_request(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(mine[0]["course"]["title"], "Sleep basics");
        assert_eq!(mine[0]["progress"]["completedLessons"], 1);

        let (status, _) = call_json(
            &app,
            actix_test::TestRequest::delete()
                .uri(&format!("/api/v1/courses/{id}"))
                .cookie(doctor)
                .to_request(),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT, "enrolled courses stay");
    }

    #[actix_web::test]
    async fn unknown_lessons_are_not_found() {
        let (_, _, state) = memory_state();
        let app = actix_test::init_service(api_app(state)).await;
        let (patient, _) = sign_up(&app, "pat@example.com", "PATIENT").await;
        let (status, _) = call_json(
            &app,
            actix_test::TestRequest::put()
                .uri(&format!(
                    "/api/v1/courses/{FIRST_LESSON}/lessons/{SECOND_LESSON}/completion"
                ))
                .cookie(patient)
                .set_json(json!({ "completed": true }))
                .to_request(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
