//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] aggregates every annotated handler under `inbound::http` with
//! the schema wrappers from [`crate::inbound::http::schemas`], so domain
//! types stay free of utoipa derives. The document backs Swagger UI in debug
//! builds and is exported by the `openapi-dump` binary.

use crate::inbound::http::schemas::{
    AnswerSchema, ClinicRoleSchema, CourseModuleSchema, ErrorCodeSchema, ErrorSchema,
    LessonSchema, PlanSchema, PrescriptionStatusSchema, ProtocolDaySchema,
    ProtocolSessionSchema, ProtocolTaskSchema, QuestionKindSchema, ReferralStatusSchema,
    RoleSchema, SubscriptionStatusSchema, TaskKindSchema, TimeOfDaySchema,
};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Enrich the generated document with the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie issued by POST /api/v1/auth/login.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "CarePlan API",
        description = "Care protocols, prescriptions, check-ins, habits and courses for doctors and their patients."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::auth::register,
        crate::inbound::http::auth::login,
        crate::inbound::http::auth::logout,
        crate::inbound::http::users::current_user,
        crate::inbound::http::users::list_users,
        crate::inbound::http::care_team::link_patient,
        crate::inbound::http::care_team::list_patients,
        crate::inbound::http::care_team::unlink_patient,
        crate::inbound::http::care_team::list_doctors,
        crate::inbound::http::protocols::create_protocol,
        crate::inbound::http::protocols::list_protocols,
        crate::inbound::http::protocols::get_protocol,
        crate::inbound::http::protocols::update_protocol,
        crate::inbound::http::protocols::delete_protocol,
        crate::inbound::http::prescriptions::prescribe,
        crate::inbound::http::prescriptions::list_prescriptions,
        crate::inbound::http::prescriptions::get_prescription,
        crate::inbound::http::prescriptions::transition_prescription,
        crate::inbound::http::prescriptions::prescription_progress,
        crate::inbound::http::prescriptions::prescription_today,
        crate::inbound::http::prescriptions::list_completions,
        crate::inbound::http::prescriptions::record_completion,
        crate::inbound::http::check_ins::create_question,
        crate::inbound::http::check_ins::list_questions,
        crate::inbound::http::check_ins::deactivate_question,
        crate::inbound::http::check_ins::my_questions,
        crate::inbound::http::check_ins::submit_check_in,
        crate::inbound::http::check_ins::check_in_history,
        crate::inbound::http::habits::create_habit,
        crate::inbound::http::habits::list_habits,
        crate::inbound::http::habits::update_habit,
        crate::inbound::http::habits::archive_habit,
        crate::inbound::http::habits::set_habit_progress,
        crate::inbound::http::habits::habit_stats,
        crate::inbound::http::courses::create_course,
        crate::inbound::http::courses::list_courses,
        crate::inbound::http::courses::update_course,
        crate::inbound::http::courses::delete_course,
        crate::inbound::http::courses::publish_course,
        crate::inbound::http::courses::enroll_patient,
        crate::inbound::http::courses::my_courses,
        crate::inbound::http::courses::set_lesson_completion,
        crate::inbound::http::referrals::create_referral,
        crate::inbound::http::referrals::list_my_referrals,
        crate::inbound::http::referrals::list_all_referrals,
        crate::inbound::http::referrals::update_referral_status,
        crate::inbound::http::subscriptions::my_subscription,
        crate::inbound::http::subscriptions::change_plan,
        crate::inbound::http::subscriptions::cancel_subscription,
        crate::inbound::http::subscriptions::set_subscription_status,
        crate::inbound::http::clinics::create_clinic,
        crate::inbound::http::clinics::list_clinics,
        crate::inbound::http::clinics::list_members,
        crate::inbound::http::clinics::add_member,
        crate::inbound::http::clinics::change_role,
        crate::inbound::http::clinics::remove_member,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        ErrorSchema,
        ErrorCodeSchema,
        RoleSchema,
        TimeOfDaySchema,
        TaskKindSchema,
        ProtocolTaskSchema,
        ProtocolSessionSchema,
        ProtocolDaySchema,
        PrescriptionStatusSchema,
        QuestionKindSchema,
        AnswerSchema,
        LessonSchema,
        CourseModuleSchema,
        ReferralStatusSchema,
        PlanSchema,
        SubscriptionStatusSchema,
        ClinicRoleSchema,
    )),
    tags(
        (name = "auth", description = "Registration and sessions"),
        (name = "users", description = "The signed-in account"),
        (name = "admin", description = "Operator-only endpoints"),
        (name = "care-team", description = "Doctor and patient links"),
        (name = "protocols", description = "Doctor-authored care protocols"),
        (name = "prescriptions", description = "Protocol runs and daily progress"),
        (name = "check-ins", description = "Daily questions and answers"),
        (name = "habits", description = "Patient habit tracking"),
        (name = "courses", description = "Educational courses and enrolments"),
        (name = "referrals", description = "Referral leads"),
        (name = "subscriptions", description = "Doctor plans and billing status"),
        (name = "clinics", description = "Clinics and their member doctors"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    //! Field-level checks on the generated document. Path coverage is also
    //! exercised by the snapshot in `backend/tests/openapi_snapshot.rs`.

    use super::*;
    use rstest::rstest;
    use utoipa::OpenApi;
    use utoipa::openapi::RefOr;
    use utoipa::openapi::schema::Schema;

    // utoipa replaces :: with . in schema names
    const ERROR_SCHEMA_NAME: &str = "crate.domain.Error";

    fn assert_object_schema_has_field(schema: &RefOr<Schema>, field: &str) {
        match schema {
            RefOr::T(Schema::Object(obj)) => {
                assert!(
                    obj.properties.contains_key(field),
                    "schema should have field '{field}'"
                );
            }
            _ => panic!("expected Object schema"),
        }
    }

    #[rstest]
    fn error_schema_has_required_fields() {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().expect("components").schemas;
        let error_schema = schemas.get(ERROR_SCHEMA_NAME).expect("Error schema");

        assert_object_schema_has_field(error_schema, "code");
        assert_object_schema_has_field(error_schema, "message");
    }

    #[rstest]
    #[case("/api/v1/auth/register")]
    #[case("/api/v1/care-team/patients/{patientId}")]
    #[case("/api/v1/prescriptions/{id}/completions")]
    #[case("/api/v1/check-ins")]
    #[case("/api/v1/habits/{id}/progress/{date}")]
    #[case("/api/v1/courses/{id}/lessons/{lessonId}/completion")]
    #[case("/api/v1/admin/referrals/{id}/status")]
    #[case("/api/v1/admin/subscriptions/{doctorId}/status")]
    #[case("/api/v1/clinics/{id}/members/{doctorId}")]
    #[case("/health/ready")]
    fn documents_path(#[case] path: &str) {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key(path), "missing {path}");
    }

    #[rstest]
    fn session_cookie_scheme_is_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("SessionCookie"));
    }
}
