//! Domain primitives, aggregates and use-case services.
//!
//! Purpose: hold every business rule of the care platform behind strongly
//! typed values. Adapters reach the domain through the traits in [`ports`]
//! and never the other way round.
//!
//! Public surface:
//! - `Error` / `ErrorCode`: the uniform failure payload.
//! - Aggregates: users, care links, protocols, prescriptions, check-ins,
//!   habits, courses, referrals, subscriptions and clinics.
//! - `*Service` types implementing the driving ports.

pub mod auth;
pub mod care_team;
pub mod check_in;
pub mod clinic;
pub mod course;
pub mod error;
pub mod habit;
pub mod ids;
pub mod paging;
pub mod ports;
pub mod prescription;
pub mod progress;
pub mod protocol;
pub mod referral;
pub mod subscription;
pub mod trace_id;
pub mod user;
pub mod validation;

mod account_service;
mod care_team_service;
mod check_in_service;
mod clinic_service;
mod course_service;
mod habit_service;
mod prescription_service;
mod protocol_service;
mod referral_service;
mod subscription_service;
#[cfg(test)]
mod test_fixtures;

pub use self::account_service::AccountService;
pub use self::auth::{LoginCredentials, Password, PasswordHash, Registration};
pub use self::care_team::{CareLink, LinkedUser};
pub use self::care_team_service::CareTeamService;
pub use self::check_in::{
    Answer, AnswerValue, CheckIn, CheckInQuestion, QuestionKind, validate_answers,
};
pub use self::check_in_service::CheckInService;
pub use self::clinic::{Clinic, ClinicMember, ClinicMembership, ClinicRole, MembershipRuleError};
pub use self::clinic_service::ClinicService;
pub use self::course::{
    Course, CourseContent, CourseModule, CourseOutline, CourseProgress, Enrollment, Lesson,
};
pub use self::course_service::CourseService;
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::habit::{Habit, HabitDetails, HabitStats};
pub use self::habit_service::HabitService;
pub use self::ids::{
    CheckInId, ClinicId, CourseId, HabitId, LessonId, ModuleId, PrescriptionId, ProtocolId,
    QuestionId, ReferralId, TaskId, UserId,
};
pub use self::paging::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, Page, PageKey, PageRequest};
pub use self::prescription::{
    Prescription, PrescriptionFilter, PrescriptionStatus, SchedulePosition, TaskCompletion,
    TransitionActor, TransitionError, is_transition_allowed,
};
pub use self::prescription_service::PrescriptionService;
pub use self::progress::{DayProgress, PrescriptionProgress};
pub use self::protocol::{
    Protocol, ProtocolContent, ProtocolDay, ProtocolPlan, ProtocolSession, ProtocolTask, TaskKind,
    TimeOfDay,
};
pub use self::protocol_service::ProtocolService;
pub use self::referral::{
    Referral, ReferralDraft, ReferralFilter, ReferralStatus, ReferralTransitionError,
};
pub use self::referral_service::ReferralService;
pub use self::subscription::{Plan, Subscription, SubscriptionChangeError, SubscriptionStatus};
pub use self::subscription_service::SubscriptionService;
pub use self::trace_id::TraceId;
pub use self::user::{DisplayName, EmailAddress, Principal, Role, User};
pub use self::validation::ValidationError;

/// Convenient use-case result alias.
///
/// # Examples
/// ```
/// use careplan::domain::{ApiResult, Error};
///
/// fn guard(allowed: bool) -> ApiResult<()> {
///     if allowed { Ok(()) } else { Err(Error::forbidden("nope")) }
/// }
/// assert!(guard(false).is_err());
/// ```
pub type ApiResult<T> = Result<T, Error>;
