//! Diesel row structs for the careplan tables.
//!
//! Rows mirror columns one to one and never leave the persistence layer.
//! Repositories convert them to domain values, validating on the way in.

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::schema::{
    care_links, check_in_questions, check_ins, clinic_memberships, clinics, course_enrollments,
    courses, habit_logs, habits, prescriptions, protocols, referrals, subscriptions,
    task_completions, users,
};

// ---------------------------------------------------------------------------
// Accounts and care links
// ---------------------------------------------------------------------------

/// Account row without the password hash.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CredentialsRow {
    #[diesel(embed)]
    pub user: UserRow,
    pub password_hash: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub id: Uuid,
    pub email: &'a str,
    pub display_name: &'a str,
    pub role: &'a str,
    pub password_hash: &'a str,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = care_links)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CareLinkRow {
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Protocols and prescriptions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = protocols)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub(crate) struct ProtocolRow {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub duration_days: i32,
    pub plan: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = prescriptions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub(crate) struct PrescriptionRow {
    pub id: Uuid,
    pub protocol_id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub status: String,
    pub notes: Option<String>,
    pub prescribed_at: DateTime<Utc>,
    pub start_date: Option<NaiveDate>,
    pub paused_on: Option<NaiveDate>,
    pub paused_days: i32,
    pub ended_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = task_completions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct TaskCompletionRow {
    pub prescription_id: Uuid,
    pub day_number: i32,
    pub task_id: Uuid,
    pub completed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Check-ins and habits
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = check_in_questions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub(crate) struct QuestionRow {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Option<Uuid>,
    pub prompt: String,
    pub kind: serde_json::Value,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = check_ins)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CheckInRow {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub check_in_date: NaiveDate,
    pub answers: serde_json::Value,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = habits)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub(crate) struct HabitRow {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub target_per_week: i16,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = habit_logs)]
pub(crate) struct NewHabitLogRow {
    pub habit_id: Uuid,
    pub log_date: NaiveDate,
}

// ---------------------------------------------------------------------------
// Courses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = courses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub(crate) struct CourseRow {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub published: bool,
    pub outline: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = course_enrollments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct EnrollmentRow {
    pub course_id: Uuid,
    pub patient_id: Uuid,
    pub enrolled_by: Uuid,
    pub completed_lessons: Vec<Uuid>,
    pub completed_at: Option<DateTime<Utc>>,
    pub enrolled_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Referrals, subscriptions and clinics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = referrals)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub(crate) struct ReferralRow {
    pub id: Uuid,
    pub referrer_id: Uuid,
    pub target_role: String,
    pub referee_name: String,
    pub referee_email: String,
    pub referee_phone: Option<String>,
    pub notes: Option<String>,
    pub status: String,
    pub converted_user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = subscriptions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct SubscriptionRow {
    pub doctor_id: Uuid,
    pub plan: String,
    pub status: String,
    pub current_period_end: NaiveDate,
    pub cancel_at_period_end: bool,
    pub trial_used: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = clinics)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ClinicRow {
    pub id: Uuid,
    pub name: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = clinic_memberships)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct MembershipRow {
    pub clinic_id: Uuid,
    pub doctor_id: Uuid,
    pub role: String,
    pub joined_at: DateTime<Utc>,
}
