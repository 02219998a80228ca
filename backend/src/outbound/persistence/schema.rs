//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. Regenerate with
//! `diesel print-schema` after changing a migration, then restore the
//! non-null array element type on `course_enrollments.completed_lessons`.

diesel::table! {
    /// Registered accounts. `email` is unique and stored normalised.
    users (id) {
        id -> Uuid,
        email -> Varchar,
        display_name -> Varchar,
        role -> Varchar,
        password_hash -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Doctor–patient care relationships.
    care_links (doctor_id, patient_id) {
        doctor_id -> Uuid,
        patient_id -> Uuid,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Doctor-authored protocols. `plan` holds the validated day list.
    protocols (id) {
        id -> Uuid,
        doctor_id -> Uuid,
        title -> Varchar,
        description -> Nullable<Text>,
        duration_days -> Int4,
        plan -> Jsonb,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// A patient's run of a protocol.
    ///
    /// A partial unique index keeps one ACTIVE or PAUSED run per
    /// `(patient_id, protocol_id)`.
    prescriptions (id) {
        id -> Uuid,
        protocol_id -> Uuid,
        doctor_id -> Uuid,
        patient_id -> Uuid,
        status -> Varchar,
        notes -> Nullable<Text>,
        prescribed_at -> Timestamptz,
        start_date -> Nullable<Date>,
        paused_on -> Nullable<Date>,
        paused_days -> Int4,
        ended_at -> Nullable<Timestamptz>,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    task_completions (prescription_id, day_number, task_id) {
        prescription_id -> Uuid,
        day_number -> Int4,
        task_id -> Uuid,
        completed_at -> Timestamptz,
    }
}

diesel::table! {
    /// Questions doctors ask in daily check-ins. `kind` is the tagged answer
    /// shape.
    check_in_questions (id) {
        id -> Uuid,
        doctor_id -> Uuid,
        patient_id -> Nullable<Uuid>,
        prompt -> Varchar,
        kind -> Jsonb,
        active -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// One submission per patient per date.
    check_ins (id) {
        id -> Uuid,
        patient_id -> Uuid,
        check_in_date -> Date,
        answers -> Jsonb,
        submitted_at -> Timestamptz,
    }
}

diesel::table! {
    habits (id) {
        id -> Uuid,
        patient_id -> Uuid,
        name -> Varchar,
        description -> Nullable<Text>,
        target_per_week -> Int2,
        archived -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    habit_logs (habit_id, log_date) {
        habit_id -> Uuid,
        log_date -> Date,
    }
}

diesel::table! {
    /// Courses. `outline` holds modules and lessons.
    courses (id) {
        id -> Uuid,
        doctor_id -> Uuid,
        title -> Varchar,
        description -> Nullable<Text>,
        published -> Bool,
        outline -> Jsonb,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    course_enrollments (course_id, patient_id) {
        course_id -> Uuid,
        patient_id -> Uuid,
        enrolled_by -> Uuid,
        completed_lessons -> Array<Uuid>,
        completed_at -> Nullable<Timestamptz>,
        enrolled_at -> Timestamptz,
    }
}

diesel::table! {
    referrals (id) {
        id -> Uuid,
        referrer_id -> Uuid,
        target_role -> Varchar,
        referee_name -> Varchar,
        referee_email -> Varchar,
        referee_phone -> Nullable<Varchar>,
        notes -> Nullable<Text>,
        status -> Varchar,
        converted_user_id -> Nullable<Uuid>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Doctors without a row are on the implicit free plan.
    subscriptions (doctor_id) {
        doctor_id -> Uuid,
        plan -> Varchar,
        status -> Varchar,
        current_period_end -> Date,
        cancel_at_period_end -> Bool,
        trial_used -> Bool,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    clinics (id) {
        id -> Uuid,
        name -> Varchar,
        created_by -> Uuid,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    clinic_memberships (clinic_id, doctor_id) {
        clinic_id -> Uuid,
        doctor_id -> Uuid,
        role -> Varchar,
        joined_at -> Timestamptz,
    }
}

diesel::joinable!(course_enrollments -> courses (course_id));
diesel::joinable!(clinic_memberships -> clinics (clinic_id));
diesel::joinable!(task_completions -> prescriptions (prescription_id));
diesel::joinable!(habit_logs -> habits (habit_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    care_links,
    protocols,
    prescriptions,
    task_completions,
    check_in_questions,
    check_ins,
    habits,
    habit_logs,
    courses,
    course_enrollments,
    referrals,
    subscriptions,
    clinics,
    clinic_memberships,
);
