//! HTTP inbound adapter exposing REST endpoints.

use actix_web::web;

use crate::domain::Error;

pub mod auth;
pub mod care_team;
pub mod check_ins;
pub mod clinics;
pub mod courses;
pub mod error;
pub mod habits;
pub mod health;
pub(crate) mod pagination;
pub mod prescriptions;
pub mod protocols;
pub mod referrals;
pub mod schemas;
pub mod session;
pub mod session_config;
pub mod state;
pub mod subscriptions;
#[cfg(test)]
pub mod test_utils;
pub mod users;
pub mod validation;

pub use error::ApiResult;

fn rejected(message: String) -> actix_web::Error {
    Error::invalid_request(message).into()
}

/// Register every `/api/v1` handler on `cfg`.
///
/// Extractor failures (malformed JSON, query strings or paths) are reported
/// as `invalid_request` errors so clients always receive the JSON envelope.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _| rejected(err.to_string())))
        .app_data(web::QueryConfig::default().error_handler(|err, _| rejected(err.to_string())))
        .app_data(web::PathConfig::default().error_handler(|err, _| rejected(err.to_string())))
        .service(auth::register)
        .service(auth::login)
        .service(auth::logout)
        .service(users::current_user)
        .service(users::list_users)
        .service(care_team::link_patient)
        .service(care_team::list_patients)
        .service(care_team::unlink_patient)
        .service(care_team::list_doctors)
        .service(protocols::create_protocol)
        .service(protocols::list_protocols)
        .service(protocols::get_protocol)
        .service(protocols::update_protocol)
        .service(protocols::delete_protocol)
        .service(prescriptions::prescribe)
        .service(prescriptions::list_prescriptions)
        .service(prescriptions::get_prescription)
        .service(prescriptions::transition_prescription)
        .service(prescriptions::prescription_progress)
        .service(prescriptions::prescription_today)
        .service(prescriptions::list_completions)
        .service(prescriptions::record_completion)
        .service(check_ins::create_question)
        .service(check_ins::list_questions)
        .service(check_ins::deactivate_question)
        .service(check_ins::my_questions)
        .service(check_ins::submit_check_in)
        .service(check_ins::check_in_history)
        .service(habits::create_habit)
        .service(habits::list_habits)
        .service(habits::update_habit)
        .service(habits::archive_habit)
        .service(habits::set_habit_progress)
        .service(habits::habit_stats)
        .service(courses::create_course)
        .service(courses::list_courses)
        .service(courses::update_course)
        .service(courses::delete_course)
        .service(courses::publish_course)
        .service(courses::enroll_patient)
        .service(courses::my_courses)
        .service(courses::set_lesson_completion)
        .service(referrals::create_referral)
        .service(referrals::list_my_referrals)
        .service(referrals::list_all_referrals)
        .service(referrals::update_referral_status)
        .service(subscriptions::my_subscription)
        .service(subscriptions::change_plan)
        .service(subscriptions::cancel_subscription)
        .service(subscriptions::set_subscription_status)
        .service(clinics::create_clinic)
        .service(clinics::list_clinics)
        .service(clinics::list_members)
        .service(clinics::add_member)
        .service(clinics::change_role)
        .service(clinics::remove_member);
}
