//! Wiring of Diesel repositories into the shared HTTP state.

use std::sync::Arc;

use actix_web::web;
use mockable::DefaultClock;

use careplan::inbound::http::state::{HttpState, Repositories};
use careplan::outbound::persistence::{
    DbPool, DieselCareLinkRepository, DieselCheckInRepository, DieselClinicRepository,
    DieselCourseRepository, DieselHabitRepository, DieselPrescriptionRepository,
    DieselProtocolRepository, DieselReferralRepository, DieselSubscriptionRepository,
    DieselUserRepository,
};
use careplan::outbound::security::Argon2PasswordHasher;

/// One repository per port, all sharing `pool`.
fn diesel_repositories(pool: &DbPool) -> Repositories {
    Repositories {
        users: Arc::new(DieselUserRepository::new(pool.clone())),
        links: Arc::new(DieselCareLinkRepository::new(pool.clone())),
        protocols: Arc::new(DieselProtocolRepository::new(pool.clone())),
        prescriptions: Arc::new(DieselPrescriptionRepository::new(pool.clone())),
        check_ins: Arc::new(DieselCheckInRepository::new(pool.clone())),
        habits: Arc::new(DieselHabitRepository::new(pool.clone())),
        courses: Arc::new(DieselCourseRepository::new(pool.clone())),
        referrals: Arc::new(DieselReferralRepository::new(pool.clone())),
        subscriptions: Arc::new(DieselSubscriptionRepository::new(pool.clone())),
        clinics: Arc::new(DieselClinicRepository::new(pool.clone())),
    }
}

/// Build the shared HTTP state over the database.
pub(super) fn build_http_state(pool: &DbPool) -> web::Data<HttpState> {
    web::Data::new(HttpState::from_repositories(
        diesel_repositories(pool),
        Arc::new(Argon2PasswordHasher::default()),
        Arc::new(DefaultClock),
    ))
}
