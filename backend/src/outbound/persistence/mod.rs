//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Each repository implements one domain port over a shared `bb8` pool of
//! `diesel-async` connections.
//!
//! - **Thin adapters**: repositories translate between row structs and
//!   domain types. Business rules stay in the domain services.
//! - **Internal models**: row structs (`models.rs`) and table definitions
//!   (`schema.rs`) never leave this module.
//! - **Typed errors**: database failures map onto
//!   [`RepositoryError`](crate::domain::ports::RepositoryError); unique and
//!   foreign key violations become conflicts.
//!
//! # Example
//!
//! ```ignore
//! use careplan::outbound::persistence::{DbPool, PoolConfig, DieselUserRepository};
//!
//! let config = PoolConfig::new("postgres://localhost/careplan");
//! let pool = DbPool::new(config).await?;
//! let users = DieselUserRepository::new(pool);
//! ```

mod diesel_care_link_repository;
mod diesel_check_in_repository;
mod diesel_clinic_repository;
mod diesel_course_repository;
mod diesel_habit_repository;
pub(crate) mod diesel_helpers;
mod diesel_prescription_repository;
mod diesel_protocol_repository;
mod diesel_referral_repository;
mod diesel_subscription_repository;
mod diesel_user_repository;
mod json_serializers;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_care_link_repository::DieselCareLinkRepository;
pub use diesel_check_in_repository::DieselCheckInRepository;
pub use diesel_clinic_repository::DieselClinicRepository;
pub use diesel_course_repository::DieselCourseRepository;
pub use diesel_habit_repository::DieselHabitRepository;
pub use diesel_prescription_repository::DieselPrescriptionRepository;
pub use diesel_protocol_repository::DieselProtocolRepository;
pub use diesel_referral_repository::DieselReferralRepository;
pub use diesel_subscription_repository::DieselSubscriptionRepository;
pub use diesel_user_repository::DieselUserRepository;
pub use migrations::run_migrations;
pub use pool::{DbPool, PoolConfig, PoolError};
