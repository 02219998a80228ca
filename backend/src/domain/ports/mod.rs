//! Domain ports for the hexagonal boundary.
//!
//! Driven ports (`*Repository`, [`PasswordHasher`]) are implemented by
//! outbound adapters. Driving ports (one trait per use-case area) are
//! implemented by the domain services and called by inbound adapters.

mod macros;
pub(crate) use macros::define_port_error;

mod accounts;
mod care_link_repository;
mod care_team;
mod check_in_repository;
mod check_ins;
mod clinic_repository;
mod clinics;
mod course_repository;
mod courses;
mod habit_repository;
mod habits;
mod password_hasher;
mod prescription_repository;
mod prescriptions;
mod protocol_repository;
mod protocols;
mod referral_repository;
mod referrals;
mod repository_error;
mod subscription_repository;
mod subscriptions;
mod user_repository;

pub use accounts::Accounts;
#[cfg(test)]
pub use accounts::MockAccounts;
pub use care_link_repository::CareLinkRepository;
#[cfg(test)]
pub use care_link_repository::MockCareLinkRepository;
pub use care_team::CareTeam;
#[cfg(test)]
pub use care_team::MockCareTeam;
pub use check_in_repository::CheckInRepository;
#[cfg(test)]
pub use check_in_repository::MockCheckInRepository;
#[cfg(test)]
pub use check_ins::MockCheckIns;
pub use check_ins::{CheckIns, HistoryQuery, NewQuestion};
pub use clinic_repository::ClinicRepository;
#[cfg(test)]
pub use clinic_repository::MockClinicRepository;
#[cfg(test)]
pub use clinics::MockClinics;
pub use clinics::{ClinicSummary, Clinics};
pub use course_repository::CourseRepository;
#[cfg(test)]
pub use course_repository::MockCourseRepository;
#[cfg(test)]
pub use courses::MockCourses;
pub use courses::{Courses, EnrolledCourse};
pub use habit_repository::HabitRepository;
#[cfg(test)]
pub use habit_repository::MockHabitRepository;
#[cfg(test)]
pub use habits::MockHabits;
pub use habits::{HabitPatch, Habits};
#[cfg(test)]
pub use password_hasher::MockPasswordHasher;
pub use password_hasher::{PasswordHashError, PasswordHasher};
#[cfg(test)]
pub use prescription_repository::MockPrescriptionRepository;
pub use prescription_repository::{PrescriptionRepository, ProtocolUsage};
#[cfg(test)]
pub use prescriptions::MockPrescriptions;
pub use prescriptions::{
    CompletionUpdate, PrescribeRequest, PrescriptionQuery, Prescriptions, TodayPlan, TodaySession,
    TodayTask,
};
#[cfg(test)]
pub use protocol_repository::MockProtocolRepository;
pub use protocol_repository::ProtocolRepository;
#[cfg(test)]
pub use protocols::MockProtocols;
pub use protocols::Protocols;
#[cfg(test)]
pub use referral_repository::MockReferralRepository;
pub use referral_repository::ReferralRepository;
#[cfg(test)]
pub use referrals::MockReferrals;
pub use referrals::Referrals;
pub use repository_error::RepositoryError;
#[cfg(test)]
pub use subscription_repository::MockSubscriptionRepository;
pub use subscription_repository::SubscriptionRepository;
#[cfg(test)]
pub use subscriptions::MockSubscriptions;
pub use subscriptions::{SubscriptionView, Subscriptions};
#[cfg(test)]
pub use user_repository::MockUserRepository;
pub use user_repository::{StoredCredentials, UserRepository};
