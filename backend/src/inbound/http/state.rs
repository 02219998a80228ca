//! Shared HTTP adapter state.
//!
//! Handlers receive this state through `actix_web::web::Data`, so they only
//! depend on driving ports and stay testable without I/O.

use std::sync::Arc;

use mockable::Clock;

use crate::domain::ports::{
    Accounts, CareLinkRepository, CareTeam, CheckInRepository, CheckIns, ClinicRepository,
    Clinics, CourseRepository, Courses, HabitRepository, Habits, PasswordHasher,
    PrescriptionRepository, Prescriptions, ProtocolRepository, Protocols, ReferralRepository,
    Referrals, SubscriptionRepository, Subscriptions, UserRepository,
};
use crate::domain::{
    AccountService, CareTeamService, CheckInService, ClinicService, CourseService, HabitService,
    PrescriptionService, ProtocolService, ReferralService, SubscriptionService,
};

/// Dependency bundle for HTTP handlers, one port per use-case area.
#[derive(Clone)]
pub struct HttpState {
    pub accounts: Arc<dyn Accounts>,
    pub care_team: Arc<dyn CareTeam>,
    pub protocols: Arc<dyn Protocols>,
    pub prescriptions: Arc<dyn Prescriptions>,
    pub check_ins: Arc<dyn CheckIns>,
    pub habits: Arc<dyn Habits>,
    pub courses: Arc<dyn Courses>,
    pub referrals: Arc<dyn Referrals>,
    pub subscriptions: Arc<dyn Subscriptions>,
    pub clinics: Arc<dyn Clinics>,
}

/// Driven adapters the domain services are wired over.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub links: Arc<dyn CareLinkRepository>,
    pub protocols: Arc<dyn ProtocolRepository>,
    pub prescriptions: Arc<dyn PrescriptionRepository>,
    pub check_ins: Arc<dyn CheckInRepository>,
    pub habits: Arc<dyn HabitRepository>,
    pub courses: Arc<dyn CourseRepository>,
    pub referrals: Arc<dyn ReferralRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub clinics: Arc<dyn ClinicRepository>,
}

impl HttpState {
    /// Wire every domain service over the given adapters.
    ///
    /// Account registration converts referrals and care team linking checks
    /// plan limits, so those services share the referral and subscription
    /// services built here.
    #[must_use]
    pub fn from_repositories(
        repos: Repositories,
        hasher: Arc<dyn PasswordHasher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let referrals: Arc<dyn Referrals> = Arc::new(ReferralService::new(
            repos.referrals,
            repos.users.clone(),
            clock.clone(),
        ));
        let subscriptions: Arc<dyn Subscriptions> = Arc::new(SubscriptionService::new(
            repos.subscriptions,
            repos.users.clone(),
            repos.links.clone(),
            clock.clone(),
        ));
        Self {
            accounts: Arc::new(AccountService::new(
                repos.users.clone(),
                hasher,
                referrals.clone(),
                clock.clone(),
            )),
            care_team: Arc::new(CareTeamService::new(
                repos.users.clone(),
                repos.links.clone(),
                subscriptions.clone(),
                clock.clone(),
            )),
            protocols: Arc::new(ProtocolService::new(
                repos.protocols.clone(),
                repos.prescriptions.clone(),
                clock.clone(),
            )),
            prescriptions: Arc::new(PrescriptionService::new(
                repos.protocols,
                repos.prescriptions,
                repos.links.clone(),
                clock.clone(),
            )),
            check_ins: Arc::new(CheckInService::new(
                repos.check_ins,
                repos.links.clone(),
                clock.clone(),
            )),
            habits: Arc::new(HabitService::new(
                repos.habits,
                repos.links.clone(),
                clock.clone(),
            )),
            courses: Arc::new(CourseService::new(repos.courses, repos.links, clock.clone())),
            referrals,
            subscriptions,
            clinics: Arc::new(ClinicService::new(repos.clinics, repos.users, clock)),
        }
    }
}
