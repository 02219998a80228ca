//! Tests for the care team service and shared access checks.

use rstest::rstest;

use super::*;
use crate::domain::ports::{MockCareLinkRepository, MockSubscriptions, MockUserRepository};
use crate::domain::test_fixtures::{admin, doctor, fixture_clock, patient, user};
use crate::domain::{ErrorCode, User};

struct Mocks {
    users: MockUserRepository,
    links: MockCareLinkRepository,
    subscriptions: MockSubscriptions,
}

impl Mocks {
    fn new() -> Self {
        Self {
            users: MockUserRepository::new(),
            links: MockCareLinkRepository::new(),
            subscriptions: MockSubscriptions::new(),
        }
    }

    fn with_account(mut self, account: User) -> Self {
        self.users
            .expect_find_by_email()
            .return_once(move |_| Ok(Some(account)));
        self
    }

    fn build(self) -> CareTeamService {
        CareTeamService::new(
            Arc::new(self.users),
            Arc::new(self.links),
            Arc::new(self.subscriptions),
            fixture_clock(),
        )
    }
}

fn email() -> EmailAddress {
    EmailAddress::parse("pat@example.com").expect("email")
}

#[tokio::test]
async fn link_patient_stores_link() {
    let target = user(Role::Patient, "pat@example.com");
    let target_id = target.id;
    let mut mocks = Mocks::new().with_account(target);
    mocks.links.expect_exists().return_once(|_, _| Ok(false));
    mocks
        .subscriptions
        .expect_patient_limit()
        .return_once(|_| Ok(Some(5)));
    mocks.links.expect_count_patients().return_once(|_| Ok(4));
    mocks
        .links
        .expect_insert()
        .withf(move |link| link.patient_id == target_id)
        .times(1)
        .return_once(|_| Ok(()));

    let linked = mocks
        .build()
        .link_patient(doctor(), email())
        .await
        .expect("linked");
    assert_eq!(linked.user.id, target_id);
}

#[tokio::test]
async fn link_patient_enforces_plan_limit() {
    let mut mocks = Mocks::new().with_account(user(Role::Patient, "pat@example.com"));
    mocks.links.expect_exists().return_once(|_, _| Ok(false));
    mocks
        .subscriptions
        .expect_patient_limit()
        .return_once(|_| Ok(Some(5)));
    mocks.links.expect_count_patients().return_once(|_| Ok(5));
    mocks.links.expect_insert().never();

    let err = mocks
        .build()
        .link_patient(doctor(), email())
        .await
        .expect_err("limit");
    assert_eq!(err.code(), ErrorCode::Forbidden);
    assert_eq!(
        err.details().and_then(|d| d.get("code")).and_then(|c| c.as_str()),
        Some("patient_limit_reached")
    );
}

#[tokio::test]
async fn unlimited_plans_skip_the_count() {
    let mut mocks = Mocks::new().with_account(user(Role::Patient, "pat@example.com"));
    mocks.links.expect_exists().return_once(|_, _| Ok(false));
    mocks
        .subscriptions
        .expect_patient_limit()
        .return_once(|_| Ok(None));
    mocks.links.expect_count_patients().never();
    mocks.links.expect_insert().return_once(|_| Ok(()));

    assert!(mocks.build().link_patient(doctor(), email()).await.is_ok());
}

#[tokio::test]
async fn link_patient_rejects_duplicates() {
    let mut mocks = Mocks::new().with_account(user(Role::Patient, "pat@example.com"));
    mocks.links.expect_exists().return_once(|_, _| Ok(true));
    let err = mocks
        .build()
        .link_patient(doctor(), email())
        .await
        .expect_err("duplicate");
    assert_eq!(err.code(), ErrorCode::Conflict);
}

#[tokio::test]
async fn link_patient_rejects_doctors_as_targets() {
    let mocks = Mocks::new().with_account(user(Role::Doctor, "pat@example.com"));
    let err = mocks
        .build()
        .link_patient(doctor(), email())
        .await
        .expect_err("not a patient");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}

#[tokio::test]
async fn patients_cannot_link() {
    let err = Mocks::new()
        .build()
        .link_patient(patient(), email())
        .await
        .expect_err("forbidden");
    assert_eq!(err.code(), ErrorCode::Forbidden);
}

#[tokio::test]
async fn unlink_reports_missing_links() {
    let mut mocks = Mocks::new();
    mocks.links.expect_delete().return_once(|_, _| Ok(false));
    let err = mocks
        .build()
        .unlink_patient(doctor(), UserId::random())
        .await
        .expect_err("missing");
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[rstest]
#[case(Role::Patient, true, false, true)]
#[case(Role::Patient, false, false, false)]
#[case(Role::Doctor, false, true, true)]
#[case(Role::Doctor, false, false, false)]
#[case(Role::SuperAdmin, false, true, false)]
#[tokio::test]
async fn patient_access_rules(
    #[case] role: Role,
    #[case] is_self: bool,
    #[case] linked: bool,
    #[case] allowed: bool,
) {
    let principal = Principal::new(UserId::random(), role);
    let patient_id = if is_self {
        principal.user_id
    } else {
        UserId::random()
    };
    let mut links = MockCareLinkRepository::new();
    links.expect_exists().returning(move |_, _| Ok(linked));
    let result = ensure_patient_access(&links, principal, patient_id).await;
    assert_eq!(result.is_ok(), allowed);
}

#[rstest]
fn subject_patient_defaults_to_patient_caller() {
    let caller = patient();
    assert_eq!(subject_patient(caller, None).ok(), Some(caller.user_id));
    let err = subject_patient(admin(), None).expect_err("required");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}
